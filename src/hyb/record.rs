//! A hybrid record.
//!
//! One hyb line describes one chimeric (hybrid) read: the read's identifier
//! and nucleotide sequence, an optional folding energy, the alignment
//! properties of its two segments, and a table of `key=value` flags. See
//! [`Record`] for the details and [`Record::from_line`] for the text format.

pub mod flags;
pub mod segment;

use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;

use noodles::fasta;
use regex::Regex;

pub use flags::Flags;
pub use flags::Key;
pub use segment::SegmentProperties;

use crate::fold;

/// The delimiter between the fields of a hyb line.
pub const DELIMITER: char = '\t';

/// The placeholder written for a missing value.
pub const PLACEHOLDER: &str = ".";

/// The number of fields in a hyb line without a flag field.
pub const NUM_FIELDS_BARE: usize = 15;

/// The number of fields in a hyb line with a flag field.
pub const NUM_FIELDS_FLAGGED: usize = 16;

/// The field names of a hyb line, in order.
pub const FIELD_NAMES: [&str; NUM_FIELDS_FLAGGED] = [
    "id",
    "seq",
    "energy",
    "seg1_ref_name",
    "seg1_read_start",
    "seg1_read_end",
    "seg1_ref_start",
    "seg1_ref_end",
    "seg1_score",
    "seg2_ref_name",
    "seg2_read_start",
    "seg2_read_end",
    "seg2_ref_start",
    "seg2_ref_end",
    "seg2_score",
    "flags",
];

/// The segment types treated as miRNA by default.
pub const MIRNA_TYPES: [&str; 2] = ["miRNA", "microRNA"];

/// The segment type assigned when a type cannot be found but unknown types
/// are allowed.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Matches numeric strings, including scientific notation.
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+(\.\d+)?([eE][-+]?\d+)?$").unwrap());

/// Returns whether a string holds a plain or scientific-notation number.
pub(crate) fn is_numeric_string(s: &str) -> bool {
    NUMERIC.is_match(s)
}

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a hyb line.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of fields in the line.
    IncorrectNumberOfFields(usize),

    /// An invalid coordinate field.
    InvalidCoordinate(&'static str, ParseIntError),

    /// An invalid flag field.
    Flags(flags::Error),

    /// An identifier that does not follow the `<read_id>_<read_count>` shape
    /// expected when inferring read counts from identifiers.
    InvalidHybformatId(String),

    /// A reference name that does not follow the
    /// `<gene>_<transcript>_<name>_<type>` shape expected when inferring
    /// segment types from reference names.
    InvalidHybformatRef(String),

    /// A segment type inferred from a reference name conflicts with a
    /// segment type flag already present on the line.
    SegmentTypeConflict(String, String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(fields) => write!(
                f,
                "invalid number of fields in hyb line: expected {} or {} fields, found {} fields",
                NUM_FIELDS_BARE, NUM_FIELDS_FLAGGED, fields
            ),
            ParseError::InvalidCoordinate(field, err) => {
                write!(f, "invalid {}: {}", field, err)
            }
            ParseError::Flags(err) => write!(f, "invalid flags: {err}"),
            ParseError::InvalidHybformatId(id) => write!(
                f,
                "invalid identifier for read count inference: expected \
                 `<read_id>_<read_count>`, found \"{}\"",
                id
            ),
            ParseError::InvalidHybformatRef(ref_name) => write!(
                f,
                "invalid reference name for segment type inference: expected \
                 `<gene>_<transcript>_<name>_<type>`, found \"{}\"",
                ref_name
            ),
            ParseError::SegmentTypeConflict(existing, parsed) => write!(
                f,
                "segment type \"{}\" inferred from the reference name conflicts with the \
                 segment type flag \"{}\"",
                parsed, existing
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to a [`Record`].
#[derive(Debug)]
pub enum Error {
    /// A missing or empty identifier.
    MissingId,

    /// A missing or empty sequence.
    MissingSequence,

    /// A sequence containing non-alphabetic characters.
    NonAlphabeticSequence(String),

    /// An energy that is not a numeric string.
    InvalidEnergy(String),

    /// A read count that disagrees with the record's `read_count` flag.
    ReadCountMismatch(u64, String),

    /// A flag error.
    Flag(flags::Error),

    /// A parse error.
    Parse(ParseError),

    /// A segment error.
    Segment(segment::Error),

    /// A count flag holding a non-integer value.
    InvalidCount(String),

    /// A segment type was requested before the types were evaluated.
    TypesNotEvaluated,

    /// A type could not be found for a segment.
    UnknownSegmentType(usize, Option<String>),

    /// The miRNA state was requested before it was evaluated.
    MirnaNotEvaluated,

    /// A `miRNA_seg` flag holding an unrecognized value.
    InvalidMirnaSeg(String),

    /// A miRNA detail was requested from a record with no miRNA segment.
    NoMirna(String),

    /// A miRNA detail was requested from a miRNA dimer without the dimer
    /// escape.
    MirnaDimer(String),

    /// A fold-derived detail was requested before a fold record was set.
    FoldRecordNotSet,

    /// The record's energy disagrees with its fold record's energy.
    EnergyMismatch(String, String),

    /// A fold record error.
    Fold(fold::record::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingId => write!(f, "missing identifier"),
            Error::MissingSequence => write!(f, "missing sequence"),
            Error::NonAlphabeticSequence(seq) => {
                write!(f, "sequence contains non-alphabetic characters: \"{}\"", seq)
            }
            Error::InvalidEnergy(energy) => {
                write!(f, "invalid energy: expected a numeric string, found \"{}\"", energy)
            }
            Error::ReadCountMismatch(argument, flag) => write!(
                f,
                "provided read count {} disagrees with the `read_count` flag \"{}\"",
                argument, flag
            ),
            Error::Flag(err) => write!(f, "flag error: {err}"),
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Segment(err) => write!(f, "segment error: {err}"),
            Error::InvalidCount(value) => {
                write!(f, "invalid count: expected an integer, found \"{}\"", value)
            }
            Error::TypesNotEvaluated => write!(
                f,
                "segment types have not been evaluated; call `eval_types` first"
            ),
            Error::UnknownSegmentType(segment, ref_name) => write!(
                f,
                "cannot identify a type for segment {} (reference name: {})",
                segment,
                ref_name.as_deref().unwrap_or(PLACEHOLDER)
            ),
            Error::MirnaNotEvaluated => write!(
                f,
                "the miRNA state has not been evaluated; call `eval_mirna` first"
            ),
            Error::InvalidMirnaSeg(value) => write!(
                f,
                "unrecognized `miRNA_seg` flag value: expected \"N\", \"5p\", \"3p\", or \"B\", \
                 found \"{}\"",
                value
            ),
            Error::NoMirna(id) => {
                write!(f, "record \"{}\" does not contain a miRNA segment", id)
            }
            Error::MirnaDimer(id) => write!(
                f,
                "record \"{}\" is a miRNA dimer; pass `allow_mirna_dimers` to treat segment 1 \
                 as the miRNA",
                id
            ),
            Error::FoldRecordNotSet => {
                write!(f, "no fold record has been set for this record")
            }
            Error::EnergyMismatch(hyb, fold) => write!(
                f,
                "record energy \"{}\" disagrees with the fold record energy \"{}\"",
                hyb, fold
            ),
            Error::Fold(err) => write!(f, "fold record error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<segment::Error> for Error {
    fn from(err: segment::Error) -> Self {
        Error::Segment(err)
    }
}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Type finding
////////////////////////////////////////////////////////////////////////////////////////

/// A strategy for classifying a segment into a type (e.g., `microRNA`).
///
/// The crate deliberately ships no classification strategies of its own: how
/// a pipeline maps reference names to types is its own concern. Any closure
/// from segment properties to an optional type string works:
///
/// ```
/// use hybfile::hyb::record::SegmentProperties;
///
/// // Hyb-style reference names carry the type as their fourth `_`-separated
/// // component.
/// let finder = |segment: &SegmentProperties| -> Option<String> {
///     let parts = segment.ref_name.as_deref()?.split('_').collect::<Vec<_>>();
///     match parts.as_slice() {
///         [_, _, _, seg_type] if !seg_type.is_empty() => Some((*seg_type).to_string()),
///         _ => None,
///     }
/// };
///
/// let segment = SegmentProperties {
///     ref_name: Some(String::from("MIMAT0000078_MirBase_miR-23a_microRNA")),
///     ..Default::default()
/// };
///
/// use hybfile::hyb::record::TypeFinder as _;
/// assert_eq!(finder.find(&segment), Some(String::from("microRNA")));
/// ```
pub trait TypeFinder {
    /// Returns the type of the segment, or [`None`] when the segment cannot
    /// be classified.
    fn find(&self, segment: &SegmentProperties) -> Option<String>;
}

impl<F> TypeFinder for F
where
    F: Fn(&SegmentProperties) -> Option<String>,
{
    fn find(&self, segment: &SegmentProperties) -> Option<String> {
        self(segment)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Parse configuration
////////////////////////////////////////////////////////////////////////////////////////

/// Configuration for parsing hyb lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseConfig {
    /// Infer the `read_count` flag from identifiers shaped
    /// `<read_id>_<read_count>`, as written by the Hyb software package.
    pub hybformat_id: bool,

    /// Infer segment type flags from reference names shaped
    /// `<gene>_<transcript>_<name>_<type>`, as found in the reference
    /// database of the Hyb software package.
    pub hybformat_ref: bool,

    /// Accept flags outside the defined set.
    pub allow_undefined_flags: bool,
}

////////////////////////////////////////////////////////////////////////////////////////
// Record
////////////////////////////////////////////////////////////////////////////////////////

/// A chimeric-read record from a hyb file.
///
/// # Examples
///
/// ```
/// use hybfile::hyb;
///
/// let line = "1_1000\tAAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG\t-10.0\t\
///             ARTSEG1_SOURCE_NAME_microRNA\t1\t20\t1\t20\t0.001\t\
///             ARTSEG2_SOURCE_NAME_mRNA\t21\t40\t21\t40\t0.001\tdataset=artificial";
///
/// let record = line.parse::<hyb::Record>()?;
///
/// assert_eq!(record.id(), "1_1000");
/// assert_eq!(record.energy(), Some("-10.0"));
/// assert_eq!(record.seg1().read_span()?, Some(20));
/// assert_eq!(record.to_line(), line);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Record {
    /// The read identifier.
    id: String,

    /// The hybrid nucleotide sequence.
    seq: String,

    /// The intra-hybrid folding energy, kept verbatim.
    energy: Option<String>,

    /// The alignment properties of the 5′ segment.
    seg1: SegmentProperties,

    /// The alignment properties of the 3′ segment.
    seg2: SegmentProperties,

    /// The flag table.
    flags: Flags,

    /// The fold record paired with this record, if one has been set.
    fold_record: Option<fold::Record>,
}

impl Record {
    /// Attempts to create a new [`Record`].
    ///
    /// A `read_count` provided here must agree with any `read_count` flag
    /// already present in `flags`; when no such flag exists, the provided
    /// count is stored as one.
    pub fn try_new(
        id: impl Into<String>,
        seq: impl Into<String>,
        energy: Option<String>,
        seg1: SegmentProperties,
        seg2: SegmentProperties,
        flags: Flags,
        read_count: Option<u64>,
    ) -> Result<Self> {
        let id = id.into();
        let seq = seq.into();

        if id.is_empty() || id == PLACEHOLDER || id.chars().any(char::is_whitespace) {
            return Err(Error::MissingId);
        }

        if seq.is_empty() || seq == PLACEHOLDER {
            return Err(Error::MissingSequence);
        }

        if !seq.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::NonAlphabeticSequence(seq));
        }

        let energy = energy.filter(|energy| energy != PLACEHOLDER);
        if let Some(energy) = &energy {
            if !is_numeric_string(energy) {
                return Err(Error::InvalidEnergy(energy.clone()));
            }
        }

        let mut flags = flags;
        if let Some(read_count) = read_count {
            match flags.get(Key::ReadCount) {
                Some(flag) if flag != read_count.to_string() => {
                    return Err(Error::ReadCountMismatch(read_count, flag.into()));
                }
                Some(_) => {}
                None => flags.set(Key::ReadCount, read_count.to_string()),
            }
        }

        Ok(Record {
            id,
            seq,
            energy,
            seg1,
            seg2,
            flags,
            fold_record: None,
        })
    }

    /// Parses a record from a hyb line with the default configuration.
    ///
    /// Equivalent to `line.parse::<Record>()`.
    pub fn from_line(line: &str) -> Result<Self> {
        Self::from_line_with(line, &ParseConfig::default())
    }

    /// Parses a record from a hyb line.
    ///
    /// A hyb line has fifteen tab-separated fields (identifier, sequence,
    /// energy, and six alignment fields for each of the two segments), plus
    /// an optional sixteenth field of `;`-separated `key=value` flags. A
    /// lone `.` marks a missing value.
    pub fn from_line_with(line: &str, config: &ParseConfig) -> Result<Self> {
        let fields = line.trim_end_matches(['\n', '\r']).split(DELIMITER).collect::<Vec<_>>();

        if fields.len() != NUM_FIELDS_BARE && fields.len() != NUM_FIELDS_FLAGGED {
            return Err(Error::Parse(ParseError::IncorrectNumberOfFields(
                fields.len(),
            )));
        }

        let id = fields[0];
        let seq = fields[1];
        let energy = optional(fields[2]).map(String::from);

        let seg1 = parse_segment(&fields[3..9], 1)?;
        let seg2 = parse_segment(&fields[9..15], 2)?;

        let mut flags = match fields.get(NUM_FIELDS_FLAGGED - 1) {
            Some(field) => Flags::from_flag_string(field, config.allow_undefined_flags)
                .map_err(|err| Error::Parse(ParseError::Flags(err)))?,
            None if config.allow_undefined_flags => Flags::with_undefined_allowed(),
            None => Flags::new(),
        };

        let read_count = match config.hybformat_id {
            true => Some(read_count_from_id(id)?),
            false => None,
        };

        if config.hybformat_ref {
            infer_segment_type(&seg1, Key::Seg1Type, &mut flags)?;
            infer_segment_type(&seg2, Key::Seg2Type, &mut flags)?;
        }

        Self::try_new(id, seq, energy, seg1, seg2, flags, read_count)
    }

    /// Gets the read identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the hybrid nucleotide sequence.
    pub fn seq(&self) -> &str {
        &self.seq
    }

    /// Gets the intra-hybrid folding energy.
    pub fn energy(&self) -> Option<&str> {
        self.energy.as_deref()
    }

    /// Gets the alignment properties of the 5′ segment.
    pub fn seg1(&self) -> &SegmentProperties {
        &self.seg1
    }

    /// Gets the alignment properties of the 3′ segment.
    pub fn seg2(&self) -> &SegmentProperties {
        &self.seg2
    }

    /// Gets a mutable reference to the alignment properties of the 5′
    /// segment.
    pub fn seg1_mut(&mut self) -> &mut SegmentProperties {
        &mut self.seg1
    }

    /// Gets a mutable reference to the alignment properties of the 3′
    /// segment.
    pub fn seg2_mut(&mut self) -> &mut SegmentProperties {
        &mut self.seg2
    }

    /// Gets the flag table.
    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// Gets a mutable reference to the flag table.
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Sets a flag by its textual key, honoring the record's undefined-flag
    /// policy.
    pub fn set_flag(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.flags.set_by_name(name, value).map_err(Error::Flag)
    }

    /// Gets the fold record paired with this record, if one has been set.
    pub fn fold_record(&self) -> Option<&fold::Record> {
        self.fold_record.as_ref()
    }

    /// Gets the assigned type of segment 1, if evaluated.
    pub fn seg1_type(&self) -> Option<&str> {
        self.flags.get(Key::Seg1Type)
    }

    /// Gets the assigned type of segment 2, if evaluated.
    pub fn seg2_type(&self) -> Option<&str> {
        self.flags.get(Key::Seg2Type)
    }

    /// Gets the number of reads represented by this record, from the
    /// `read_count` flag.
    pub fn read_count(&self) -> Result<Option<u64>> {
        match self.flags.get(Key::ReadCount) {
            Some(value) => value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::InvalidCount(value.into())),
            None => Ok(None),
        }
    }

    /// Gets the number of records represented by this record, from the
    /// `count_total` flag. A record without the flag represents itself
    /// alone.
    pub fn record_count(&self) -> Result<u64> {
        match self.flags.get(Key::CountTotal) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| Error::InvalidCount(value.into())),
            None => Ok(1),
        }
    }

    /// Evaluates the types of both segments with the provided finder,
    /// storing the results in the `seg1_type` and `seg2_type` flags.
    ///
    /// The evaluation is deterministic for a given finder, so repeated calls
    /// are harmless. When the finder cannot classify a segment, the segment
    /// is assigned [`UNKNOWN_TYPE`] if `allow_unknown` is set and the call
    /// fails otherwise.
    pub fn eval_types<F>(&mut self, finder: &F, allow_unknown: bool) -> Result<()>
    where
        F: TypeFinder + ?Sized,
    {
        let mut types = Vec::with_capacity(2);

        for (number, segment) in [(1, &self.seg1), (2, &self.seg2)] {
            match finder.find(segment) {
                Some(seg_type) => types.push(seg_type),
                None if allow_unknown => types.push(UNKNOWN_TYPE.to_string()),
                None => {
                    return Err(Error::UnknownSegmentType(
                        number,
                        segment.ref_name.clone(),
                    ));
                }
            }
        }

        // Both segments classified; only now mutate the flags.
        let seg2_type = types.pop().unwrap();
        let seg1_type = types.pop().unwrap();
        self.flags.set(Key::Seg1Type, seg1_type);
        self.flags.set(Key::Seg2Type, seg2_type);

        Ok(())
    }

    /// Evaluates which segments are miRNA, storing the result in the
    /// `miRNA_seg` flag: `B` when both segment types are miRNA types, `5p`
    /// for segment 1 only, `3p` for segment 2 only, and `N` for neither.
    ///
    /// Requires [`Record::eval_types`] to have run. A record whose
    /// `miRNA_seg` flag is already set is left untouched unless `overwrite`
    /// is passed.
    pub fn eval_mirna(&mut self, mirna_types: &[&str], overwrite: bool) -> Result<()> {
        if !overwrite && self.flags.get(Key::MirnaSeg).is_some() {
            return Ok(());
        }

        let (seg1_type, seg2_type) = match (self.seg1_type(), self.seg2_type()) {
            (Some(seg1_type), Some(seg2_type)) => (seg1_type, seg2_type),
            _ => return Err(Error::TypesNotEvaluated),
        };

        let seg1_mirna = mirna_types.contains(&seg1_type);
        let seg2_mirna = mirna_types.contains(&seg2_type);

        let mirna_seg = match (seg1_mirna, seg2_mirna) {
            (true, true) => "B",
            (true, false) => "5p",
            (false, true) => "3p",
            (false, false) => "N",
        };

        self.flags.set(Key::MirnaSeg, mirna_seg);

        Ok(())
    }

    /// Resolves which segment is the miRNA and which is the target.
    ///
    /// Requires [`Record::eval_mirna`] to have run and the record to contain
    /// exactly one miRNA segment, unless `allow_mirna_dimers` is passed, in
    /// which case segment 1 of a dimer is treated as the miRNA side.
    fn mirna_side(&self, allow_mirna_dimers: bool) -> Result<MirnaSide> {
        match self.flags.get(Key::MirnaSeg) {
            None => Err(Error::MirnaNotEvaluated),
            Some("N") => Err(Error::NoMirna(self.id.clone())),
            Some("B") if allow_mirna_dimers => Ok(MirnaSide::Seg1),
            Some("B") => Err(Error::MirnaDimer(self.id.clone())),
            Some("5p") => Ok(MirnaSide::Seg1),
            Some("3p") => Ok(MirnaSide::Seg2),
            Some(value) => Err(Error::InvalidMirnaSeg(value.into())),
        }
    }

    /// Collects the details of the record's miRNA/target pairing.
    ///
    /// The fold substrings are present only when a fold record has been set.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    ///
    /// let line = "1_1000\tAAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG\t-10.0\t\
    ///             ARTSEG1_SOURCE_NAME_microRNA\t1\t20\t1\t20\t0.001\t\
    ///             ARTSEG2_SOURCE_NAME_mRNA\t21\t40\t21\t40\t0.001\t\
    ///             seg1_type=microRNA;seg2_type=mRNA;miRNA_seg=5p;dataset=artificial";
    ///
    /// let record = line.parse::<hyb::Record>()?;
    /// let details = record.mirna_details(false)?;
    ///
    /// assert_eq!(details.mirna_ref.as_deref(), Some("ARTSEG1_SOURCE_NAME_microRNA"));
    /// assert_eq!(details.mirna_seq, "AAAAAAAAAAAAAAAAAAAA");
    /// assert_eq!(details.target_seq, "GGGGGGGGGGGGGGGGGGGG");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn mirna_details(&self, allow_mirna_dimers: bool) -> Result<MirnaDetails> {
        let side = self.mirna_side(allow_mirna_dimers)?;

        let (mirna, target) = match side {
            MirnaSide::Seg1 => (&self.seg1, &self.seg2),
            MirnaSide::Seg2 => (&self.seg2, &self.seg1),
        };

        let (mirna_seg_type, target_seg_type) = match side {
            MirnaSide::Seg1 => (self.seg1_type(), self.seg2_type()),
            MirnaSide::Seg2 => (self.seg2_type(), self.seg1_type()),
        };

        let (mirna_fold, target_fold) = match &self.fold_record {
            Some(fold_record) => (
                Some(fold_record.seg_fold(mirna, self).map_err(Error::Fold)?.to_string()),
                Some(fold_record.seg_fold(target, self).map_err(Error::Fold)?.to_string()),
            ),
            None => (None, None),
        };

        Ok(MirnaDetails {
            mirna_ref: mirna.ref_name.clone(),
            target_ref: target.ref_name.clone(),
            mirna_seg_type: mirna_seg_type.map(String::from),
            target_seg_type: target_seg_type.map(String::from),
            mirna_seq: mirna.slice(&self.seq)?.to_string(),
            target_seq: target.slice(&self.seq)?.to_string(),
            mirna_fold,
            target_fold,
        })
    }

    /// Gets a single miRNA/target detail.
    ///
    /// Requesting a fold detail before a fold record has been set is an
    /// error; the other details come back as [`None`] when unavailable.
    pub fn mirna_detail(
        &self,
        detail: MirnaDetail,
        allow_mirna_dimers: bool,
    ) -> Result<Option<String>> {
        let details = self.mirna_details(allow_mirna_dimers)?;

        let value = match detail {
            MirnaDetail::MirnaRef => details.mirna_ref,
            MirnaDetail::TargetRef => details.target_ref,
            MirnaDetail::MirnaSegType => details.mirna_seg_type,
            MirnaDetail::TargetSegType => details.target_seg_type,
            MirnaDetail::MirnaSeq => Some(details.mirna_seq),
            MirnaDetail::TargetSeq => Some(details.target_seq),
            MirnaDetail::MirnaFold => {
                Some(details.mirna_fold.ok_or(Error::FoldRecordNotSet)?)
            }
            MirnaDetail::TargetFold => {
                Some(details.target_fold.ok_or(Error::FoldRecordNotSet)?)
            }
        };

        Ok(value)
    }

    /// Returns whether either segment's alignment contains an insertion or
    /// deletion, i.e., whether a segment's read span and reference span
    /// differ in length.
    ///
    /// Segments without both span pairs set cannot contain a detectable
    /// indel and are skipped.
    pub fn has_indels(&self) -> Result<bool> {
        for segment in [&self.seg1, &self.seg2] {
            let (read_span, ref_span) = (segment.read_span()?, segment.ref_span()?);

            if let (Some(read_span), Some(ref_span)) = (read_span, ref_span) {
                if read_span != ref_span {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Evaluates a predicate over the record.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    /// use hybfile::hyb::record::Match;
    /// use hybfile::hyb::record::Prop;
    /// use hybfile::hyb::record::StringField;
    ///
    /// let line = "1_1000\tAAAAGGGG\t.\t\
    ///             ARTSEG1_SOURCE_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
    ///             ARTSEG2_SOURCE_NAME_mRNA\t5\t8\t5\t8\t0.001\tdataset=artificial";
    /// let record = line.parse::<hyb::Record>()?;
    ///
    /// let prop = Prop::String(StringField::Id, Match::Prefix, String::from("1_"));
    /// assert!(record.prop(&prop)?);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn prop(&self, prop: &Prop) -> Result<bool> {
        match prop {
            Prop::HasIndels => self.has_indels(),
            Prop::Mirna(state) => self.mirna_state_prop(*state),
            Prop::String(field, mode, value) => self.string_prop(*field, *mode, value),
        }
    }

    /// Evaluates a miRNA-state predicate.
    fn mirna_state_prop(&self, state: MirnaState) -> Result<bool> {
        let mirna_seg = self
            .flags
            .get(Key::MirnaSeg)
            .ok_or(Error::MirnaNotEvaluated)?;

        if !matches!(mirna_seg, "N" | "B" | "5p" | "3p") {
            return Err(Error::InvalidMirnaSeg(mirna_seg.into()));
        }

        let result = match state {
            MirnaState::HasMirna => matches!(mirna_seg, "B" | "5p" | "3p"),
            MirnaState::NoMirna => mirna_seg == "N",
            MirnaState::MirnaDimer => mirna_seg == "B",
            MirnaState::MirnaNotDimer => matches!(mirna_seg, "5p" | "3p"),
            MirnaState::FivePrimeMirna => matches!(mirna_seg, "B" | "5p"),
            MirnaState::ThreePrimeMirna => matches!(mirna_seg, "B" | "3p"),
        };

        Ok(result)
    }

    /// Evaluates a string-match predicate.
    fn string_prop(&self, field: StringField, mode: Match, value: &str) -> Result<bool> {
        let matches = |candidate: &str| match mode {
            Match::Is => candidate == value,
            Match::Prefix => candidate.starts_with(value),
            Match::Suffix => candidate.ends_with(value),
            Match::Contains => candidate.contains(value),
        };

        let candidates: Vec<Option<&str>> = match field {
            StringField::Id => vec![Some(&self.id)],
            StringField::Seq => vec![Some(&self.seq)],
            StringField::Seg1 => vec![self.seg1.ref_name.as_deref()],
            StringField::Seg2 => vec![self.seg2.ref_name.as_deref()],
            StringField::AnySeg => vec![
                self.seg1.ref_name.as_deref(),
                self.seg2.ref_name.as_deref(),
            ],
            StringField::Seg1Type => {
                vec![Some(self.seg1_type().ok_or(Error::TypesNotEvaluated)?)]
            }
            StringField::Seg2Type => {
                vec![Some(self.seg2_type().ok_or(Error::TypesNotEvaluated)?)]
            }
            StringField::AnySegType => vec![
                Some(self.seg1_type().ok_or(Error::TypesNotEvaluated)?),
                Some(self.seg2_type().ok_or(Error::TypesNotEvaluated)?),
            ],
            StringField::Mirna
            | StringField::Target
            | StringField::MirnaSegType
            | StringField::TargetSegType => {
                // Dimers are tolerated here: segment 1 stands in as the
                // miRNA side, as in `mirna_details`.
                let details = self.mirna_details(true)?;

                let candidate = match field {
                    StringField::Mirna => details.mirna_ref,
                    StringField::Target => details.target_ref,
                    StringField::MirnaSegType => details.mirna_seg_type,
                    StringField::TargetSegType => details.target_seg_type,
                    // SAFETY: the outer match arm covers exactly these four
                    // fields.
                    _ => unreachable!(),
                };

                return Ok(candidate.as_deref().map(matches).unwrap_or(false));
            }
        };

        Ok(candidates
            .into_iter()
            .flatten()
            .any(matches))
    }

    /// Returns whether a given piece of record state has been populated.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    /// use hybfile::hyb::record::IsSet;
    ///
    /// let line = "1_1000\tAAAAGGGG\t-10.0\t\
    ///             ARTSEG1_SOURCE_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
    ///             ARTSEG2_SOURCE_NAME_mRNA\t5\t8\t5\t8\t0.001\tdataset=artificial";
    /// let record = line.parse::<hyb::Record>()?;
    ///
    /// assert!(record.is_set(IsSet::Energy));
    /// assert!(record.is_set(IsSet::FullSegProps));
    /// assert!(!record.is_set(IsSet::EvalTypes));
    /// assert!(!record.is_set(IsSet::FoldRecord));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn is_set(&self, prop: IsSet) -> bool {
        match prop {
            IsSet::Energy => self.energy.is_some(),
            IsSet::FullSegProps => self.seg1.is_complete() && self.seg2.is_complete(),
            IsSet::EvalTypes => self.seg1_type().is_some() && self.seg2_type().is_some(),
            IsSet::EvalMirna => self.flags.get(Key::MirnaSeg).is_some(),
            IsSet::EvalTarget => self.flags.get(Key::TargetReg).is_some(),
            IsSet::FoldRecord => self.fold_record.is_some(),
        }
    }

    /// Sets the fold record paired with this record.
    ///
    /// The fold record's sequence must match this record's within
    /// `allowed_mismatches` (see
    /// [`fold::Record::ensure_matches_hyb_record`]). Energies are
    /// reconciled: when this record has no energy, the fold record's energy
    /// is adopted; when both are present and differ, the call fails unless
    /// `allow_energy_mismatch` is passed.
    pub fn set_fold_record(
        &mut self,
        fold_record: fold::Record,
        allowed_mismatches: usize,
        allow_energy_mismatch: bool,
    ) -> Result<()> {
        fold_record
            .ensure_matches_hyb_record(self, allowed_mismatches)
            .map_err(Error::Fold)?;

        match (self.energy.as_deref(), fold_record.energy()) {
            (Some(hyb), Some(fold)) if hyb != fold => {
                if !allow_energy_mismatch {
                    return Err(Error::EnergyMismatch(hyb.into(), fold.into()));
                }
            }
            (None, Some(fold)) => self.energy = Some(fold.to_string()),
            _ => {}
        }

        self.fold_record = Some(fold_record);

        Ok(())
    }

    /// Returns the record as a hyb line.
    ///
    /// Missing values render as `.`; the flag field is omitted entirely when
    /// no flag is set.
    pub fn to_line(&self) -> String {
        let mut fields = self.field_values();

        if self.flags.is_empty() {
            fields.pop();
        }

        fields.join(&DELIMITER.to_string())
    }

    /// Returns the record as a comma-separated line.
    pub fn to_csv(&self) -> String {
        let mut fields = self.field_values();

        if self.flags.is_empty() {
            fields.pop();
        }

        fields.join(",")
    }

    /// Returns the header line matching [`Record::to_csv`].
    pub fn csv_header() -> String {
        FIELD_NAMES.join(",")
    }

    /// Returns the record as named fields, in hyb column order.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        FIELD_NAMES.into_iter().zip(self.field_values()).collect()
    }

    /// Returns the record's column values, with `.` for missing entries.
    fn field_values(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(NUM_FIELDS_FLAGGED);

        fields.push(self.id.clone());
        fields.push(self.seq.clone());
        fields.push(self.energy.clone().unwrap_or_else(|| PLACEHOLDER.into()));
        fields.extend(segment_fields(&self.seg1));
        fields.extend(segment_fields(&self.seg2));
        fields.push(self.flags.to_string());

        fields
    }

    /// Returns a FASTA record for the requested part of the hybrid.
    ///
    /// With `annotate`, the FASTA name gains the record's dataset as a
    /// prefix and, for segment parts, the segment span and reference name:
    /// `<dataset>:<id>[:<start>-<end>[:<ref_name>]]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    /// use hybfile::hyb::record::FastaPart;
    ///
    /// let line = "1_1000\tAAAAGGGG\t.\t\
    ///             ARTSEG1_SOURCE_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
    ///             ARTSEG2_SOURCE_NAME_mRNA\t5\t8\t5\t8\t0.001\tdataset=artificial";
    /// let record = line.parse::<hyb::Record>()?;
    ///
    /// let fasta = record.to_fasta_record(FastaPart::Seg2, true, false)?;
    /// assert_eq!(
    ///     String::from_utf8_lossy(fasta.name()),
    ///     "artificial:1_1000:5-8:ARTSEG2_SOURCE_NAME_mRNA"
    /// );
    /// assert_eq!(fasta.sequence().as_ref(), b"GGGG");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn to_fasta_record(
        &self,
        part: FastaPart,
        annotate: bool,
        allow_mirna_dimers: bool,
    ) -> Result<fasta::Record> {
        let segment = match part {
            FastaPart::Hybrid => None,
            FastaPart::Seg1 => Some(&self.seg1),
            FastaPart::Seg2 => Some(&self.seg2),
            FastaPart::Mirna => Some(match self.mirna_side(allow_mirna_dimers)? {
                MirnaSide::Seg1 => &self.seg1,
                MirnaSide::Seg2 => &self.seg2,
            }),
            FastaPart::Target => Some(match self.mirna_side(allow_mirna_dimers)? {
                MirnaSide::Seg1 => &self.seg2,
                MirnaSide::Seg2 => &self.seg1,
            }),
        };

        let mut name = match (annotate, self.flags.get(Key::Dataset)) {
            (true, Some(dataset)) => format!("{}:{}", dataset, self.id),
            _ => self.id.clone(),
        };

        let seq = match segment {
            Some(segment) => {
                let seq = segment.slice(&self.seq)?;

                // SAFETY: `slice` requires both read coordinates.
                let (start, end) = (
                    segment.read_start.unwrap(),
                    segment.read_end.unwrap(),
                );
                name.push_str(&format!(":{}-{}", start, end));

                if annotate {
                    if let Some(ref_name) = &segment.ref_name {
                        name.push_str(&format!(":{}", ref_name));
                    }
                }

                seq
            }
            None => &self.seq,
        };

        Ok(fasta::Record::new(
            fasta::record::Definition::new(name, None),
            fasta::record::Sequence::from(seq.as_bytes().to_vec()),
        ))
    }
}

/// Records compare by identifier and sequence; hashing uses the identifier
/// alone.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.seq == other.seq
    }
}

impl Eq for Record {}

impl std::hash::Hash for Record {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl FromStr for Record {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_line(s)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Predicates and details
////////////////////////////////////////////////////////////////////////////////////////

/// Which segment holds the miRNA of a miRNA/target pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MirnaSide {
    /// Segment 1 is the miRNA.
    Seg1,
    /// Segment 2 is the miRNA.
    Seg2,
}

/// The details of a record's miRNA/target pairing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MirnaDetails {
    /// The miRNA segment's reference name.
    pub mirna_ref: Option<String>,
    /// The target segment's reference name.
    pub target_ref: Option<String>,
    /// The miRNA segment's type.
    pub mirna_seg_type: Option<String>,
    /// The target segment's type.
    pub target_seg_type: Option<String>,
    /// The miRNA segment's subsequence of the hybrid sequence.
    pub mirna_seq: String,
    /// The target segment's subsequence of the hybrid sequence.
    pub target_seq: String,
    /// The miRNA segment's portion of the fold, when a fold record is set.
    pub mirna_fold: Option<String>,
    /// The target segment's portion of the fold, when a fold record is set.
    pub target_fold: Option<String>,
}

/// A single miRNA/target detail, for [`Record::mirna_detail`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirnaDetail {
    /// The miRNA segment's reference name.
    MirnaRef,
    /// The target segment's reference name.
    TargetRef,
    /// The miRNA segment's type.
    MirnaSegType,
    /// The target segment's type.
    TargetSegType,
    /// The miRNA segment's subsequence.
    MirnaSeq,
    /// The target segment's subsequence.
    TargetSeq,
    /// The miRNA segment's portion of the fold.
    MirnaFold,
    /// The target segment's portion of the fold.
    TargetFold,
}

/// The record state inspected by [`Record::is_set`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IsSet {
    /// The record has an energy.
    Energy,
    /// Both segments have every property set.
    FullSegProps,
    /// The segment types have been evaluated.
    EvalTypes,
    /// The miRNA state has been evaluated.
    EvalMirna,
    /// The target region has been evaluated.
    EvalTarget,
    /// A fold record has been set.
    FoldRecord,
}

/// The miRNA states queried by [`Prop::Mirna`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirnaState {
    /// At least one segment is a miRNA.
    HasMirna,
    /// Neither segment is a miRNA.
    NoMirna,
    /// Both segments are miRNA.
    MirnaDimer,
    /// Exactly one segment is a miRNA.
    MirnaNotDimer,
    /// Segment 1 is a miRNA (including dimers).
    FivePrimeMirna,
    /// Segment 2 is a miRNA (including dimers).
    ThreePrimeMirna,
}

/// The record fields a string predicate can match against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StringField {
    /// The record identifier.
    Id,
    /// The hybrid sequence.
    Seq,
    /// Segment 1's reference name.
    Seg1,
    /// Segment 2's reference name.
    Seg2,
    /// Either segment's reference name.
    AnySeg,
    /// Segment 1's type.
    Seg1Type,
    /// Segment 2's type.
    Seg2Type,
    /// Either segment's type.
    AnySegType,
    /// The miRNA segment's reference name.
    Mirna,
    /// The target segment's reference name.
    Target,
    /// The miRNA segment's type.
    MirnaSegType,
    /// The target segment's type.
    TargetSegType,
}

/// How a string predicate compares its field against its value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Match {
    /// The field equals the value.
    Is,
    /// The field starts with the value.
    Prefix,
    /// The field ends with the value.
    Suffix,
    /// The field contains the value.
    Contains,
}

/// A predicate over a record, for [`Record::prop`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Prop {
    /// Either segment's alignment contains an insertion or deletion.
    HasIndels,
    /// The record's miRNA state matches.
    Mirna(MirnaState),
    /// A record field matches a string.
    String(StringField, Match, String),
}

/// The part of a hybrid rendered by [`Record::to_fasta_record`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FastaPart {
    /// The full hybrid sequence.
    Hybrid,
    /// Segment 1's subsequence.
    Seg1,
    /// Segment 2's subsequence.
    Seg2,
    /// The miRNA segment's subsequence.
    Mirna,
    /// The target segment's subsequence.
    Target,
}

////////////////////////////////////////////////////////////////////////////////////////
// Parsing helpers
////////////////////////////////////////////////////////////////////////////////////////

/// Maps a hyb field to [`None`] when it holds the placeholder.
fn optional(field: &str) -> Option<&str> {
    match field {
        PLACEHOLDER => None,
        _ => Some(field),
    }
}

/// Parses the six fields of one segment.
fn parse_segment(fields: &[&str], number: usize) -> Result<SegmentProperties> {
    /// The coordinate field names for each segment, for error reporting.
    const COORDINATE_NAMES: [[&str; 4]; 2] = [
        [
            "seg1_read_start",
            "seg1_read_end",
            "seg1_ref_start",
            "seg1_ref_end",
        ],
        [
            "seg2_read_start",
            "seg2_read_end",
            "seg2_ref_start",
            "seg2_ref_end",
        ],
    ];

    let names = COORDINATE_NAMES[number - 1];

    let coordinate = |field: &str, name: &'static str| -> Result<Option<usize>> {
        optional(field)
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|err| Error::Parse(ParseError::InvalidCoordinate(name, err)))
            })
            .transpose()
    };

    Ok(SegmentProperties {
        ref_name: optional(fields[0]).map(String::from),
        read_start: coordinate(fields[1], names[0])?,
        read_end: coordinate(fields[2], names[1])?,
        ref_start: coordinate(fields[3], names[2])?,
        ref_end: coordinate(fields[4], names[3])?,
        score: optional(fields[5]).map(String::from),
    })
}

/// Renders the six fields of one segment.
fn segment_fields(segment: &SegmentProperties) -> Vec<String> {
    let coordinate = |value: Option<usize>| {
        value
            .map(|value| value.to_string())
            .unwrap_or_else(|| PLACEHOLDER.into())
    };

    vec![
        segment.ref_name.clone().unwrap_or_else(|| PLACEHOLDER.into()),
        coordinate(segment.read_start),
        coordinate(segment.read_end),
        coordinate(segment.ref_start),
        coordinate(segment.ref_end),
        segment.score.clone().unwrap_or_else(|| PLACEHOLDER.into()),
    ]
}

/// Extracts the read count from a `<read_id>_<read_count>`-shaped
/// identifier.
fn read_count_from_id(id: &str) -> Result<u64> {
    id.rsplit_once('_')
        .and_then(|(_, count)| count.parse::<u64>().ok())
        .ok_or_else(|| Error::Parse(ParseError::InvalidHybformatId(id.into())))
}

/// Infers a segment type from a `<gene>_<transcript>_<name>_<type>`-shaped
/// reference name and stores it under `key`, checking against any type flag
/// already present.
fn infer_segment_type(
    segment: &SegmentProperties,
    key: Key,
    flags: &mut Flags,
) -> Result<()> {
    let ref_name = match &segment.ref_name {
        Some(ref_name) => ref_name,
        None => return Ok(()),
    };

    let parts = ref_name.split('_').collect::<Vec<_>>();
    let seg_type = match parts.as_slice() {
        [_, _, _, seg_type] if !seg_type.is_empty() => *seg_type,
        _ => {
            return Err(Error::Parse(ParseError::InvalidHybformatRef(
                ref_name.clone(),
            )));
        }
    };

    match flags.get(key) {
        Some(existing) if existing != seg_type => Err(Error::Parse(
            ParseError::SegmentTypeConflict(existing.into(), seg_type.into()),
        )),
        _ => {
            flags.set(key, seg_type);
            Ok(())
        }
    }
}
