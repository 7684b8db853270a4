//! A fold record.

use std::borrow::Cow;

use crate::hyb;
use crate::hyb::record::segment;
use crate::hyb::record::SegmentProperties;

/// The number of sequence mismatches tolerated between a fold record and a
/// hybrid record when no explicit tolerance is given.
pub const DEFAULT_ALLOWED_MISMATCHES: usize = 0;

/// The characters allowed in a dot-bracket fold string.
const FOLD_ALPHABET: [char; 4] = ['(', ')', '.', '-'];

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Record`].
#[derive(Debug)]
pub enum Error {
    /// A missing or empty identifier.
    MissingId,

    /// A missing or empty sequence.
    MissingSequence,

    /// A sequence containing non-alphabetic characters.
    NonAlphabeticSequence(String),

    /// A fold string that is empty or contains characters outside the
    /// dot-bracket alphabet.
    InvalidFold(String),

    /// An energy that is not a numeric string.
    InvalidEnergy(String),

    /// A segment coordinate problem hit while reconstructing the dynamic
    /// sequence or extracting a segment fold.
    Segment(segment::Error),

    /// A segment that belongs to neither side of the hybrid record.
    UnknownSegment,

    /// The fold record's sequence does not match the hybrid record's within
    /// the allowed tolerance.
    Mismatch {
        /// The fold record identifier.
        id: String,
        /// The number of mismatched positions found.
        found: usize,
        /// The number of mismatched positions allowed.
        allowed: usize,
        /// A character-level comparison of the two sequences.
        diagnostic: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingId => write!(f, "missing identifier"),
            Error::MissingSequence => write!(f, "missing sequence"),
            Error::NonAlphabeticSequence(seq) => {
                write!(f, "sequence contains non-alphabetic characters: \"{}\"", seq)
            }
            Error::InvalidFold(fold) => write!(
                f,
                "invalid fold: expected a non-empty string over \"().-\", found \"{}\"",
                fold
            ),
            Error::InvalidEnergy(energy) => {
                write!(f, "invalid energy: expected a numeric string, found \"{}\"", energy)
            }
            Error::Segment(err) => write!(f, "segment error: {err}"),
            Error::UnknownSegment => write!(
                f,
                "the provided segment matches neither segment of the hybrid record"
            ),
            Error::Mismatch {
                id,
                found,
                allowed,
                diagnostic,
            } => write!(
                f,
                "fold record \"{}\" does not match the hybrid record: found {} mismatches, {} \
                 allowed\n{}",
                id, found, allowed, diagnostic
            ),
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
// Sequence type
////////////////////////////////////////////////////////////////////////////////////////

/// How a fold record's sequence relates to its hybrid record's sequence.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SeqType {
    /// The fold sequence is the hybrid sequence, character for character.
    #[default]
    Static,

    /// The fold sequence is the concatenation of the two segment
    /// subsequences of the hybrid record. Overlapping alignments make this
    /// longer than the hybrid sequence; gapped alignments make it shorter.
    Dynamic,
}

impl std::str::FromStr for SeqType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "static" => Ok(SeqType::Static),
            "dynamic" => Ok(SeqType::Dynamic),
            _ => Err(format!(
                "invalid sequence type: expected \"static\" or \"dynamic\", found \"{}\"",
                s
            )),
        }
    }
}

impl std::fmt::Display for SeqType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeqType::Static => write!(f, "static"),
            SeqType::Dynamic => write!(f, "dynamic"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Record
////////////////////////////////////////////////////////////////////////////////////////

/// A secondary-structure prediction for a hybrid read.
///
/// A fold record pairs a nucleotide sequence with its predicted fold in
/// dot-bracket notation and, usually, a folding energy. It never owns a
/// hybrid record; instead it is validated *against* one via
/// [`Record::ensure_matches_hyb_record`] (directly, or through
/// [`hyb::Record::set_fold_record`]).
#[derive(Clone, Debug)]
pub struct Record {
    /// The record identifier.
    id: String,

    /// The folded nucleotide sequence.
    seq: String,

    /// The fold in dot-bracket notation.
    fold: String,

    /// The predicted folding energy, kept verbatim.
    energy: Option<String>,

    /// How the sequence relates to the paired hybrid record's sequence.
    seq_type: SeqType,
}

impl Record {
    /// Attempts to create a new [`Record`].
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::fold;
    /// use hybfile::fold::record::SeqType;
    ///
    /// let record = fold::Record::try_new(
    ///     "1_1000",
    ///     "GGGAAACCC",
    ///     "(((...)))",
    ///     Some("-7.5".into()),
    ///     SeqType::Static,
    /// )?;
    ///
    /// assert_eq!(record.id(), "1_1000");
    /// assert_eq!(record.energy(), Some("-7.5"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        id: impl Into<String>,
        seq: impl Into<String>,
        fold: impl Into<String>,
        energy: Option<String>,
        seq_type: SeqType,
    ) -> Result<Self> {
        let id = id.into();
        let seq = seq.into();
        let fold = fold.into();

        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(Error::MissingId);
        }

        if seq.is_empty() {
            return Err(Error::MissingSequence);
        }

        if !seq.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::NonAlphabeticSequence(seq));
        }

        if fold.is_empty() || !fold.chars().all(|c| FOLD_ALPHABET.contains(&c)) {
            return Err(Error::InvalidFold(fold));
        }

        if let Some(energy) = &energy {
            if !crate::hyb::record::is_numeric_string(energy) {
                return Err(Error::InvalidEnergy(energy.clone()));
            }
        }

        Ok(Record {
            id,
            seq,
            fold,
            energy,
            seq_type,
        })
    }

    /// Gets the record identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the folded sequence.
    pub fn seq(&self) -> &str {
        &self.seq
    }

    /// Gets the fold in dot-bracket notation.
    pub fn fold(&self) -> &str {
        &self.fold
    }

    /// Gets the folding energy.
    pub fn energy(&self) -> Option<&str> {
        self.energy.as_deref()
    }

    /// Gets the sequence type.
    pub fn seq_type(&self) -> SeqType {
        self.seq_type
    }

    /// Reconstructs the sequence this record is expected to match for the
    /// given hybrid record.
    ///
    /// For a [`SeqType::Static`] record this is the hybrid sequence itself.
    /// For a [`SeqType::Dynamic`] record it is the concatenation of the two
    /// segment subsequences, which requires both segments' read coordinates.
    pub fn expected_sequence<'a>(&self, hyb_record: &'a hyb::Record) -> Result<Cow<'a, str>> {
        match self.seq_type {
            SeqType::Static => Ok(Cow::Borrowed(hyb_record.seq())),
            SeqType::Dynamic => {
                let mut seq = String::new();
                seq.push_str(hyb_record.seg1().slice(hyb_record.seq())?);
                seq.push_str(hyb_record.seg2().slice(hyb_record.seq())?);
                Ok(Cow::Owned(seq))
            }
        }
    }

    /// Counts the positions at which this record's sequence differs from the
    /// hybrid record's (static) or reconstructed (dynamic) sequence.
    ///
    /// The comparison runs to the longer of the two lengths; positions
    /// present in only one sequence count as mismatches.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::fold;
    /// use hybfile::fold::record::SeqType;
    /// use hybfile::hyb;
    ///
    /// let hyb_record = hyb::Record::from_line("1_1\tAAAT\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.")?;
    /// let fold_record =
    ///     fold::Record::try_new("1_1", "AAAA", "....", None, SeqType::Static)?;
    ///
    /// assert_eq!(fold_record.count_hyb_record_mismatches(&hyb_record)?, 1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn count_hyb_record_mismatches(&self, hyb_record: &hyb::Record) -> Result<usize> {
        let expected = self.expected_sequence(hyb_record)?;
        Ok(count_mismatches(&self.seq, &expected))
    }

    /// Returns whether this record matches the hybrid record within the
    /// allowed number of mismatches.
    pub fn matches_hyb_record(
        &self,
        hyb_record: &hyb::Record,
        allowed_mismatches: usize,
    ) -> Result<bool> {
        Ok(self.count_hyb_record_mismatches(hyb_record)? <= allowed_mismatches)
    }

    /// Ensures this record matches the hybrid record within the allowed
    /// number of mismatches, returning a diagnostic error otherwise.
    pub fn ensure_matches_hyb_record(
        &self,
        hyb_record: &hyb::Record,
        allowed_mismatches: usize,
    ) -> Result<()> {
        let expected = self.expected_sequence(hyb_record)?;
        let found = count_mismatches(&self.seq, &expected);

        if found <= allowed_mismatches {
            return Ok(());
        }

        Err(Error::Mismatch {
            id: self.id.clone(),
            found,
            allowed: allowed_mismatches,
            diagnostic: mismatch_diagnostic(&self.seq, &expected, self.seq_type),
        })
    }

    /// Extracts the dot-bracket substring corresponding to one segment of
    /// the hybrid record.
    ///
    /// For a static record, the fold is sliced directly by the segment's
    /// read coordinates. For a dynamic record, the fold is split at the
    /// length of segment 1's span, and the half corresponding to the
    /// requested segment is returned.
    pub fn seg_fold(
        &self,
        segment: &SegmentProperties,
        hyb_record: &hyb::Record,
    ) -> Result<&str> {
        match self.seq_type {
            SeqType::Static => {
                let (start, end) = match (segment.read_start, segment.read_end) {
                    (Some(start), Some(end)) => (start, end),
                    (None, None) => return Err(segment::Error::MissingReadCoordinates.into()),
                    _ => return Err(segment::Error::PartialReadCoordinates.into()),
                };

                if start < 1 || start > end {
                    return Err(segment::Error::InvalidSpan(start, end).into());
                }

                if end > self.fold.len() {
                    return Err(
                        segment::Error::SpanOutOfBounds(start, end, self.fold.len()).into()
                    );
                }

                Ok(&self.fold[start - 1..end])
            }
            SeqType::Dynamic => {
                let seg1_span = hyb_record
                    .seg1()
                    .read_span()?
                    .ok_or(segment::Error::MissingReadCoordinates)?;
                let seg2_span = hyb_record
                    .seg2()
                    .read_span()?
                    .ok_or(segment::Error::MissingReadCoordinates)?;

                if seg1_span > self.fold.len() {
                    return Err(segment::Error::SpanOutOfBounds(
                        1,
                        seg1_span,
                        self.fold.len(),
                    )
                    .into());
                }

                let (seg1_fold, seg2_fold) = self.fold.split_at(seg1_span);
                assert_eq!(
                    seg1_fold.len() + seg2_fold.len(),
                    seg1_span + seg2_span,
                    "dynamic fold length must equal the reconstructed sequence length"
                );

                if segment == hyb_record.seg1() {
                    Ok(seg1_fold)
                } else if segment == hyb_record.seg2() {
                    Ok(seg2_fold)
                } else {
                    Err(Error::UnknownSegment)
                }
            }
        }
    }

    /// Returns the record as the three lines of a Vienna block.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::fold;
    /// use hybfile::fold::record::SeqType;
    ///
    /// let record = fold::Record::try_new(
    ///     "1_1000",
    ///     "GGGAAACCC",
    ///     "(((...)))",
    ///     Some("-7.5".into()),
    ///     SeqType::Static,
    /// )?;
    ///
    /// assert_eq!(
    ///     record.to_vienna_lines(),
    ///     vec![
    ///         String::from(">1_1000"),
    ///         String::from("GGGAAACCC"),
    ///         String::from("(((...)))\t(-7.5)"),
    ///     ],
    /// );
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn to_vienna_lines(&self) -> Vec<String> {
        let fold_line = match &self.energy {
            Some(energy) => format!("{}\t({})", self.fold, energy),
            None => self.fold.clone(),
        };

        vec![format!(">{}", self.id), self.seq.clone(), fold_line]
    }

    /// Returns the record as a Vienna block without a trailing newline.
    pub fn to_vienna_string(&self) -> String {
        self.to_vienna_lines().join("\n")
    }
}

/// Fold records compare by identifier and sequence; hashing uses the
/// identifier alone.
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

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_vienna_string())
    }
}

/// Counts position-wise differences between two sequences, running to the
/// longer length so that positions present in only one sequence count.
fn count_mismatches(left: &str, right: &str) -> usize {
    let mut left_chars = left.chars();
    let mut right_chars = right.chars();
    let mut count = 0;

    loop {
        match (left_chars.next(), right_chars.next()) {
            (None, None) => return count,
            (Some(l), Some(r)) if l == r => {}
            _ => count += 1,
        }
    }
}

/// Renders a character-level comparison of the fold sequence against the
/// expected sequence. Dynamic comparisons get a match ribbon (`|` for a
/// match, `X` for a mismatch) under the two sequences.
fn mismatch_diagnostic(fold_seq: &str, expected: &str, seq_type: SeqType) -> String {
    let mut lines = vec![
        format!("  fold record sequence: {}", fold_seq),
        format!("  expected sequence:    {}", expected),
    ];

    if seq_type == SeqType::Dynamic {
        let mut ribbon = String::with_capacity(fold_seq.len().max(expected.len()));
        let mut fold_chars = fold_seq.chars();
        let mut expected_chars = expected.chars();

        loop {
            match (fold_chars.next(), expected_chars.next()) {
                (None, None) => break,
                (Some(l), Some(r)) if l == r => ribbon.push('|'),
                _ => ribbon.push('X'),
            }
        }

        lines.push(format!("                        {}", ribbon));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyb_record(line: &str) -> hyb::Record {
        hyb::Record::from_line(line).unwrap()
    }

    /// An artificial record with abutting segments 1-20 and 21-40.
    const ABUTTING: &str = "1_1000\tAAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG\t-10.0\t\
                            ARTSEG1_SOURCE_NAME_microRNA\t1\t20\t1\t20\t0.001\t\
                            ARTSEG2_SOURCE_NAME_mRNA\t21\t40\t21\t40\t0.001\tdataset=artificial";

    /// An artificial record with overlapping segments 1-24 and 17-40.
    const OVERLAPPING: &str = "1_1000\tGGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA\t-10.0\t\
                               ARTSEG1_SOURCE_NAME_microRNA\t1\t24\t1\t24\t0.001\t\
                               ARTSEG2_SOURCE_NAME_mRNA\t17\t40\t17\t40\t0.001\t\
                               dataset=artificial";

    #[test]
    fn static_mismatch_counting() {
        assert_eq!(count_mismatches("AAAA", "AAAA"), 0);
        assert_eq!(count_mismatches("AAAA", "AAAT"), 1);
        assert_eq!(count_mismatches("AAA", "AAAA"), 1);
        assert_eq!(count_mismatches("AAAA", "AAA"), 1);
        assert_eq!(count_mismatches("GATTACA", "CATTACA"), 1);
    }

    #[test]
    fn static_comparison_against_hyb_record() {
        let hyb_record = hyb_record(ABUTTING);
        let record = Record::try_new(
            "1_1000",
            "AAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG",
            ".".repeat(40),
            Some("-10.0".into()),
            SeqType::Static,
        )
        .unwrap();

        assert_eq!(record.count_hyb_record_mismatches(&hyb_record).unwrap(), 0);
        assert!(record.matches_hyb_record(&hyb_record, 0).unwrap());
        record.ensure_matches_hyb_record(&hyb_record, 0).unwrap();
    }

    #[test]
    fn dynamic_reconstruction_of_abutting_segments_is_the_full_sequence() {
        let hyb_record = hyb_record(ABUTTING);
        let record = Record::try_new(
            "1_1000",
            "AAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG",
            ".".repeat(40),
            None,
            SeqType::Dynamic,
        )
        .unwrap();

        let expected = record.expected_sequence(&hyb_record).unwrap();
        assert_eq!(expected.as_ref(), hyb_record.seq());
    }

    #[test]
    fn dynamic_reconstruction_of_overlapping_segments_is_longer() {
        let hyb_record = hyb_record(OVERLAPPING);
        let record = Record::try_new(
            "1_1000",
            "GGGCCCCCCCCCCCCCCGGGAAAGCGGGAAAGGGGGGGGGGGGGGAAA",
            "...((((((((((((((......()......))))))))))))))...",
            Some("-15".into()),
            SeqType::Dynamic,
        )
        .unwrap();

        let expected = record.expected_sequence(&hyb_record).unwrap();
        assert_eq!(expected.len(), 48);
        assert_eq!(expected.as_ref(), record.seq());
        assert_eq!(record.count_hyb_record_mismatches(&hyb_record).unwrap(), 0);
    }

    #[test]
    fn dynamic_reconstruction_requires_read_coordinates() {
        let hyb_record = hyb_record("1_1\tACGT\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.\t.");
        let record =
            Record::try_new("1_1", "ACGT", "....", None, SeqType::Dynamic).unwrap();

        let err = record.count_hyb_record_mismatches(&hyb_record).unwrap_err();
        assert!(matches!(
            err,
            Error::Segment(segment::Error::MissingReadCoordinates)
        ));
    }

    #[test]
    fn static_seg_fold_slices_by_read_coordinates() {
        let hyb_record = hyb_record(ABUTTING);
        let fold = format!("{}{}", "(".repeat(20), ")".repeat(20));
        let record = Record::try_new(
            "1_1000",
            "AAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG",
            fold,
            None,
            SeqType::Static,
        )
        .unwrap();

        assert_eq!(
            record.seg_fold(hyb_record.seg1(), &hyb_record).unwrap(),
            "(".repeat(20)
        );
        assert_eq!(
            record.seg_fold(hyb_record.seg2(), &hyb_record).unwrap(),
            ")".repeat(20)
        );
    }

    #[test]
    fn dynamic_seg_fold_splits_at_the_first_segment_span() {
        let hyb_record = hyb_record(OVERLAPPING);
        let record = Record::try_new(
            "1_1000",
            "GGGCCCCCCCCCCCCCCGGGAAAGCGGGAAAGGGGGGGGGGGGGGAAA",
            "...((((((((((((((......()......))))))))))))))...",
            None,
            SeqType::Dynamic,
        )
        .unwrap();

        assert_eq!(
            record.seg_fold(hyb_record.seg1(), &hyb_record).unwrap(),
            "...((((((((((((((......("
        );
        assert_eq!(
            record.seg_fold(hyb_record.seg2(), &hyb_record).unwrap(),
            ")......))))))))))))))..."
        );
    }

    #[test]
    fn mismatch_beyond_tolerance_is_diagnosed() {
        let hyb_record = hyb_record(ABUTTING);
        let record = Record::try_new(
            "1_1000",
            "AAAAAAAAAAAAAAAAAAAACCCCCCGGGGGGGGGGGGGG",
            ".".repeat(40),
            None,
            SeqType::Static,
        )
        .unwrap();

        let err = record
            .ensure_matches_hyb_record(&hyb_record, 0)
            .unwrap_err();

        match &err {
            Error::Mismatch { found, allowed, .. } => {
                assert_eq!(*found, 6);
                assert_eq!(*allowed, 0);
            }
            _ => panic!("expected a mismatch error"),
        }

        assert!(err.to_string().contains("found 6 mismatches, 0 allowed"));
    }

    #[test]
    fn invalid_fold() {
        let err = Record::try_new("1_1", "ACGT", "..x.", None, SeqType::Static).unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid fold: expected a non-empty string over \"().-\", found \"..x.\""
        );
    }

    #[test]
    fn invalid_energy() {
        let err =
            Record::try_new("1_1", "ACGT", "....", Some("minus-ten".into()), SeqType::Static)
                .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid energy: expected a numeric string, found \"minus-ten\""
        );
    }

    #[test]
    fn equality_and_hashing() {
        let first =
            Record::try_new("1_1", "ACGT", "....", Some("-1".into()), SeqType::Static).unwrap();
        let second =
            Record::try_new("1_1", "ACGT", "(())", None, SeqType::Dynamic).unwrap();

        // Fold, energy, and sequence type do not participate in equality.
        assert_eq!(first, second);
    }
}
