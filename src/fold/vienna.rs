//! Vienna-format fold records.
//!
//! A Vienna record is three lines of text:
//!
//! ```text
//! >1_1000_ARTSEG1_SOURCE_NAME_microRNA-ARTSEG2_SOURCE_NAME_mRNA
//! GGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA
//! ...((((((((((((((......))))))))))))))...	(-15)
//! ```
//!
//! The energy on the third line is tab-separated from the fold and wrapped in
//! parentheses. Upstream folding tools write an energy of `99*` when folding
//! a sequence failed; such blocks carry no usable fold.

use std::io;
use std::io::BufRead;
use std::iter;

use crate::fold::record;
use crate::fold::record::Record;
use crate::fold::record::SeqType;
use crate::fold::ErrorMode;
use crate::fold::Outcome;
use crate::hyb::reader::read_line;

/// The number of lines in a Vienna record.
pub const RECORD_LINES: usize = 3;

/// The prefix of the identifier line.
pub const ID_PREFIX: char = '>';

/// The energy prefix written by folding tools when folding failed.
const NOFOLD_ENERGY_PREFIX: &str = "99";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a Vienna record.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of lines in the record.
    IncorrectNumberOfLines(usize),

    /// An identifier line without the expected `>` prefix.
    MissingIdPrefix(String),

    /// A fold line without a tab-separated energy field.
    MissingEnergy(String),

    /// An energy literal indicating that folding the sequence failed.
    FoldingFailed(String),

    /// An invalid record.
    Record(record::Error),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfLines(lines) => write!(
                f,
                "invalid number of lines in vienna record: expected {} lines, found {} lines",
                RECORD_LINES, lines
            ),
            ParseError::MissingIdPrefix(line) => {
                write!(
                    f,
                    "invalid identifier line: expected \"{}\" prefix, found \"{}\"",
                    ID_PREFIX, line
                )
            }
            ParseError::MissingEnergy(line) => write!(
                f,
                "invalid fold line: expected a tab-separated energy field, found \"{}\"",
                line
            ),
            ParseError::FoldingFailed(energy) => {
                write!(f, "folding failed upstream: energy literal \"{}\"", energy)
            }
            ParseError::Record(err) => write!(f, "record error: {err}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A parse error.
    Parse(ParseError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Parsing
////////////////////////////////////////////////////////////////////////////////////////

/// Parses a Vienna record from its lines.
///
/// Under [`ErrorMode::Raise`], every malformation is an error. Under the
/// lenient modes, malformations come back as the sentinel [`Outcome`]
/// variants carrying the raw text, and [`ErrorMode::WarnReturn`] additionally
/// logs a warning.
///
/// # Examples
///
/// ```
/// use hybfile::fold::record::SeqType;
/// use hybfile::fold::vienna;
/// use hybfile::fold::ErrorMode;
/// use hybfile::fold::Outcome;
///
/// let lines = [">1_1000", "GGGAAACCC", "(((...)))\t(-7.5)"];
/// let outcome = vienna::from_lines(&lines, SeqType::Static, ErrorMode::Raise)?;
///
/// let record = match outcome {
///     Outcome::Record(record) => record,
///     _ => unreachable!(),
/// };
///
/// assert_eq!(record.id(), "1_1000");
/// assert_eq!(record.fold(), "(((...)))");
/// assert_eq!(record.energy(), Some("-7.5"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn from_lines(
    lines: &[impl AsRef<str>],
    seq_type: SeqType,
    error_mode: ErrorMode,
) -> Result<Outcome, ParseError> {
    let raw = || {
        lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join("\n")
    };

    if lines.len() != RECORD_LINES {
        return lenient(
            error_mode,
            ParseError::IncorrectNumberOfLines(lines.len()),
            Outcome::Malformed(raw()),
        );
    }

    let id_line = lines[0].as_ref().trim_end();
    let id = match id_line.strip_prefix(ID_PREFIX) {
        Some(id) => id,
        None => {
            return lenient(
                error_mode,
                ParseError::MissingIdPrefix(id_line.into()),
                Outcome::Malformed(raw()),
            );
        }
    };

    let seq = lines[1].as_ref().trim_end();
    let fold_line = lines[2].as_ref().trim_end();

    let (fold, energy) = match fold_line.split_once('\t') {
        Some((fold, energy)) => (fold, energy),
        None => {
            return lenient(
                error_mode,
                ParseError::MissingEnergy(fold_line.into()),
                Outcome::NoEnergy(raw()),
            );
        }
    };

    let energy = energy
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');

    if energy.starts_with(NOFOLD_ENERGY_PREFIX) {
        return lenient(
            error_mode,
            ParseError::FoldingFailed(energy.into()),
            Outcome::NoFold(raw()),
        );
    }

    match Record::try_new(id, seq, fold, Some(energy.into()), seq_type) {
        Ok(record) => Ok(Outcome::Record(record)),
        Err(err) => lenient(error_mode, ParseError::Record(err), Outcome::Malformed(raw())),
    }
}

/// Parses a strict Vienna record from a newline-delimited string.
///
/// # Examples
///
/// ```
/// use hybfile::fold::record::SeqType;
/// use hybfile::fold::vienna;
///
/// let record =
///     vienna::from_string(">1_1000\nGGGAAACCC\n(((...)))\t(-7.5)", SeqType::Static)?;
///
/// assert_eq!(record.to_vienna_string(), ">1_1000\nGGGAAACCC\n(((...)))\t(-7.5)");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn from_string(s: &str, seq_type: SeqType) -> Result<Record, ParseError> {
    let lines = s.trim_end_matches('\n').split('\n').collect::<Vec<_>>();

    match from_lines(&lines, seq_type, ErrorMode::Raise)? {
        Outcome::Record(record) => Ok(record),
        // SAFETY: `ErrorMode::Raise` turns every sentinel outcome into an
        // error, so only successfully parsed records reach this point.
        _ => unreachable!(),
    }
}

/// Applies an error mode to a malformation: raise it, or hand back the
/// sentinel outcome (with a warning under [`ErrorMode::WarnReturn`]).
fn lenient(
    error_mode: ErrorMode,
    err: ParseError,
    outcome: Outcome,
) -> Result<Outcome, ParseError> {
    match error_mode {
        ErrorMode::Raise => Err(err),
        ErrorMode::WarnReturn => {
            tracing::warn!("skipping strict handling of vienna record: {err}");
            Ok(outcome)
        }
        ErrorMode::Return => Ok(outcome),
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Reader
////////////////////////////////////////////////////////////////////////////////////////

/// Configuration for a Vienna [`Reader`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// The sequence type to assign to parsed records.
    pub seq_type: SeqType,

    /// The error mode used by [`Reader::read_record`].
    pub error_mode: ErrorMode,
}

/// A Vienna file reader.
///
/// # Examples
///
/// ```
/// use hybfile::fold::vienna;
/// use hybfile::fold::Outcome;
///
/// let data = b">1_1000\nGGGAAACCC\n(((...)))\t(-7.5)\n";
/// let mut reader = vienna::Reader::new(&data[..]);
///
/// let outcome = reader.read_record()?.unwrap();
/// assert!(matches!(outcome, Outcome::Record(_)));
/// assert!(reader.read_record()?.is_none());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Reader<T>
where
    T: BufRead,
{
    /// The inner reader.
    inner: T,

    /// The reader configuration.
    config: Config,
}

impl<T> Reader<T>
where
    T: BufRead,
{
    /// Creates a Vienna file reader with the default configuration
    /// (static records, raising error mode).
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, Config::default())
    }

    /// Creates a Vienna file reader with the given configuration.
    pub fn with_config(inner: T, config: Config) -> Self {
        Self { inner, config }
    }

    /// Gets the reader configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consumes self and returns the inner reader.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Attempts to read a record using the configured error mode.
    pub fn read_record(&mut self) -> Result<Option<Outcome>, Error> {
        self.read_record_with_mode(self.config.error_mode)
    }

    /// Attempts to read a record, overriding the configured error mode.
    pub fn read_record_with_mode(
        &mut self,
        error_mode: ErrorMode,
    ) -> Result<Option<Outcome>, Error> {
        let mut lines = Vec::with_capacity(RECORD_LINES);
        let mut buffer = String::new();

        // Skip blank lines between records.
        loop {
            match read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? {
                0 => return Ok(None),
                _ if buffer.is_empty() => continue,
                _ => break,
            }
        }

        lines.push(buffer.clone());

        while lines.len() < RECORD_LINES {
            match read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? {
                0 => break,
                _ => lines.push(buffer.clone()),
            }
        }

        from_lines(&lines, self.config.seq_type, error_mode)
            .map(Some)
            .map_err(Error::Parse)
    }

    /// Returns an iterator over the record outcomes in the underlying
    /// reader, using the configured error mode.
    pub fn records(&mut self) -> impl Iterator<Item = Result<Outcome, Error>> + '_ {
        iter::from_fn(move || self.read_record().transpose())
    }
}

impl<T> crate::fold::FoldSource for Reader<T>
where
    T: BufRead,
{
    fn read_fold_record(
        &mut self,
        error_mode: ErrorMode,
    ) -> Result<Option<Outcome>, crate::fold::Error> {
        self.read_record_with_mode(error_mode)
            .map_err(crate::fold::Error::Vienna)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The Vienna block paired with the abutting artificial hybrid record.
    const BLOCK: &str = ">1_1000_ARTSEG1_SOURCE_NAME_microRNA-ARTSEG2_SOURCE_NAME_mRNA\n\
                         GGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA\n\
                         ...((((((((((((((......))))))))))))))...\t(-15)";

    #[test]
    fn round_trip() {
        let record = from_string(BLOCK, SeqType::Static).unwrap();

        assert_eq!(
            record.id(),
            "1_1000_ARTSEG1_SOURCE_NAME_microRNA-ARTSEG2_SOURCE_NAME_mRNA"
        );
        assert_eq!(record.seq(), "GGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA");
        assert_eq!(record.energy(), Some("-15"));
        assert_eq!(record.to_vienna_string(), BLOCK);
    }

    #[test]
    fn nofold_energy_is_a_sentinel_in_lenient_mode() {
        let lines = [">1_1000", "GGGAAACCC", "(((...)))\t(99.0)"];

        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::WarnReturn).unwrap();
        match outcome {
            Outcome::NoFold(raw) => {
                assert_eq!(raw, ">1_1000\nGGGAAACCC\n(((...)))\t(99.0)")
            }
            _ => panic!("expected a no-fold outcome"),
        }
    }

    #[test]
    fn nofold_energy_raises_in_raise_mode() {
        let lines = [">1_1000", "GGGAAACCC", "(((...)))\t(99.0)"];

        let err = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap_err();
        assert_eq!(
            err.to_string(),
            "folding failed upstream: energy literal \"99.0\""
        );
    }

    #[test]
    fn missing_energy_is_a_sentinel_in_lenient_mode() {
        let lines = [">1_1000", "GGGAAACCC", "(((...)))"];

        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::Return).unwrap();
        assert!(matches!(outcome, Outcome::NoEnergy(_)));
    }

    #[test]
    fn missing_id_prefix() {
        let lines = ["1_1000", "GGGAAACCC", "(((...)))\t(-7.5)"];

        let err = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid identifier line: expected \">\" prefix, found \"1_1000\""
        );

        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::Return).unwrap();
        assert!(matches!(outcome, Outcome::Malformed(_)));
    }

    #[test]
    fn incorrect_number_of_lines() {
        let lines = [">1_1000", "GGGAAACCC"];

        let err = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of lines in vienna record: expected 3 lines, found 2 lines"
        );
    }

    #[test]
    fn reader_reads_consecutive_blocks() {
        let data = format!("{}\n{}\n", BLOCK, BLOCK);
        let mut reader = Reader::new(data.as_bytes());

        let mut count = 0;
        for result in reader.records() {
            assert!(matches!(result.unwrap(), Outcome::Record(_)));
            count += 1;
        }

        assert_eq!(count, 2);
    }

    #[test]
    fn reader_stops_at_end_of_input() {
        let mut reader = Reader::new(&b""[..]);
        assert!(reader.read_record().unwrap().is_none());
    }
}
