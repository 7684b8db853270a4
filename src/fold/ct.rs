//! Connectivity-table (CT) fold records.
//!
//! Support for this format is experimental. A CT block is a header line
//! followed by one line per base:
//!
//! ```text
//! 9	dG = -7.5	dH = -30.2	1_1000
//! 1	G	0	2	9	1	0	0
//! 2	G	1	3	8	2	0	0
//! ...
//! ```
//!
//! The header carries the expected sequence length, an energy field (the
//! token after `dG =`), and the record name. Each base line names the base,
//! and column five holds the one-based index of its pairing partner (`0` for
//! unpaired); comparing that index to the base's own position recovers the
//! dot-bracket character.

use std::io;
use std::io::BufRead;
use std::iter;
use std::num::ParseIntError;

use crate::fold::record;
use crate::fold::record::Record;
use crate::fold::record::SeqType;
use crate::fold::ErrorMode;
use crate::fold::Outcome;
use crate::hyb::reader::read_line;

/// The number of columns in a CT base line.
pub const BASE_LINE_COLUMNS: usize = 8;

/// The header token marking the energy field.
const ENERGY_MARKER: &str = "dG";

/// The energy prefix written by folding tools when folding failed.
const NOFOLD_ENERGY_PREFIX: &str = "99";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error associated with parsing a CT record.
#[derive(Debug)]
pub enum ParseError {
    /// A header line without the expected energy marker.
    MissingHeader(String),

    /// An unparseable sequence length in the header.
    InvalidSequenceLength(ParseIntError),

    /// A header energy field without a value.
    MissingEnergy(String),

    /// An energy literal indicating that folding the sequence failed.
    FoldingFailed(String),

    /// An incorrect number of base lines for the header's sequence length.
    IncorrectNumberOfLines(usize, usize),

    /// An incorrect number of columns in a base line.
    IncorrectNumberOfColumns(usize, usize),

    /// An unparseable pairing partner index.
    InvalidPairIndex(ParseIntError),

    /// A base recorded as paired with itself.
    SelfPairedBase(usize),

    /// An invalid record.
    Record(record::Error),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingHeader(line) => write!(
                f,
                "invalid ct header: expected a `{} = <energy>` field, found \"{}\"",
                ENERGY_MARKER, line
            ),
            ParseError::InvalidSequenceLength(err) => {
                write!(f, "invalid sequence length: {}", err)
            }
            ParseError::MissingEnergy(field) => {
                write!(f, "invalid energy field: expected a value, found \"{}\"", field)
            }
            ParseError::FoldingFailed(energy) => {
                write!(f, "folding failed upstream: energy literal \"{}\"", energy)
            }
            ParseError::IncorrectNumberOfLines(expected, found) => write!(
                f,
                "invalid number of base lines in ct record: expected {} lines, found {} lines",
                expected, found
            ),
            ParseError::IncorrectNumberOfColumns(line_no, found) => write!(
                f,
                "invalid number of columns in ct base line {}: expected {} columns, found {} \
                 columns",
                line_no, BASE_LINE_COLUMNS, found
            ),
            ParseError::InvalidPairIndex(err) => write!(f, "invalid pair index: {}", err),
            ParseError::SelfPairedBase(position) => {
                write!(f, "base at position {} is recorded as paired with itself", position)
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

/// Parses a CT record from its lines (header line plus one line per base).
///
/// The lenient contract matches [`crate::fold::vienna::from_lines`]: under
/// [`ErrorMode::Raise`] every malformation is an error; under the lenient
/// modes, malformations come back as sentinel [`Outcome`] variants.
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

    match parse(lines, seq_type) {
        Ok(outcome) => Ok(outcome),
        Err(err) => match error_mode {
            ErrorMode::Raise => Err(err),
            ErrorMode::WarnReturn => {
                tracing::warn!("skipping strict handling of ct record: {err}");
                Ok(sentinel_for(err, raw()))
            }
            ErrorMode::Return => Ok(sentinel_for(err, raw())),
        },
    }
}

/// Maps a parse error to its sentinel outcome.
fn sentinel_for(err: ParseError, raw: String) -> Outcome {
    match err {
        ParseError::FoldingFailed(_) => Outcome::NoFold(raw),
        ParseError::MissingEnergy(_) => Outcome::NoEnergy(raw),
        _ => Outcome::Malformed(raw),
    }
}

/// Parses a CT record strictly.
fn parse(lines: &[impl AsRef<str>], seq_type: SeqType) -> Result<Outcome, ParseError> {
    let header = match lines.first() {
        Some(line) => line.as_ref().trim_end(),
        None => return Err(ParseError::IncorrectNumberOfLines(1, 0)),
    };

    if !header.contains(ENERGY_MARKER) {
        return Err(ParseError::MissingHeader(header.into()));
    }

    let items = header.split('\t').collect::<Vec<_>>();

    let expected_len = items[0]
        .trim()
        .parse::<usize>()
        .map_err(ParseError::InvalidSequenceLength)?;

    // SAFETY: the energy marker was found in the header above, so at least
    // one item contains it.
    let energy_field = items
        .iter()
        .find(|item| item.contains(ENERGY_MARKER))
        .unwrap();

    let energy = energy_field
        .split_whitespace()
        .last()
        .filter(|token| !token.contains(ENERGY_MARKER))
        .ok_or_else(|| ParseError::MissingEnergy((*energy_field).into()))?;

    if energy.starts_with(NOFOLD_ENERGY_PREFIX) {
        return Err(ParseError::FoldingFailed(energy.into()));
    }

    // SAFETY: `items` came from `split`, which always yields at least one
    // item.
    let id = *items.last().unwrap();

    let base_lines = &lines[1..];
    if base_lines.len() != expected_len {
        return Err(ParseError::IncorrectNumberOfLines(
            expected_len,
            base_lines.len(),
        ));
    }

    let mut seq = String::with_capacity(expected_len);
    let mut fold = String::with_capacity(expected_len);

    for (i, line) in base_lines.iter().enumerate() {
        let position = i + 1;
        let columns = line.as_ref().trim_end().split('\t').collect::<Vec<_>>();

        if columns.len() != BASE_LINE_COLUMNS {
            return Err(ParseError::IncorrectNumberOfColumns(
                position,
                columns.len(),
            ));
        }

        seq.push_str(columns[1]);

        let pair_index = columns[4]
            .trim()
            .parse::<usize>()
            .map_err(ParseError::InvalidPairIndex)?;

        if pair_index == 0 {
            fold.push('.');
        } else if pair_index > position {
            fold.push('(');
        } else if pair_index < position {
            fold.push(')');
        } else {
            return Err(ParseError::SelfPairedBase(position));
        }
    }

    Record::try_new(id, seq, fold, Some(energy.into()), seq_type)
        .map(Outcome::Record)
        .map_err(ParseError::Record)
}

////////////////////////////////////////////////////////////////////////////////////////
// Reader
////////////////////////////////////////////////////////////////////////////////////////

/// Configuration for a CT [`Reader`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// The sequence type to assign to parsed records.
    pub seq_type: SeqType,

    /// The error mode used by [`Reader::read_record`].
    pub error_mode: ErrorMode,
}

/// A CT file reader.
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
    /// Creates a CT file reader with the default configuration (static
    /// records, raising error mode).
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, Config::default())
    }

    /// Creates a CT file reader with the given configuration.
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
    ///
    /// The number of lines in a block comes from the block's own header; a
    /// block whose header does not parse consumes only the header line.
    pub fn read_record_with_mode(
        &mut self,
        error_mode: ErrorMode,
    ) -> Result<Option<Outcome>, Error> {
        let mut buffer = String::new();

        // Skip blank lines between records.
        loop {
            match read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? {
                0 => return Ok(None),
                _ if buffer.is_empty() => continue,
                _ => break,
            }
        }

        let mut lines = vec![buffer.clone()];

        if let Ok(expected_len) = header_sequence_length(&buffer) {
            while lines.len() < expected_len + 1 {
                match read_line(&mut self.inner, &mut buffer).map_err(Error::Io)? {
                    0 => break,
                    _ => lines.push(buffer.clone()),
                }
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

/// Extracts the expected sequence length from a CT header line.
fn header_sequence_length(header: &str) -> Result<usize, ParseError> {
    header
        .split('\t')
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<usize>()
        .map_err(ParseError::InvalidSequenceLength)
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
            .map_err(crate::fold::Error::Ct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 9-base hairpin: positions 1-3 pair with positions 9-7.
    const BLOCK: &str = "9\tdG = -7.5\tdH = -30.2\t1_1000\n\
                         1\tG\t0\t2\t9\t1\t0\t0\n\
                         2\tG\t1\t3\t8\t2\t0\t0\n\
                         3\tG\t2\t4\t7\t3\t0\t0\n\
                         4\tA\t3\t5\t0\t4\t0\t0\n\
                         5\tA\t4\t6\t0\t5\t0\t0\n\
                         6\tA\t5\t7\t0\t6\t0\t0\n\
                         7\tC\t6\t8\t3\t7\t0\t0\n\
                         8\tC\t7\t9\t2\t8\t0\t0\n\
                         9\tC\t8\t0\t1\t9\t0\t0";

    #[test]
    fn parse() {
        let lines = BLOCK.split('\n').collect::<Vec<_>>();
        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap();

        let record = match outcome {
            Outcome::Record(record) => record,
            _ => panic!("expected a record"),
        };

        assert_eq!(record.id(), "1_1000");
        assert_eq!(record.seq(), "GGGAAACCC");
        assert_eq!(record.fold(), "(((...)))");
        assert_eq!(record.energy(), Some("-7.5"));
    }

    #[test]
    fn missing_header() {
        let lines = ["not a header"];

        let err = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid ct header: expected a `dG = <energy>` field, found \"not a header\""
        );

        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::Return).unwrap();
        assert!(matches!(outcome, Outcome::Malformed(_)));
    }

    #[test]
    fn nofold_energy_is_a_sentinel_in_lenient_mode() {
        let mut lines = BLOCK.split('\n').collect::<Vec<_>>();
        lines[0] = "9\tdG = 99.9\tdH = -30.2\t1_1000";

        let outcome = from_lines(&lines, SeqType::Static, ErrorMode::Return).unwrap();
        assert!(matches!(outcome, Outcome::NoFold(_)));
    }

    #[test]
    fn incorrect_number_of_base_lines() {
        let lines = BLOCK.split('\n').take(5).collect::<Vec<_>>();

        let err = from_lines(&lines, SeqType::Static, ErrorMode::Raise).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of base lines in ct record: expected 9 lines, found 4 lines"
        );
    }

    #[test]
    fn reader_reads_a_block() {
        let data = format!("{}\n", BLOCK);
        let mut reader = Reader::new(data.as_bytes());

        let outcome = reader.read_record().unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Record(_)));
        assert!(reader.read_record().unwrap().is_none());
    }
}
