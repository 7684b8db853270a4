//! Fold records and the file formats that carry them.

pub mod ct;
pub mod record;
pub mod vienna;

pub use record::Record;
pub use record::SeqType;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to reading fold records, from any supported format.
#[derive(Debug)]
pub enum Error {
    /// An error from a Vienna reader.
    Vienna(vienna::Error),

    /// An error from a CT reader.
    Ct(ct::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Vienna(err) => write!(f, "vienna error: {err}"),
            Error::Ct(err) => write!(f, "ct error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Error modes
////////////////////////////////////////////////////////////////////////////////////////

/// How a fold reader treats a malformed record.
///
/// Raising is the default: a malformed block is an error. The lenient modes
/// exist so that a caller layering its own policy on top (most importantly
/// the paired iterator) receives malformed blocks as sentinel [`Outcome`]
/// values instead of errors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorMode {
    /// Return an error for a malformed record.
    #[default]
    Raise,

    /// Log a warning and hand back a sentinel outcome.
    WarnReturn,

    /// Hand back a sentinel outcome with no output.
    Return,
}

////////////////////////////////////////////////////////////////////////////////////////
// Outcomes
////////////////////////////////////////////////////////////////////////////////////////

/// The outcome of leniently reading one fold record.
///
/// Every variant but [`Outcome::Record`] is a sentinel carrying the raw text
/// of the offending block; matching on the variant replaces inspecting
/// stringly-typed error values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A successfully parsed record.
    Record(Record),

    /// The block's energy marks a sequence that failed to fold upstream.
    NoFold(String),

    /// The block lacks an energy field.
    NoEnergy(String),

    /// The block is otherwise malformed.
    Malformed(String),
}

impl Outcome {
    /// Returns the parsed record, if there is one.
    pub fn record(&self) -> Option<&Record> {
        match self {
            Outcome::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Consumes self and returns the parsed record, if there is one.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Outcome::Record(record) => Some(record),
            _ => None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Sources
////////////////////////////////////////////////////////////////////////////////////////

/// A source of fold records.
///
/// Both the [Vienna](vienna::Reader) and [CT](ct::Reader) readers implement
/// this; the paired iterator works through it so that either format can sit
/// on the fold side of a run.
pub trait FoldSource {
    /// Attempts to read the next fold record under the given error mode,
    /// returning [`None`] at the end of input.
    fn read_fold_record(&mut self, error_mode: ErrorMode) -> Result<Option<Outcome>, Error>;
}
