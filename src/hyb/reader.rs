//! A hyb file reader.

use std::io::BufRead;
use std::io::{self};
use std::iter;

use crate::hyb::record;
use crate::hyb::record::ParseConfig;
use crate::hyb::Record;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A record error.
    Record(record::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Record(err) => write!(f, "record error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Reader
////////////////////////////////////////////////////////////////////////////////////////

/// A hyb file reader.
///
/// # Examples
///
/// ```
/// use hybfile::hyb;
///
/// let data = b"1_1000\tAAAAGGGG\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.\n";
/// let mut reader = hyb::Reader::new(&data[..]);
///
/// let record = reader.read_record()?.unwrap();
/// assert_eq!(record.id(), "1_1000");
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

    /// The line parsing configuration.
    config: ParseConfig,
}

impl<T> Reader<T>
where
    T: BufRead,
{
    /// Creates a hyb file reader with the default parsing configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ParseConfig::default())
    }

    /// Creates a hyb file reader with the given parsing configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    /// use hybfile::hyb::record::ParseConfig;
    ///
    /// let data = b"1_1000\tAAAAGGGG\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.\n";
    /// let mut reader = hyb::Reader::with_config(
    ///     &data[..],
    ///     ParseConfig {
    ///         hybformat_id: true,
    ///         ..Default::default()
    ///     },
    /// );
    ///
    /// let record = reader.read_record()?.unwrap();
    /// assert_eq!(record.read_count()?, Some(1000));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn with_config(inner: T, config: ParseConfig) -> Self {
        Self { inner, config }
    }

    /// Gets the parsing configuration.
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Gets a reference to the inner reader.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Gets a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consumes self and returns the inner reader.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Reads a raw, textual line from the underlying reader.
    pub fn read_line_raw(&mut self, buffer: &mut String) -> io::Result<usize> {
        read_line(self.inner_mut(), buffer)
    }

    /// Attempts to read a [`Record`] from the underlying reader, returning
    /// [`None`] at the end of input. Blank lines are skipped.
    pub fn read_record(&mut self) -> Result<Option<Record>, Error> {
        let mut buffer = String::new();

        loop {
            match self.read_line_raw(&mut buffer).map_err(Error::Io)? {
                0 => return Ok(None),
                _ if buffer.is_empty() => continue,
                _ => break,
            }
        }

        Record::from_line_with(&buffer, &self.config)
            .map(Some)
            .map_err(Error::Record)
    }

    /// Returns an iterator over the records in the underlying reader.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb;
    ///
    /// let data = b"1_1000\tAAAAGGGG\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.\n\
    ///              2_2000\tCCCCTTTT\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.\n";
    /// let mut reader = hyb::Reader::new(&data[..]);
    ///
    /// let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    /// assert_eq!(records.len(), 2);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn records(&mut self) -> impl Iterator<Item = Result<Record, Error>> + '_ {
        iter::from_fn(move || self.read_record().transpose())
    }
}

impl<T> From<T> for Reader<T>
where
    T: BufRead,
{
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

/// Reads a line from a buffered reader, stripping the line terminator.
///
/// Adapted from the equivalent helper in noodles-gtf, which does exactly
/// what every line-oriented reader in this crate needs.
pub(crate) fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    match reader.read_line(buffer) {
        Ok(0) => Ok(0),
        Ok(n) => {
            if buffer.ends_with(NEW_LINE) {
                buffer.pop();

                if buffer.ends_with(CARRIAGE_RETURN) {
                    buffer.pop();
                }
            }

            Ok(n)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_read_line() {
        let data = b"hello\r\nworld!";
        let mut cursor = io::Cursor::new(data);

        let mut buffer = String::new();
        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "hello");
        assert_eq!(len, 7);

        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "world!");
        assert_eq!(len, 6);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let data = b"\n1_1000\tAAAAGGGG\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.\n\n";
        let mut reader = Reader::new(&data[..]);

        assert!(reader.read_record().unwrap().is_some());
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn a_malformed_line_is_an_error() {
        let data = b"1_1000\tAAAAGGGG\n";
        let mut reader = Reader::new(&data[..]);

        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, Error::Record(_)));
    }
}
