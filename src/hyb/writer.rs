//! A hyb file writer.

use std::io;
use std::io::Write;

use crate::hyb::Record;

/// A hyb file writer.
///
/// # Examples
///
/// ```
/// use hybfile::hyb;
///
/// let line = "1_1000\tAAAAGGGG\t.\tNotype1\t.\t.\t.\t.\t.\tNotype2\t.\t.\t.\t.\t.";
/// let record = line.parse::<hyb::Record>()?;
///
/// let mut writer = hyb::Writer::new(Vec::new());
/// writer.write_record(&record)?;
///
/// assert_eq!(writer.into_inner(), format!("{}\n", line).into_bytes());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Writer<W>
where
    W: Write,
{
    /// The inner writer.
    inner: W,
}

impl<W> Writer<W>
where
    W: Write,
{
    /// Creates a hyb file writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Gets a mutable reference to the inner writer.
    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consumes self and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes a record as one hyb line.
    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        writeln!(self.inner, "{}", record.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyb::Reader;

    #[test]
    fn written_records_read_back() {
        let line = "1_1000\tAAAAGGGG\t-10.0\tNotype1\t1\t4\t1\t4\t0.001\t\
                    Notype2\t5\t8\t5\t8\t0.001\tdataset=test";
        let record = line.parse::<Record>().unwrap();

        let mut writer = Writer::new(Vec::new());
        writer.write_record(&record).unwrap();
        writer.write_record(&record).unwrap();

        let data = writer.into_inner();
        let mut reader = Reader::new(&data[..]);

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_line(), line);
    }
}
