//! Properties of one aligned segment within a hybrid record.

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to [`SegmentProperties`].
#[derive(Debug)]
pub enum Error {
    /// The read coordinates are required but unset.
    MissingReadCoordinates,

    /// Only one of the read coordinates (`read_start`/`read_end`) is set.
    PartialReadCoordinates,

    /// Only one of the reference coordinates (`ref_start`/`ref_end`) is set.
    PartialRefCoordinates,

    /// A coordinate pair does not describe a valid one-based span.
    InvalidSpan(usize, usize),

    /// A read span reaches past the end of the hybrid sequence.
    SpanOutOfBounds(usize, usize, usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingReadCoordinates => {
                write!(
                    f,
                    "the segment read coordinates (`read_start` and `read_end`) are required but \
                     unset"
                )
            }
            Error::PartialReadCoordinates => {
                write!(
                    f,
                    "only one of the read coordinates is set: expected both `read_start` and \
                     `read_end`, or neither"
                )
            }
            Error::PartialRefCoordinates => {
                write!(
                    f,
                    "only one of the reference coordinates is set: expected both `ref_start` and \
                     `ref_end`, or neither"
                )
            }
            Error::InvalidSpan(start, end) => {
                write!(
                    f,
                    "invalid segment span: expected 1 <= start <= end, found start {} and end {}",
                    start, end
                )
            }
            Error::SpanOutOfBounds(start, end, len) => write!(
                f,
                "segment span {}-{} reaches past the end of the sequence (length {})",
                start, end, len
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Segment properties
////////////////////////////////////////////////////////////////////////////////////////

/// The alignment properties of one segment of a hybrid read.
///
/// Each hybrid record carries two of these: one for the 5′ segment and one
/// for the 3′ segment. All fields are optional; the hyb format writes `.`
/// for anything not known. Coordinates are one-based and inclusive, with the read
/// coordinates indexing into the hybrid sequence and the reference
/// coordinates indexing into the mapped reference sequence.
///
/// The read coordinates must be set together or not at all; methods that need
/// a span return an error when only one of the pair is present. The same
/// holds for the reference coordinates.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SegmentProperties {
    /// The mapping reference identity (e.g.,
    /// `MIMAT0000078_MirBase_miR-23a_microRNA`).
    pub ref_name: Option<String>,

    /// The one-based start position of the mapping within the hybrid read.
    pub read_start: Option<usize>,

    /// The one-based end position of the mapping within the hybrid read.
    pub read_end: Option<usize>,

    /// The one-based start position of the mapping within the reference.
    pub ref_start: Option<usize>,

    /// The one-based end position of the mapping within the reference.
    pub ref_end: Option<usize>,

    /// The alignment score, kept verbatim (it may be a BLAST e-value such as
    /// `1.2e-06` or a mapping score, depending on the upstream pipeline).
    pub score: Option<String>,
}

impl SegmentProperties {
    /// Returns the length of the segment's span within the hybrid read, or
    /// [`None`] when the read coordinates are unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb::record::SegmentProperties;
    ///
    /// let segment = SegmentProperties {
    ///     read_start: Some(1),
    ///     read_end: Some(20),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(segment.read_span()?, Some(20));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_span(&self) -> Result<Option<usize>> {
        span(self.read_start, self.read_end, Error::PartialReadCoordinates)
    }

    /// Returns the length of the segment's span within the reference, or
    /// [`None`] when the reference coordinates are unset.
    pub fn ref_span(&self) -> Result<Option<usize>> {
        span(self.ref_start, self.ref_end, Error::PartialRefCoordinates)
    }

    /// Returns the subsequence of `seq` covered by this segment's read
    /// coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb::record::SegmentProperties;
    ///
    /// let segment = SegmentProperties {
    ///     read_start: Some(21),
    ///     read_end: Some(40),
    ///     ..Default::default()
    /// };
    ///
    /// let seq = "AAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGG";
    /// assert_eq!(segment.slice(seq)?, "GGGGGGGGGGGGGGGGGGGG");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn slice<'a>(&self, seq: &'a str) -> Result<&'a str> {
        let (start, end) = match (self.read_start, self.read_end) {
            (Some(start), Some(end)) => (start, end),
            (None, None) => return Err(Error::MissingReadCoordinates),
            _ => return Err(Error::PartialReadCoordinates),
        };

        if start < 1 || start > end {
            return Err(Error::InvalidSpan(start, end));
        }

        if end > seq.len() {
            return Err(Error::SpanOutOfBounds(start, end, seq.len()));
        }

        Ok(&seq[start - 1..end])
    }

    /// Returns whether every property of the segment is set.
    pub fn is_complete(&self) -> bool {
        self.ref_name.is_some()
            && self.read_start.is_some()
            && self.read_end.is_some()
            && self.ref_start.is_some()
            && self.ref_end.is_some()
            && self.score.is_some()
    }
}

/// Computes the inclusive length of a one-based coordinate pair, returning
/// `partial` when exactly one side is set.
fn span(start: Option<usize>, end: Option<usize>, partial: Error) -> Result<Option<usize>> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if start < 1 || start > end {
                return Err(Error::InvalidSpan(start, end));
            }

            Ok(Some(end - start + 1))
        }
        (None, None) => Ok(None),
        _ => Err(partial),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_span() {
        let segment = SegmentProperties {
            read_start: Some(1),
            read_end: Some(21),
            ..Default::default()
        };

        assert_eq!(segment.read_span().unwrap(), Some(21));
    }

    #[test]
    fn unset_spans() {
        let segment = SegmentProperties::default();

        assert_eq!(segment.read_span().unwrap(), None);
        assert_eq!(segment.ref_span().unwrap(), None);
    }

    #[test]
    fn partial_read_coordinates() {
        let segment = SegmentProperties {
            read_start: Some(1),
            ..Default::default()
        };

        let err = segment.read_span().unwrap_err();
        assert_eq!(
            err.to_string(),
            "only one of the read coordinates is set: expected both `read_start` and `read_end`, \
             or neither"
        );
    }

    #[test]
    fn slice() {
        let segment = SegmentProperties {
            read_start: Some(1),
            read_end: Some(4),
            ..Default::default()
        };

        assert_eq!(segment.slice("ACGTACGT").unwrap(), "ACGT");
    }

    #[test]
    fn slice_out_of_bounds() {
        let segment = SegmentProperties {
            read_start: Some(5),
            read_end: Some(12),
            ..Default::default()
        };

        let err = segment.slice("ACGTACGT").unwrap_err();
        assert_eq!(
            err.to_string(),
            "segment span 5-12 reaches past the end of the sequence (length 8)"
        );
    }

    #[test]
    fn invalid_span() {
        let segment = SegmentProperties {
            read_start: Some(10),
            read_end: Some(2),
            ..Default::default()
        };

        let err = segment.read_span().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid segment span: expected 1 <= start <= end, found start 10 and end 2"
        );
    }
}
