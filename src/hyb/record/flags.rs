//! The flag table of a hybrid record.
//!
//! The sixteenth column of a hyb line holds arbitrary annotations as
//! `;`-separated `key=value` pairs. The keys used by the Hyb software package
//! and by this crate are enumerated in [`Key`]; anything else is a custom
//! flag, accepted only when the flag table was created with the undefined
//! flag escape enabled.

use std::str::FromStr;

/// The delimiter between flag entries.
pub const DELIMITER: char = ';';

/// The separator between a flag key and its value.
pub const SEPARATOR: char = '=';

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Flags`] table.
#[derive(Debug)]
pub enum Error {
    /// A flag entry without a `key=value` separator.
    MissingSeparator(String),

    /// A flag key outside the defined set, without the undefined flag escape.
    Undefined(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingSeparator(entry) => {
                write!(
                    f,
                    "invalid flag entry: expected `key{}value`, found \"{}\"",
                    SEPARATOR, entry
                )
            }
            Error::Undefined(key) => write!(
                f,
                "flag \"{}\" is not defined; pass it as a custom flag by enabling undefined flags",
                key
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Keys
////////////////////////////////////////////////////////////////////////////////////////

/// A defined flag key.
///
/// The first four keys are written by the Hyb software package itself; the
/// remainder are annotations added during analysis. [`Flags`] stores each of
/// these in a named slot and everything else in a custom side table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    /// The total number of hybrids represented by the record.
    CountTotal,
    /// The number of hybrids represented at the last clustering.
    CountLastClustering,
    /// Whether entries with mirrored 5′ and 3′ hybrids were merged.
    TwoWayMerged,
    /// The identifiers of all hybrids merged into this record.
    SeqIdsInCluster,
    /// The number of sequence reads represented by the record.
    ReadCount,
    /// The orientation of the strand.
    Orient,
    /// An arbitrary detail about the record.
    Det,
    /// The assigned type of segment 1.
    Seg1Type,
    /// The assigned type of segment 2.
    Seg2Type,
    /// An arbitrary detail about segment 1.
    Seg1Det,
    /// An arbitrary detail about segment 2.
    Seg2Det,
    /// Which segment (if any) is a miRNA: `N`, `5p`, `3p`, `B`, or `U`.
    MirnaSeg,
    /// The assigned region of the miRNA target.
    TargetReg,
    /// Whether the record sequences were bioinformatically extended.
    Ext,
    /// A label for the record's source dataset.
    Dataset,
}

/// Every defined flag key, in the canonical write order.
pub const DEFINED_KEYS: [Key; 15] = [
    Key::CountTotal,
    Key::CountLastClustering,
    Key::TwoWayMerged,
    Key::SeqIdsInCluster,
    Key::ReadCount,
    Key::Orient,
    Key::Det,
    Key::Seg1Type,
    Key::Seg2Type,
    Key::Seg1Det,
    Key::Seg2Det,
    Key::MirnaSeg,
    Key::TargetReg,
    Key::Ext,
    Key::Dataset,
];

impl Key {
    /// Returns the key as written in a hyb line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::CountTotal => "count_total",
            Key::CountLastClustering => "count_last_clustering",
            Key::TwoWayMerged => "two_way_merged",
            Key::SeqIdsInCluster => "seq_IDs_in_cluster",
            Key::ReadCount => "read_count",
            Key::Orient => "orient",
            Key::Det => "det",
            Key::Seg1Type => "seg1_type",
            Key::Seg2Type => "seg2_type",
            Key::Seg1Det => "seg1_det",
            Key::Seg2Det => "seg2_det",
            Key::MirnaSeg => "miRNA_seg",
            Key::TargetReg => "target_reg",
            Key::Ext => "ext",
            Key::Dataset => "dataset",
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DEFINED_KEYS
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::Undefined(s.into()))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Flags
////////////////////////////////////////////////////////////////////////////////////////

/// The flag table of a hybrid record.
///
/// Defined flags live in named slots; custom flags live in an ordered side
/// table and are accepted only when the undefined flag escape is enabled.
/// Rendering always uses the canonical order: defined flags first (in
/// [`DEFINED_KEYS`] order), then custom flags in insertion order.
///
/// # Examples
///
/// ```
/// use hybfile::hyb::record::flags::Flags;
/// use hybfile::hyb::record::flags::Key;
///
/// let flags = "seg1_type=microRNA;seg2_type=mRNA".parse::<Flags>()?;
///
/// assert_eq!(flags.get(Key::Seg1Type), Some("microRNA"));
/// assert_eq!(flags.get(Key::Seg2Type), Some("mRNA"));
/// assert_eq!(flags.to_string(), "seg1_type=microRNA;seg2_type=mRNA");
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    /// The values of the defined flags, indexed parallel to [`DEFINED_KEYS`].
    defined: [Option<String>; 15],

    /// Custom flags, in insertion order.
    custom: Vec<(String, String)>,

    /// Whether keys outside the defined set are accepted.
    allow_undefined: bool,
}

impl Flags {
    /// Creates an empty flag table that rejects undefined keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty flag table that accepts undefined keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybfile::hyb::record::flags::Flags;
    ///
    /// let mut flags = Flags::with_undefined_allowed();
    /// flags.set_by_name("my_flag", "1")?;
    ///
    /// assert_eq!(flags.get_custom("my_flag"), Some("1"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn with_undefined_allowed() -> Self {
        Self {
            allow_undefined: true,
            ..Default::default()
        }
    }

    /// Returns whether keys outside the defined set are accepted.
    pub fn allows_undefined(&self) -> bool {
        self.allow_undefined
    }

    /// Gets the value of a defined flag.
    pub fn get(&self, key: Key) -> Option<&str> {
        self.defined[index_of(key)].as_deref()
    }

    /// Sets the value of a defined flag.
    pub fn set(&mut self, key: Key, value: impl Into<String>) {
        self.defined[index_of(key)] = Some(value.into());
    }

    /// Gets the value of a custom flag.
    pub fn get_custom(&self, name: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets a flag by its textual key.
    ///
    /// Defined keys go to their named slot. Anything else goes to the custom
    /// side table when the undefined flag escape is enabled and is rejected
    /// otherwise.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        match name.parse::<Key>() {
            Ok(key) => {
                self.set(key, value);
                Ok(())
            }
            Err(_) if self.allow_undefined => {
                let value = value.into();
                match self.custom.iter_mut().find(|(key, _)| key == name) {
                    Some(entry) => entry.1 = value,
                    None => self.custom.push((name.into(), value)),
                }
                Ok(())
            }
            Err(_) => Err(Error::Undefined(name.into())),
        }
    }

    /// Returns whether no flag is set.
    pub fn is_empty(&self) -> bool {
        self.defined.iter().all(Option::is_none) && self.custom.is_empty()
    }

    /// Returns the set flags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        DEFINED_KEYS
            .iter()
            .zip(self.defined.iter())
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
            .chain(
                self.custom
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
    }

    /// Parses a flag string, applying the given undefined flag policy.
    ///
    /// Empty entries (e.g., from a trailing delimiter) are ignored.
    pub fn from_flag_string(s: &str, allow_undefined: bool) -> Result<Self> {
        let mut flags = Flags {
            allow_undefined,
            ..Default::default()
        };

        for entry in s.split(DELIMITER) {
            if entry.is_empty() {
                continue;
            }

            let (key, value) = entry
                .split_once(SEPARATOR)
                .ok_or_else(|| Error::MissingSeparator(entry.into()))?;

            flags.set_by_name(key, value)?;
        }

        Ok(flags)
    }
}

/// Returns the slot index of a defined key.
fn index_of(key: Key) -> usize {
    DEFINED_KEYS
        .iter()
        .position(|candidate| *candidate == key)
        // SAFETY: `DEFINED_KEYS` contains every `Key` variant.
        .unwrap()
}

impl FromStr for Flags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_flag_string(s, false)
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for (key, value) in self.iter() {
            if !first {
                write!(f, "{}", DELIMITER)?;
            }

            write!(f, "{}{}{}", key, SEPARATOR, value)?;
            first = false;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A flag string containing every defined flag, in canonical order.
    const ALL_FLAGS: &str = "count_total=10;count_last_clustering=11;two_way_merged=TRUE;\
                             seq_IDs_in_cluster=test_id_1,test_id_2;read_count=4;orient=F;\
                             det=Arbitrary_Test_Detail;seg1_type=microRNA;seg2_type=mRNA;\
                             seg1_det=Arbitrary_Test_Seg1_Detail;\
                             seg2_det=Arbitrary_Test_Seg2_Detail;miRNA_seg=5p;target_reg=3p;\
                             ext=FALSE;dataset=test_dataset";

    #[test]
    fn parse_and_display_round_trip() {
        let flags = ALL_FLAGS.parse::<Flags>().unwrap();

        assert_eq!(flags.get(Key::CountTotal), Some("10"));
        assert_eq!(flags.get(Key::SeqIdsInCluster), Some("test_id_1,test_id_2"));
        assert_eq!(flags.get(Key::MirnaSeg), Some("5p"));
        assert_eq!(flags.to_string(), ALL_FLAGS);
    }

    #[test]
    fn trailing_delimiter_is_ignored() {
        let flags = "dataset=test;".parse::<Flags>().unwrap();

        assert_eq!(flags.get(Key::Dataset), Some("test"));
        assert_eq!(flags.to_string(), "dataset=test");
    }

    #[test]
    fn undefined_flag_is_rejected() {
        let err = "bad_flag=1".parse::<Flags>().unwrap_err();

        assert_eq!(
            err.to_string(),
            "flag \"bad_flag\" is not defined; pass it as a custom flag by enabling undefined \
             flags"
        );
    }

    #[test]
    fn undefined_flag_is_accepted_with_escape() {
        let flags = Flags::from_flag_string("bad_flag=1;dataset=test", true).unwrap();

        assert_eq!(flags.get_custom("bad_flag"), Some("1"));
        // Custom flags render after defined flags.
        assert_eq!(flags.to_string(), "dataset=test;bad_flag=1");
    }

    #[test]
    fn missing_separator() {
        let err = "count_total".parse::<Flags>().unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid flag entry: expected `key=value`, found \"count_total\""
        );
    }

    #[test]
    fn overwriting_keeps_one_entry() {
        let mut flags = Flags::with_undefined_allowed();
        flags.set_by_name("my_flag", "1").unwrap();
        flags.set_by_name("my_flag", "2").unwrap();

        assert_eq!(flags.get_custom("my_flag"), Some("2"));
        assert_eq!(flags.to_string(), "my_flag=2");
    }
}
