//! Synchronized iteration over paired hyb and fold sources.
//!
//! A hyb file and its companion fold file carry records for the same reads
//! in the same order. [`HybFoldIter`] walks both in lockstep, validates each
//! fold record against its hybrid record, and applies a configurable policy
//! to inconsistent pairs: raise, warn, skip, or yield them anyway. Skipping
//! is bounded: a long run of consecutive skips almost always means the two
//! files have desynchronized, and the iterator fails rather than silently
//! discarding the remainder of the input.

use std::io::BufRead;

use crate::fold;
use crate::fold::FoldSource;
use crate::fold::Outcome;
use crate::hyb;

/// The default bound on consecutively skipped record pairs.
pub const DEFAULT_MAX_SEQUENTIAL_SKIPS: usize = 100;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`HybFoldIter`].
#[derive(Debug)]
pub enum Error {
    /// An error reading the hyb source.
    Hyb(hyb::reader::Error),

    /// An error reading the fold source.
    Fold(fold::Error),

    /// A hybrid record error hit while checking or combining a pair.
    Record(hyb::record::Error),

    /// A fold record error hit while checking a pair.
    FoldRecord(fold::record::Error),

    /// A consistency check failed under [`ErrorMode::Raise`].
    FailedCheck(String, String),

    /// Too many record pairs were skipped in a row.
    MaxSequentialSkips(usize, usize, Option<String>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Hyb(err) => write!(f, "hyb source error: {err}"),
            Error::Fold(err) => write!(f, "fold source error: {err}"),
            Error::Record(err) => write!(f, "record error: {err}"),
            Error::FoldRecord(err) => write!(f, "fold record error: {err}"),
            Error::FailedCheck(id, diagnostic) => {
                write!(f, "record pair \"{}\" failed a consistency check: {}", id, diagnostic)
            }
            Error::MaxSequentialSkips(skips, max, last_id) => write!(
                f,
                "skipped {} record pairs in a row (at most {} allowed), which usually indicates \
                 desynchronized input files; last successfully paired record: {}",
                skips,
                max,
                last_id.as_deref().unwrap_or("none")
            ),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////
// Configuration
////////////////////////////////////////////////////////////////////////////////////////

/// How the iterator treats a record pair that fails a consistency check.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorMode {
    /// Return an error.
    Raise,

    /// Log a warning and yield the pair, with the diagnostic attached.
    WarnReturn,

    /// Log a warning and move on to the next pair.
    #[default]
    WarnSkip,

    /// Move on to the next pair with no output.
    Skip,

    /// Yield the pair with the diagnostic attached, with no output.
    Return,
}

impl ErrorMode {
    /// Returns whether this mode logs a warning for a failed check.
    fn warns(&self) -> bool {
        matches!(self, ErrorMode::WarnReturn | ErrorMode::WarnSkip)
    }

    /// Returns whether this mode skips a pair that fails a check.
    fn skips(&self) -> bool {
        matches!(self, ErrorMode::WarnSkip | ErrorMode::Skip)
    }
}

/// The consistency checks run on each record pair.
///
/// The checks always run in a fixed order (unreadable fold, indel, sequence
/// mismatch, energy mismatch) and only the first failure is reported. The
/// order carries no particular meaning; it is kept stable so that runs over
/// the same input produce the same diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Checks {
    /// Flag pairs whose fold record marks a failed upstream fold.
    pub foldrecord_nofold: bool,

    /// Flag pairs whose hybrid record contains an insertion or deletion.
    pub hybrecord_indel: bool,

    /// Flag pairs whose sequences mismatch beyond the allowed tolerance.
    pub max_mismatch: bool,

    /// Flag pairs whose energies disagree.
    pub energy_mismatch: bool,
}

impl Checks {
    /// Enables every check.
    pub fn all() -> Self {
        Self {
            foldrecord_nofold: true,
            hybrecord_indel: true,
            max_mismatch: true,
            energy_mismatch: true,
        }
    }

    /// Disables every check.
    pub fn none() -> Self {
        Self {
            foldrecord_nofold: false,
            hybrecord_indel: false,
            max_mismatch: false,
            energy_mismatch: false,
        }
    }
}

impl Default for Checks {
    fn default() -> Self {
        Self::all()
    }
}

/// Configuration for a [`HybFoldIter`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The policy applied to pairs that fail a consistency check.
    pub error_mode: ErrorMode,

    /// The consistency checks to run.
    pub checks: Checks,

    /// The bound on consecutively skipped pairs.
    pub max_sequential_skips: usize,

    /// The number of sequence mismatches tolerated between a fold record
    /// and its hybrid record.
    pub allowed_mismatches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::default(),
            checks: Checks::default(),
            max_sequential_skips: DEFAULT_MAX_SEQUENTIAL_SKIPS,
            allowed_mismatches: fold::record::DEFAULT_ALLOWED_MISMATCHES,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Outputs
////////////////////////////////////////////////////////////////////////////////////////

/// The records yielded for one step of paired iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    /// The hybrid record, carrying its fold record (combine mode).
    Combined(hyb::Record),

    /// The hybrid record and its fold record, separately.
    Pair(hyb::Record, fold::Record),

    /// The hybrid record alongside a fold read that produced no usable
    /// record, yielded under a return-flavored error mode.
    Unpaired(hyb::Record, Outcome),
}

impl Output {
    /// Gets the hybrid record.
    pub fn hyb_record(&self) -> &hyb::Record {
        match self {
            Output::Combined(record) => record,
            Output::Pair(record, _) => record,
            Output::Unpaired(record, _) => record,
        }
    }

    /// Gets the fold record, when the step produced one.
    ///
    /// In combine mode the fold record lives on the hybrid record itself.
    pub fn fold_record(&self) -> Option<&fold::Record> {
        match self {
            Output::Combined(record) => record.fold_record(),
            Output::Pair(_, fold_record) => Some(fold_record),
            Output::Unpaired(..) => None,
        }
    }
}

/// One step of paired iteration: the yielded records, plus the consistency
/// diagnostic under the return-flavored error modes.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// The yielded records.
    output: Output,

    /// The diagnostic of the failed check, if one failed and the error mode
    /// yields such pairs.
    diagnostic: Option<String>,
}

impl Step {
    /// Gets the yielded records.
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Gets the diagnostic of the failed check, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Consumes self and returns the yielded records.
    pub fn into_output(self) -> Output {
        self.output
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Reporting
////////////////////////////////////////////////////////////////////////////////////////

/// Counters accumulated over a paired iteration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Report {
    /// The number of read attempts, including skipped and failed ones.
    pub total_read_attempts: usize,

    /// The number of hyb records read.
    pub hyb_record_read_attempts: usize,

    /// The number of fold records read.
    pub fold_record_read_attempts: usize,

    /// The number of record pairs skipped.
    pub pair_skips: usize,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "paired iteration report:")?;
        writeln!(f, "    total read attempts:  {}", self.total_read_attempts)?;
        writeln!(f, "    hyb records read:     {}", self.hyb_record_read_attempts)?;
        writeln!(f, "    fold records read:    {}", self.fold_record_read_attempts)?;
        write!(f, "    record pairs skipped: {}", self.pair_skips)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Iterator
////////////////////////////////////////////////////////////////////////////////////////

/// An iterator over paired hyb and fold sources.
///
/// The iterator borrows both sources and owns neither; their lifecycle
/// (opening, closing) stays with the caller. Iteration stops at the end of
/// either source.
///
/// # Examples
///
/// ```
/// use hybfile::fold::record::SeqType;
/// use hybfile::fold::vienna;
/// use hybfile::hyb;
/// use hybfile::pair;
/// use hybfile::pair::HybFoldIter;
///
/// let hyb_data = b"1_1000\tGGGAAACCC\t-7.5\t\
///                  ART_SRC_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
///                  ART_SRC_NAME_mRNA\t5\t9\t5\t9\t0.001\tdataset=artificial\n";
/// let fold_data = b">1_1000\nGGGAAACCC\n(((...)))\t(-7.5)\n";
///
/// let mut hyb_reader = hyb::Reader::new(&hyb_data[..]);
/// let mut fold_reader = vienna::Reader::with_config(
///     &fold_data[..],
///     vienna::Config {
///         seq_type: SeqType::Static,
///         ..Default::default()
///     },
/// );
///
/// let mut iter = HybFoldIter::new(
///     &mut hyb_reader,
///     &mut fold_reader,
///     false,
///     pair::Config::default(),
/// );
///
/// for result in &mut iter {
///     let step = result?;
///     assert_eq!(step.output().hyb_record().id(), "1_1000");
///     assert!(step.diagnostic().is_none());
/// }
///
/// assert_eq!(iter.report().pair_skips, 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct HybFoldIter<'a, R, F>
where
    R: BufRead,
    F: FoldSource,
{
    /// The hyb source.
    hyb_reader: &'a mut hyb::Reader<R>,

    /// The fold source.
    fold_source: &'a mut F,

    /// Whether to attach each fold record to its hybrid record and yield
    /// only the latter.
    combine: bool,

    /// The iterator configuration.
    config: Config,

    /// The accumulated counters.
    report: Report,

    /// The number of pairs skipped since the last emission.
    sequential_skips: usize,

    /// The identifier of the last successfully paired record, kept for
    /// diagnostics.
    last_id: Option<String>,
}

impl<'a, R, F> HybFoldIter<'a, R, F>
where
    R: BufRead,
    F: FoldSource,
{
    /// Creates an iterator over the given paired sources.
    pub fn new(
        hyb_reader: &'a mut hyb::Reader<R>,
        fold_source: &'a mut F,
        combine: bool,
        config: Config,
    ) -> Self {
        Self {
            hyb_reader,
            fold_source,
            combine,
            config,
            report: Report::default(),
            sequential_skips: 0,
            last_id: None,
        }
    }

    /// Gets the iterator configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the counters accumulated so far.
    pub fn report(&self) -> Report {
        self.report
    }

    /// Writes the report to standard output.
    pub fn print_report(&self) {
        println!("{}", self.report);
    }

    /// Runs the configured consistency checks on a pair, returning the
    /// diagnostic of the first failed check.
    ///
    /// The fixed order (unreadable fold, indel, sequence mismatch, energy
    /// mismatch) is preserved for reproducible diagnostics.
    fn run_checks(
        &self,
        hyb_record: &hyb::Record,
        outcome: &Outcome,
    ) -> Result<Option<String>, Error> {
        let fold_record = match outcome {
            Outcome::NoFold(raw) => {
                return Ok(self.config.checks.foldrecord_nofold.then(|| {
                    format!(
                        "the fold source returned a record whose sequence failed to fold \
                         upstream:\n{}",
                        raw
                    )
                }));
            }
            // A fold read without an energy, or one that did not parse at
            // all, is flagged unconditionally.
            Outcome::NoEnergy(raw) => {
                return Ok(Some(format!(
                    "the fold source returned a record without an energy:\n{}",
                    raw
                )));
            }
            Outcome::Malformed(raw) => {
                return Ok(Some(format!(
                    "the fold source returned an unparseable record:\n{}",
                    raw
                )));
            }
            Outcome::Record(fold_record) => fold_record,
        };

        if self.config.checks.hybrecord_indel && hyb_record.has_indels().map_err(Error::Record)? {
            return Ok(Some(format!(
                "hybrid record \"{}\" contains an insertion or deletion, so its sequence cannot \
                 be matched against the fold record",
                hyb_record.id()
            )));
        }

        if self.config.checks.max_mismatch {
            let found = fold_record
                .count_hyb_record_mismatches(hyb_record)
                .map_err(Error::FoldRecord)?;

            if found > self.config.allowed_mismatches {
                return Ok(Some(format!(
                    "fold record \"{}\" mismatches hybrid record \"{}\" at {} positions ({} \
                     allowed)",
                    fold_record.id(),
                    hyb_record.id(),
                    found,
                    self.config.allowed_mismatches
                )));
            }
        }

        if self.config.checks.energy_mismatch {
            if let (Some(hyb_energy), Some(fold_energy)) =
                (hyb_record.energy(), fold_record.energy())
            {
                if hyb_energy != fold_energy {
                    return Ok(Some(format!(
                        "hybrid record \"{}\" energy \"{}\" disagrees with fold record energy \
                         \"{}\"",
                        hyb_record.id(),
                        hyb_energy,
                        fold_energy
                    )));
                }
            }
        }

        Ok(None)
    }

    /// Emits one step, resetting the skip counter and attaching the fold
    /// record in combine mode.
    fn emit(
        &mut self,
        hyb_record: hyb::Record,
        outcome: Outcome,
        diagnostic: Option<String>,
    ) -> Result<Step, Error> {
        self.sequential_skips = 0;
        self.last_id = Some(hyb_record.id().to_string());

        let output = match outcome {
            Outcome::Record(fold_record) if self.combine => {
                let mut hyb_record = hyb_record;
                hyb_record
                    .set_fold_record(fold_record, self.config.allowed_mismatches, true)
                    .map_err(Error::Record)?;
                Output::Combined(hyb_record)
            }
            Outcome::Record(fold_record) => Output::Pair(hyb_record, fold_record),
            sentinel => Output::Unpaired(hyb_record, sentinel),
        };

        Ok(Step { output, diagnostic })
    }
}

impl<R, F> Iterator for HybFoldIter<'_, R, F>
where
    R: BufRead,
    F: FoldSource,
{
    type Item = Result<Step, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // (1) Read one record from each source. The end of either
            // source ends the iteration; it is not an error.
            self.report.total_read_attempts += 1;

            self.report.hyb_record_read_attempts += 1;
            let hyb_record = match self.hyb_reader.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => return None,
                Err(err) => return Some(Err(Error::Hyb(err))),
            };

            // (2) Read the fold side leniently: parse problems surface as
            // sentinel outcomes for the checks below, not as errors.
            self.report.fold_record_read_attempts += 1;
            let outcome = match self.fold_source.read_fold_record(fold::ErrorMode::Return) {
                Ok(Some(outcome)) => outcome,
                Ok(None) => return None,
                Err(err) => return Some(Err(Error::Fold(err))),
            };

            // (3) Check the pair and apply the configured policy.
            let diagnostic = match self.run_checks(&hyb_record, &outcome) {
                Ok(diagnostic) => diagnostic,
                Err(err) => return Some(Err(err)),
            };

            let Some(diagnostic) = diagnostic else {
                return Some(self.emit(hyb_record, outcome, None));
            };

            if self.config.error_mode.warns() {
                tracing::warn!(
                    "record pair \"{}\" failed a consistency check: {}",
                    hyb_record.id(),
                    diagnostic
                );
            }

            match self.config.error_mode {
                ErrorMode::Raise => {
                    return Some(Err(Error::FailedCheck(
                        hyb_record.id().to_string(),
                        diagnostic,
                    )));
                }
                mode if mode.skips() => {
                    self.sequential_skips += 1;
                    self.report.pair_skips += 1;

                    if self.sequential_skips > self.config.max_sequential_skips {
                        return Some(Err(Error::MaxSequentialSkips(
                            self.sequential_skips,
                            self.config.max_sequential_skips,
                            self.last_id.clone(),
                        )));
                    }
                }
                _ => return Some(self.emit(hyb_record, outcome, Some(diagnostic))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::fold::record::SeqType;
    use crate::fold::vienna;

    use super::*;

    /// An artificial hybrid record with abutting segments 1-20 and 21-40.
    const HYB_LINE: &str = "1_1000\tGGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA\t-15\t\
                            ARTSEG1_SOURCE_NAME_microRNA\t1\t20\t1\t20\t0.001\t\
                            ARTSEG2_SOURCE_NAME_mRNA\t21\t40\t21\t40\t0.001\tdataset=artificial";

    /// The matching Vienna block.
    const VIENNA_BLOCK: &str = ">1_1000_ARTSEG1_SOURCE_NAME_microRNA-ARTSEG2_SOURCE_NAME_mRNA\n\
                                GGGCCCCCCCCCCCCCCGGGAAAGGGGGGGGGGGGGGAAA\n\
                                ...((((((((((((((......))))))))))))))...\t(-15)";

    /// A Vienna block whose sequence mismatches the hybrid record at three
    /// positions.
    const MISMATCH_BLOCK: &str = ">1_1000_ARTSEG1_SOURCE_NAME_microRNA-ARTSEG2_SOURCE_NAME_mRNA\n\
                                  GGGCCCCCCCCCCCCCCTTTAAAGGGGGGGGGGGGGGAAA\n\
                                  ...((((((((((((((......))))))))))))))...\t(-15)";

    fn run(
        hyb_data: &str,
        fold_data: &str,
        combine: bool,
        config: Config,
    ) -> (Vec<Result<Step, Error>>, Report) {
        let mut hyb_reader = hyb::Reader::new(hyb_data.as_bytes());
        let mut fold_reader = vienna::Reader::with_config(
            fold_data.as_bytes(),
            vienna::Config {
                seq_type: SeqType::Static,
                ..Default::default()
            },
        );

        let mut iter = HybFoldIter::new(&mut hyb_reader, &mut fold_reader, combine, config);
        let items = (&mut iter).collect::<Vec<_>>();
        let report = iter.report();

        (items, report)
    }

    fn raise_config() -> Config {
        Config {
            error_mode: ErrorMode::Raise,
            ..Default::default()
        }
    }

    #[test]
    fn a_matching_pair_is_yielded_separately() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!("{}\n", VIENNA_BLOCK);

        let (items, report) = run(&hyb_data, &fold_data, false, raise_config());

        assert_eq!(items.len(), 1);
        let step = items.into_iter().next().unwrap().unwrap();
        assert!(step.diagnostic().is_none());

        match step.into_output() {
            Output::Pair(hyb_record, fold_record) => {
                assert_eq!(hyb_record.to_line(), HYB_LINE);
                assert_eq!(fold_record.to_vienna_string(), VIENNA_BLOCK);
            }
            _ => panic!("expected a separate pair"),
        }

        assert_eq!(report.total_read_attempts, 2);
        assert_eq!(report.hyb_record_read_attempts, 2);
        assert_eq!(report.fold_record_read_attempts, 1);
        assert_eq!(report.pair_skips, 0);
    }

    #[test]
    fn combine_mode_attaches_the_fold_record_and_adopts_its_energy() {
        // The hybrid record has no energy of its own; combining adopts the
        // fold record's.
        let hyb_data = format!("{}\n", HYB_LINE.replacen("\t-15\t", "\t.\t", 1));
        let fold_data = format!("{}\n", VIENNA_BLOCK);

        let (items, _) = run(&hyb_data, &fold_data, true, raise_config());

        assert_eq!(items.len(), 1);
        let step = items.into_iter().next().unwrap().unwrap();

        match step.into_output() {
            Output::Combined(hyb_record) => {
                let fold_record = hyb_record.fold_record().unwrap();
                assert_eq!(fold_record.to_vienna_string(), VIENNA_BLOCK);
                assert_eq!(hyb_record.energy(), Some("-15"));
            }
            _ => panic!("expected a combined record"),
        }
    }

    #[test]
    fn a_mismatching_pair_raises_under_raise_mode() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!("{}\n", MISMATCH_BLOCK);

        let (items, _) = run(&hyb_data, &fold_data, false, raise_config());

        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();

        match err {
            Error::FailedCheck(id, diagnostic) => {
                assert_eq!(id, "1_1000");
                assert!(diagnostic.contains("mismatches hybrid record"));
                assert!(diagnostic.contains("3 positions"));
            }
            _ => panic!("expected a failed check"),
        }
    }

    #[test]
    fn a_mismatching_pair_is_yielded_with_its_diagnostic_under_return_mode() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!("{}\n", MISMATCH_BLOCK);

        let config = Config {
            error_mode: ErrorMode::Return,
            ..Default::default()
        };
        let (items, report) = run(&hyb_data, &fold_data, false, config);

        assert_eq!(items.len(), 1);
        let step = items.into_iter().next().unwrap().unwrap();

        assert!(step.diagnostic().unwrap().contains("3 positions"));
        assert!(matches!(step.output(), Output::Pair(..)));
        assert_eq!(report.pair_skips, 0);
    }

    #[test]
    fn a_mismatching_pair_is_skipped_under_skip_mode() {
        let hyb_data = format!("{}\n{}\n", HYB_LINE, HYB_LINE);
        let fold_data = format!("{}\n{}\n", MISMATCH_BLOCK, VIENNA_BLOCK);

        let config = Config {
            error_mode: ErrorMode::Skip,
            ..Default::default()
        };
        let (items, report) = run(&hyb_data, &fold_data, false, config);

        // The first pair is skipped silently; the second is yielded.
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
        assert_eq!(report.pair_skips, 1);
        assert_eq!(report.total_read_attempts, 3);
    }

    #[test]
    fn a_raised_tolerance_admits_the_mismatching_pair() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!("{}\n", MISMATCH_BLOCK);

        let config = Config {
            error_mode: ErrorMode::Raise,
            allowed_mismatches: 3,
            ..Default::default()
        };
        let (items, _) = run(&hyb_data, &fold_data, false, config);

        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[test]
    fn exceeding_the_skip_bound_is_an_error() {
        let hyb_data = format!("{0}\n{0}\n{0}\n", HYB_LINE);
        let fold_data = format!("{0}\n{0}\n{0}\n", MISMATCH_BLOCK);

        let config = Config {
            error_mode: ErrorMode::WarnSkip,
            max_sequential_skips: 2,
            ..Default::default()
        };
        let (items, report) = run(&hyb_data, &fold_data, false, config);

        // Two skips are tolerated; the third consecutive skip fails.
        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(err, Error::MaxSequentialSkips(3, 2, None)));
        assert_eq!(report.pair_skips, 3);
    }

    #[test]
    fn skips_under_the_bound_exhaust_the_input_quietly() {
        let hyb_data = format!("{0}\n{0}\n", HYB_LINE);
        let fold_data = format!("{0}\n{0}\n", MISMATCH_BLOCK);

        let config = Config {
            error_mode: ErrorMode::WarnSkip,
            max_sequential_skips: DEFAULT_MAX_SEQUENTIAL_SKIPS,
            ..Default::default()
        };
        let (items, report) = run(&hyb_data, &fold_data, false, config);

        assert!(items.is_empty());
        assert_eq!(report.pair_skips, 2);
    }

    #[test]
    fn an_emission_resets_the_skip_counter() {
        // bad, good, bad, good with a bound of one: each skip run stays
        // within the bound.
        let hyb_data = format!("{0}\n{0}\n{0}\n{0}\n", HYB_LINE);
        let fold_data = format!(
            "{}\n{}\n{}\n{}\n",
            MISMATCH_BLOCK, VIENNA_BLOCK, MISMATCH_BLOCK, VIENNA_BLOCK
        );

        let config = Config {
            error_mode: ErrorMode::Skip,
            max_sequential_skips: 1,
            ..Default::default()
        };
        let (items, report) = run(&hyb_data, &fold_data, false, config);

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(Result::is_ok));
        assert_eq!(report.pair_skips, 2);
    }

    #[test]
    fn a_nofold_block_is_flagged() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!(
            "{}\n",
            VIENNA_BLOCK.replacen("\t(-15)", "\t(99.0)", 1)
        );

        let (items, _) = run(&hyb_data, &fold_data, false, raise_config());

        let err = items.into_iter().next().unwrap().unwrap_err();
        match err {
            Error::FailedCheck(_, diagnostic) => {
                assert!(diagnostic.contains("failed to fold upstream"));
            }
            _ => panic!("expected a failed check"),
        }
    }

    #[test]
    fn a_nofold_block_passes_through_when_its_check_is_disabled() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!(
            "{}\n",
            VIENNA_BLOCK.replacen("\t(-15)", "\t(99.0)", 1)
        );

        let config = Config {
            error_mode: ErrorMode::Raise,
            checks: Checks {
                foldrecord_nofold: false,
                ..Checks::all()
            },
            ..Default::default()
        };
        let (items, _) = run(&hyb_data, &fold_data, false, config);

        let step = items.into_iter().next().unwrap().unwrap();
        assert!(matches!(
            step.into_output(),
            Output::Unpaired(_, Outcome::NoFold(_))
        ));
    }

    #[test]
    fn a_fold_block_without_an_energy_is_flagged_unconditionally() {
        let hyb_data = format!("{}\n", HYB_LINE);
        let fold_data = format!("{}\n", VIENNA_BLOCK.replacen("\t(-15)", "", 1));

        let config = Config {
            error_mode: ErrorMode::Raise,
            checks: Checks::none(),
            ..Default::default()
        };
        let (items, _) = run(&hyb_data, &fold_data, false, config);

        let err = items.into_iter().next().unwrap().unwrap_err();
        match err {
            Error::FailedCheck(_, diagnostic) => {
                assert!(diagnostic.contains("without an energy"));
            }
            _ => panic!("expected a failed check"),
        }
    }

    #[test]
    fn an_energy_disagreement_is_flagged() {
        let hyb_data = format!("{}\n", HYB_LINE.replacen("\t-15\t", "\t-10.0\t", 1));
        let fold_data = format!("{}\n", VIENNA_BLOCK);

        let (items, _) = run(&hyb_data, &fold_data, false, raise_config());

        let err = items.into_iter().next().unwrap().unwrap_err();
        match err {
            Error::FailedCheck(_, diagnostic) => {
                assert!(diagnostic.contains("disagrees with fold record energy"));
            }
            _ => panic!("expected a failed check"),
        }
    }

    #[test]
    fn an_indel_is_flagged_before_the_mismatch_check() {
        // Segment 2 covers 20 read bases but 21 reference bases.
        let hyb_data = format!(
            "{}\n",
            HYB_LINE.replacen("\t21\t40\t0.001", "\t21\t41\t0.001", 1)
        );
        let fold_data = format!("{}\n", MISMATCH_BLOCK);

        let (items, _) = run(&hyb_data, &fold_data, false, raise_config());

        let err = items.into_iter().next().unwrap().unwrap_err();
        match err {
            Error::FailedCheck(_, diagnostic) => {
                assert!(diagnostic.contains("insertion or deletion"));
            }
            _ => panic!("expected a failed check"),
        }
    }

    #[test]
    fn iteration_stops_at_the_end_of_the_shorter_source() {
        let hyb_data = format!("{0}\n{0}\n", HYB_LINE);
        let fold_data = format!("{}\n", VIENNA_BLOCK);

        let (items, _) = run(&hyb_data, &fold_data, false, raise_config());

        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[test]
    fn report_renders_its_counters() {
        let report = Report {
            total_read_attempts: 4,
            hyb_record_read_attempts: 4,
            fold_record_read_attempts: 3,
            pair_skips: 2,
        };

        let rendered = report.to_string();
        assert!(rendered.starts_with("paired iteration report:"));
        assert!(rendered.contains("total read attempts:  4"));
        assert!(rendered.ends_with("record pairs skipped: 2"));
    }
}
