//! A binary to validate a paired hyb/fold file set.
//!
//! ```shell
//! cargo run --release --bin=hyb-check --features=binaries -- \
//!     sample.hyb sample.vienna --seq-type dynamic
//! ```
//!
//! The program walks the two files in lockstep, checks every record pair for
//! consistency, and prints the iteration report. Under the default error
//! mode, inconsistent pairs are logged and skipped (up to the sequential
//! bound); pass `--error-mode raise` to stop at the first inconsistency
//! instead. Gzip-compressed inputs (`.gz`) are handled transparently.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use flate2::read::GzDecoder;
use hybfile::fold;
use hybfile::fold::record::SeqType;
use hybfile::fold::vienna;
use hybfile::hyb;
use hybfile::pair;
use hybfile::pair::HybFoldIter;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

/// The command line arguments.
#[derive(Parser)]
struct Args {
    /// The hyb file to read.
    hyb: PathBuf,

    /// The fold file to read (Vienna format).
    fold: PathBuf,

    /// How fold record sequences relate to hybrid record sequences:
    /// `static` (identical) or `dynamic` (concatenated segment
    /// subsequences).
    #[arg(short, long, default_value = "static")]
    seq_type: SeqType,

    /// How to treat record pairs that fail a consistency check:
    /// `raise`, `warn-return`, `warn-skip`, `skip`, or `return`.
    #[arg(short, long, default_value = "warn-skip")]
    error_mode: String,

    /// The number of sequence mismatches to tolerate between a fold record
    /// and its hybrid record.
    #[arg(short, long, default_value_t = 0)]
    allowed_mismatches: usize,

    /// The maximum number of record pairs to skip in a row.
    #[arg(short, long, default_value_t = pair::DEFAULT_MAX_SEQUENTIAL_SKIPS)]
    max_sequential_skips: usize,

    /// Infer read counts from `<read_id>_<read_count>`-shaped identifiers.
    #[arg(long, default_value_t = false)]
    hybformat_id: bool,

    /// Infer segment types from
    /// `<gene>_<transcript>_<name>_<type>`-shaped reference names.
    #[arg(long, default_value_t = false)]
    hybformat_ref: bool,

    /// Accept flags outside the defined set.
    #[arg(long, default_value_t = false)]
    allow_undefined_flags: bool,

    #[command(flatten)]
    verbose: Verbosity,
}

/// Opens a possibly gzip-compressed file for buffered reading.
fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let reader: Box<dyn Read> = match path.extension().is_some_and(|ext| ext == "gz") {
        true => Box::new(GzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(Box::new(BufReader::new(reader)))
}

/// Parses the error mode argument.
fn parse_error_mode(mode: &str) -> Result<pair::ErrorMode> {
    match mode {
        "raise" => Ok(pair::ErrorMode::Raise),
        "warn-return" => Ok(pair::ErrorMode::WarnReturn),
        "warn-skip" => Ok(pair::ErrorMode::WarnSkip),
        "skip" => Ok(pair::ErrorMode::Skip),
        "return" => Ok(pair::ErrorMode::Return),
        _ => bail!("invalid error mode: {mode}"),
    }
}

/// Runs the paired validation.
fn check(args: &Args) -> Result<()> {
    let config = pair::Config {
        error_mode: parse_error_mode(&args.error_mode)?,
        max_sequential_skips: args.max_sequential_skips,
        allowed_mismatches: args.allowed_mismatches,
        ..Default::default()
    };

    let mut hyb_reader = hyb::Reader::with_config(
        open(&args.hyb)?,
        hyb::record::ParseConfig {
            hybformat_id: args.hybformat_id,
            hybformat_ref: args.hybformat_ref,
            allow_undefined_flags: args.allow_undefined_flags,
        },
    );

    let mut fold_reader = vienna::Reader::with_config(
        open(&args.fold)?,
        vienna::Config {
            seq_type: args.seq_type,
            error_mode: fold::ErrorMode::Return,
        },
    );

    let mut iter = HybFoldIter::new(&mut hyb_reader, &mut fold_reader, false, config);

    let mut pairs = 0usize;
    let mut flagged = 0usize;

    for result in &mut iter {
        let step = result.with_context(|| {
            format!(
                "iterating {} alongside {}",
                args.hyb.display(),
                args.fold.display()
            )
        })?;

        pairs += 1;
        if step.diagnostic().is_some() {
            flagged += 1;
        }
    }

    let report = iter.report();

    info!("processed {} record pairs", pairs);
    if flagged > 0 {
        info!("{} pairs were yielded with a failed consistency check", flagged);
    }

    println!("{report}");

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    check(&args)
}
