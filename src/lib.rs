//! `hybfile` is a crate for reading and cross-referencing genomic hyb and
//! fold files.
//!
//! The crate provides two main points of entry:
//!
//! - Parsing and reading hyb and fold files directly.
//! - Providing a synchronized iterator over a paired hyb/fold file set that
//!   validates each pair as it goes.
//!
//! A hyb file describes chimeric (hybrid) reads, one tab-separated record
//! per line; a fold file carries RNA secondary-structure predictions for the
//! same reads in dot-bracket notation, most commonly in the three-line
//! Vienna format. The two files are only useful together, and in real data
//! they drift: fold sequences disagree with their reads, and the files can
//! fall out of sync entirely. The paired iterator exists to make walking
//! such data predictable.
//!
//! ## Parsing and reading records
//!
//! Use [`hyb::Reader`] for hyb files and [`fold::vienna::Reader`] (or the
//! experimental [`fold::ct::Reader`]) for fold files. Individual lines parse
//! through [`str::parse`].
//!
//! ```
//! use hybfile::hyb;
//!
//! let line = "1_1000\tGGGAAACCC\t-7.5\t\
//!             ART_SRC_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
//!             ART_SRC_NAME_mRNA\t5\t9\t5\t9\t0.001\tdataset=artificial";
//!
//! let record = line.parse::<hyb::Record>()?;
//! assert_eq!(record.seg1().slice(record.seq())?, "GGGA");
//! assert_eq!(record.to_line(), line);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Paired iteration
//!
//! [`pair::HybFoldIter`] pulls one record from each source per step, checks
//! the pair for consistency (unreadable folds, indels, sequence mismatches,
//! energy disagreements), and applies the configured [`pair::ErrorMode`]:
//! raise, warn and yield, warn and skip, skip, or yield, with a bound on
//! consecutive skips as a desynchronization guard.
//!
//! ```
//! use hybfile::fold::record::SeqType;
//! use hybfile::fold::vienna;
//! use hybfile::hyb;
//! use hybfile::pair;
//!
//! let hyb_data = b"1_1000\tGGGAAACCC\t-7.5\t\
//!                  ART_SRC_NAME_microRNA\t1\t4\t1\t4\t0.001\t\
//!                  ART_SRC_NAME_mRNA\t5\t9\t5\t9\t0.001\tdataset=artificial\n";
//! let fold_data = b">1_1000\nGGGAAACCC\n(((...)))\t(-7.5)\n";
//!
//! let mut hyb_reader = hyb::Reader::new(&hyb_data[..]);
//! let mut fold_reader = vienna::Reader::with_config(
//!     &fold_data[..],
//!     vienna::Config {
//!         seq_type: SeqType::Static,
//!         ..Default::default()
//!     },
//! );
//!
//! // Combine mode attaches each fold record to its hybrid record.
//! let mut iter = pair::HybFoldIter::new(
//!     &mut hyb_reader,
//!     &mut fold_reader,
//!     true,
//!     pair::Config::default(),
//! );
//!
//! for result in &mut iter {
//!     let step = result?;
//!     let hyb_record = step.output().hyb_record();
//!     assert!(hyb_record.fold_record().is_some());
//! }
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod fold;
pub mod hyb;
pub mod pair;

pub use pair::HybFoldIter;
