//! Hybrid records and the hyb file format.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::Reader;
pub use record::Record;
pub use writer::Writer;
