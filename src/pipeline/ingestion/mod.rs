// Pipeline ingestion: reading the delimited source into raw rows

pub mod extract;
pub mod fingerprint;

pub use extract::{extract, extract_from_bytes, RawTable};
