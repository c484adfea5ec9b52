// Pipeline processing: type coercion, date normalization, validation, and partitioning

pub mod coerce;
pub mod dates;
pub mod dedup;
pub mod transform;
pub mod validity;

pub use transform::{Partitions, TransformStats, Transformer};
pub use validity::{classify, RejectReason, Truth, Verdict};
