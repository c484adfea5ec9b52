// Extract, transform and load stages plus the run driver that sequences them

pub mod ingestion;
pub mod loader;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use loader::{load_invalid, load_valid, LoadReport};
pub use orchestrator::{create_schema, Pipeline, RunSummary};
