pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::EtlConfig;
pub use error::{EtlError, Result, Stage};
