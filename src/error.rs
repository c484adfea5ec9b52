use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Extract,
    Transform,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to read source '{}'{}: {message}", path.display(), fmt_row(*row))]
    SourceRead {
        path: PathBuf,
        row: Option<usize>,
        message: String,
    },

    #[error("Input is missing required column(s): {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Row {row}: column '{column}' has value '{value}' which is not a valid {expected}")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Row {row}: could not parse day '{value}' as a month-first date")]
    DateParse { row: usize, value: String },

    #[error("Integrity violation loading '{table}'{}: {message}", fmt_row(*row))]
    LoadIntegrity {
        table: String,
        row: Option<usize>,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_row(row: Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}

impl EtlError {
    pub fn stage(&self) -> Stage {
        match self {
            EtlError::SourceRead { .. } => Stage::Extract,
            EtlError::SchemaMismatch { .. }
            | EtlError::InvalidField { .. }
            | EtlError::DateParse { .. } => Stage::Transform,
            EtlError::LoadIntegrity { .. } | EtlError::Store(_) => Stage::Load,
            EtlError::Config(_) | EtlError::Toml(_) | EtlError::Io(_) => Stage::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
