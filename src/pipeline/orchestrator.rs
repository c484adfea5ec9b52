use crate::config::EtlConfig;
use crate::error::Result;
use crate::pipeline::ingestion::extract;
use crate::pipeline::loader::{load_invalid, load_valid, LoadReport};
use crate::pipeline::processing::{TransformStats, Transformer};
use crate::pipeline::storage::Store;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub source_path: PathBuf,
    pub source_sha256: String,
    pub rows_extracted: usize,
    pub transform: TransformStats,
    pub loaded: LoadReport,
    /// False when the diagnostics table was skipped by configuration
    pub fails_loaded: bool,
    pub elapsed_secs: f64,
}

/// Drives extract, transform and load for one configuration.
pub struct Pipeline<'a> {
    config: &'a EtlConfig,
    run_date: NaiveDate,
}

impl<'a> Pipeline<'a> {
    /// The run date is fixed here so every record of the run shares it
    pub fn new(config: &'a EtlConfig) -> Self {
        Self {
            config,
            run_date: config.resolve_run_date(),
        }
    }

    /// Run every stage against `store`. Any error aborts the run; rows
    /// already committed by earlier batches stay in the store.
    pub fn run<S: Store + ?Sized>(&self, store: &mut S) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id, run_date = %self.run_date);
        let _enter = span.enter();

        crate::metrics::run::started();
        info!("Starting run with source {}", self.config.source.path.display());

        self.run_stages(run_id, store).map_err(|e| {
            crate::metrics::run::failed(&e.stage().to_string());
            error!(stage = %e.stage(), "Run failed: {}", e);
            e
        })
    }

    fn run_stages<S: Store + ?Sized>(&self, run_id: Uuid, store: &mut S) -> Result<RunSummary> {
        let started = Instant::now();

        // tables exist even when a later stage aborts the run
        timed("schema", || store.create_schema())?;

        let table = timed("extract", || extract(&self.config.source))?;
        crate::metrics::extract::rows(table.len());

        let transformer = Transformer::new(self.run_date, &self.config.source.null_tokens);
        let partitions = timed("transform", || transformer.transform(&table))?;

        let loaded = timed("load", || -> Result<LoadReport> {
            let mut report = load_valid(store, &partitions.valid)?;
            if self.config.load.load_fails {
                report.fails = load_invalid(store, &partitions.invalid)?;
            } else if !partitions.invalid.is_empty() {
                warn!(
                    "Skipping {} invalid records; diagnostics table disabled",
                    partitions.invalid.len()
                );
            }
            Ok(report)
        })?;

        let summary = RunSummary {
            run_id,
            run_date: self.run_date,
            source_path: table.path.clone(),
            source_sha256: table.source_sha256.clone(),
            rows_extracted: table.len(),
            transform: partitions.stats,
            loaded,
            fails_loaded: self.config.load.load_fails,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            users = loaded.users,
            projects = loaded.projects,
            metrics = loaded.metrics,
            fails = loaded.fails,
            elapsed_secs = summary.elapsed_secs,
            "Run complete"
        );
        Ok(summary)
    }
}

/// Create the output tables without loading anything
pub fn create_schema<S: Store + ?Sized>(store: &mut S) -> Result<()> {
    timed("schema", || store.create_schema())?;
    info!("Output tables ready");
    Ok(())
}

fn timed<T>(stage: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _span = info_span!("stage", stage).entered();
    let started = Instant::now();
    let out = f();
    crate::metrics::stage_duration(stage, started.elapsed().as_secs_f64());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::pipeline::storage::{MemoryStore, SqliteStore};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "user_id,project_id,metric_name,metrics_value,day,user_org,user_region,user_title,user_age,project_owner,project_multi,project_purpose";

    fn source(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn config(file: &NamedTempFile) -> EtlConfig {
        let mut config = EtlConfig::default();
        config.source.path = file.path().to_path_buf();
        config.run.date = NaiveDate::from_ymd_opt(2024, 3, 1);
        config
    }

    #[test]
    fn runs_every_stage_into_the_store() {
        let file = source(&[
            "1,10,logins,3,04/13/2024,5,US,,41,5,false,review",
            "1,10,logins,3,04/13/2024,5,US,,41,5,false,review",
            "2,11,logins,1,,7,US,,,5,false,review",
        ]);
        let config = config(&file);
        let mut store = MemoryStore::new();

        let summary = Pipeline::new(&config).run(&mut store).unwrap();
        assert_eq!(summary.rows_extracted, 3);
        assert_eq!(summary.transform.valid_rows, 1);
        assert_eq!(summary.transform.duplicates_dropped, 1);
        assert_eq!(summary.transform.invalid_rows, 1);
        assert_eq!(summary.loaded.fails, 1);
        assert_eq!(summary.run_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(store.row_count("metrics"), 1);
        assert_eq!(store.row_count("fails"), 1);
    }

    #[test]
    fn fails_can_be_skipped() {
        let file = source(&["2,11,logins,1,,7,US,,,5,false,review"]);
        let mut config = config(&file);
        config.load.load_fails = false;
        let mut store = MemoryStore::new();

        let summary = Pipeline::new(&config).run(&mut store).unwrap();
        assert!(!summary.fails_loaded);
        assert_eq!(summary.transform.invalid_rows, 1);
        assert_eq!(store.row_count("fails"), 0);
    }

    #[test]
    fn missing_source_reports_extract_stage() {
        let mut config = EtlConfig::default();
        config.source.path = PathBuf::from("/nonexistent/usage.csv");
        let err = Pipeline::new(&config).run(&mut MemoryStore::new()).unwrap_err();
        assert!(matches!(err, EtlError::SourceRead { .. }));
        assert_eq!(err.stage().to_string(), "extract");
    }

    #[test]
    fn bad_date_aborts_before_load() {
        let file = source(&["1,10,logins,3,13/04/2024,5,US,,41,5,false,review"]);
        let config = config(&file);
        let mut store = MemoryStore::new();
        let err = Pipeline::new(&config).run(&mut store).unwrap_err();
        assert!(matches!(err, EtlError::DateParse { row: 0, .. }));
        assert_eq!(store.row_count("users"), 0);
    }

    #[test]
    fn tables_are_created_before_extract() {
        let mut config = EtlConfig::default();
        config.source.path = PathBuf::from("/nonexistent/usage.csv");
        let mut store = SqliteStore::open_in_memory().unwrap();
        Pipeline::new(&config).run(&mut store).unwrap_err();

        for table in ["users", "projects", "metrics", "fails"] {
            let rows: i64 = store
                .connection()
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap();
            assert_eq!(rows, 0);
        }
    }
}
