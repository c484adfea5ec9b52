//! Run metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless a recorder is installed; the binary installs
//! a Prometheus recorder when a snapshot file is requested.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RowsExtracted,
    RecordsValid,
    RecordsInvalid,
    DuplicatesDropped,
    DaysDefaulted,
    RowsAppended,
    StageDuration,
    RunsTotal,
    RunFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsExtracted => "usage_etl_rows_extracted_total",
            MetricName::RecordsValid => "usage_etl_records_valid_total",
            MetricName::RecordsInvalid => "usage_etl_records_invalid_total",
            MetricName::DuplicatesDropped => "usage_etl_duplicates_dropped_total",
            MetricName::DaysDefaulted => "usage_etl_days_defaulted_total",
            MetricName::RowsAppended => "usage_etl_rows_appended_total",
            MetricName::StageDuration => "usage_etl_stage_duration_seconds",
            MetricName::RunsTotal => "usage_etl_runs_total",
            MetricName::RunFailures => "usage_etl_run_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install a Prometheus recorder and return the handle used to render it
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

pub fn stage_duration(stage: &'static str, secs: f64) {
    ::metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => stage).record(secs);
}

pub mod run {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::RunsTotal.as_str()).increment(1);
    }

    pub fn failed(stage: &str) {
        ::metrics::counter!(MetricName::RunFailures.as_str(), "stage" => stage.to_string())
            .increment(1);
    }
}

pub mod extract {
    use super::MetricName;

    pub fn rows(count: usize) {
        ::metrics::counter!(MetricName::RowsExtracted.as_str()).increment(count as u64);
    }
}

pub mod transform {
    use super::MetricName;

    pub fn valid(count: usize) {
        ::metrics::counter!(MetricName::RecordsValid.as_str()).increment(count as u64);
    }

    pub fn invalid(reason: &str) {
        ::metrics::counter!(MetricName::RecordsInvalid.as_str(), "reason" => reason.to_string())
            .increment(1);
    }

    pub fn duplicates_dropped(count: usize) {
        ::metrics::counter!(MetricName::DuplicatesDropped.as_str()).increment(count as u64);
    }

    pub fn days_defaulted(count: usize) {
        ::metrics::counter!(MetricName::DaysDefaulted.as_str()).increment(count as u64);
    }
}

pub mod load {
    use super::MetricName;

    pub fn rows_appended(table: &str, count: usize) {
        ::metrics::counter!(MetricName::RowsAppended.as_str(), "table" => table.to_string())
            .increment(count as u64);
    }
}
