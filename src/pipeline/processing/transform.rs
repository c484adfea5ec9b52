use crate::domain::{Field, UsageRecord, ValidUsage};
use crate::error::{EtlError, Result};
use crate::pipeline::ingestion::RawTable;
use crate::pipeline::processing::coerce::{parse_bool, parse_int, NullPolicy};
use crate::pipeline::processing::dates::parse_day;
use crate::pipeline::processing::dedup::dedup_stable;
use crate::pipeline::processing::validity::{classify, Verdict};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Output of the transform stage.
///
/// `valid` is deduplicated (first occurrence wins); `invalid` keeps every
/// rejected record, duplicates included, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitions {
    pub valid: Vec<ValidUsage>,
    pub invalid: Vec<UsageRecord>,
    pub stats: TransformStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformStats {
    pub input_rows: usize,
    pub valid_rows: usize,
    pub duplicates_dropped: usize,
    pub invalid_rows: usize,
    pub days_defaulted: usize,
    /// Count of invalid records per reason; a record may carry several
    pub reject_reasons: BTreeMap<String, usize>,
}

/// Header position of each logical field
#[derive(Debug, Clone)]
struct ColumnMap {
    positions: BTreeMap<Field, usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self> {
        let mut positions = BTreeMap::new();
        let mut missing = Vec::new();
        for field in Field::ALL {
            match headers.iter().position(|h| h == field.as_str()) {
                Some(idx) => {
                    positions.insert(field, idx);
                }
                None => missing.push(field.as_str().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(EtlError::SchemaMismatch { missing });
        }
        Ok(Self { positions })
    }

    fn get<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.positions
            .get(&field)
            .and_then(|idx| row.get(*idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Normalizes raw rows and splits them into valid and invalid partitions.
pub struct Transformer {
    run_date: NaiveDate,
    nulls: NullPolicy,
}

impl Transformer {
    pub fn new<S: AsRef<str>>(run_date: NaiveDate, null_tokens: &[S]) -> Self {
        Self {
            run_date,
            nulls: NullPolicy::new(null_tokens),
        }
    }

    #[instrument(skip(self, table), fields(rows = table.len(), run_date = %self.run_date))]
    pub fn transform(&self, table: &RawTable) -> Result<Partitions> {
        let columns = ColumnMap::resolve(&table.headers)?;

        let mut stats = TransformStats {
            input_rows: table.len(),
            ..TransformStats::default()
        };
        let mut valid = Vec::new();
        let mut invalid = Vec::new();

        for (idx, row) in table.rows.iter().enumerate() {
            let (record, defaulted) = self.normalize_row(idx, row, &columns)?;
            if defaulted {
                stats.days_defaulted += 1;
            }

            match classify(&record) {
                Verdict::Valid(usage) => valid.push(usage),
                Verdict::Invalid(reasons) => {
                    debug!(row = idx, ?reasons, "Record rejected");
                    for reason in &reasons {
                        let label = reason.to_string();
                        crate::metrics::transform::invalid(&label);
                        *stats.reject_reasons.entry(label).or_default() += 1;
                    }
                    invalid.push(record);
                }
            }
        }

        let before = valid.len();
        let valid = dedup_stable(valid);
        stats.valid_rows = valid.len();
        stats.duplicates_dropped = before - valid.len();
        stats.invalid_rows = invalid.len();

        crate::metrics::transform::valid(stats.valid_rows);
        crate::metrics::transform::duplicates_dropped(stats.duplicates_dropped);
        crate::metrics::transform::days_defaulted(stats.days_defaulted);
        info!(
            valid = stats.valid_rows,
            invalid = stats.invalid_rows,
            duplicates = stats.duplicates_dropped,
            days_defaulted = stats.days_defaulted,
            "Partitioned records"
        );

        Ok(Partitions {
            valid,
            invalid,
            stats,
        })
    }

    /// Coerce one raw row. Returns the record and whether `day` was defaulted.
    fn normalize_row(
        &self,
        idx: usize,
        row: &[String],
        columns: &ColumnMap,
    ) -> Result<(UsageRecord, bool)> {
        let text = |field: Field| self.nulls.cell(columns.get(row, field));

        let int = |field: Field| -> Result<Option<i64>> {
            match text(field) {
                None => Ok(None),
                Some(value) => parse_int(value).map(Some).ok_or_else(|| EtlError::InvalidField {
                    row: idx,
                    column: field.as_str().to_string(),
                    value: value.to_string(),
                    expected: "integer",
                }),
            }
        };

        let flag = |field: Field| -> Result<Option<bool>> {
            match text(field) {
                None => Ok(None),
                Some(value) => parse_bool(value).map(Some).ok_or_else(|| EtlError::InvalidField {
                    row: idx,
                    column: field.as_str().to_string(),
                    value: value.to_string(),
                    expected: "boolean",
                }),
            }
        };

        let string = |field: Field| text(field).map(str::to_string);

        // the default applies before any validity check
        let (day, defaulted) = match text(Field::Day) {
            None => (self.run_date, true),
            Some(value) => {
                let day = parse_day(value).ok_or_else(|| EtlError::DateParse {
                    row: idx,
                    value: value.to_string(),
                })?;
                (day, false)
            }
        };

        let record = UsageRecord {
            user_id: int(Field::UserId)?,
            project_id: int(Field::ProjectId)?,
            metric_name: string(Field::MetricName),
            metrics_value: int(Field::MetricsValue)?,
            day,
            user_org: int(Field::UserOrg)?,
            user_region: string(Field::UserRegion),
            user_title: string(Field::UserTitle),
            user_age: int(Field::UserAge)?,
            project_owner: int(Field::ProjectOwner)?,
            project_multi: flag(Field::ProjectMulti)?,
            project_purpose: string(Field::ProjectPurpose),
        };
        Ok((record, defaulted))
    }
}
