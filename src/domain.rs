//! Record and entity shapes shared by the pipeline stages and the stores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve logical input fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    UserId,
    ProjectId,
    MetricName,
    MetricsValue,
    Day,
    UserOrg,
    UserRegion,
    UserTitle,
    UserAge,
    ProjectOwner,
    ProjectMulti,
    ProjectPurpose,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::UserId,
        Field::ProjectId,
        Field::MetricName,
        Field::MetricsValue,
        Field::Day,
        Field::UserOrg,
        Field::UserRegion,
        Field::UserTitle,
        Field::UserAge,
        Field::ProjectOwner,
        Field::ProjectMulti,
        Field::ProjectPurpose,
    ];

    /// Fields that must be non-null for a record to be valid
    pub const REQUIRED: [Field; 8] = [
        Field::UserId,
        Field::UserOrg,
        Field::ProjectId,
        Field::ProjectOwner,
        Field::ProjectPurpose,
        Field::ProjectMulti,
        Field::MetricName,
        Field::MetricsValue,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Field::UserId => "user_id",
            Field::ProjectId => "project_id",
            Field::MetricName => "metric_name",
            Field::MetricsValue => "metrics_value",
            Field::Day => "day",
            Field::UserOrg => "user_org",
            Field::UserRegion => "user_region",
            Field::UserTitle => "user_title",
            Field::UserAge => "user_age",
            Field::ProjectOwner => "project_owner",
            Field::ProjectMulti => "project_multi",
            Field::ProjectPurpose => "project_purpose",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input row after type coercion and date normalization.
///
/// Every field except `day` may be null. Invalid records are persisted in
/// this shape into the diagnostics table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub metric_name: Option<String>,
    pub metrics_value: Option<i64>,
    pub day: NaiveDate,
    pub user_org: Option<i64>,
    pub user_region: Option<String>,
    pub user_title: Option<String>,
    pub user_age: Option<i64>,
    pub project_owner: Option<i64>,
    pub project_multi: Option<bool>,
    pub project_purpose: Option<String>,
}

/// Diagnostics rows keep every field exactly as captured
pub type FailRecord = UsageRecord;

impl UsageRecord {
    pub fn is_null(&self, field: Field) -> bool {
        match field {
            Field::UserId => self.user_id.is_none(),
            Field::ProjectId => self.project_id.is_none(),
            Field::MetricName => self.metric_name.is_none(),
            Field::MetricsValue => self.metrics_value.is_none(),
            Field::Day => false,
            Field::UserOrg => self.user_org.is_none(),
            Field::UserRegion => self.user_region.is_none(),
            Field::UserTitle => self.user_title.is_none(),
            Field::UserAge => self.user_age.is_none(),
            Field::ProjectOwner => self.project_owner.is_none(),
            Field::ProjectMulti => self.project_multi.is_none(),
            Field::ProjectPurpose => self.project_purpose.is_none(),
        }
    }

    /// Required fields that are null, in `Field::REQUIRED` order
    pub fn missing_required(&self) -> Vec<Field> {
        Field::REQUIRED
            .iter()
            .copied()
            .filter(|f| self.is_null(*f))
            .collect()
    }
}

/// A record that passed validation: every required field is present
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidUsage {
    pub user_id: i64,
    pub project_id: i64,
    pub metric_name: String,
    pub metrics_value: i64,
    pub day: NaiveDate,
    pub user_org: i64,
    pub user_region: Option<String>,
    pub user_title: Option<String>,
    pub user_age: Option<i64>,
    pub project_owner: i64,
    pub project_multi: bool,
    pub project_purpose: String,
}

impl TryFrom<&UsageRecord> for ValidUsage {
    type Error = Vec<Field>;

    fn try_from(record: &UsageRecord) -> Result<Self, Self::Error> {
        match (
            record.user_id,
            record.project_id,
            record.metric_name.as_ref(),
            record.metrics_value,
            record.user_org,
            record.project_owner,
            record.project_multi,
            record.project_purpose.as_ref(),
        ) {
            (
                Some(user_id),
                Some(project_id),
                Some(metric_name),
                Some(metrics_value),
                Some(user_org),
                Some(project_owner),
                Some(project_multi),
                Some(project_purpose),
            ) => Ok(Self {
                user_id,
                project_id,
                metric_name: metric_name.clone(),
                metrics_value,
                day: record.day,
                user_org,
                user_region: record.user_region.clone(),
                user_title: record.user_title.clone(),
                user_age: record.user_age,
                project_owner,
                project_multi,
                project_purpose: project_purpose.clone(),
            }),
            _ => Err(record.missing_required()),
        }
    }
}

/// Dimension row for the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub user_org: i64,
    pub user_region: Option<String>,
    pub user_age: Option<i64>,
    pub user_title: Option<String>,
}

/// Dimension row for the `projects` table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub project_owner: i64,
    pub project_multi: bool,
    pub project_purpose: String,
}

/// Fact row for the `metrics` table; `metric_id` is assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub metrics_value: i64,
    pub day: NaiveDate,
    pub project_id: i64,
    pub user_id: i64,
}

impl From<&ValidUsage> for User {
    fn from(v: &ValidUsage) -> Self {
        Self {
            user_id: v.user_id,
            user_org: v.user_org,
            user_region: v.user_region.clone(),
            user_age: v.user_age,
            user_title: v.user_title.clone(),
        }
    }
}

impl From<&ValidUsage> for Project {
    fn from(v: &ValidUsage) -> Self {
        Self {
            project_id: v.project_id,
            project_owner: v.project_owner,
            project_multi: v.project_multi,
            project_purpose: v.project_purpose.clone(),
        }
    }
}

impl From<&ValidUsage> for Metric {
    fn from(v: &ValidUsage) -> Self {
        Self {
            metric_name: v.metric_name.clone(),
            metrics_value: v.metrics_value,
            day: v.day,
            project_id: v.project_id,
            user_id: v.user_id,
        }
    }
}
