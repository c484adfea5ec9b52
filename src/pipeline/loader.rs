use crate::domain::{FailRecord, Metric, Project, User, ValidUsage};
use crate::error::Result;
use crate::pipeline::processing::dedup::dedup_stable;
use crate::pipeline::storage::{FieldValue, Store, TableRow};
use serde::Serialize;
use tracing::{info, instrument};

/// Rows written per output table during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub users: usize,
    pub projects: usize,
    pub metrics: usize,
    pub fails: usize,
}

/// Append `rows` to the table their type maps onto, as one batch
pub fn append_rows<S, R>(store: &mut S, rows: &[R]) -> Result<usize>
where
    S: Store + ?Sized,
    R: TableRow,
{
    let table = R::table();
    let values: Vec<Vec<FieldValue>> = rows.iter().map(R::values).collect();
    let written = store.append(table, &values)?;
    crate::metrics::load::rows_appended(table.name, written);
    info!("Appended {} rows to {}", written, table.name);
    Ok(written)
}

/// Split valid records into users, projects and metrics and append them in
/// that order so every metric's references exist before it is written.
///
/// Users and projects are deduplicated on the whole row. Two records that
/// share a `user_id` but disagree on any user attribute survive as two rows
/// and collide on the primary key.
#[instrument(skip_all, fields(records = valid.len()))]
pub fn load_valid<S: Store + ?Sized>(store: &mut S, valid: &[ValidUsage]) -> Result<LoadReport> {
    let users = dedup_stable(valid.iter().map(User::from));
    let projects = dedup_stable(valid.iter().map(Project::from));
    let metrics: Vec<Metric> = valid.iter().map(Metric::from).collect();

    Ok(LoadReport {
        users: append_rows(store, &users)?,
        projects: append_rows(store, &projects)?,
        metrics: append_rows(store, &metrics)?,
        fails: 0,
    })
}

/// Append rejected records verbatim to the diagnostics table
#[instrument(skip_all, fields(records = invalid.len()))]
pub fn load_invalid<S: Store + ?Sized>(store: &mut S, invalid: &[FailRecord]) -> Result<usize> {
    append_rows(store, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UsageRecord;
    use crate::error::EtlError;
    use crate::pipeline::storage::MemoryStore;
    use chrono::NaiveDate;

    fn usage(user_id: i64, project_id: i64, region: &str) -> ValidUsage {
        ValidUsage {
            user_id,
            project_id,
            metric_name: "logins".to_string(),
            metrics_value: 1,
            day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            user_org: 5,
            user_region: Some(region.to_string()),
            user_title: None,
            user_age: None,
            project_owner: 5,
            project_multi: false,
            project_purpose: "review".to_string(),
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_schema().unwrap();
        store
    }

    #[test]
    fn shared_user_is_written_once() {
        let mut store = store();
        let mut second = usage(1, 10, "US");
        second.metrics_value = 2;
        let valid = vec![usage(1, 10, "US"), second, usage(2, 10, "US")];

        let report = load_valid(&mut store, &valid).unwrap();
        assert_eq!(
            report,
            LoadReport {
                users: 2,
                projects: 1,
                metrics: 3,
                fails: 0
            }
        );
        assert_eq!(store.row_count("users"), 2);
        assert_eq!(store.row_count("metrics"), 3);
    }

    #[test]
    fn conflicting_user_attributes_fail_the_load() {
        let mut store = store();
        let valid = vec![usage(1, 10, "US"), usage(1, 10, "CA")];
        let err = load_valid(&mut store, &valid).unwrap_err();
        assert!(matches!(
            err,
            EtlError::LoadIntegrity { ref table, row: Some(1), .. } if table == "users"
        ));
    }

    #[test]
    fn users_are_written_in_first_seen_order() {
        let mut store = store();
        let valid = vec![usage(3, 10, "US"), usage(1, 10, "US"), usage(3, 10, "US")];
        load_valid(&mut store, &valid).unwrap();
        let ids: Vec<&FieldValue> = store.rows("users").iter().map(|r| &r[0]).collect();
        assert_eq!(ids, vec![&FieldValue::Integer(3), &FieldValue::Integer(1)]);
    }

    #[test]
    fn invalid_records_keep_duplicates() {
        let mut store = store();
        let record = UsageRecord {
            user_id: Some(1),
            project_id: None,
            metric_name: None,
            metrics_value: None,
            day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            user_org: None,
            user_region: None,
            user_title: None,
            user_age: None,
            project_owner: None,
            project_multi: None,
            project_purpose: None,
        };
        let written = load_invalid(&mut store, &[record.clone(), record]).unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.row_count("fails"), 2);
    }

    #[test]
    fn empty_partitions_write_nothing() {
        let mut store = store();
        let report = load_valid(&mut store, &[]).unwrap();
        assert_eq!(report, LoadReport::default());
        assert_eq!(load_invalid(&mut store, &[]).unwrap(), 0);
    }
}
