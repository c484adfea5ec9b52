//! Table definitions for the four output tables and the column type mapping
//! they share. DDL and pre-insert checks are both derived from here.

use crate::domain::{Field, Metric, Project, UsageRecord, User};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Varchar(usize),
    Date,
    Boolean,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Integer => f.write_str("INTEGER"),
            SqlType::Varchar(n) => write!(f, "VARCHAR({n})"),
            SqlType::Date => f.write_str("DATE"),
            SqlType::Boolean => f.write_str("BOOLEAN"),
        }
    }
}

/// Type of each logical field, wherever it is stored
pub const fn column_type(field: Field) -> SqlType {
    match field {
        Field::UserId
        | Field::ProjectId
        | Field::MetricsValue
        | Field::UserOrg
        | Field::UserAge
        | Field::ProjectOwner => SqlType::Integer,
        Field::MetricName | Field::UserTitle | Field::ProjectPurpose => SqlType::Varchar(45),
        Field::UserRegion => SqlType::Varchar(3),
        Field::Day => SqlType::Date,
        Field::ProjectMulti => SqlType::Boolean,
    }
}

/// A single cell bound for the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

impl FieldValue {
    fn fits(&self, sql_type: SqlType) -> Result<(), String> {
        match (self, sql_type) {
            (FieldValue::Null, _) => Ok(()),
            (FieldValue::Integer(_), SqlType::Integer) => Ok(()),
            (FieldValue::Boolean(_), SqlType::Boolean) => Ok(()),
            (FieldValue::Date(_), SqlType::Date) => Ok(()),
            (FieldValue::Text(s), SqlType::Varchar(n)) => {
                let len = s.chars().count();
                if len <= n {
                    Ok(())
                } else {
                    Err(format!("{len} characters exceed VARCHAR({n})"))
                }
            }
            (value, sql_type) => Err(format!("{value:?} is not a {sql_type}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Assigned by the store; never part of an insert
    pub auto_increment: bool,
    /// `(table, column)` this column points at
    pub references: Option<(&'static str, &'static str)>,
}

impl ColumnDef {
    const fn field(field: Field) -> Self {
        Self {
            name: field.as_str(),
            sql_type: column_type(field),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            references: None,
        }
    }

    const fn surrogate(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::Integer,
            nullable: false,
            primary_key: true,
            auto_increment: true,
            references: None,
        }
    }

    const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    const fn key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    fn ddl(&self) -> String {
        if self.auto_increment {
            return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.name);
        }
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some((table, column)) = self.references {
            sql.push_str(&format!(" REFERENCES {table}({column})"));
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// Columns supplied on insert, in row order
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.auto_increment)
    }

    /// Position of the caller-supplied primary key within an insert row
    pub fn key_position(&self) -> Option<usize> {
        self.insert_columns().position(|c| c.primary_key)
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::ddl).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.name,
            columns.join(",\n    ")
        )
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.insert_columns().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    /// Arity, NOT NULL, type and length checks shared by every store
    pub fn check_row(&self, row: &[FieldValue]) -> Result<(), String> {
        let expected = self.insert_columns().count();
        if row.len() != expected {
            return Err(format!("expected {expected} values, got {}", row.len()));
        }
        for (column, value) in self.insert_columns().zip(row) {
            if *value == FieldValue::Null && !column.nullable {
                return Err(format!("{} must not be null", column.name));
            }
            value
                .fits(column.sql_type)
                .map_err(|e| format!("{}: {e}", column.name))?;
        }
        Ok(())
    }
}

pub static USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        ColumnDef::field(Field::UserId).key(),
        ColumnDef::field(Field::UserOrg).not_null(),
        ColumnDef::field(Field::UserRegion),
        ColumnDef::field(Field::UserAge),
        ColumnDef::field(Field::UserTitle),
    ],
};

pub static PROJECTS: TableDef = TableDef {
    name: "projects",
    columns: &[
        ColumnDef::field(Field::ProjectId).key(),
        ColumnDef::field(Field::ProjectOwner).not_null(),
        ColumnDef::field(Field::ProjectMulti).not_null(),
        ColumnDef::field(Field::ProjectPurpose).not_null(),
    ],
};

pub static METRICS: TableDef = TableDef {
    name: "metrics",
    columns: &[
        ColumnDef::surrogate("metric_id"),
        ColumnDef::field(Field::MetricName).not_null(),
        ColumnDef::field(Field::MetricsValue).not_null(),
        ColumnDef::field(Field::Day).not_null(),
        ColumnDef::field(Field::ProjectId)
            .not_null()
            .references("projects", "project_id"),
        ColumnDef::field(Field::UserId)
            .not_null()
            .references("users", "user_id"),
    ],
};

pub static FAILS: TableDef = TableDef {
    name: "fails",
    columns: &[
        ColumnDef::surrogate("fail_id"),
        ColumnDef::field(Field::UserId),
        ColumnDef::field(Field::ProjectId),
        ColumnDef::field(Field::MetricName),
        ColumnDef::field(Field::MetricsValue),
        ColumnDef::field(Field::Day).not_null(),
        ColumnDef::field(Field::UserOrg),
        ColumnDef::field(Field::UserRegion),
        ColumnDef::field(Field::UserTitle),
        ColumnDef::field(Field::UserAge),
        ColumnDef::field(Field::ProjectOwner),
        ColumnDef::field(Field::ProjectMulti),
        ColumnDef::field(Field::ProjectPurpose),
    ],
};

/// Creation order: referenced tables first
pub static ALL_TABLES: [&TableDef; 4] = [&USERS, &PROJECTS, &METRICS, &FAILS];

/// An entity that maps onto one row of a table
pub trait TableRow {
    fn table() -> &'static TableDef;
    fn values(&self) -> Vec<FieldValue>;
}

impl TableRow for User {
    fn table() -> &'static TableDef {
        &USERS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.user_id.into(),
            self.user_org.into(),
            self.user_region.as_ref().into(),
            self.user_age.into(),
            self.user_title.as_ref().into(),
        ]
    }
}

impl TableRow for Project {
    fn table() -> &'static TableDef {
        &PROJECTS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.project_id.into(),
            self.project_owner.into(),
            self.project_multi.into(),
            (&self.project_purpose).into(),
        ]
    }
}

impl TableRow for Metric {
    fn table() -> &'static TableDef {
        &METRICS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            (&self.metric_name).into(),
            self.metrics_value.into(),
            self.day.into(),
            self.project_id.into(),
            self.user_id.into(),
        ]
    }
}

impl TableRow for UsageRecord {
    fn table() -> &'static TableDef {
        &FAILS
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.user_id.into(),
            self.project_id.into(),
            self.metric_name.as_ref().into(),
            self.metrics_value.into(),
            self.day.into(),
            self.user_org.into(),
            self.user_region.as_ref().into(),
            self.user_title.as_ref().into(),
            self.user_age.into(),
            self.project_owner.into(),
            self.project_multi.into(),
            self.project_purpose.as_ref().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_ddl() {
        assert_eq!(
            USERS.create_sql(),
            "CREATE TABLE IF NOT EXISTS users (\n    \
             user_id INTEGER NOT NULL PRIMARY KEY,\n    \
             user_org INTEGER NOT NULL,\n    \
             user_region VARCHAR(3),\n    \
             user_age INTEGER,\n    \
             user_title VARCHAR(45)\n);"
        );
    }

    #[test]
    fn metrics_ddl_has_surrogate_and_foreign_keys() {
        let sql = METRICS.create_sql();
        assert!(sql.contains("metric_id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("project_id INTEGER NOT NULL REFERENCES projects(project_id)"));
        assert!(sql.contains("user_id INTEGER NOT NULL REFERENCES users(user_id)"));
        assert!(sql.contains("day DATE NOT NULL"));
    }

    #[test]
    fn insert_skips_surrogate_keys() {
        assert_eq!(
            METRICS.insert_sql(),
            "INSERT INTO metrics (metric_name, metrics_value, day, project_id, user_id) VALUES (?1, ?2, ?3, ?4, ?5)"
        );
        assert_eq!(FAILS.insert_columns().count(), 12);
        assert_eq!(FAILS.key_position(), None);
        assert_eq!(USERS.key_position(), Some(0));
    }

    #[test]
    fn fails_only_requires_day() {
        let required: Vec<&str> = FAILS
            .insert_columns()
            .filter(|c| !c.nullable)
            .map(|c| c.name)
            .collect();
        assert_eq!(required, vec!["day"]);
    }

    #[test]
    fn check_row_enforces_null_type_and_length() {
        let user = |id: FieldValue, org: FieldValue, region: FieldValue| {
            vec![id, org, region, FieldValue::Null, FieldValue::Null]
        };

        let ok = user(1i64.into(), 5i64.into(), "US".into());
        assert!(USERS.check_row(&ok).is_ok());

        let null_org = user(1i64.into(), FieldValue::Null, FieldValue::Null);
        assert_eq!(USERS.check_row(&null_org).unwrap_err(), "user_org must not be null");

        let long_region = user(1i64.into(), 5i64.into(), "EMEA".into());
        assert!(USERS.check_row(&long_region).unwrap_err().contains("VARCHAR(3)"));

        let wrong_type = user(true.into(), 5i64.into(), FieldValue::Null);
        assert!(USERS.check_row(&wrong_type).is_err());

        assert!(USERS.check_row(&[FieldValue::Integer(1)]).is_err());
    }
}
