use super::schema::{FieldValue, TableDef, ALL_TABLES};
use super::traits::Store;
use crate::constants::RUN_DATE_FORMAT;
use crate::error::{EtlError, Result};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, TransactionBehavior};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            FieldValue::Date(d) => {
                ToSqlOutput::Owned(Value::Text(d.format(RUN_DATE_FORMAT).to_string()))
            }
        })
    }
}

/// Relational store backed by a SQLite file.
///
/// Foreign keys are enforced per connection, so every connection opened here
/// turns them on before anything else runs.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        info!("Opened SQLite store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, surfacing any error SQLite reports on close
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| EtlError::Store(e))
    }
}

fn integrity(table: &TableDef, row: Option<usize>, message: String) -> EtlError {
    EtlError::LoadIntegrity {
        table: table.name.to_string(),
        row,
        message,
    }
}

fn insert_error(table: &TableDef, row: usize, err: rusqlite::Error) -> EtlError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => integrity(table, Some(row), err.to_string()),
        _ => EtlError::Store(err),
    }
}

impl Store for SqliteStore {
    fn create_schema(&mut self) -> Result<()> {
        let ddl: Vec<String> = ALL_TABLES.iter().map(|t| t.create_sql()).collect();
        self.conn.execute_batch(&ddl.join("\n"))?;
        debug!("Ensured {} tables exist", ALL_TABLES.len());
        Ok(())
    }

    fn append(&mut self, table: &TableDef, rows: &[Vec<FieldValue>]) -> Result<usize> {
        for (idx, row) in rows.iter().enumerate() {
            table
                .check_row(row)
                .map_err(|e| integrity(table, Some(idx), e))?;
        }

        // Dropping the transaction without commit rolls the batch back
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(&table.insert_sql())?;
            for (idx, row) in rows.iter().enumerate() {
                stmt.execute(params_from_iter(row.iter()))
                    .map_err(|e| insert_error(table, idx, e))?;
            }
        }
        tx.commit()?;

        debug!("Appended {} rows to {}", rows.len(), table.name);
        Ok(rows.len())
    }
}
