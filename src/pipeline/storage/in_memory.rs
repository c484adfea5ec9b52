use super::schema::{FieldValue, TableDef, ALL_TABLES};
use super::traits::Store;
use crate::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug)]
struct MemTable {
    def: &'static TableDef,
    /// Stored rows, surrogate id first when the table has one
    rows: Vec<Vec<FieldValue>>,
    keys: HashSet<FieldValue>,
    next_id: i64,
}

/// In-memory store for dry runs and tests.
///
/// Enforces the same NOT NULL, length, primary key and foreign key rules as
/// the SQLite store so both fail on the same input.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<&'static str, MemTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows written to `table`, in insert order
    pub fn rows(&self, table: &str) -> &[Vec<FieldValue>] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    fn integrity(table: &TableDef, row: Option<usize>, message: String) -> EtlError {
        EtlError::LoadIntegrity {
            table: table.name.to_string(),
            row,
            message,
        }
    }

    /// Check a whole batch before anything is written
    fn validate(&self, table: &TableDef, rows: &[Vec<FieldValue>]) -> Result<()> {
        let target = self
            .tables
            .get(table.name)
            .ok_or_else(|| Self::integrity(table, None, "no such table".to_string()))?;
        let key_pos = table.key_position();
        let mut batch_keys = HashSet::new();

        for (idx, row) in rows.iter().enumerate() {
            table
                .check_row(row)
                .map_err(|e| Self::integrity(table, Some(idx), e))?;

            if let Some(pos) = key_pos {
                let key = &row[pos];
                if target.keys.contains(key) || !batch_keys.insert(key) {
                    return Err(Self::integrity(
                        table,
                        Some(idx),
                        format!("duplicate primary key {key:?}"),
                    ));
                }
            }

            for (column, value) in table.insert_columns().zip(row) {
                let Some((ref_table, _)) = column.references else {
                    continue;
                };
                if *value == FieldValue::Null {
                    continue;
                }
                let found = self
                    .tables
                    .get(ref_table)
                    .is_some_and(|t| t.keys.contains(value));
                if !found {
                    return Err(Self::integrity(
                        table,
                        Some(idx),
                        format!("{} {value:?} has no match in {ref_table}", column.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn create_schema(&mut self) -> Result<()> {
        for def in ALL_TABLES {
            self.tables.entry(def.name).or_insert_with(|| MemTable {
                def,
                rows: Vec::new(),
                keys: HashSet::new(),
                next_id: 1,
            });
        }
        Ok(())
    }

    fn append(&mut self, table: &TableDef, rows: &[Vec<FieldValue>]) -> Result<usize> {
        self.validate(table, rows)?;

        let target = self
            .tables
            .get_mut(table.name)
            .ok_or_else(|| Self::integrity(table, None, "no such table".to_string()))?;
        let surrogate = target.def.columns.iter().any(|c| c.auto_increment);
        let key_pos = target.def.key_position();

        for row in rows {
            if let Some(pos) = key_pos {
                target.keys.insert(row[pos].clone());
            }
            let mut stored = Vec::with_capacity(row.len() + 1);
            if surrogate {
                stored.push(FieldValue::Integer(target.next_id));
                target.next_id += 1;
            }
            stored.extend(row.iter().cloned());
            target.rows.push(stored);
        }

        debug!("Appended {} rows to in-memory {}", rows.len(), table.name);
        Ok(rows.len())
    }
}
