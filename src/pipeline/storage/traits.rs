use super::schema::{FieldValue, TableDef};
use crate::error::Result;

/// Persistence boundary for the load stage.
///
/// Stores are append-only: there is no read-back, update or delete path.
pub trait Store {
    /// Create every output table if it does not already exist
    fn create_schema(&mut self) -> Result<()>;

    /// Append a batch of rows to `table` as one unit; either every row is
    /// written or none is. Rows follow `table.insert_columns()` order.
    fn append(&mut self, table: &TableDef, rows: &[Vec<FieldValue>]) -> Result<usize>;
}
