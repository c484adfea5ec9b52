pub mod in_memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use in_memory::MemoryStore;
pub use schema::{FieldValue, TableDef, TableRow, ALL_TABLES, FAILS, METRICS, PROJECTS, USERS};
pub use sqlite::SqliteStore;
pub use traits::Store;
