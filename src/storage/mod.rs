pub mod queries;
pub mod sqlite;

pub use sqlite::SqliteStorage;
