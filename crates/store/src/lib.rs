//! `bursary-store`: SQLite persistence for the claim engine.

pub mod audit;
pub mod sqlite;

pub use audit::DatabaseSink;
pub use sqlite::SqliteStore;
