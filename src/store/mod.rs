// src/store/mod.rs
pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteStore;
