pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{MemoryConfig, MemoryStorage};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
