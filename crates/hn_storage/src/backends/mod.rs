pub mod memory;

#[cfg(feature = "chroma")]
pub mod chroma;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStorage;

#[cfg(feature = "chroma")]
pub use chroma::{ChromaConfig, ChromaStorage};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;
