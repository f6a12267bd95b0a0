pub mod repository;

pub use repository::{HistoryRow, LinkNexusStorage, StorageConfig};
