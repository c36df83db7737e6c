pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{AppConfig, DedupConfig, LoggingConfig, ScoreWeights, StorageConfig};
pub use error::{AssetError, ExitCode, Result};
pub use models::*;

pub use storage::AssetStore;
pub use storage::database::{
    ConnectionPool, SqliteAssetStore, StoreStats, open_database, open_in_memory,
};
pub use storage::repositories::{
    AssetRepository, DependentRepository, InventoryRepository, Repository,
    SqliteAssetRepository, SqliteDependentRepository, SqliteInventoryRepository,
};
