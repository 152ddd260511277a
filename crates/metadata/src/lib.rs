//! Embedded metadata store for the phono storage core.
//!
//! This crate owns the two tables of the blob-cache/backup subsystem:
//! - `asset_cache`: logical asset key -> blob reference, with creation
//!   timestamps for TTL-based invalidation
//! - `snapshot_log`: which channel sequence numbers are known database
//!   snapshots, so retention cleanup survives restarts
//!
//! The snapshot log deliberately lives inside the database it backs up:
//! a restored database carries its own cleanup history.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{AssetCacheRow, SnapshotRow};
pub use repos::{AssetCacheRepo, SnapshotLogRepo};
pub use store::{MetadataStore, SqliteStore};

use phono_core::config::DatabaseConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &DatabaseConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = SqliteStore::new(&config.path).await?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
