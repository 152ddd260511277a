//! Asset cache repository trait.

use crate::error::MetadataResult;
use crate::models::AssetCacheRow;
use async_trait::async_trait;
use phono_core::{AssetKey, BlobRef};
use time::OffsetDateTime;

/// Repository for the `asset_cache` table.
///
/// Raw persistence only; the TTL policy lives above this layer.
#[async_trait]
pub trait AssetCacheRepo: Send + Sync {
    /// Look up the entry for a key.
    async fn get_cache_entry(&self, key: &AssetKey) -> MetadataResult<Option<AssetCacheRow>>;

    /// Insert or overwrite the entry for a key. The old remote blob is
    /// not touched; stale remote blobs are acceptable garbage.
    async fn upsert_cache_entry(
        &self,
        key: &AssetKey,
        blob_ref: &BlobRef,
        created_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Remove the entry for a key. Returns true iff a row was deleted.
    async fn delete_cache_entry(&self, key: &AssetKey) -> MetadataResult<bool>;
}
