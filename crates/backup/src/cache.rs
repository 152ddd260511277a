//! Asset cache policy layer.
//!
//! Maps a logical asset key to a blob reference in the channel, with
//! age-based expiry evaluated lazily at read time. No background
//! sweeper: lazy expiry keeps the cache correct even if the process
//! restarts mid-TTL.

use crate::error::BackupResult;
use phono_core::config::CacheConfig;
use phono_core::{AssetKey, BlobRef};
use phono_metadata::{AssetCacheRepo, MetadataStore};
use std::sync::Arc;
use time::OffsetDateTime;

/// TTL-enforcing view over the `asset_cache` table.
///
/// Every failure on the read path converts to a miss; a miss is always
/// a valid, silent outcome that sends the caller back to the production
/// pipeline, never an error surfaced to the request that triggered the
/// lookup.
pub struct AssetCache {
    metadata: Arc<dyn MetadataStore>,
    ttl: time::Duration,
}

impl AssetCache {
    pub fn new(metadata: Arc<dyn MetadataStore>, config: &CacheConfig) -> Self {
        Self {
            metadata,
            ttl: config.ttl(),
        }
    }

    /// Look up a cached reference. Returns `None` when absent, expired,
    /// or unreadable. An expired entry is evicted best-effort; eviction
    /// failure still reports a miss.
    pub async fn get(&self, key: &AssetKey) -> Option<BlobRef> {
        self.get_at(key, OffsetDateTime::now_utc()).await
    }

    /// Upsert the reference for a key. A prior entry's remote blob is
    /// not deleted; keys are fully qualified by format and quality, so
    /// stale remote blobs are acceptable garbage. Two concurrent puts
    /// for the same key are both fine: last write wins and the value is
    /// idempotently re-derivable.
    pub async fn put(&self, key: &AssetKey, blob_ref: &BlobRef) -> BackupResult<()> {
        self.metadata
            .upsert_cache_entry(key, blob_ref, OffsetDateTime::now_utc())
            .await?;
        tracing::debug!(key = %key, blob_ref = %blob_ref, "asset cached");
        Ok(())
    }

    async fn get_at(&self, key: &AssetKey, now: OffsetDateTime) -> Option<BlobRef> {
        let row = match self.metadata.get_cache_entry(key).await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed, treating as miss");
                return None;
            }
        };

        if now - row.created_at > self.ttl {
            match self.metadata.delete_cache_entry(key).await {
                Ok(_) => tracing::debug!(key = %key, "expired cache entry evicted"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to evict expired cache entry")
                }
            }
            return None;
        }

        Some(row.blob_ref())
    }
}
