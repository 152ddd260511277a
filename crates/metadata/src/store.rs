//! Metadata store trait and SQLite implementation.

use crate::error::MetadataResult;
use crate::models::{AssetCacheRow, SnapshotRow};
use crate::repos::{AssetCacheRepo, SnapshotLogRepo};
use async_trait::async_trait;
use phono_core::{AssetKey, BlobRef, MessageSeq};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: AssetCacheRepo + SnapshotLogRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and migrate the schema.
    ///
    /// WAL keeps the main file in a consistent, independently-readable
    /// state, which is what lets the backup routine copy it without an
    /// exclusive lock.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures when cache
            // traffic and the snapshot cycle overlap.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), "metadata store opened");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetCacheRepo for SqliteStore {
    async fn get_cache_entry(&self, key: &AssetKey) -> MetadataResult<Option<AssetCacheRow>> {
        let row = sqlx::query_as::<_, AssetCacheRow>(
            "SELECT * FROM asset_cache WHERE asset_id = ? AND format = ? AND quality = ?",
        )
        .bind(&key.asset_id)
        .bind(key.format.as_str())
        .bind(&key.quality)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_cache_entry(
        &self,
        key: &AssetKey,
        blob_ref: &BlobRef,
        created_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO asset_cache (asset_id, format, quality, blob_ref, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (asset_id, format, quality)
            DO UPDATE SET blob_ref = excluded.blob_ref, created_at = excluded.created_at
            "#,
        )
        .bind(&key.asset_id)
        .bind(key.format.as_str())
        .bind(&key.quality)
        .bind(blob_ref.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_cache_entry(&self, key: &AssetKey) -> MetadataResult<bool> {
        let result = sqlx::query(
            "DELETE FROM asset_cache WHERE asset_id = ? AND format = ? AND quality = ?",
        )
        .bind(&key.asset_id)
        .bind(key.format.as_str())
        .bind(&key.quality)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SnapshotLogRepo for SqliteStore {
    async fn append_snapshot(&self, record: &SnapshotRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshot_log (sequence_number, blob_ref, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (sequence_number) DO NOTHING
            "#,
        )
        .bind(record.sequence_number)
        .bind(&record.blob_ref)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_snapshots_by_age(&self) -> MetadataResult<Vec<SnapshotRow>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT * FROM snapshot_log ORDER BY created_at ASC, sequence_number ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn remove_snapshot(&self, sequence_number: MessageSeq) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM snapshot_log WHERE sequence_number = ?")
            .bind(sequence_number)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const SCHEMA_SQL: &str = r#"
-- Per-variant media cache: one live row per fully qualified asset key.
CREATE TABLE IF NOT EXISTS asset_cache (
    asset_id TEXT NOT NULL,
    format TEXT NOT NULL,
    quality TEXT NOT NULL,
    blob_ref TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (asset_id, format, quality)
);
CREATE INDEX IF NOT EXISTS idx_asset_cache_created ON asset_cache(created_at);

-- Snapshots known to live in the channel. Rows leave this table only
-- after the remote message is confirmed gone.
CREATE TABLE IF NOT EXISTS snapshot_log (
    sequence_number INTEGER PRIMARY KEY,
    blob_ref TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshot_log_created ON snapshot_log(created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use phono_core::EncodingFormat;
    use tempfile::tempdir;

    async fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("phono.db")).await.unwrap();
        (temp, store)
    }

    fn key(asset_id: &str, quality: &str) -> AssetKey {
        AssetKey::new(asset_id, EncodingFormat::Lossy, quality)
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let (_temp, store) = open_store().await;
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn cache_upsert_overwrites_same_key() {
        let (_temp, store) = open_store().await;
        let k = key("t1", "192");
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let t1 = t0 + time::Duration::hours(1);

        store
            .upsert_cache_entry(&k, &BlobRef::new("refA"), t0)
            .await
            .unwrap();
        store
            .upsert_cache_entry(&k, &BlobRef::new("refB"), t1)
            .await
            .unwrap();

        let row = store.get_cache_entry(&k).await.unwrap().unwrap();
        assert_eq!(row.blob_ref, "refB");
        assert_eq!(row.created_at, t1);

        // Distinct qualities are distinct keys.
        store
            .upsert_cache_entry(&key("t1", "320"), &BlobRef::new("refC"), t1)
            .await
            .unwrap();
        assert_eq!(
            store.get_cache_entry(&k).await.unwrap().unwrap().blob_ref,
            "refB"
        );
    }

    #[tokio::test]
    async fn cache_delete_reports_whether_row_existed() {
        let (_temp, store) = open_store().await;
        let k = key("t2", "192");
        assert!(!store.delete_cache_entry(&k).await.unwrap());

        store
            .upsert_cache_entry(&k, &BlobRef::new("refA"), OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert!(store.delete_cache_entry(&k).await.unwrap());
        assert!(store.get_cache_entry(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_log_orders_oldest_first() {
        let (_temp, store) = open_store().await;
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();

        for (seq, offset_secs) in [(15, 60), (10, 0), (20, 120)] {
            store
                .append_snapshot(&SnapshotRow {
                    sequence_number: seq,
                    blob_ref: format!("ref-{seq}"),
                    created_at: t0 + time::Duration::seconds(offset_secs),
                })
                .await
                .unwrap();
        }

        let rows = store.list_snapshots_by_age().await.unwrap();
        let seqs: Vec<_> = rows.iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![10, 15, 20]);
    }

    #[tokio::test]
    async fn snapshot_remove_is_safe_to_repeat() {
        let (_temp, store) = open_store().await;
        store
            .append_snapshot(&SnapshotRow {
                sequence_number: 10,
                blob_ref: "ref-10".to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        assert!(store.remove_snapshot(10).await.unwrap());
        assert!(!store.remove_snapshot(10).await.unwrap());
        assert!(store.list_snapshots_by_age().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_append_ignores_replayed_sequence() {
        // A crash between upload and append can be replayed by a manual
        // trigger; the log must not error on the duplicate.
        let (_temp, store) = open_store().await;
        let row = SnapshotRow {
            sequence_number: 7,
            blob_ref: "ref-7".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        store.append_snapshot(&row).await.unwrap();
        store.append_snapshot(&row).await.unwrap();
        assert_eq!(store.list_snapshots_by_age().await.unwrap().len(), 1);
    }
}
