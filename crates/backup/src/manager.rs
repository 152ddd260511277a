//! Backup/restore orchestration.
//!
//! Four operations over one channel and one snapshot log: restore at
//! startup, periodic snapshot upload, pin maintenance, and retention
//! cleanup. Every failure is non-fatal: restore falls back to a fresh
//! schema, a failed snapshot waits for the next tick, and a failed
//! cleanup retries after the next successful snapshot.

use crate::error::BackupResult;
use bytes::Bytes;
use phono_channel::{ChannelStore, UploadMeta};
use phono_core::config::BackupConfig;
use phono_core::{ContentTag, MessageSeq};
use phono_metadata::{MetadataStore, SnapshotLogRepo, SnapshotRow};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;

/// What the startup restore decided.
#[derive(Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Local file is plausibly non-empty; local state wins over remote.
    LocalHealthy { size: u64 },
    /// The pinned snapshot was downloaded and moved into place.
    Restored { seq: MessageSeq, size: u64 },
    /// No usable snapshot; normal initialization creates a fresh schema.
    FreshSchema,
}

/// What one snapshot cycle did.
#[derive(Debug, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Uploaded, pinned, logged and cleaned up.
    Uploaded { seq: MessageSeq, size: u64 },
    /// Nothing to back up this cycle.
    SkippedMissingFile,
    /// Another run holds the guard; this tick is dropped, not queued.
    SkippedAlreadyRunning,
}

/// Orchestrates snapshot upload, pin maintenance and retention cleanup.
///
/// Snapshot execution is serialized with an in-process mutex, not by
/// convention: the timer-driven cycle and manual triggers share the
/// same guard.
pub struct BackupManager {
    channel: Arc<dyn ChannelStore>,
    metadata: Arc<dyn MetadataStore>,
    db_path: PathBuf,
    config: BackupConfig,
    run_lock: Mutex<()>,
}

impl BackupManager {
    pub fn new(
        channel: Arc<dyn ChannelStore>,
        metadata: Arc<dyn MetadataStore>,
        db_path: impl Into<PathBuf>,
        config: BackupConfig,
    ) -> Self {
        Self {
            channel,
            metadata,
            db_path: db_path.into(),
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Startup restore decision. Runs before the embedded database
    /// opens; the database must not open against a half-restored file.
    ///
    /// Never fails: any problem along the way logs and falls through to
    /// fresh-schema initialization.
    pub async fn restore(
        channel: &dyn ChannelStore,
        db_path: &Path,
        config: &BackupConfig,
    ) -> RestoreOutcome {
        match tokio::fs::metadata(db_path).await {
            Ok(meta) if meta.len() >= config.min_restore_bytes => {
                tracing::info!(
                    path = %db_path.display(),
                    size = meta.len(),
                    "local database looks healthy, skipping restore"
                );
                return RestoreOutcome::LocalHealthy { size: meta.len() };
            }
            Ok(meta) => {
                tracing::info!(
                    size = meta.len(),
                    threshold = config.min_restore_bytes,
                    "local database below size threshold, attempting restore"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %db_path.display(), "no local database, attempting restore");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not inspect local database, attempting restore");
            }
        }

        let pin = match channel.get_pinned().await {
            Ok(Some(pin)) => pin,
            Ok(None) => {
                tracing::info!("no pinned message in channel, starting with a fresh schema");
                return RestoreOutcome::FreshSchema;
            }
            Err(e) => {
                tracing::warn!(error = %e, "pin lookup failed, starting with a fresh schema");
                return RestoreOutcome::FreshSchema;
            }
        };

        // A pin can legitimately be an unrelated item; only a declared
        // database snapshot is ever loaded.
        let Some(blob_ref) = pin.snapshot_ref() else {
            tracing::info!(
                seq = pin.seq,
                filename = pin.filename.as_deref().unwrap_or(""),
                "pinned message is not a database snapshot, starting with a fresh schema"
            );
            return RestoreOutcome::FreshSchema;
        };

        let bytes = match channel.fetch(blob_ref).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot download failed, starting with a fresh schema");
                return RestoreOutcome::FreshSchema;
            }
        };

        match install_snapshot(db_path, &bytes).await {
            Ok(()) => {
                tracing::info!(
                    seq = pin.seq,
                    size = bytes.len(),
                    path = %db_path.display(),
                    "database restored from pinned snapshot"
                );
                RestoreOutcome::Restored {
                    seq: pin.seq,
                    size: bytes.len() as u64,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install snapshot, starting with a fresh schema");
                RestoreOutcome::FreshSchema
            }
        }
    }

    /// Run one snapshot cycle: upload the database file, move the pin,
    /// append to the snapshot log, then prune old snapshots.
    ///
    /// Serialized by the run guard; a cycle arriving while another is
    /// in flight is skipped. Serves both the periodic scheduler and
    /// manual triggers.
    pub async fn snapshot_now(&self) -> BackupResult<SnapshotOutcome> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::debug!("snapshot already in progress, skipping");
            return Ok(SnapshotOutcome::SkippedAlreadyRunning);
        };

        // Best-effort point-in-time copy; WAL keeps the main file in a
        // consistently readable state without an exclusive lock.
        let data = match tokio::fs::read(&self.db_path).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.db_path.display(),
                    "database file missing, skipping snapshot cycle"
                );
                return Ok(SnapshotOutcome::SkippedMissingFile);
            }
            Err(e) => return Err(e.into()),
        };

        let now = OffsetDateTime::now_utc();
        let caption = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let meta = UploadMeta::new(self.config.snapshot_filename.clone(), ContentTag::DbSnapshot)
            .with_caption(caption);

        let size = data.len() as u64;
        let stored = self.channel.upload(data, &meta).await?;
        tracing::info!(seq = stored.seq, size, "database snapshot uploaded");

        // Pin happens-after upload; the log append happens-after the
        // pin. A crash in between leaves the pin ahead of the log,
        // which only costs one unpruned message.
        self.channel.set_pinned(stored.seq).await?;

        self.metadata
            .append_snapshot(&SnapshotRow {
                sequence_number: stored.seq,
                blob_ref: stored.blob_ref.to_string(),
                created_at: now,
            })
            .await?;

        self.cleanup().await;

        Ok(SnapshotOutcome::Uploaded {
            seq: stored.seq,
            size,
        })
    }

    /// Prune snapshots beyond the retention window, oldest first.
    ///
    /// Deletes only sequence numbers read from the snapshot log, never
    /// probed or guessed, so cached media and unrelated channel content
    /// are untouchable by construction. Per-item failures are logged
    /// and skipped; the log row stays so the next cycle retries.
    async fn cleanup(&self) {
        let rows = match self.metadata.list_snapshots_by_age().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "cleanup skipped, snapshot log unreadable");
                return;
            }
        };

        if rows.len() <= self.config.retain_count {
            return;
        }

        let excess = rows.len() - self.config.retain_count;
        for row in rows.into_iter().take(excess) {
            let seq = row.sequence_number;
            match self.channel.delete(seq).await {
                Ok(confirmed) => {
                    if !confirmed {
                        tracing::debug!(seq, "old snapshot already absent in channel");
                    }
                    // Gone either way; forget it so the retention
                    // invariant holds.
                    match self.metadata.remove_snapshot(seq).await {
                        Ok(_) => tracing::info!(seq, "old snapshot pruned"),
                        Err(e) => {
                            tracing::warn!(seq, error = %e, "snapshot deleted remotely but log row remains")
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(seq, error = %e, "failed to delete old snapshot, will retry next cycle");
                }
            }
        }
    }
}

/// Write snapshot bytes next to the target and atomically rename into
/// place, with permissions the database engine can open for read/write.
async fn install_snapshot(db_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            parent.to_path_buf()
        }
        _ => PathBuf::from("."),
    };

    let file_name = db_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp_path = parent.join(format!("{file_name}.restore"));

    let install = async {
        tokio::fs::write(&tmp_path, bytes).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o644)).await?;
        }
        tokio::fs::rename(&tmp_path, db_path).await
    };

    match install.await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            Err(e)
        }
    }
}
