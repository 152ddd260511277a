//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Channel store client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Base URL of the chat-store HTTP API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API token for the bot account that owns the storage channel.
    pub token: String,
    /// Identifier of the storage channel (one pinned slot per channel).
    pub channel_id: String,
    /// Per-request timeout in seconds, distinct from the snapshot interval.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ChannelConfig {
    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate channel configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("channel.token must not be empty".to_string());
        }
        if self.channel_id.is_empty() {
            return Err("channel.channel_id must not be empty".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("channel.request_timeout_secs must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Embedded database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file. This is the file the backup
    /// subsystem snapshots and restores.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/phono.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Snapshot backup configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Seconds between periodic snapshot uploads.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Number of most recent snapshots kept in the channel; older ones
    /// are deleted during cleanup.
    #[serde(default = "default_retain_count")]
    pub retain_count: usize,
    /// Local database files at or above this size are trusted over any
    /// remote snapshot; smaller files trigger a restore attempt.
    /// Hand-tuned default, not an invariant.
    #[serde(default = "default_min_restore_bytes")]
    pub min_restore_bytes: u64,
    /// Filename declared on snapshot uploads.
    #[serde(default = "default_snapshot_filename")]
    pub snapshot_filename: String,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_retain_count() -> usize {
    crate::DEFAULT_RETAIN_COUNT
}

fn default_min_restore_bytes() -> u64 {
    crate::DEFAULT_MIN_RESTORE_BYTES
}

fn default_snapshot_filename() -> String {
    "phono.db".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retain_count: default_retain_count(),
            min_restore_bytes: default_min_restore_bytes(),
            snapshot_filename: default_snapshot_filename(),
        }
    }
}

impl BackupConfig {
    /// Get the snapshot interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate backup configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("backup.interval_secs must be >= 1".to_string());
        }
        if self.retain_count == 0 {
            return Err(
                "backup.retain_count must be >= 1; retaining zero snapshots would delete \
                 the pinned snapshot immediately after upload"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Asset cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Days before a cache entry is treated as stale and evicted on read.
    /// Hand-tuned default, not an invariant.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u64,
}

fn default_ttl_days() -> u64 {
    crate::DEFAULT_CACHE_TTL_DAYS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
        }
    }
}

impl CacheConfig {
    /// Get the TTL as a time-crate Duration (signed, for timestamp math).
    pub fn ttl(&self) -> time::Duration {
        let days = i64::try_from(self.ttl_days).unwrap_or(i64::MAX / 86_400);
        time::Duration::days(days)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Channel store client configuration (required).
    pub channel: ChannelConfig,
    /// Embedded database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Snapshot backup configuration.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Asset cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Validate the whole configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.channel.validate()?;
        self.backup.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_defaults() {
        let config = BackupConfig::default();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.retain_count, 2);
        assert_eq!(config.min_restore_bytes, 32 * 1024);
    }

    #[test]
    fn cache_ttl_defaults_to_seven_days() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.ttl(), time::Duration::days(7));
    }

    #[test]
    fn backup_rejects_zero_retention() {
        let config = BackupConfig {
            retain_count: 0,
            ..BackupConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn app_config_deserialize_minimal() {
        let config: AppConfig =
            serde_json::from_str(r#"{"channel": {"token": "123:abc", "channel_id": "-100123"}}"#)
                .unwrap();
        assert_eq!(config.channel.base_url, "https://api.telegram.org");
        assert_eq!(config.backup.interval_secs, 300);
        config.validate().unwrap();
    }

    #[test]
    fn app_config_rejects_empty_token() {
        let config: AppConfig =
            serde_json::from_str(r#"{"channel": {"token": "", "channel_id": "-100123"}}"#).unwrap();
        assert!(config.validate().is_err());
    }
}
