//! phonod - storage daemon for the phono media bot.
//!
//! Startup order matters: the restore decision runs before the
//! metadata store opens, so the database never opens against a
//! half-restored file.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use phono_backup::{BackupManager, scheduler};
use phono_core::config::AppConfig;
use phono_metadata::MetadataStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// phono - personal media bot storage core
#[derive(Parser, Debug)]
#[command(name = "phonod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PHONO_CONFIG",
        default_value = "config/phonod.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("phonod v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("PHONO_") && key != "PHONO_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: phonod --config /path/to/phonod.toml\n  \
             2. Environment variables: PHONO_CHANNEL__TOKEN=123:abc \
             PHONO_CHANNEL__CHANNEL_ID=-1001234 phonod\n\n\
             See config/phonod.example.toml for example configuration."
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PHONO_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().map_err(anyhow::Error::msg)?;

    // Initialize the channel store client
    let channel = phono_channel::from_config(&config.channel)
        .context("failed to initialize channel store")?;
    tracing::info!(channel_id = %config.channel.channel_id, "Channel store initialized");

    // Phase 1: restore decision. Never fatal; any failure falls through
    // to fresh-schema initialization.
    let outcome =
        BackupManager::restore(channel.as_ref(), &config.database.path, &config.backup).await;
    tracing::info!(outcome = ?outcome, "Restore phase complete");

    // Phase 2: open the metadata store. This is the one startup step
    // that is allowed to abort the process.
    let metadata = phono_metadata::from_config(&config.database)
        .await
        .context("failed to open metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!(path = %config.database.path.display(), "Metadata store initialized");

    // Phase 3: periodic snapshots.
    let manager = Arc::new(BackupManager::new(
        channel,
        metadata,
        &config.database.path,
        config.backup.clone(),
    ));
    let shutdown = CancellationToken::new();
    let scheduler_handle = scheduler::spawn(manager, config.backup.interval(), shutdown.clone());
    tracing::info!(
        interval_secs = config.backup.interval_secs,
        retain_count = config.backup.retain_count,
        "Periodic database backup started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    // The scheduler exits at its next wake-up; an in-flight snapshot
    // upload is not force-cancelled.
    shutdown.cancel();
    scheduler_handle
        .await
        .context("snapshot scheduler panicked")?;

    tracing::info!("phonod stopped");
    Ok(())
}
