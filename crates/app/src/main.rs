use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use voxdub_app::config::AppConfig;
use voxdub_app::runtime::{self, AppRuntimeOptions};
use voxdub_foundation::{LanguageTag, ShutdownHandler};

#[derive(Parser, Debug)]
#[command(name = "voxdub", about = "Live dubbing for call transcripts", version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "VOXDUB_CONFIG")]
    config: Option<PathBuf>,

    /// Dub only this speaker's segments
    #[arg(long, env = "VOXDUB_SPEAKER")]
    speaker: Option<String>,

    /// Language to dub into, e.g. "en" ("off" disables dubbing)
    #[arg(long, env = "VOXDUB_TARGET_LANG")]
    target_lang: Option<String>,

    /// Playback device name (system default when omitted)
    #[arg(long, env = "VOXDUB_OUTPUT_DEVICE")]
    output_device: Option<String>,

    /// Enable dubbing at startup
    #[arg(long)]
    enable: bool,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "voxdub.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    let cli = Cli::parse();
    tracing::info!("Starting VoxDub");

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .map_err(|e| anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(speaker) = cli.speaker {
        config.session.target_speaker_id = Some(speaker);
    }
    if let Some(lang) = cli.target_lang {
        config.session.target_language = LanguageTag::new(&lang);
    }
    if let Some(device) = cli.output_device {
        config.session.output_device_id = Some(device);
    }
    if cli.enable {
        config.session.translation_enabled = true;
    }

    let shutdown = ShutdownHandler::new().install().await;
    let handle = match runtime::start(AppRuntimeOptions::new(config)).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start pipeline: {}", e);
            return Err(anyhow!(e).into());
        }
    };
    let mut status = handle.status();

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = stats_interval.tick() => {
                let s = handle.metrics.snapshot();
                tracing::info!(
                    events_seen = s.events_seen,
                    events_gated = s.events_gated,
                    translations = s.translate_requests,
                    cache_hits = s.translate_cache_hits,
                    fallbacks = s.translate_fallbacks,
                    clips_played = s.clips_played,
                    clips_failed = s.clips_failed,
                    queue_depth = s.queue_depth,
                    persisted = s.persist_writes,
                    "pipeline stats"
                );
            }
            changed = status.changed() => {
                if changed.is_err() {
                    tracing::debug!("status feed ended");
                    break;
                }
                let message = status.borrow_and_update().clone();
                tracing::info!(target: "session", status = %message, "status changed");
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
