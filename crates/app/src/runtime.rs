//! Runtime assembly: build every pipeline stage and hand back a handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use voxdub_foundation::{real_clock, AppError};
use voxdub_playback::{
    AudioOutput, PlaybackConfig, PlaybackHandle, PlaybackQueue, PlaybackState, RodioOutput,
};
use voxdub_telemetry::PipelineMetrics;
use voxdub_transcript::TranscriptBus;
use voxdub_translate::{
    GoogleWebProvider, OllamaProvider, Resolver, ResolverOptions, TranslationProvider,
};
use voxdub_tts::{CartesiaProvider, GeminiProvider, Synthesizer, TtsProvider};

use crate::config::{AppConfig, SessionConfig, TranslateSettings, TtsSettings};
use crate::session::{DubbingSession, DubbingSessionOptions, SessionIdentity};
use crate::store::{spawn_store_writer, RestStore};

/// Options for starting the VoxDub runtime.
pub struct AppRuntimeOptions {
    pub config: AppConfig,
    /// Replaces the real audio device; used by tests to run the
    /// pipeline without a sound card.
    pub audio_output: Option<Arc<dyn AudioOutput>>,
}

impl AppRuntimeOptions {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            audio_output: None,
        }
    }
}

/// Handle to the running dubbing pipeline.
pub struct AppHandle {
    pub metrics: PipelineMetrics,
    bus: TranscriptBus,
    session_config: Arc<RwLock<SessionConfig>>,
    status_rx: watch::Receiver<String>,
    playback: PlaybackHandle,
    session_handle: JoinHandle<()>,
    playback_handle: JoinHandle<()>,
    store_handle: Option<JoinHandle<()>>,
}

impl AppHandle {
    /// The bus call events are published into.
    pub fn bus(&self) -> TranscriptBus {
        self.bus.clone()
    }

    /// Live session settings; writes take effect on the next event.
    pub fn session_config(&self) -> Arc<RwLock<SessionConfig>> {
        Arc::clone(&self.session_config)
    }

    /// Watchable human-readable pipeline status.
    pub fn status(&self) -> watch::Receiver<String> {
        self.status_rx.clone()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Points playback at a different output device for clips that
    /// have not started yet.
    pub async fn set_output_device(&self, device: Option<String>) {
        self.session_config.write().output_device_id = device.clone();
        if let Err(e) = self.playback.set_output_device(device).await {
            tracing::warn!(target: "runtime", error = %e, "failed to update output device");
        }
    }

    /// Gracefully stop the pipeline and wait for shutdown.
    pub async fn shutdown(self) {
        info!("Shutting down VoxDub runtime...");

        // Stop taking new events first.
        self.session_handle.abort();
        let _ = self.session_handle.await;

        // Close playback; the clip in flight finishes, buffered clips
        // are released unplayed.
        let _ = self.playback.close().await;
        let _ = self.playback_handle.await;

        // The store writer exits once every record sender is gone and
        // the backlog is written out.
        if let Some(handle) = self.store_handle {
            let _ = handle.await;
        }

        info!("VoxDub runtime shutdown complete");
    }
}

/// Start the VoxDub pipeline with the given options.
pub async fn start(options: AppRuntimeOptions) -> Result<AppHandle, AppError> {
    let config = options.config;
    let metrics = PipelineMetrics::new();

    // 1) Transcript feed
    let bus = TranscriptBus::new();
    let subscription = bus.subscribe();

    // 2) Translation resolver
    let resolver = Arc::new(build_resolver(&config.translate, metrics.clone())?);

    // 3) Speech synthesis
    let synthesizer = Arc::new(build_synthesizer(&config.tts, metrics.clone())?);

    // 4) Playback queue
    let output: Arc<dyn AudioOutput> = match options.audio_output {
        Some(output) => output,
        None => Arc::new(RodioOutput::spawn().map_err(|e| AppError::Runtime(e.to_string()))?),
    };
    let playback_config = PlaybackConfig {
        inter_clip_gap: Duration::from_millis(config.playback.inter_clip_gap_ms),
        output_device: config.session.output_device_id.clone(),
        ..Default::default()
    };
    let (playback, playback_handle) =
        PlaybackQueue::spawn(output, playback_config, metrics.clone());

    // 5) Segment store (optional)
    let (record_tx, store_handle) = match &config.store.base_url {
        Some(base_url) => {
            let api_key = require_env("VOXDUB_STORE_KEY")?;
            let store = Arc::new(RestStore::new(base_url, &config.store.table, api_key)?);
            let (tx, rx) = mpsc::channel(256);
            let handle = spawn_store_writer(rx, store, metrics.clone());
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    // 6) Session controller
    let session_config = Arc::new(RwLock::new(config.session.clone()));
    let (session, status_rx) = DubbingSession::new(DubbingSessionOptions {
        subscription,
        config: Arc::clone(&session_config),
        identity: SessionIdentity {
            user_id: config.user_id.clone(),
            meeting_id: config.meeting_id.clone(),
        },
        resolver,
        synthesizer,
        playback: playback.clone(),
        records: record_tx,
        metrics: metrics.clone(),
    });
    let session_handle = session.spawn();

    info!(
        translate = %config.translate.primary,
        tts = %config.tts.provider,
        persistence = config.store.base_url.is_some(),
        "VoxDub pipeline started"
    );

    Ok(AppHandle {
        metrics,
        bus,
        session_config,
        status_rx,
        playback,
        session_handle,
        playback_handle,
        store_handle,
    })
}

fn build_resolver(
    settings: &TranslateSettings,
    metrics: PipelineMetrics,
) -> Result<Resolver, AppError> {
    let google = || -> Result<Arc<dyn TranslationProvider>, AppError> {
        Ok(Arc::new(GoogleWebProvider::new().map_err(config_error)?))
    };

    let (primary, fallback): (
        Arc<dyn TranslationProvider>,
        Option<Arc<dyn TranslationProvider>>,
    ) = match settings.primary.as_str() {
        "ollama" => {
            let fallback = if settings.google_fallback {
                Some(google()?)
            } else {
                None
            };
            match std::env::var("OLLAMA_API_KEY").ok().filter(|k| !k.is_empty()) {
                Some(key) => {
                    let provider = OllamaProvider::new(
                        key,
                        &settings.ollama.base_url,
                        settings.ollama.model.clone(),
                    )
                    .map_err(config_error)?;
                    (Arc::new(provider), fallback)
                }
                None => match fallback {
                    Some(provider) => {
                        tracing::warn!(
                            target: "runtime",
                            "OLLAMA_API_KEY is not set, translating with google-free only"
                        );
                        (provider, None)
                    }
                    None => {
                        return Err(AppError::Config(
                            "OLLAMA_API_KEY is not set and the google fallback is disabled".into(),
                        ))
                    }
                },
            }
        }
        "google-free" => (google()?, None),
        other => {
            return Err(AppError::Config(format!(
                "unknown translation provider '{other}' (expected 'ollama' or 'google-free')"
            )))
        }
    };

    Ok(Resolver::new(ResolverOptions {
        primary,
        fallback,
        cache_capacity: settings.cache_capacity,
        rate_limit_max: settings.rate_limit_max,
        rate_limit_window: Duration::from_secs(settings.rate_limit_window_secs),
        request_timeout: Duration::from_secs(settings.request_timeout_secs),
        clock: real_clock(),
        metrics,
    }))
}

fn build_synthesizer(
    settings: &TtsSettings,
    metrics: PipelineMetrics,
) -> Result<Synthesizer, AppError> {
    let provider: Arc<dyn TtsProvider> = match settings.provider.as_str() {
        "cartesia" => {
            let key = require_env("CARTESIA_API_KEY")?;
            Arc::new(
                CartesiaProvider::new(
                    key,
                    settings.cartesia.model_id.clone(),
                    settings.cartesia.voice_id.clone(),
                )
                .map_err(config_error)?,
            )
        }
        "gemini" => {
            let key = require_env("GEMINI_API_KEY")?;
            Arc::new(
                GeminiProvider::new(key, &settings.gemini.model, settings.gemini.voice.clone())
                    .map_err(config_error)?,
            )
        }
        other => {
            return Err(AppError::Config(format!(
                "unknown tts provider '{other}' (expected 'cartesia' or 'gemini')"
            )))
        }
    };
    Ok(Synthesizer::new(
        provider,
        Duration::from_secs(settings.request_timeout_secs),
        metrics,
    ))
}

fn require_env(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{name} is not set")))
}

fn config_error(e: impl std::fmt::Display) -> AppError {
    AppError::Config(e.to_string())
}
