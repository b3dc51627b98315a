//! Application configuration: a TOML file with CLI/env overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use voxdub_foundation::{AppError, LanguageTag};

/// Dubbing knobs that can change while a session is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dub only this speaker's segments; `None` dubs every speaker.
    pub target_speaker_id: Option<String>,
    /// Master switch for the translate-synthesize-play pipeline.
    pub translation_enabled: bool,
    /// Language to dub into. The `off` sentinel disables dubbing even
    /// when `translation_enabled` is set.
    pub target_language: LanguageTag,
    /// Language of the incoming transcript, `auto` to let the
    /// translator detect it.
    pub source_language: LanguageTag,
    /// Playback device name, `None` for the system default.
    pub output_device_id: Option<String>,
    /// Suppresses dubbing without tearing the session down.
    pub muted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_speaker_id: None,
            translation_enabled: false,
            target_language: LanguageTag::off(),
            source_language: LanguageTag::auto(),
            output_device_id: None,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        use voxdub_translate::providers::ollama;
        Self {
            base_url: ollama::DEFAULT_BASE_URL.to_string(),
            model: ollama::DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateSettings {
    /// Primary provider: "ollama" or "google-free".
    pub primary: String,
    /// Try the free Google endpoint when the primary fails.
    pub google_fallback: bool,
    pub cache_capacity: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub request_timeout_secs: u64,
    pub ollama: OllamaSettings,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            primary: "ollama".to_string(),
            google_fallback: true,
            cache_capacity: 256,
            rate_limit_max: 20,
            rate_limit_window_secs: 60,
            request_timeout_secs: 8,
            ollama: OllamaSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartesiaSettings {
    pub model_id: String,
    pub voice_id: String,
}

impl Default for CartesiaSettings {
    fn default() -> Self {
        use voxdub_tts::providers::cartesia;
        Self {
            model_id: cartesia::DEFAULT_MODEL_ID.to_string(),
            voice_id: cartesia::DEFAULT_VOICE_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub voice: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: voxdub_tts::providers::gemini::DEFAULT_MODEL.to_string(),
            voice: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Synthesis provider: "cartesia" or "gemini".
    pub provider: String,
    pub request_timeout_secs: u64,
    pub cartesia: CartesiaSettings,
    pub gemini: GeminiSettings,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: "cartesia".to_string(),
            request_timeout_secs: 12,
            cartesia: CartesiaSettings::default(),
            gemini: GeminiSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub inter_clip_gap_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            inter_clip_gap_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// PostgREST-style endpoint root. Persistence is off when unset.
    pub base_url: Option<String>,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            table: "transcript_segments".to_string(),
        }
    }
}

/// Everything the runtime needs to start, loadable from one TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Caller identity for rate limiting and persisted records.
    pub user_id: String,
    pub meeting_id: String,
    pub session: SessionConfig,
    pub translate: TranslateSettings,
    pub tts: TtsSettings,
    pub playback: PlaybackSettings,
    pub store: StoreSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| AppError::Config(format!("parse {}: {e}", path.display())))
    }
}
