//! Provider trait and the failure type providers report.

use std::time::Duration;

use async_trait::async_trait;
use voxdub_foundation::LanguageTag;

use crate::types::AudioPayload;

/// Why a single synthesis attempt failed.
///
/// Folded into [`crate::TtsError::Unavailable`] by the synthesizer;
/// callers never see these directly.
#[derive(Debug, thiserror::Error)]
pub enum SynthFailure {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider returned no audio")]
    NoAudio,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A backend capable of speaking text.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Short stable name used in logs.
    fn name(&self) -> &'static str;

    /// Synthesizes `text` into audio.
    ///
    /// `lang` steers spoken language on providers that support it and
    /// is ignored elsewhere. `voice` overrides the provider's default
    /// voice.
    async fn synthesize(
        &self,
        text: &str,
        lang: Option<&LanguageTag>,
        voice: Option<&str>,
    ) -> Result<AudioPayload, SynthFailure>;
}
