//! Synthesizer: validation, timeout and payload checks over a provider.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use voxdub_telemetry::PipelineMetrics;

use crate::provider::{SynthFailure, TtsProvider};
use crate::types::{
    AudioClip, AudioHandle, ReleaseTracker, SynthesisRequest, TtsError, MAX_TEXT_CHARS,
    MIN_AUDIO_BYTES,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

/// Turns validated text into playable clips.
pub struct Synthesizer {
    provider: Arc<dyn TtsProvider>,
    request_timeout: Duration,
    tracker: Option<Arc<ReleaseTracker>>,
    metrics: PipelineMetrics,
}

impl Synthesizer {
    pub fn new(
        provider: Arc<dyn TtsProvider>,
        request_timeout: Duration,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            provider,
            request_timeout,
            tracker: None,
            metrics,
        }
    }

    /// Registers every produced clip with `tracker` so release
    /// accounting can be audited.
    pub fn with_release_tracker(mut self, tracker: Arc<ReleaseTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Synthesizes one clip.
    ///
    /// Rejects empty or oversized text before contacting the provider.
    /// Provider responses under [`MIN_AUDIO_BYTES`] are treated as
    /// failures, not audio.
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<AudioClip, TtsError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(TtsError::InvalidInput("text is empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(TtsError::InvalidInput(format!(
                "text is {chars} characters, limit is {MAX_TEXT_CHARS}"
            )));
        }

        self.metrics.synth_requests.fetch_add(1, Ordering::Relaxed);

        let attempt = tokio::time::timeout(
            self.request_timeout,
            self.provider
                .synthesize(text, request.lang.as_ref(), request.voice.as_deref()),
        )
        .await
        .unwrap_or(Err(SynthFailure::Timeout(self.request_timeout)));

        let payload = match attempt {
            Ok(payload) => payload,
            Err(failure) => {
                self.metrics.synth_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "tts",
                    provider = self.provider.name(),
                    error = %failure,
                    "synthesis failed"
                );
                return Err(TtsError::Unavailable(failure.to_string()));
            }
        };

        if payload.bytes.len() < MIN_AUDIO_BYTES {
            self.metrics.synth_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "tts",
                provider = self.provider.name(),
                bytes = payload.bytes.len(),
                "rejecting implausibly small audio payload"
            );
            return Err(TtsError::Unavailable(format!(
                "implausibly small audio payload: {} bytes",
                payload.bytes.len()
            )));
        }

        let audio = match &self.tracker {
            Some(tracker) => AudioHandle::tracked(payload, Arc::clone(tracker)),
            None => AudioHandle::new(payload),
        };
        Ok(AudioClip {
            text: text.to_string(),
            audio,
        })
    }
}
