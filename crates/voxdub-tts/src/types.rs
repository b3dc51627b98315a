//! Synthesis requests, audio handles and the release-tracking wrapper.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use voxdub_foundation::LanguageTag;

/// Longest input the synthesizer accepts, in characters (inclusive).
pub const MAX_TEXT_CHARS: usize = 600;

/// Payloads smaller than this are treated as provider errors rather
/// than audio. Real clips are never this small; tiny bodies are
/// usually an error page or an empty response.
pub const MIN_AUDIO_BYTES: usize = 100;

/// One request to speak a piece of text.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    /// Language the audio should be spoken in, if the provider supports
    /// steering it.
    pub lang: Option<LanguageTag>,
    /// Provider-specific voice override.
    pub voice: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: None,
            voice: None,
        }
    }

    pub fn with_lang(mut self, lang: LanguageTag) -> Self {
        self.lang = Some(lang);
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// Raw synthesized audio as returned by a provider.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Counts handle allocations and releases.
///
/// Lets tests and diagnostics assert that every clip's audio was
/// released exactly once regardless of how it left the pipeline.
#[derive(Debug, Default)]
pub struct ReleaseTracker {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

impl ReleaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) {
        self.allocated.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_balanced(&self) -> bool {
        self.allocated() == self.released()
    }
}

/// Owning handle to a clip's audio bytes.
///
/// Releasing is idempotent; dropping an unreleased handle releases it.
/// Either way the underlying resources are given back exactly once.
#[derive(Debug)]
pub struct AudioHandle {
    bytes: Vec<u8>,
    mime: String,
    released: bool,
    tracker: Option<Arc<ReleaseTracker>>,
}

impl AudioHandle {
    pub fn new(payload: AudioPayload) -> Self {
        Self {
            bytes: payload.bytes,
            mime: payload.mime,
            released: false,
            tracker: None,
        }
    }

    /// Like [`AudioHandle::new`] but registers the allocation with a
    /// tracker so its release can be audited.
    pub fn tracked(payload: AudioPayload, tracker: Arc<ReleaseTracker>) -> Self {
        tracker.allocate();
        Self {
            bytes: payload.bytes,
            mime: payload.mime,
            released: false,
            tracker: Some(tracker),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases the audio. Safe to call more than once; only the first
    /// call has any effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.bytes = Vec::new();
        if let Some(tracker) = &self.tracker {
            tracker.release();
        }
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// A synthesized utterance ready for playback.
#[derive(Debug)]
pub struct AudioClip {
    /// The text that was spoken, kept for status display.
    pub text: String,
    pub audio: AudioHandle,
}

/// Errors surfaced by the synthesizer to its callers.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Input rejected before any provider was contacted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The synthesizer or a provider is missing required configuration.
    #[error("tts configuration error: {0}")]
    Configuration(String),

    /// The provider failed or returned something that is not audio.
    #[error("tts unavailable: {0}")]
    Unavailable(String),
}
