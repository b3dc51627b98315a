//! Speech synthesis for VoxDub.
//!
//! Providers turn translated text into audio bytes; the synthesizer
//! wraps a provider behind validation, a request timeout and payload
//! sanity checks, and hands back clips whose audio is released
//! exactly once no matter how the clip leaves the pipeline.

pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod types;

pub use provider::{SynthFailure, TtsProvider};
pub use providers::{CartesiaProvider, GeminiProvider};
pub use synthesizer::Synthesizer;
pub use types::{
    AudioClip, AudioHandle, AudioPayload, ReleaseTracker, SynthesisRequest, TtsError,
    MAX_TEXT_CHARS, MIN_AUDIO_BYTES,
};
