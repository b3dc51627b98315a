//! Request/response types and the translation error taxonomy.

use voxdub_foundation::LanguageTag;

/// Longest input the resolver accepts, in characters (inclusive).
pub const MAX_TEXT_CHARS: usize = 1000;

/// A single translation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    pub text: String,
    pub source: LanguageTag,
    pub target: LanguageTag,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<LanguageTag>,
        target: impl Into<LanguageTag>,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A completed translation and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub provider: &'static str,
}

/// Errors surfaced by the resolver to its callers.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// Input rejected before any provider was contacted: empty after
    /// trimming, or longer than [`MAX_TEXT_CHARS`].
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller exhausted its request budget for the current window.
    #[error("rate limit exceeded for {caller}: {limit} requests per {window_secs}s")]
    RateLimited {
        caller: String,
        limit: u32,
        window_secs: u64,
    },

    /// The resolver or a provider is missing required configuration.
    #[error("translation configuration error: {0}")]
    Configuration(String),

    /// Every configured provider failed for this request.
    #[error("translation unavailable: {0}")]
    Unavailable(String),
}
