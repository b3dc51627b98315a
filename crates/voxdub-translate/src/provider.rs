//! Provider trait and the failure type providers report.

use std::time::Duration;

use async_trait::async_trait;
use voxdub_foundation::LanguageTag;

/// Why a single provider attempt failed.
///
/// These never reach resolver callers directly; the resolver folds
/// them into [`crate::TranslateError::Unavailable`] after the fallback
/// chain is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ProviderFailure {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider returned an empty translation")]
    Empty,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A backend capable of translating text between two languages.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short stable name used in logs and in [`crate::Translation::provider`].
    fn name(&self) -> &'static str;

    /// Translates `text` from `source` to `target`.
    ///
    /// `source` may be the `auto` sentinel for providers that detect
    /// the input language themselves.
    async fn translate(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<String, ProviderFailure>;
}
