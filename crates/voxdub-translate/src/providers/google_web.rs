//! Free Google web translation endpoint.

use async_trait::async_trait;
use voxdub_foundation::LanguageTag;

use crate::provider::{ProviderFailure, TranslationProvider};
use crate::types::TranslateError;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const PROVIDER_NAME: &str = "google-free";

/// Translator backed by the unauthenticated `translate_a/single`
/// endpoint Google exposes for its web widget.
///
/// No API key, no SLA. Fine as a fallback, not something to lean on
/// as the only provider in production.
pub struct GoogleWebProvider {
    client: reqwest::Client,
}

impl GoogleWebProvider {
    pub fn new() -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TranslateError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranslationProvider for GoogleWebProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<String, ProviderFailure> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        parse_translation(&payload)
    }
}

/// Extracts the translated text from the endpoint's bare-array response.
///
/// The shape is `[[[translated, original, ...], ...], ...]`: the first
/// element holds one entry per sentence. Long inputs come back split
/// across several entries, so all of them are concatenated.
fn parse_translation(payload: &serde_json::Value) -> Result<String, ProviderFailure> {
    let segments = payload
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderFailure::Malformed("missing segment array".into()))?;

    let mut out = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
            out.push_str(piece);
        }
    }

    if out.is_empty() {
        return Err(ProviderFailure::Empty);
    }
    Ok(out)
}
