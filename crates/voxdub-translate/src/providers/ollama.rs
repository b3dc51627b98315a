//! Ollama Cloud chat-completion translator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use voxdub_foundation::LanguageTag;

use crate::provider::{ProviderFailure, TranslationProvider};
use crate::types::TranslateError;

pub const DEFAULT_BASE_URL: &str = "https://ollama.com/api";
pub const DEFAULT_MODEL: &str = "gpt-oss:120b";
const PROVIDER_NAME: &str = "ollama";

/// Translator that prompts an Ollama-hosted chat model.
///
/// The instruction pins the model to translation-only output so the
/// reply can be used verbatim as the dubbed text.
#[derive(Debug)]
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OllamaProvider {
    /// Builds a provider against `{base_url}/chat`.
    ///
    /// OpenAI-compatible base URLs ending in `/v1` are normalized to
    /// the native API root first.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, TranslateError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(TranslateError::Configuration(
                "Ollama API key is not configured".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TranslateError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat", normalize_base(base_url)),
            model: model.into(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: String,
}

#[async_trait]
impl TranslationProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<String, ProviderFailure> {
        let instruction = build_instruction(source, target);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::Malformed(e.to_string()))?;
        let translated = parsed.message.content.trim().to_string();
        if translated.is_empty() {
            return Err(ProviderFailure::Empty);
        }
        Ok(translated)
    }
}

fn build_instruction(source: &LanguageTag, target: &LanguageTag) -> String {
    if source.is_auto() {
        format!(
            "You are a translation engine. Translate the user's message into {target}. \
             Detect the source language yourself. Reply with the translation only, \
             no commentary, no quotes."
        )
    } else {
        format!(
            "You are a translation engine. Translate the user's message from {source} \
             to {target}. Reply with the translation only, no commentary, no quotes."
        )
    }
}

/// Strips trailing slashes and a trailing `/v1` path segment.
fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_base_is_unchanged() {
        assert_eq!(normalize_base("https://ollama.com/api"), "https://ollama.com/api");
    }

    #[test]
    fn openai_style_suffix_is_stripped() {
        assert_eq!(normalize_base("https://host/api/v1"), "https://host/api");
        assert_eq!(normalize_base("https://host/api/v1/"), "https://host/api");
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = OllamaProvider::new("", DEFAULT_BASE_URL, DEFAULT_MODEL).unwrap_err();
        assert!(matches!(err, TranslateError::Configuration(_)));
    }

    #[test]
    fn instruction_mentions_both_languages() {
        let msg = build_instruction(&LanguageTag::new("es"), &LanguageTag::new("en"));
        assert!(msg.contains("from es"));
        assert!(msg.contains("to en"));

        let auto = build_instruction(&LanguageTag::auto(), &LanguageTag::new("fr"));
        assert!(auto.contains("into fr"));
        assert!(auto.contains("Detect the source language"));
    }
}
