//! Gemini native-audio synthesis backend.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use voxdub_foundation::LanguageTag;

use crate::provider::{SynthFailure, TtsProvider};
use crate::types::{AudioPayload, TtsError};

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-12-2025";

/// Synthesizer backed by Gemini's `generateContent` with the AUDIO
/// response modality. Audio comes back base64-encoded inside the
/// candidate parts.
#[derive(Debug)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model_path: String,
    default_voice: Option<String>,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        default_voice: Option<String>,
    ) -> Result<Self, TtsError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(TtsError::Configuration(
                "Gemini API key is not configured".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TtsError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model_path: ensure_model_path(model),
            default_voice,
        })
    }
}

/// Model names may arrive bare ("gemini-x") or fully qualified
/// ("models/gemini-x"); the URL needs the qualified form.
fn ensure_model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'a str; 1],
    temperature: f32,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Serialize)]
struct SpeechConfig<'a> {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
struct VoiceConfig<'a> {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
struct PrebuiltVoiceConfig<'a> {
    #[serde(rename = "voiceName")]
    voice_name: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[async_trait]
impl TtsProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn synthesize(
        &self,
        text: &str,
        lang: Option<&LanguageTag>,
        voice: Option<&str>,
    ) -> Result<AudioPayload, SynthFailure> {
        let prompt = match lang {
            Some(lang) => format!("Speak in {lang}. {text}"),
            None => text.to_string(),
        };
        let voice = voice.or(self.default_voice.as_deref());
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [TextPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                temperature: 0.2,
                speech_config: voice.map(|name| SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: name },
                    },
                }),
            },
        };

        let url = format!("{API_ROOT}/{}:generateContent", self.model_path);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SynthFailure::Malformed(e.to_string()))?;
        extract_audio(parsed)
    }
}

/// Pulls the first inline audio blob out of the response and decodes it.
fn extract_audio(response: GenerateResponse) -> Result<AudioPayload, SynthFailure> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.inline_data)
        .find(|inline| inline.data.as_deref().is_some_and(|d| !d.is_empty()));

    let Some(inline) = inline else {
        return Err(SynthFailure::NoAudio);
    };
    let encoded = inline.data.unwrap_or_default();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| SynthFailure::Malformed(format!("base64 audio: {e}")))?;
    Ok(AudioPayload {
        bytes,
        mime: inline.mime_type.unwrap_or_else(|| "audio/mpeg".into()),
    })
}
