//! Cartesia `tts/bytes` synthesis backend.

use async_trait::async_trait;
use serde::Serialize;
use voxdub_foundation::LanguageTag;

use crate::provider::{SynthFailure, TtsProvider};
use crate::types::{AudioPayload, TtsError};

const ENDPOINT: &str = "https://api.cartesia.ai/tts/bytes";
const API_VERSION: &str = "2025-04-16";

pub const DEFAULT_MODEL_ID: &str = "sonic-3";
pub const DEFAULT_VOICE_ID: &str = "9c7e6604-52c6-424a-9f9f-2c4ad89f3bb9";

/// Synthesizer backed by Cartesia's bytes endpoint, which returns the
/// encoded audio directly in the response body.
///
/// The sonic models infer the spoken language from the transcript, so
/// the language hint is not sent.
#[derive(Debug)]
pub struct CartesiaProvider {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    voice_id: String,
}

impl CartesiaProvider {
    pub fn new(
        api_key: impl Into<String>,
        model_id: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Result<Self, TtsError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(TtsError::Configuration(
                "Cartesia API key is not configured".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TtsError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model_id: model_id.into(),
            voice_id: voice_id.into(),
        })
    }
}

#[derive(Serialize)]
struct BytesRequest<'a> {
    model_id: &'a str,
    transcript: &'a str,
    voice: VoiceSpec<'a>,
    output_format: OutputFormat<'a>,
}

#[derive(Serialize)]
struct VoiceSpec<'a> {
    mode: &'a str,
    id: &'a str,
}

#[derive(Serialize)]
struct OutputFormat<'a> {
    container: &'a str,
    encoding: &'a str,
    sample_rate: u32,
}

#[async_trait]
impl TtsProvider for CartesiaProvider {
    fn name(&self) -> &'static str {
        "cartesia"
    }

    async fn synthesize(
        &self,
        text: &str,
        _lang: Option<&LanguageTag>,
        voice: Option<&str>,
    ) -> Result<AudioPayload, SynthFailure> {
        let voice_id = voice.unwrap_or(&self.voice_id);
        let request = BytesRequest {
            model_id: &self.model_id,
            transcript: text,
            voice: VoiceSpec {
                mode: "id",
                id: voice_id,
            },
            output_format: OutputFormat {
                container: "mp3",
                encoding: "mp3",
                sample_rate: 44100,
            },
        };

        let response = self
            .client
            .post(ENDPOINT)
            .header("X-API-Key", &self.api_key)
            .header("Cartesia-Version", API_VERSION)
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

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(SynthFailure::NoAudio);
        }
        Ok(AudioPayload {
            bytes,
            mime: "audio/mpeg".into(),
        })
    }
}
