//! Wire-level call events and the transcript segments extracted from them.

use serde::{Deserialize, Serialize};

/// A finalized (or partial) transcript segment attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Stable identifier of the speaker within the call.
    #[serde(rename = "speakerId")]
    pub speaker_id: String,
    /// Recognized text for this segment.
    pub text: String,
    /// Whether the recognizer considers this segment final.
    ///
    /// Feeds that only emit finalized segments omit the flag, so absence
    /// means final.
    #[serde(rename = "isFinal", default = "default_true")]
    pub is_final: bool,
    /// Capture timestamp in milliseconds since the start of the call.
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
}

fn default_true() -> bool {
    true
}

/// Envelope for events arriving on the call's realtime channel.
///
/// The channel multiplexes several event kinds; only transcription
/// events matter to the dubbing pipeline, everything else is decoded
/// into [`CallEvent::Other`] and counted as filtered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CallEvent {
    #[serde(rename = "transcription.new")]
    Transcription(TranscriptEvent),
    #[serde(other)]
    Other,
}

impl CallEvent {
    /// Extracts the transcript segment if this is a transcription event.
    pub fn into_transcript(self) -> Option<TranscriptEvent> {
        match self {
            CallEvent::Transcription(ev) => Some(ev),
            CallEvent::Other => None,
        }
    }
}
