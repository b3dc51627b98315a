//! Per-speaker deduplication of transcript segments.

use std::collections::HashMap;

/// Tracks the newest accepted segment per speaker and rejects
/// out-of-order or repeated deliveries.
///
/// Realtime feeds re-send segments on reconnect and occasionally
/// deliver them out of order. The cursor keeps one (timestamp, text)
/// pair per speaker: a segment older than the cursor is stale, and a
/// segment at the same timestamp with identical text is a duplicate.
/// A same-timestamp segment with different text is accepted, since
/// recognizers may revise a segment in place.
#[derive(Debug, Default)]
pub struct SpeakerCursor {
    latest: HashMap<String, (u64, String)>,
}

impl SpeakerCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the segment advances this speaker's cursor and
    /// records it; false if it is stale or a duplicate.
    pub fn accept(&mut self, speaker_id: &str, timestamp_ms: u64, text: &str) -> bool {
        match self.latest.get(speaker_id) {
            Some((last_ts, _)) if timestamp_ms < *last_ts => false,
            Some((last_ts, last_text)) if timestamp_ms == *last_ts && last_text == text => false,
            _ => {
                self.latest
                    .insert(speaker_id.to_string(), (timestamp_ms, text.to_string()));
                true
            }
        }
    }

    /// Forgets a speaker, e.g. when they leave the call.
    pub fn clear(&mut self, speaker_id: &str) {
        self.latest.remove(speaker_id);
    }
}
