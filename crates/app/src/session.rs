//! Dubbing session controller.
//!
//! One task owns the transcript subscription and decides, per event,
//! whether it becomes an utterance. Each accepted utterance gets the
//! next sequence number and its own task for the translate-synthesize
//! leg; the playback queue restores sequence order at the end.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use voxdub_playback::{PlaybackHandle, PlaybackState, QueuedClip};
use voxdub_telemetry::PipelineMetrics;
use voxdub_transcript::{CallEvent, SpeakerCursor, Subscription};
use voxdub_translate::{Resolver, TranslationRequest};
use voxdub_tts::{SynthesisRequest, Synthesizer};

use crate::config::SessionConfig;
use crate::store::TranslationRecord;

/// Who is running this session, for rate limiting and persistence.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub user_id: String,
    pub meeting_id: String,
}

pub struct DubbingSessionOptions {
    pub subscription: Subscription,
    pub config: Arc<RwLock<SessionConfig>>,
    pub identity: SessionIdentity,
    pub resolver: Arc<Resolver>,
    pub synthesizer: Arc<Synthesizer>,
    pub playback: PlaybackHandle,
    /// Sink for finished records; `None` disables persistence.
    pub records: Option<mpsc::Sender<TranslationRecord>>,
    pub metrics: PipelineMetrics,
}

/// Consumes call events and drives the dubbing pipeline.
pub struct DubbingSession {
    subscription: Subscription,
    config: Arc<RwLock<SessionConfig>>,
    identity: Arc<SessionIdentity>,
    resolver: Arc<Resolver>,
    synthesizer: Arc<Synthesizer>,
    playback: PlaybackHandle,
    records: Option<mpsc::Sender<TranslationRecord>>,
    metrics: PipelineMetrics,
    status_tx: Arc<watch::Sender<String>>,
    cursor: SpeakerCursor,
    next_seq: u64,
}

impl DubbingSession {
    /// Builds the session and the status feed UIs can watch.
    pub fn new(options: DubbingSessionOptions) -> (Self, watch::Receiver<String>) {
        let (status_tx, status_rx) = watch::channel("Ready".to_string());
        let session = Self {
            subscription: options.subscription,
            config: options.config,
            identity: Arc::new(options.identity),
            resolver: options.resolver,
            synthesizer: options.synthesizer,
            playback: options.playback,
            records: options.records,
            metrics: options.metrics,
            status_tx: Arc::new(status_tx),
            cursor: SpeakerCursor::new(),
            next_seq: 0,
        };
        (session, status_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::info!(
            target: "session",
            user = %self.identity.user_id,
            meeting = %self.identity.meeting_id,
            "dubbing session started"
        );
        let mut playback_state = self.playback.state_receiver();
        loop {
            tokio::select! {
                event = self.subscription.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
                changed = playback_state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = playback_state.borrow_and_update().clone();
                    if let PlaybackState::Failed { seq, reason } = state {
                        tracing::warn!(target: "session", seq, reason = %reason, "playback failed");
                        let _ = self.status_tx.send("Playback failed".to_string());
                    }
                }
            }
        }
        tracing::info!(target: "session", "transcript feed closed, session ending");
    }

    fn handle_event(&mut self, event: CallEvent) {
        self.metrics.events_seen.fetch_add(1, Ordering::Relaxed);

        let Some(segment) = event.into_transcript() else {
            self.metrics.events_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let (speaker_matches, gate_open, source, target) = {
            let config = self.config.read();
            (
                config
                    .target_speaker_id
                    .as_deref()
                    .map_or(true, |id| id == segment.speaker_id),
                config.translation_enabled && !config.target_language.is_off() && !config.muted,
                config.source_language.clone(),
                config.target_language.clone(),
            )
        };

        if !speaker_matches || !segment.is_final {
            self.metrics.events_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let text = segment.text.trim();
        if text.is_empty() {
            self.metrics.events_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if !self.cursor.accept(&segment.speaker_id, segment.timestamp_ms, text) {
            tracing::debug!(
                target: "session",
                speaker = %segment.speaker_id,
                ts = segment.timestamp_ms,
                "stale or duplicate segment dropped"
            );
            self.metrics.events_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if !gate_open {
            self.metrics.events_gated.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let utterance = UtteranceTask {
            seq,
            identity: Arc::clone(&self.identity),
            resolver: Arc::clone(&self.resolver),
            synthesizer: Arc::clone(&self.synthesizer),
            playback: self.playback.clone(),
            records: self.records.clone(),
            status_tx: Arc::clone(&self.status_tx),
        };
        let request = TranslationRequest::new(text, source, target);
        tokio::spawn(utterance.process(request));
    }
}

/// The translate-synthesize-enqueue leg for one utterance.
///
/// Runs detached so slow providers never hold up event intake; the
/// sequence number keeps playback ordered no matter which task
/// finishes first. Any failure abandons the sequence number so the
/// queue does not wait for a clip that will never arrive.
struct UtteranceTask {
    seq: u64,
    identity: Arc<SessionIdentity>,
    resolver: Arc<Resolver>,
    synthesizer: Arc<Synthesizer>,
    playback: PlaybackHandle,
    records: Option<mpsc::Sender<TranslationRecord>>,
    status_tx: Arc<watch::Sender<String>>,
}

impl UtteranceTask {
    async fn process(self, request: TranslationRequest) {
        let source_lang = request.source.clone();
        let target_lang = request.target.clone();
        let original_text = request.text.clone();

        let translation = match self
            .resolver
            .translate(&self.identity.user_id, request)
            .await
        {
            Ok(translation) => translation,
            Err(e) => {
                tracing::warn!(target: "session", seq = self.seq, error = %e, "translation failed");
                let _ = self.status_tx.send(format!("Translation failed: {e}"));
                let _ = self.playback.abandon(self.seq).await;
                return;
            }
        };

        if let Some(records) = &self.records {
            let record = TranslationRecord {
                user_id: self.identity.user_id.clone(),
                meeting_id: self.identity.meeting_id.clone(),
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
                original_text,
                translated_text: translation.text.clone(),
            };
            if let Err(e) = records.try_send(record) {
                tracing::warn!(target: "session", seq = self.seq, error = %e, "segment not persisted");
            }
        }

        let _ = self
            .status_tx
            .send(format!("Queueing: \"{}...\"", preview(&translation.text)));

        let clip = match self
            .synthesizer
            .synthesize(SynthesisRequest::new(translation.text).with_lang(target_lang))
            .await
        {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(target: "session", seq = self.seq, error = %e, "synthesis failed");
                let _ = self.status_tx.send(format!("TTS Gen Failed: {e}"));
                let _ = self.playback.abandon(self.seq).await;
                return;
            }
        };

        if self
            .playback
            .enqueue(QueuedClip {
                seq: self.seq,
                clip,
            })
            .await
            .is_err()
        {
            tracing::warn!(target: "session", seq = self.seq, "playback queue closed, clip dropped");
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(15).collect()
}
