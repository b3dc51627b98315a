//! Sequence-ordered playback queue.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use voxdub_telemetry::PipelineMetrics;
use voxdub_tts::AudioClip;

use crate::output::{AudioOutput, PlaybackError};

/// What the queue is doing right now.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Idle,
    Playing { seq: u64, text: String },
    Failed { seq: u64, reason: String },
}

/// A clip stamped with its position in the utterance order.
#[derive(Debug)]
pub struct QueuedClip {
    pub seq: u64,
    pub clip: AudioClip,
}

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Silence enforced between the end of one clip and the start of
    /// the next.
    pub inter_clip_gap: Duration,
    /// Output device name, `None` for the system default.
    pub output_device: Option<String>,
    /// Command channel capacity; senders back off when it fills.
    pub command_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            inter_clip_gap: Duration::from_millis(100),
            output_device: None,
            command_capacity: 64,
        }
    }
}

enum Command {
    Enqueue(QueuedClip),
    Abandon(u64),
    SetDevice(Option<String>),
    Close,
}

/// Async-facing handle to a running queue.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<PlaybackState>,
}

impl PlaybackHandle {
    /// Hands a clip to the queue. It plays once every earlier sequence
    /// number has played or been abandoned.
    pub async fn enqueue(&self, clip: QueuedClip) -> Result<(), PlaybackError> {
        self.tx
            .send(Command::Enqueue(clip))
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    /// Marks a sequence number as never-arriving so the queue does not
    /// wait for it. Safe for already-buffered clips too; their audio is
    /// released immediately.
    pub async fn abandon(&self, seq: u64) -> Result<(), PlaybackError> {
        self.tx
            .send(Command::Abandon(seq))
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    /// Switches the output device for clips that have not started yet.
    pub async fn set_output_device(&self, device: Option<String>) -> Result<(), PlaybackError> {
        self.tx
            .send(Command::SetDevice(device))
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    /// Stops the queue. The clip in flight finishes; buffered clips are
    /// released unplayed.
    pub async fn close(&self) -> Result<(), PlaybackError> {
        self.tx
            .send(Command::Close)
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    pub fn state(&self) -> PlaybackState {
        self.state_rx.borrow().clone()
    }

    /// Watch receiver for state changes, for select loops.
    pub fn state_receiver(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }
}

/// Plays clips strictly in sequence order, one at a time.
///
/// Clips may arrive out of order; the queue buffers ahead-of-order
/// arrivals and waits for the missing sequence numbers. A sequence
/// number that will never produce a clip must be abandoned or the
/// queue will wait for it indefinitely.
pub struct PlaybackQueue {
    output: Arc<dyn AudioOutput>,
    config: PlaybackConfig,
    metrics: PipelineMetrics,
    rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<PlaybackState>,
    pending: BTreeMap<u64, AudioClip>,
    abandoned: HashSet<u64>,
    next_seq: u64,
    last_finish: Option<tokio::time::Instant>,
}

impl PlaybackQueue {
    pub fn spawn(
        output: Arc<dyn AudioOutput>,
        config: PlaybackConfig,
        metrics: PipelineMetrics,
    ) -> (PlaybackHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.command_capacity);
        let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);
        let queue = Self {
            output,
            config,
            metrics,
            rx,
            state_tx,
            pending: BTreeMap::new(),
            abandoned: HashSet::new(),
            next_seq: 0,
            last_finish: None,
        };
        let join = tokio::spawn(queue.run());
        (PlaybackHandle { tx, state_rx }, join)
    }

    async fn run(mut self) {
        tracing::debug!(target: "playback", "queue started");
        loop {
            self.drain_ready().await;
            match self.rx.recv().await {
                Some(Command::Enqueue(queued)) => self.enqueue(queued),
                Some(Command::Abandon(seq)) => self.abandon(seq),
                Some(Command::SetDevice(device)) => {
                    tracing::info!(
                        target: "playback",
                        device = device.as_deref().unwrap_or("default"),
                        "output device changed"
                    );
                    self.config.output_device = device;
                }
                Some(Command::Close) | None => break,
            }
        }
        let remaining = self.pending.len();
        if remaining > 0 {
            self.metrics
                .clips_abandoned
                .fetch_add(remaining as u64, Ordering::Relaxed);
            self.pending.clear();
        }
        self.metrics.queue_depth.store(0, Ordering::Relaxed);
        let _ = self.state_tx.send(PlaybackState::Idle);
        tracing::debug!(target: "playback", released = remaining, "queue stopped");
    }

    fn enqueue(&mut self, queued: QueuedClip) {
        if queued.seq < self.next_seq || self.abandoned.contains(&queued.seq) {
            tracing::debug!(target: "playback", seq = queued.seq, "discarding stale or abandoned clip");
            return;
        }
        if self.pending.contains_key(&queued.seq) {
            tracing::debug!(target: "playback", seq = queued.seq, "discarding duplicate clip");
            return;
        }
        self.pending.insert(queued.seq, queued.clip);
        self.metrics.clips_enqueued.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .queue_depth
            .store(self.pending.len(), Ordering::Relaxed);
    }

    fn abandon(&mut self, seq: u64) {
        if seq < self.next_seq {
            tracing::debug!(target: "playback", seq, "abandon for already-finished sequence ignored");
            return;
        }
        // The tombstone stays until the head of the queue passes it,
        // even when a buffered clip is discarded here.
        let newly_abandoned = self.abandoned.insert(seq);
        if self.pending.remove(&seq).is_some() {
            self.metrics
                .queue_depth
                .store(self.pending.len(), Ordering::Relaxed);
        }
        if newly_abandoned {
            self.metrics.clips_abandoned.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: "playback", seq, "sequence abandoned");
        }
    }

    /// Plays every clip that is next in order, skipping abandoned
    /// sequence numbers, until the head of the queue is missing.
    async fn drain_ready(&mut self) {
        loop {
            while self.abandoned.remove(&self.next_seq) {
                self.next_seq += 1;
            }
            let Some(clip) = self.pending.remove(&self.next_seq) else {
                break;
            };
            let seq = self.next_seq;
            self.next_seq += 1;
            self.metrics
                .queue_depth
                .store(self.pending.len(), Ordering::Relaxed);
            self.play_clip(seq, clip).await;
        }
    }

    async fn play_clip(&mut self, seq: u64, mut clip: AudioClip) {
        if let Some(last) = self.last_finish {
            let since = last.elapsed();
            if since < self.config.inter_clip_gap {
                tokio::time::sleep(self.config.inter_clip_gap - since).await;
            }
        }

        let _ = self.state_tx.send(PlaybackState::Playing {
            seq,
            text: clip.text.clone(),
        });
        self.metrics.playback_active.store(true, Ordering::Relaxed);
        tracing::debug!(target: "playback", seq, chars = clip.text.chars().count(), "playing clip");

        let result = self
            .output
            .play(clip.audio.bytes(), self.config.output_device.as_deref())
            .await;

        clip.audio.release();
        self.metrics.playback_active.store(false, Ordering::Relaxed);
        self.metrics.mark_clip_finished();
        self.last_finish = Some(tokio::time::Instant::now());

        match result {
            Ok(()) => {
                self.metrics.clips_played.fetch_add(1, Ordering::Relaxed);
                let _ = self.state_tx.send(PlaybackState::Idle);
            }
            Err(e) => {
                self.metrics.clips_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "playback", seq, error = %e, "clip playback failed");
                let _ = self.state_tx.send(PlaybackState::Failed {
                    seq,
                    reason: e.to_string(),
                });
            }
        }
    }
}
