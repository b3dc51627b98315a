use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared counters for cross-task pipeline monitoring.
///
/// Every stage holds a clone and bumps its own counters with relaxed atomics;
/// the binary's stats tick reads a [`MetricsSnapshot`] for logging.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    // Event intake (controller)
    pub events_seen: Arc<AtomicU64>,
    pub events_filtered: Arc<AtomicU64>,
    pub events_gated: Arc<AtomicU64>,

    // Translation resolver
    pub translate_requests: Arc<AtomicU64>,
    pub translate_cache_hits: Arc<AtomicU64>,
    pub translate_fallbacks: Arc<AtomicU64>,
    pub translate_failures: Arc<AtomicU64>,

    // Speech synthesis
    pub synth_requests: Arc<AtomicU64>,
    pub synth_failures: Arc<AtomicU64>,

    // Playback queue
    pub clips_enqueued: Arc<AtomicU64>,
    pub clips_played: Arc<AtomicU64>,
    pub clips_failed: Arc<AtomicU64>,
    pub clips_abandoned: Arc<AtomicU64>,
    pub queue_depth: Arc<AtomicUsize>,
    pub playback_active: Arc<AtomicBool>,
    pub last_clip_finished: Arc<RwLock<Option<Instant>>>,

    // Persistence sink
    pub persist_writes: Arc<AtomicU64>,
    pub persist_failures: Arc<AtomicU64>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_seen: self.events_seen.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            events_gated: self.events_gated.load(Ordering::Relaxed),
            translate_requests: self.translate_requests.load(Ordering::Relaxed),
            translate_cache_hits: self.translate_cache_hits.load(Ordering::Relaxed),
            translate_fallbacks: self.translate_fallbacks.load(Ordering::Relaxed),
            translate_failures: self.translate_failures.load(Ordering::Relaxed),
            synth_requests: self.synth_requests.load(Ordering::Relaxed),
            synth_failures: self.synth_failures.load(Ordering::Relaxed),
            clips_enqueued: self.clips_enqueued.load(Ordering::Relaxed),
            clips_played: self.clips_played.load(Ordering::Relaxed),
            clips_failed: self.clips_failed.load(Ordering::Relaxed),
            clips_abandoned: self.clips_abandoned.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            playback_active: self.playback_active.load(Ordering::Relaxed),
            persist_writes: self.persist_writes.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }

    /// Seconds since the last clip finished, if any clip has played.
    pub fn idle_secs(&self) -> Option<u64> {
        self.last_clip_finished
            .read()
            .map(|at| at.elapsed().as_secs())
    }

    pub fn mark_clip_finished(&self) {
        *self.last_clip_finished.write() = Some(Instant::now());
    }
}

/// Plain-value copy of [`PipelineMetrics`] for logging and assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_seen: u64,
    pub events_filtered: u64,
    pub events_gated: u64,
    pub translate_requests: u64,
    pub translate_cache_hits: u64,
    pub translate_fallbacks: u64,
    pub translate_failures: u64,
    pub synth_requests: u64,
    pub synth_failures: u64,
    pub clips_enqueued: u64,
    pub clips_played: u64,
    pub clips_failed: u64,
    pub clips_abandoned: u64,
    pub queue_depth: usize,
    pub playback_active: bool,
    pub persist_writes: u64,
    pub persist_failures: u64,
}
