//! End-to-end pipeline tests with mock providers, a mock store and a
//! collecting audio output. No network, no sound card.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};

use voxdub_app::config::SessionConfig;
use voxdub_app::session::{DubbingSession, DubbingSessionOptions, SessionIdentity};
use voxdub_app::store::{spawn_store_writer, StoreError, TranslationRecord, TranslationStore};
use voxdub_foundation::{real_clock, LanguageTag};
use voxdub_playback::{
    AudioOutput, PlaybackConfig, PlaybackError, PlaybackHandle, PlaybackQueue,
};
use voxdub_telemetry::PipelineMetrics;
use voxdub_transcript::{CallEvent, TranscriptBus, TranscriptEvent};
use voxdub_translate::{ProviderFailure, Resolver, ResolverOptions, TranslationProvider};
use voxdub_tts::{AudioPayload, ReleaseTracker, SynthFailure, Synthesizer, TtsProvider};

struct MockTranslator {
    delays: HashMap<String, Duration>,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl MockTranslator {
    fn instant() -> Arc<Self> {
        Arc::new(Self {
            delays: HashMap::new(),
            fail_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn with_delays(delays: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            delays: delays
                .iter()
                .map(|(text, ms)| (text.to_string(), Duration::from_millis(*ms)))
                .collect(),
            fail_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            delays: HashMap::new(),
            fail_on: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TranslationProvider for MockTranslator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        _source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<String, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(ProviderFailure::Status {
                status: 502,
                body: "mock failure".into(),
            });
        }
        Ok(format!("{text} in {target}"))
    }
}

struct MockTts {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl MockTts {
    fn working() -> Arc<Self> {
        Arc::new(Self {
            fail_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing_on(text: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TtsProvider for MockTts {
    fn name(&self) -> &'static str {
        "mock-tts"
    }

    async fn synthesize(
        &self,
        text: &str,
        _lang: Option<&LanguageTag>,
        _voice: Option<&str>,
    ) -> Result<AudioPayload, SynthFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(text) {
            return Err(SynthFailure::NoAudio);
        }
        // Spoken text padded into the payload so the output can
        // identify what it played.
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(160, b' ');
        Ok(AudioPayload {
            bytes,
            mime: "audio/mpeg".into(),
        })
    }
}

struct CollectingOutput {
    texts: StdMutex<Vec<String>>,
    active: AtomicBool,
    overlapped: AtomicBool,
    play_duration: Duration,
}

impl CollectingOutput {
    fn new(play_duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            texts: StdMutex::new(Vec::new()),
            active: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            play_duration,
        })
    }

    fn played(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioOutput for CollectingOutput {
    async fn play(&self, bytes: &[u8], _device: Option<&str>) -> Result<(), PlaybackError> {
        if self.active.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(self.play_duration).await;
        self.active.store(false, Ordering::SeqCst);
        let text = String::from_utf8_lossy(bytes).trim_end().to_string();
        self.texts.lock().unwrap().push(text);
        Ok(())
    }
}

struct MemoryStore {
    records: Arc<Mutex<Vec<TranslationRecord>>>,
    fail_all: bool,
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn save(&self, record: &TranslationRecord) -> Result<(), StoreError> {
        if self.fail_all {
            return Err(StoreError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

struct TestPipeline {
    bus: TranscriptBus,
    session_handle: tokio::task::JoinHandle<()>,
    playback: PlaybackHandle,
    playback_handle: tokio::task::JoinHandle<()>,
    status_rx: watch::Receiver<String>,
    metrics: PipelineMetrics,
    tracker: Arc<ReleaseTracker>,
    config: Arc<RwLock<SessionConfig>>,
}

impl TestPipeline {
    async fn shutdown(self) {
        self.session_handle.abort();
        let _ = self.session_handle.await;
        let _ = self.playback.close().await;
        let _ = self.playback_handle.await;
    }
}

fn start_pipeline(
    session: SessionConfig,
    translator: Arc<MockTranslator>,
    tts: Arc<MockTts>,
    output: Arc<CollectingOutput>,
    records: Option<mpsc::Sender<TranslationRecord>>,
) -> TestPipeline {
    let metrics = PipelineMetrics::new();
    let tracker = Arc::new(ReleaseTracker::new());
    let bus = TranscriptBus::new();
    let subscription = bus.subscribe();

    let resolver = Arc::new(Resolver::new(ResolverOptions {
        primary: translator,
        fallback: None,
        cache_capacity: 256,
        rate_limit_max: 100,
        rate_limit_window: Duration::from_secs(60),
        request_timeout: Duration::from_secs(8),
        clock: real_clock(),
        metrics: metrics.clone(),
    }));
    let synthesizer = Arc::new(
        Synthesizer::new(tts, Duration::from_secs(12), metrics.clone())
            .with_release_tracker(Arc::clone(&tracker)),
    );
    let (playback, playback_handle) = PlaybackQueue::spawn(
        output,
        PlaybackConfig::default(),
        metrics.clone(),
    );
    let config = Arc::new(RwLock::new(session));
    let (dubbing, status_rx) = DubbingSession::new(DubbingSessionOptions {
        subscription,
        config: Arc::clone(&config),
        identity: SessionIdentity {
            user_id: "user-1".into(),
            meeting_id: "meeting-1".into(),
        },
        resolver,
        synthesizer,
        playback: playback.clone(),
        records,
        metrics: metrics.clone(),
    });
    let session_handle = dubbing.spawn();

    TestPipeline {
        bus,
        session_handle,
        playback,
        playback_handle,
        status_rx,
        metrics,
        tracker,
        config,
    }
}

fn dubbing_config() -> SessionConfig {
    SessionConfig {
        translation_enabled: true,
        target_language: LanguageTag::new("en"),
        source_language: LanguageTag::new("es"),
        ..SessionConfig::default()
    }
}

fn segment(speaker: &str, text: &str, ts: u64) -> CallEvent {
    CallEvent::Transcription(TranscriptEvent {
        speaker_id: speaker.into(),
        text: text.into(),
        is_final: true,
        timestamp_ms: ts,
    })
}

#[tokio::test(start_paused = true)]
async fn dubs_segments_in_order_despite_uneven_latency() {
    // The first utterance translates slowest, so later clips are ready
    // first and the queue must hold them back.
    let translator = MockTranslator::with_delays(&[("uno", 300), ("dos", 200), ("tres", 100)]);
    let output = CollectingOutput::new(Duration::from_millis(50));
    let pipeline = start_pipeline(
        dubbing_config(),
        translator,
        MockTts::working(),
        output.clone(),
        None,
    );

    pipeline.bus.publish(segment("spk-1", "uno", 1000));
    pipeline.bus.publish(segment("spk-1", "dos", 2000));
    pipeline.bus.publish(segment("spk-1", "tres", 3000));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(
        output.played(),
        vec!["uno in en", "dos in en", "tres in en"]
    );
    assert!(!output.overlapped.load(Ordering::SeqCst));

    let snapshot = pipeline.metrics.snapshot();
    assert_eq!(snapshot.events_seen, 3);
    assert_eq!(snapshot.clips_played, 3);
    assert_eq!(snapshot.clips_abandoned, 0);

    let tracker = Arc::clone(&pipeline.tracker);
    pipeline.shutdown().await;
    assert!(tracker.is_balanced());
}

#[tokio::test(start_paused = true)]
async fn disabled_session_never_contacts_providers() {
    let translator = MockTranslator::instant();
    let tts = MockTts::working();
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        SessionConfig::default(),
        translator.clone(),
        tts.clone(),
        output.clone(),
        None,
    );

    for i in 0..100u64 {
        let text = format!("segmento {i}");
        pipeline.bus.publish(segment("spk-1", &text, 1000 + i));
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
    assert!(output.played().is_empty());
    let snapshot = pipeline.metrics.snapshot();
    assert_eq!(snapshot.events_seen, 100);
    assert_eq!(snapshot.events_gated, 100);
    assert_eq!(snapshot.translate_requests, 0);
    assert_eq!(snapshot.clips_enqueued, 0);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn target_language_off_gates_even_when_enabled() {
    let translator = MockTranslator::instant();
    let config = SessionConfig {
        translation_enabled: true,
        target_language: LanguageTag::off(),
        ..SessionConfig::default()
    };
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        config,
        translator.clone(),
        MockTts::working(),
        output,
        None,
    );

    pipeline.bus.publish(segment("spk-1", "hola", 1000));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.metrics.snapshot().events_gated, 1);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_translation_abandons_its_slot() {
    let translator = MockTranslator::failing_on("dos");
    let output = CollectingOutput::new(Duration::from_millis(20));
    let pipeline = start_pipeline(
        dubbing_config(),
        translator,
        MockTts::working(),
        output.clone(),
        None,
    );

    pipeline.bus.publish(segment("spk-1", "uno", 1000));
    pipeline.bus.publish(segment("spk-1", "dos", 2000));
    pipeline.bus.publish(segment("spk-1", "tres", 3000));
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The failed utterance's sequence number is skipped, not waited on.
    assert_eq!(output.played(), vec!["uno in en", "tres in en"]);
    let snapshot = pipeline.metrics.snapshot();
    assert_eq!(snapshot.clips_played, 2);
    assert_eq!(snapshot.clips_abandoned, 1);
    assert_eq!(snapshot.translate_failures, 1);

    let tracker = Arc::clone(&pipeline.tracker);
    pipeline.shutdown().await;
    assert!(tracker.is_balanced());
}

#[tokio::test(start_paused = true)]
async fn failed_synthesis_reports_status_and_abandons() {
    let tts = MockTts::failing_on("solo in en");
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        dubbing_config(),
        MockTranslator::instant(),
        tts,
        output.clone(),
        None,
    );

    pipeline.bus.publish(segment("spk-1", "solo", 1000));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(output.played().is_empty());
    let status = pipeline.status_rx.borrow().clone();
    assert!(
        status.starts_with("TTS Gen Failed"),
        "unexpected status: {status}"
    );
    assert_eq!(pipeline.metrics.snapshot().clips_abandoned, 1);

    let tracker = Arc::clone(&pipeline.tracker);
    pipeline.shutdown().await;
    assert!(tracker.is_balanced());
}

#[tokio::test(start_paused = true)]
async fn filters_wrong_speaker_partials_and_duplicates() {
    let config = SessionConfig {
        target_speaker_id: Some("spk-1".into()),
        ..dubbing_config()
    };
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        config,
        MockTranslator::instant(),
        MockTts::working(),
        output.clone(),
        None,
    );

    pipeline.bus.publish(segment("spk-2", "otro hablante", 500));
    pipeline.bus.publish(segment("spk-1", "hola", 1000));
    // Exact redelivery of the accepted segment.
    pipeline.bus.publish(segment("spk-1", "hola", 1000));
    pipeline.bus.publish(CallEvent::Transcription(TranscriptEvent {
        speaker_id: "spk-1".into(),
        text: "a medio camino".into(),
        is_final: false,
        timestamp_ms: 1500,
    }));
    pipeline.bus.publish(segment("spk-1", "   ", 2000));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(output.played(), vec!["hola in en"]);
    let snapshot = pipeline.metrics.snapshot();
    assert_eq!(snapshot.events_seen, 5);
    assert_eq!(snapshot.events_filtered, 4);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn store_failures_do_not_stall_playback() {
    let store = Arc::new(MemoryStore {
        records: Arc::new(Mutex::new(Vec::new())),
        fail_all: true,
    });
    let (record_tx, record_rx) = mpsc::channel(64);
    let output = CollectingOutput::new(Duration::from_millis(10));
    let pipeline = start_pipeline(
        dubbing_config(),
        MockTranslator::instant(),
        MockTts::working(),
        output.clone(),
        Some(record_tx),
    );
    let writer = spawn_store_writer(record_rx, store, pipeline.metrics.clone());

    pipeline.bus.publish(segment("spk-1", "uno", 1000));
    pipeline.bus.publish(segment("spk-1", "dos", 2000));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(output.played(), vec!["uno in en", "dos in en"]);
    assert_eq!(pipeline.metrics.snapshot().persist_failures, 2);

    let metrics = pipeline.metrics.clone();
    pipeline.shutdown().await;
    writer.await.unwrap();
    assert_eq!(metrics.snapshot().persist_writes, 0);
}

#[tokio::test(start_paused = true)]
async fn records_carry_the_session_identity() {
    let saved = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::new(MemoryStore {
        records: Arc::clone(&saved),
        fail_all: false,
    });
    let (record_tx, record_rx) = mpsc::channel(64);
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        dubbing_config(),
        MockTranslator::instant(),
        MockTts::working(),
        output,
        Some(record_tx),
    );
    let writer = spawn_store_writer(record_rx, store, pipeline.metrics.clone());

    pipeline.bus.publish(segment("spk-1", "hola", 1000));
    tokio::time::sleep(Duration::from_secs(2)).await;

    pipeline.shutdown().await;
    writer.await.unwrap();

    let records = saved.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "user-1");
    assert_eq!(records[0].meeting_id, "meeting-1");
    assert_eq!(records[0].source_lang, "es");
    assert_eq!(records[0].target_lang, "en");
    assert_eq!(records[0].original_text, "hola");
    assert_eq!(records[0].translated_text, "hola in en");
}

#[tokio::test(start_paused = true)]
async fn subscription_is_released_when_the_session_ends() {
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        SessionConfig::default(),
        MockTranslator::instant(),
        MockTts::working(),
        output,
        None,
    );

    assert_eq!(pipeline.bus.subscriber_count(), 1);
    let bus = pipeline.bus.clone();
    pipeline.shutdown().await;
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn enabling_mid_session_starts_dubbing() {
    let output = CollectingOutput::new(Duration::ZERO);
    let pipeline = start_pipeline(
        SessionConfig::default(),
        MockTranslator::instant(),
        MockTts::working(),
        output.clone(),
        None,
    );

    pipeline.bus.publish(segment("spk-1", "antes", 1000));
    tokio::time::sleep(Duration::from_secs(1)).await;

    {
        let mut config = pipeline.config.write();
        config.translation_enabled = true;
        config.target_language = LanguageTag::new("en");
        config.source_language = LanguageTag::new("es");
    }
    pipeline.bus.publish(segment("spk-1", "despues", 2000));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(output.played(), vec!["despues in en"]);
    let snapshot = pipeline.metrics.snapshot();
    assert_eq!(snapshot.events_gated, 1);
    assert_eq!(snapshot.clips_played, 1);

    pipeline.shutdown().await;
}
