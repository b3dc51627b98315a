//! Persistence of dubbed segments.
//!
//! Writes go through a dedicated task fed by a bounded channel, so a
//! slow or failing store never stalls the audio pipeline. The task
//! drains the channel before exiting, which is what makes shutdown
//! lossless for already-queued records.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voxdub_foundation::AppError;
use voxdub_telemetry::PipelineMetrics;

/// One dubbed utterance, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationRecord {
    pub user_id: String,
    pub meeting_id: String,
    pub source_lang: String,
    pub target_lang: String,
    pub original_text: String,
    pub translated_text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sink for finished translation records.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn save(&self, record: &TranslationRecord) -> Result<(), StoreError>;
}

/// PostgREST-style store: one POST per record, keyed with the service
/// API key in both the `apikey` header and the bearer token.
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RestStore {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TranslationStore for RestStore {
    async fn save(&self, record: &TranslationRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Runs the store writer until every record sender is gone, then
/// drains what is left and exits. Failures are counted and logged;
/// they never propagate back into the pipeline.
pub fn spawn_store_writer(
    mut rx: mpsc::Receiver<TranslationRecord>,
    store: Arc<dyn TranslationStore>,
    metrics: PipelineMetrics,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(target: "store", "writer started");
        while let Some(record) = rx.recv().await {
            match store.save(&record).await {
                Ok(()) => {
                    metrics.persist_writes.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    metrics.persist_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(target: "store", error = %e, "failed to persist segment");
                }
            }
        }
        tracing::debug!(target: "store", "writer stopped");
    })
}
