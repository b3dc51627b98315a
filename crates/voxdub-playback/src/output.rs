//! Device output abstraction.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("playback channel closed")]
    Closed,
}

/// Something that can play an encoded audio clip to completion.
///
/// `play` resolves when the clip has finished (or failed); the queue
/// relies on that to keep clips from overlapping.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Plays `bytes` on `device`, or the system default when `None`.
    async fn play(&self, bytes: &[u8], device: Option<&str>) -> Result<(), PlaybackError>;
}
