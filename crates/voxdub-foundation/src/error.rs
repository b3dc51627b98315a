use thiserror::Error;

/// Top-level errors for runtime wiring and lifecycle code.
///
/// Stage-specific failures (translation, synthesis, playback, persistence)
/// live in their own crates; this enum covers the faults that surface when
/// assembling or tearing down the pipeline itself.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("shutdown requested")]
    ShutdownRequested,
}

impl AppError {
    /// Configuration faults are per-deploy, not per-request; callers should
    /// exit rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}
