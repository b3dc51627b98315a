//! Ordered playback of synthesized clips for VoxDub.
//!
//! The queue releases clips strictly in sequence order, one at a time,
//! with a short silence gap between them. Audio device access lives
//! behind the [`AudioOutput`] trait so the pipeline can be driven
//! end-to-end without a sound card.

pub mod output;
pub mod queue;
pub mod rodio_output;

pub use output::{AudioOutput, PlaybackError};
pub use queue::{PlaybackConfig, PlaybackHandle, PlaybackQueue, PlaybackState, QueuedClip};
pub use rodio_output::RodioOutput;
