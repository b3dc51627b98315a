//! Transcript event model and realtime distribution for VoxDub.
//!
//! Defines the wire-level call event envelope, the broadcast bus that
//! fans events out to session consumers, and the per-speaker cursor
//! used to drop stale or duplicate segments.

pub mod bus;
pub mod cursor;
pub mod types;

pub use bus::{Subscription, TranscriptBus};
pub use cursor::SpeakerCursor;
pub use types::{CallEvent, TranscriptEvent};
