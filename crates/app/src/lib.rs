//! VoxDub application crate.
//!
//! Wires the transcript feed, translation resolver, speech synthesizer,
//! playback queue and segment store into a running dubbing session.

pub mod config;
pub mod runtime;
pub mod session;
pub mod store;
