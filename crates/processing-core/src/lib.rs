//! Clipforge Processing Core
//!
//! Time-driven logic layered over the edit model:
//! - **Playback:** Keep the media clock inside the timeline's clips
//! - **Preview:** Transition and fade preview state machine
//! - **Easing:** Progress curves and envelopes shared by previews
//!
//! This crate is pure computation: no I/O and no media handles.
//! Callers sample their own clocks and apply the returned commands.

pub mod easing;
pub mod playback;
pub mod preview;

pub use playback::{correct, dispatch, MediaCommand, PlaybackAction};
pub use preview::{PreviewEngine, PreviewKind, VisualState};
