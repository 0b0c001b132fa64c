//! Clipforge Render Engine
//!
//! Frame-accurate rendering of an edited session into an encoded asset.
//! Every output frame is produced by seeking a [`MediaSource`], applying
//! the session's effect stack, and compositing the overlays visible at
//! that point of the timeline.
//!
//! # Pipeline Architecture
//!
//! ```text
//! MediaSource ──seek(t)──┐
//!                        ├── Rotate + Filters (effect stack)
//! timeline ──────────────┘         │
//!                                  ├── PiP layers (PipSources)
//! overlays ────────────────────────┘         │
//!                                            ├── Text overlays (FontBook faces)
//!                                            │
//!                                            ├── Closing watermark
//!                                            ▼
//!                                       FrameSink (ffmpeg)
//!                                            │
//!                                            ▼
//!                                       EncodedAsset
//! ```

pub mod closing;
pub mod compositor;
pub mod encoder;
pub mod export;
pub mod filters;
pub mod fonts;
pub mod resources;
pub mod slideshow;
pub mod source;
pub mod text;
pub mod thumbnails;

pub use encoder::{EncodedAsset, FfmpegSink, FrameSink, MemorySink, VideoCodec};
pub use export::*;
pub use fonts::{Face, FontBook};
pub use resources::{FileOpener, PipSources, SourceOpener};
pub use source::{FfmpegSource, MediaSource, StillImageSource, TestPatternSource};
