//! Source media metadata.

use serde::{Deserialize, Serialize};

/// What kind of asset the editor session was opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A decodable video file.
    #[default]
    Video,
    /// Still images composed into a video by the slideshow composer.
    Slideshow,
}

/// Immutable description of the single source asset an editor session edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Duration in seconds.
    pub duration_secs: f64,

    /// Natural width in pixels.
    pub width: u32,

    /// Natural height in pixels.
    pub height: u32,

    #[serde(default)]
    pub kind: MediaKind,

    /// Where the asset lives, when it came from disk. Informational only;
    /// the engine never opens it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Image files of a slideshow, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slides: Vec<String>,
}

impl SourceMedia {
    pub fn new(duration_secs: f64, width: u32, height: u32) -> Self {
        Self {
            duration_secs,
            width,
            height,
            kind: MediaKind::Video,
            path: None,
            slides: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark as a slideshow over `slides`, each shown for an equal share of
    /// the duration.
    pub fn with_slides(mut self, slides: Vec<String>) -> Self {
        self.kind = MediaKind::Slideshow;
        self.slides = slides;
        self
    }

    /// Seconds each slide is shown, for slideshow media.
    pub fn secs_per_slide(&self) -> Option<f64> {
        match self.kind {
            MediaKind::Slideshow if !self.slides.is_empty() => {
                Some(self.duration_secs / self.slides.len() as f64)
            }
            _ => None,
        }
    }

    /// Whether the metadata describes something a timeline can be built on.
    pub fn is_usable(&self) -> bool {
        self.duration_secs.is_finite() && self.duration_secs > 0.0 && self.width > 0 && self.height > 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width.max(1) as f64 / self.height.max(1) as f64
    }
}
