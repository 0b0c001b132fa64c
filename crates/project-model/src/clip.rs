//! A clip: one trimmed in/out range over the source media.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable clip identifier, unique within a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip-{}", self.0)
    }
}

/// Which edge of a clip a trim applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimEdge {
    Start,
    End,
}

/// A trimmed region of the source media.
///
/// All times are seconds in the source media's own timebase. `original_start`
/// and `original_end` record the footage the clip may be trimmed back out to;
/// they are fixed when the clip is created or split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub start: f64,
    pub end: f64,
    pub original_start: f64,
    pub original_end: f64,
}

impl Clip {
    /// A clip spanning `[start, end)` whose original bounds equal its range.
    pub fn new(id: ClipId, start: f64, end: f64) -> Self {
        Self {
            id,
            start,
            end,
            original_start: start,
            original_end: end,
        }
    }

    /// Playable length in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether a source time lies inside `[start, end)`.
    pub fn contains(&self, source_secs: f64) -> bool {
        source_secs >= self.start && source_secs < self.end
    }

    /// `original_start <= start < end <= original_end`.
    pub fn is_valid(&self) -> bool {
        self.original_start <= self.start
            && self.start < self.end
            && self.end <= self.original_end
    }

    /// Allowed range for a trim of the given edge.
    ///
    /// Trimming may only recover footage up to the clip's own original
    /// bounds and always leaves at least `min_len` seconds.
    pub fn trim_range(&self, edge: TrimEdge, min_len: f64) -> (f64, f64) {
        match edge {
            TrimEdge::Start => (self.original_start, self.end - min_len),
            TrimEdge::End => (self.start + min_len, self.original_end),
        }
    }
}
