//! The timeline: an ordered sequence of clips over one source asset.
//!
//! Two timebases meet here. *Source time* is a position inside the source
//! media (what the media clock reports and what clips store). *Global time*
//! is a position on the concatenated edit, `0..total_duration()`.

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipId, TrimEdge};

/// Where a source time falls relative to the timeline's clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipLocation {
    /// Index of the clip that owns the time (or the active clip when no
    /// clip does).
    pub index: usize,
    /// Whether the time actually lies inside that clip.
    pub within_bounds: bool,
}

/// Result of mapping a global time onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPosition {
    pub index: usize,
    pub source_secs: f64,
}

/// Ordered, non-empty list of clips plus the index of the active clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    clips: Vec<Clip>,
    #[serde(default)]
    active_index: usize,
    next_clip_id: u64,
}

impl Timeline {
    /// Build the initial timeline for freshly loaded media: one clip
    /// spanning the whole asset.
    pub fn for_duration(duration_secs: f64) -> Result<Self, TimelineError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(TimelineError::InvalidDuration { duration_secs });
        }
        Ok(Self {
            clips: vec![Clip::new(ClipId(1), 0.0, duration_secs)],
            active_index: 0,
            next_clip_id: 2,
        })
    }

    /// Rebuild a timeline from explicit clips, checking every invariant.
    pub fn from_clips(clips: Vec<Clip>) -> Result<Self, TimelineError> {
        let next_clip_id = clips.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let timeline = Self {
            clips,
            active_index: 0,
            next_clip_id,
        };
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Always false for a validated timeline; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clip(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn index_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_clip(&self) -> &Clip {
        &self.clips[self.active_index.min(self.clips.len() - 1)]
    }

    pub fn set_active(&mut self, index: usize) -> Result<(), TimelineError> {
        self.check_index(index)?;
        self.active_index = index;
        Ok(())
    }

    /// Activate the clip at `index`, or the last clip when `index` is past
    /// the end. Returns the index made active.
    pub fn activate_clamped(&mut self, index: usize) -> usize {
        self.active_index = index.min(self.clips.len().saturating_sub(1));
        self.active_index
    }

    /// Sum of every clip's playable length.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(Clip::duration).sum()
    }

    /// Global time at which the clip at `index` begins.
    pub fn global_start_of(&self, index: usize) -> f64 {
        self.clips.iter().take(index).map(Clip::duration).sum()
    }

    /// Global time of a source time inside the clip at `index`.
    pub fn to_global(&self, index: usize, source_secs: f64) -> f64 {
        match self.clips.get(index) {
            Some(clip) => self.global_start_of(index) + (source_secs - clip.start),
            None => self.total_duration(),
        }
    }

    /// Map a global time to the clip that plays it and the matching source
    /// time. Times past the end resolve to the last clip's end.
    pub fn locate_global(&self, global_secs: f64) -> GlobalPosition {
        let mut offset = 0.0;
        let global_secs = global_secs.max(0.0);
        for (index, clip) in self.clips.iter().enumerate() {
            let duration = clip.duration();
            if global_secs < offset + duration {
                return GlobalPosition {
                    index,
                    source_secs: clip.start + (global_secs - offset),
                };
            }
            offset += duration;
        }
        let last = self.clips.len() - 1;
        GlobalPosition {
            index: last,
            source_secs: self.clips[last].end,
        }
    }

    /// Resolve a source time reported by the media clock.
    ///
    /// The active clip wins when it contains the time, since several clips
    /// may reference overlapping footage after a split-and-trim.
    pub fn locate_source(&self, source_secs: f64) -> ClipLocation {
        if self.active_clip().contains(source_secs) {
            return ClipLocation {
                index: self.active_index,
                within_bounds: true,
            };
        }
        match self.clips.iter().position(|c| c.contains(source_secs)) {
            Some(index) => ClipLocation {
                index,
                within_bounds: true,
            },
            None => ClipLocation {
                index: self.active_index,
                within_bounds: false,
            },
        }
    }

    /// Split the clip at `index` at source time `at_secs`.
    ///
    /// The left half keeps the parent's id; the right half gets a fresh id.
    /// Both inherit the parent's original bounds. Returns the new clip's id.
    pub fn split(
        &mut self,
        index: usize,
        at_secs: f64,
        margin_secs: f64,
    ) -> Result<ClipId, TimelineError> {
        self.check_index(index)?;
        let parent = self.clips[index];
        if at_secs < parent.start || at_secs >= parent.end {
            return Err(TimelineError::PlayheadOutsideClip { at_secs });
        }
        if at_secs <= parent.start + margin_secs || at_secs >= parent.end - margin_secs {
            return Err(TimelineError::SplitTooCloseToEdge { at_secs });
        }

        let new_id = self.allocate_id();
        let left = Clip {
            end: at_secs,
            ..parent
        };
        let right = Clip {
            id: new_id,
            start: at_secs,
            ..parent
        };
        self.clips[index] = left;
        self.clips.insert(index + 1, right);
        if self.active_index > index {
            self.active_index += 1;
        }
        Ok(new_id)
    }

    /// Move one edge of the clip at `index` to `value`, clamped to what the
    /// clip's original bounds allow. Returns the edge value actually applied.
    pub fn trim(
        &mut self,
        index: usize,
        edge: TrimEdge,
        value: f64,
        min_len: f64,
    ) -> Result<f64, TimelineError> {
        self.check_index(index)?;
        let clip = &mut self.clips[index];
        let (lo, hi) = clip.trim_range(edge, min_len);
        if lo > hi {
            // Clip already shorter than the minimum; leave it untouched.
            return Ok(match edge {
                TrimEdge::Start => clip.start,
                TrimEdge::End => clip.end,
            });
        }
        let applied = if value.is_nan() { lo } else { value.clamp(lo, hi) };
        match edge {
            TrimEdge::Start => clip.start = applied,
            TrimEdge::End => clip.end = applied,
        }
        Ok(applied)
    }

    /// Move the clip at `from` so it ends up at position `to`.
    ///
    /// The active index follows the moved clip; a clip sitting between the
    /// source and destination shifts by one to keep the same clip focused.
    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<(), TimelineError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);

        let active = self.active_index;
        self.active_index = if active == from {
            to
        } else if from < active && active <= to {
            active - 1
        } else if to <= active && active < from {
            active + 1
        } else {
            active
        };
        Ok(())
    }

    /// Exchange the clips at positions `a` and `b`.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), TimelineError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a.abs_diff(b) == 1 {
            // Adjacent swaps are moves; reuse the same active-index rules.
            return self.move_clip(a, b);
        }
        self.clips.swap(a, b);
        if self.active_index == a {
            self.active_index = b;
        } else if self.active_index == b {
            self.active_index = a;
        }
        Ok(())
    }

    /// Remove the clip at `index`. The sole remaining clip cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<Clip, TimelineError> {
        self.check_index(index)?;
        if self.clips.len() == 1 {
            return Err(TimelineError::LastClip);
        }
        let removed = self.clips.remove(index);
        self.active_index = self.active_index.min(self.clips.len() - 1);
        Ok(removed)
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.clips.is_empty() {
            return Err(TimelineError::Empty);
        }
        if self.active_index >= self.clips.len() {
            return Err(TimelineError::ClipIndexOutOfRange {
                index: self.active_index,
                len: self.clips.len(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for clip in &self.clips {
            if !clip.is_valid() {
                return Err(TimelineError::InvalidClip { id: clip.id });
            }
            if !seen.insert(clip.id) {
                return Err(TimelineError::DuplicateClipId { id: clip.id });
            }
            if clip.id.0 >= self.next_clip_id {
                return Err(TimelineError::ClipIdNotAllocated {
                    id: clip.id,
                    next: self.next_clip_id,
                });
            }
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> ClipId {
        let id = ClipId(self.next_clip_id);
        self.next_clip_id += 1;
        id
    }

    fn check_index(&self, index: usize) -> Result<(), TimelineError> {
        if index >= self.clips.len() {
            return Err(TimelineError::ClipIndexOutOfRange {
                index,
                len: self.clips.len(),
            });
        }
        Ok(())
    }
}

/// Errors raised by timeline edits. Display strings are user-facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("Move the playhead away from the clip edge to split")]
    SplitTooCloseToEdge { at_secs: f64 },

    #[error("The playhead is not inside the selected clip")]
    PlayheadOutsideClip { at_secs: f64 },

    #[error("Cannot delete the only clip")]
    LastClip,

    #[error("Clip {index} does not exist (timeline has {len} clips)")]
    ClipIndexOutOfRange { index: usize, len: usize },

    #[error("Unknown clip {id}")]
    UnknownClip { id: ClipId },

    #[error("Media duration {duration_secs} is not usable")]
    InvalidDuration { duration_secs: f64 },

    #[error("Timeline has no clips")]
    Empty,

    #[error("Clip {id} violates its trim bounds")]
    InvalidClip { id: ClipId },

    #[error("Clip id {id} is not unique")]
    DuplicateClipId { id: ClipId },

    #[error("Clip id {id} was never allocated (next id is {next})")]
    ClipIdNotAllocated { id: ClipId, next: u64 },
}
