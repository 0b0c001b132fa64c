//! Pointer gestures: trim-handle drags and overlay drags.
//!
//! At most one gesture is active at a time. Everything a gesture needs to
//! map pointer motion back into the model is captured on pointer-down.

use crate::clip::{ClipId, TrimEdge};
use crate::geometry::PercentPoint;
use crate::overlay::LayerRef;

/// A gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Dragging one edge of a clip.
    Trim {
        clip_id: ClipId,
        edge: TrimEdge,
        /// Global time at which the clip started when the drag began.
        anchor_global_start: f64,
        /// The clip's source start when the drag began.
        anchor_source_start: f64,
        /// Timeline length when the drag began; the pointer maps across it.
        anchor_total: f64,
    },
    /// Dragging an overlay layer.
    DragLayer {
        layer: LayerRef,
        /// `layer position - pointer position` at pointer-down.
        grab_offset: (f64, f64),
    },
}

impl Gesture {
    /// Source time the dragged trim edge should move to for a pointer at
    /// `pointer_x` on a timeline strip `timeline_width` pixels wide.
    ///
    /// Returns `None` for non-trim gestures.
    pub fn trim_target(&self, pointer_x: f64, timeline_width: f64) -> Option<f64> {
        match *self {
            Gesture::Trim {
                anchor_global_start,
                anchor_source_start,
                anchor_total,
                ..
            } => {
                let ratio = (pointer_x / timeline_width.max(1.0)).clamp(0.0, 1.0);
                let global = ratio * anchor_total;
                Some(anchor_source_start + (global - anchor_global_start))
            }
            Gesture::DragLayer { .. } => None,
        }
    }

    /// Layer position for a pointer at `pointer`, before clamping.
    ///
    /// Returns `None` for non-drag gestures.
    pub fn drag_target(&self, pointer: PercentPoint) -> Option<PercentPoint> {
        match *self {
            Gesture::DragLayer { grab_offset, .. } => Some(PercentPoint::new(
                pointer.x + grab_offset.0,
                pointer.y + grab_offset.1,
            )),
            Gesture::Trim { .. } => None,
        }
    }
}

/// Holder enforcing the one-gesture-at-a-time rule.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    active: Option<Gesture>,
}

impl GestureState {
    pub fn active(&self) -> Option<&Gesture> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn begin(&mut self, gesture: Gesture) -> Result<(), GestureError> {
        if self.active.is_some() {
            return Err(GestureError::AlreadyActive);
        }
        self.active = Some(gesture);
        Ok(())
    }

    /// End the active gesture, returning it.
    pub fn end(&mut self) -> Option<Gesture> {
        self.active.take()
    }
}

/// Result of activating (clicking) an overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Nothing under the pointer.
    Missed,
    /// A drag began on the layer.
    Dragging(LayerRef),
    /// A text overlay was double-activated and opened for editing.
    Editing(LayerRef),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GestureError {
    #[error("Another drag is already in progress")]
    AlreadyActive,

    #[error("No drag is in progress")]
    NoActiveGesture,
}
