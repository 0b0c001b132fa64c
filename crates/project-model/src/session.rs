//! The editor session: the single owner of all editable state.
//!
//! Every subsystem receives the session by reference; nothing else holds
//! mutable edit state. A session is persisted as a `session.json` document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use clipforge_common::config::EditorDefaults;

use crate::clip::{ClipId, TrimEdge};
use crate::effects::EffectStack;
use crate::geometry::PercentPoint;
use crate::gesture::{Activation, Gesture, GestureError, GestureState};
use crate::media::SourceMedia;
use crate::overlay::{
    LayerId, LayerRef, OverlayError, OverlaySet, PipLayer, PipLayerSpec, TextOverlay,
    TextOverlaySpec,
};
use crate::timeline::{Timeline, TimelineError};
use crate::transition::{TransitionError, TransitionSettings};

/// Current schema version of `session.json`.
pub const SESSION_VERSION: &str = "1.0";

/// Whether the preview is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Paused,
    Playing,
}

/// All editable state of one editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSession {
    pub media: SourceMedia,
    pub timeline: Timeline,
    #[serde(default)]
    pub effects: EffectStack,
    #[serde(default)]
    pub overlays: OverlaySet,
    #[serde(default)]
    pub transitions: TransitionSettings,

    /// Playhead in source seconds, as last reported by the media clock.
    #[serde(default)]
    pub playhead_secs: f64,

    #[serde(skip)]
    pub playback: PlaybackStatus,

    /// Preview-only rate multiplier; export always renders at 1x.
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,

    #[serde(skip)]
    pub limits: EditorDefaults,

    #[serde(skip)]
    gesture: GestureState,

    /// Text overlay currently open for editing.
    #[serde(skip)]
    editing_text: Option<LayerId>,
}

fn default_playback_rate() -> f64 {
    1.0
}

impl EditorSession {
    /// Open a session on freshly loaded media: one clip spanning the asset.
    pub fn open(media: SourceMedia) -> Result<Self, SessionError> {
        if !media.is_usable() {
            return Err(SessionError::UnusableMedia {
                duration_secs: media.duration_secs,
                width: media.width,
                height: media.height,
            });
        }
        let timeline = Timeline::for_duration(media.duration_secs)?;
        Ok(Self {
            media,
            timeline,
            effects: EffectStack::default(),
            overlays: OverlaySet::new(),
            transitions: TransitionSettings::default(),
            playhead_secs: 0.0,
            playback: PlaybackStatus::Paused,
            playback_rate: 1.0,
            limits: EditorDefaults::default(),
            gesture: GestureState::default(),
            editing_text: None,
        })
    }

    pub fn with_limits(mut self, limits: EditorDefaults) -> Self {
        self.limits = limits;
        self
    }

    /// Check every structural invariant (used after deserialization).
    pub fn validate(&self) -> Result<(), SessionError> {
        self.timeline.validate()?;
        self.overlays.validate()?;
        for clip in self.timeline.clips() {
            if clip.original_end > self.media.duration_secs + 1e-6 {
                return Err(SessionError::ClipBeyondMedia { id: clip.id });
            }
        }
        Ok(())
    }

    // ── Playhead & playback ──

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackStatus::Playing
    }

    pub fn play(&mut self) {
        self.playback = PlaybackStatus::Playing;
    }

    pub fn pause(&mut self) {
        self.playback = PlaybackStatus::Paused;
    }

    /// Set the preview rate multiplier, clamped to `[0.25, 4]`.
    pub fn set_playback_rate(&mut self, rate: f64) -> f64 {
        self.playback_rate = if rate.is_finite() {
            rate.clamp(0.25, 4.0)
        } else {
            1.0
        };
        self.playback_rate
    }

    /// Playhead position on the concatenated timeline.
    pub fn global_playhead(&self) -> f64 {
        self.timeline
            .to_global(self.timeline.active_index(), self.playhead_secs)
    }

    /// Scrub to a global time. Returns the source time the media handle
    /// should seek to.
    pub fn seek_global(&mut self, global_secs: f64) -> f64 {
        let pos = self.timeline.locate_global(global_secs);
        self.timeline.activate_clamped(pos.index);
        self.playhead_secs = pos.source_secs;
        pos.source_secs
    }

    /// Select a clip and park the playhead at its start. Returns the seek
    /// target.
    pub fn select_clip(&mut self, index: usize) -> Result<f64, SessionError> {
        self.timeline.set_active(index)?;
        self.playhead_secs = self.timeline.active_clip().start;
        Ok(self.playhead_secs)
    }

    // ── Clip edits ──

    /// Split the active clip at the playhead.
    pub fn split_at_playhead(&mut self) -> Result<ClipId, SessionError> {
        let index = self.timeline.active_index();
        let id = self
            .timeline
            .split(index, self.playhead_secs, self.limits.split_margin_secs)?;
        Ok(id)
    }

    /// Delete the clip at `index`. Returns the source time to force-seek to
    /// (the start of the clip that becomes active).
    pub fn delete_clip(&mut self, index: usize) -> Result<f64, SessionError> {
        self.timeline.remove(index)?;
        self.playhead_secs = self.timeline.active_clip().start;
        Ok(self.playhead_secs)
    }

    pub fn delete_active_clip(&mut self) -> Result<f64, SessionError> {
        self.delete_clip(self.timeline.active_index())
    }

    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        self.timeline.move_clip(from, to)?;
        Ok(())
    }

    /// Trim one edge of a clip to `value` (clamped). Returns the applied
    /// edge time.
    pub fn trim_clip(
        &mut self,
        clip_id: ClipId,
        edge: TrimEdge,
        value: f64,
    ) -> Result<f64, SessionError> {
        let index = self
            .timeline
            .index_of(clip_id)
            .ok_or(TimelineError::UnknownClip { id: clip_id })?;
        let applied = self
            .timeline
            .trim(index, edge, value, self.limits.min_clip_secs)?;
        self.keep_playhead_in_active_clip();
        Ok(applied)
    }

    // ── Gestures ──

    pub fn active_gesture(&self) -> Option<&Gesture> {
        self.gesture.active()
    }

    /// Pointer-down on a trim handle.
    pub fn begin_trim(&mut self, clip_id: ClipId, edge: TrimEdge) -> Result<(), SessionError> {
        let index = self
            .timeline
            .index_of(clip_id)
            .ok_or(TimelineError::UnknownClip { id: clip_id })?;
        let gesture = Gesture::Trim {
            clip_id,
            edge,
            anchor_global_start: self.timeline.global_start_of(index),
            anchor_source_start: self.timeline.clips()[index].start,
            anchor_total: self.timeline.total_duration(),
        };
        self.gesture.begin(gesture)?;
        Ok(())
    }

    /// Pointer-move while a trim handle is engaged. Returns the applied
    /// edge time.
    pub fn update_trim(&mut self, pointer_x: f64, timeline_width: f64) -> Result<f64, SessionError> {
        let gesture = *self.gesture.active().ok_or(GestureError::NoActiveGesture)?;
        let (clip_id, edge) = match gesture {
            Gesture::Trim { clip_id, edge, .. } => (clip_id, edge),
            Gesture::DragLayer { .. } => return Err(GestureError::NoActiveGesture.into()),
        };
        let target = gesture
            .trim_target(pointer_x, timeline_width)
            .ok_or(GestureError::NoActiveGesture)?;
        self.trim_clip(clip_id, edge, target)
    }

    /// Pointer-down over the preview. Hit-tests visible overlays at the
    /// global playhead; a double-activation on text opens it for editing
    /// instead of dragging.
    pub fn activate_at(
        &mut self,
        pointer: PercentPoint,
        click_count: u32,
    ) -> Result<Activation, SessionError> {
        let t = self.global_playhead();
        let hit = self
            .overlays
            .hit_test(pointer, t, self.media.width, self.media.height);
        let layer = match hit {
            Some(layer) => layer,
            None => return Ok(Activation::Missed),
        };
        if click_count >= 2 {
            if let LayerRef::Text(id) = layer {
                self.editing_text = Some(id);
                return Ok(Activation::Editing(layer));
            }
        }
        self.begin_layer_drag(layer, pointer)?;
        Ok(Activation::Dragging(layer))
    }

    /// Begin dragging a specific layer from `pointer`.
    pub fn begin_layer_drag(
        &mut self,
        layer: LayerRef,
        pointer: PercentPoint,
    ) -> Result<(), SessionError> {
        let position = self
            .overlays
            .position_of(layer)
            .ok_or(OverlayError::UnknownLayer { id: layer.id() })?;
        self.gesture.begin(Gesture::DragLayer {
            layer,
            grab_offset: position.offset_from(&pointer),
        })?;
        Ok(())
    }

    /// Pointer-move during a layer drag. Returns the clamped position.
    pub fn update_layer_drag(&mut self, pointer: PercentPoint) -> Result<PercentPoint, SessionError> {
        let gesture = *self.gesture.active().ok_or(GestureError::NoActiveGesture)?;
        let layer = match gesture {
            Gesture::DragLayer { layer, .. } => layer,
            Gesture::Trim { .. } => return Err(GestureError::NoActiveGesture.into()),
        };
        let target = gesture
            .drag_target(pointer)
            .ok_or(GestureError::NoActiveGesture)?;
        Ok(self.overlays.set_position(layer, target)?)
    }

    /// Pointer-up: ends whatever gesture is active.
    pub fn end_gesture(&mut self) -> Option<Gesture> {
        self.gesture.end()
    }

    pub fn editing_text(&self) -> Option<LayerId> {
        self.editing_text
    }

    pub fn close_text_editor(&mut self) {
        self.editing_text = None;
    }

    // ── Overlays ──

    pub fn add_text(&mut self, spec: TextOverlaySpec) -> Result<LayerId, SessionError> {
        Ok(self.overlays.add_text(spec)?)
    }

    pub fn add_pip(&mut self, spec: PipLayerSpec) -> Result<LayerId, SessionError> {
        Ok(self.overlays.add_pip(spec)?)
    }

    pub fn remove_text(&mut self, id: LayerId) -> Result<TextOverlay, SessionError> {
        self.abandon_gesture_on(LayerRef::Text(id));
        if self.editing_text == Some(id) {
            self.editing_text = None;
        }
        Ok(self.overlays.remove_text(id)?)
    }

    /// Remove a PiP layer. The caller must release the layer's decoded
    /// source through the renderer's resource registry.
    pub fn remove_pip(&mut self, id: LayerId) -> Result<PipLayer, SessionError> {
        self.abandon_gesture_on(LayerRef::Pip(id));
        Ok(self.overlays.remove_pip(id)?)
    }

    // ── Transitions ──

    pub fn select_transition(&mut self, id: &str) -> Result<(), SessionError> {
        Ok(self.transitions.select_transition(id)?)
    }

    pub fn select_fade(&mut self, id: &str) -> Result<(), SessionError> {
        Ok(self.transitions.select_fade(id)?)
    }

    fn abandon_gesture_on(&mut self, layer: LayerRef) {
        if let Some(Gesture::DragLayer { layer: dragged, .. }) = self.gesture.active() {
            if *dragged == layer {
                self.gesture.end();
            }
        }
    }

    fn keep_playhead_in_active_clip(&mut self) {
        let clip = *self.timeline.active_clip();
        if self.playhead_secs < clip.start || self.playhead_secs >= clip.end {
            self.playhead_secs = clip.start;
        }
    }
}

/// On-disk session document (`session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Schema version.
    pub version: String,

    /// Human-readable session name.
    pub name: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,

    pub session: EditorSession,
}

impl SessionDocument {
    pub fn new(name: impl Into<String>, session: EditorSession) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: SESSION_VERSION.to_string(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
            session,
        }
    }

    /// Load and validate a session document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| SessionError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let doc: SessionDocument =
            serde_json::from_str(&json).map_err(|e| SessionError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        doc.session.validate()?;
        Ok(doc)
    }

    /// Save the document, stamping `modified_at`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SessionError::IoError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        self.modified_at = chrono::Utc::now().to_rfc3339();
        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| SessionError::IoError { path, source: e })
    }
}

/// Errors raised by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error("Media is not editable ({duration_secs}s, {width}x{height})")]
    UnusableMedia {
        duration_secs: f64,
        width: u32,
        height: u32,
    },

    #[error("Clip {id} extends past the end of the media")]
    ClipBeyondMedia { id: ClipId },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl SessionError {
    /// Whether the error is a rejected edit (as opposed to a failing file).
    pub fn is_invalid_operation(&self) -> bool {
        !matches!(
            self,
            SessionError::IoError { .. } | SessionError::ParseError { .. }
        )
    }
}
