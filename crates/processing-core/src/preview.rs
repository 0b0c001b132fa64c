//! Transition and fade preview.
//!
//! Previews are time-boxed animations over the active clip. The engine is a
//! two-state machine (`Idle`, `Previewing`) driven by a monotonic clock the
//! caller samples and passes in; each tick yields the [`VisualState`] the
//! preview surface should apply. Nothing here touches the export path.

use serde::{Deserialize, Serialize};

use clipforge_project_model::color::Color;
use clipforge_project_model::session::EditorSession;
use clipforge_project_model::transition::{
    Direction, FadeChoice, TransitionChoice, TransitionKind, ZoomMode,
};

use crate::easing::{sine_bump, triangle, Easing};

/// Hold between fade-in and fade-out in a fade preview.
pub const FADE_HOLD_SECS: f64 = 1.0;

/// Peak blur radius of the blur transition.
const MAX_BLUR_PX: f64 = 20.0;

/// How far the swirl transition shrinks the frame at its midpoint.
const SWIRL_SCALE_DIP: f64 = 0.3;

/// How much a zoom transition scales the frame.
const ZOOM_AMOUNT: f64 = 0.5;

/// Directional hard-edged reveal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WipeMask {
    pub direction: Direction,
    /// Fraction of the frame revealed, `[0, 1]`.
    pub revealed: f64,
}

/// Visual properties applied to the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    /// Media opacity.
    pub opacity: f64,
    /// Solid color drawn over the media, with its own opacity.
    pub overlay_color: Option<Color>,
    pub overlay_opacity: f64,
    pub translate_x_percent: f64,
    pub translate_y_percent: f64,
    pub scale: f64,
    pub rotation_degrees: f64,
    pub blur_px: f64,
    pub wipe: Option<WipeMask>,
}

impl VisualState {
    pub const IDENTITY: VisualState = VisualState {
        opacity: 1.0,
        overlay_color: None,
        overlay_opacity: 0.0,
        translate_x_percent: 0.0,
        translate_y_percent: 0.0,
        scale: 1.0,
        rotation_degrees: 0.0,
        blur_px: 0.0,
        wipe: None,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn css_transform(&self) -> String {
        format!(
            "translate({:.3}%, {:.3}%) scale({:.4}) rotate({:.2}deg)",
            self.translate_x_percent, self.translate_y_percent, self.scale, self.rotation_degrees
        )
    }
}

impl Default for VisualState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// What is being previewed.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewKind {
    Transition(TransitionChoice),
    Fade(FadeChoice),
}

impl PreviewKind {
    /// Total running time of the preview.
    pub fn duration_secs(&self) -> f64 {
        match self {
            PreviewKind::Transition(choice) => choice.duration_secs,
            PreviewKind::Fade(fade) => fade.fade_in_secs + FADE_HOLD_SECS + fade.fade_out_secs,
        }
    }

    fn id(&self) -> &str {
        match self {
            PreviewKind::Transition(choice) => &choice.id,
            PreviewKind::Fade(fade) => &fade.id,
        }
    }

    /// Visual state `elapsed` seconds into the preview.
    pub fn visual_at(&self, elapsed: f64) -> VisualState {
        match self {
            PreviewKind::Transition(choice) => {
                let p = elapsed / choice.duration_secs.max(f64::EPSILON);
                transition_visual(choice.kind, Easing::EaseOutCubic.apply(p))
            }
            PreviewKind::Fade(fade) => fade_visual(fade, elapsed),
        }
    }
}

/// Visual state of a transition at eased progress `e`.
pub fn transition_visual(kind: TransitionKind, e: f64) -> VisualState {
    let mut v = VisualState::IDENTITY;
    match kind {
        TransitionKind::Fade { color }
        | TransitionKind::Crossfade { color }
        | TransitionKind::Dissolve { color } => {
            v.overlay_color = Some(color);
            v.overlay_opacity = triangle(e);
        }
        TransitionKind::Wipe { direction } => {
            v.wipe = Some(WipeMask {
                direction,
                revealed: e,
            });
        }
        TransitionKind::Slide { direction } => {
            let (dx, dy) = direction.vector();
            v.translate_x_percent = dx * e * 100.0;
            v.translate_y_percent = dy * e * 100.0;
        }
        TransitionKind::Zoom { mode } => {
            v.scale = match mode {
                ZoomMode::In => 1.0 + ZOOM_AMOUNT * e,
                ZoomMode::Out => 1.0 - ZOOM_AMOUNT * e,
            };
            v.opacity = 1.0 - 0.5 * e;
        }
        TransitionKind::Blur => {
            v.blur_px = MAX_BLUR_PX * sine_bump(e);
        }
        TransitionKind::Swirl => {
            v.rotation_degrees = e * 360.0;
            v.scale = 1.0 - SWIRL_SCALE_DIP * sine_bump(e);
        }
    }
    v
}

/// Visual state of a fade preview `elapsed` seconds in.
fn fade_visual(fade: &FadeChoice, elapsed: f64) -> VisualState {
    let out_start = fade.fade_in_secs + FADE_HOLD_SECS;
    // Visibility of the media: 0 -> 1 during fade-in, 1 -> 0 during fade-out.
    let visibility = if elapsed < fade.fade_in_secs {
        Easing::EaseOutCubic.apply(elapsed / fade.fade_in_secs.max(f64::EPSILON))
    } else if elapsed < out_start {
        1.0
    } else {
        let p = (elapsed - out_start) / fade.fade_out_secs.max(f64::EPSILON);
        1.0 - Easing::EaseOutCubic.apply(p)
    };

    let mut v = VisualState::IDENTITY;
    match fade.through_color {
        Some(color) => {
            v.overlay_color = Some(color);
            v.overlay_opacity = 1.0 - visibility;
        }
        None => v.opacity = visibility,
    }
    v
}

/// One step of a running preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewFrame {
    pub visual: VisualState,
    /// Set on the tick that completes the preview.
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum PreviewState {
    Idle,
    Previewing { kind: PreviewKind, started_at: f64 },
}

/// Drives transition and fade previews for a session.
#[derive(Debug, Clone)]
pub struct PreviewEngine {
    state: PreviewState,
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewEngine {
    pub fn new() -> Self {
        Self {
            state: PreviewState::Idle,
        }
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self.state, PreviewState::Previewing { .. })
    }

    /// Start previewing a transition. Pauses playback and parks the
    /// playhead at the active clip's start; returns that seek target.
    pub fn start_transition(
        &mut self,
        session: &mut EditorSession,
        choice: TransitionChoice,
        now_secs: f64,
    ) -> f64 {
        self.start(session, PreviewKind::Transition(choice), now_secs)
    }

    /// Start previewing a fade. Same playback handling as transitions.
    pub fn start_fade(
        &mut self,
        session: &mut EditorSession,
        fade: FadeChoice,
        now_secs: f64,
    ) -> f64 {
        self.start(session, PreviewKind::Fade(fade), now_secs)
    }

    fn start(&mut self, session: &mut EditorSession, kind: PreviewKind, now_secs: f64) -> f64 {
        session.pause();
        let seek = session.timeline.active_clip().start;
        session.playhead_secs = seek;
        tracing::debug!(
            preview = kind.id(),
            duration_secs = kind.duration_secs(),
            "Starting preview"
        );
        self.state = PreviewState::Previewing {
            kind,
            started_at: now_secs,
        };
        seek
    }

    /// Advance to `now_secs`. Idle engines report identity.
    pub fn tick(&mut self, now_secs: f64) -> PreviewFrame {
        let (visual, finished) = match &self.state {
            PreviewState::Idle => (VisualState::IDENTITY, false),
            PreviewState::Previewing { kind, started_at } => {
                let elapsed = (now_secs - started_at).max(0.0);
                if elapsed >= kind.duration_secs() {
                    (VisualState::IDENTITY, true)
                } else {
                    (kind.visual_at(elapsed), false)
                }
            }
        };
        if finished {
            self.state = PreviewState::Idle;
        }
        PreviewFrame { visual, finished }
    }

    /// Abort a running preview; visuals return to identity.
    pub fn cancel(&mut self) -> VisualState {
        self.state = PreviewState::Idle;
        VisualState::IDENTITY
    }
}

/// Sample a preview at `fps` from start to completion, inclusive of the
/// final identity frame.
pub fn sample_preview(kind: &PreviewKind, fps: f64) -> Vec<(f64, VisualState)> {
    let step = 1.0 / fps.max(1.0);
    let duration = kind.duration_secs();
    let mut samples = Vec::new();
    let mut t = 0.0;
    while t < duration {
        samples.push((t, kind.visual_at(t)));
        t += step;
    }
    samples.push((duration, VisualState::IDENTITY));
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::media::SourceMedia;
    use clipforge_project_model::transition::{find_fade, find_transition};

    fn session() -> EditorSession {
        let mut s = EditorSession::open(SourceMedia::new(10.0, 1280, 720)).unwrap();
        s.playhead_secs = 4.0;
        s.split_at_playhead().unwrap();
        s.select_clip(1).unwrap();
        s.playhead_secs = 6.0;
        s.play();
        s
    }

    #[test]
    fn test_start_pauses_and_seeks_to_active_clip() {
        let mut s = session();
        let mut engine = PreviewEngine::new();
        let seek = engine.start_transition(&mut s, find_transition("fade").unwrap(), 0.0);
        assert_eq!(seek, 4.0);
        assert_eq!(s.playhead_secs, 4.0);
        assert!(!s.is_playing());
        assert!(engine.is_previewing());
    }

    #[test]
    fn test_fade_transition_peaks_mid_way_and_completes_to_identity() {
        let mut s = session();
        let mut engine = PreviewEngine::new();
        engine.start_transition(&mut s, find_transition("fade").unwrap(), 10.0);

        // Eased progress reaches 0.5 at raw p = 1 - 0.5^(1/3) ~ 0.2063.
        let frame = engine.tick(10.2063);
        assert!((frame.visual.overlay_opacity - 1.0).abs() < 1e-3);
        assert_eq!(frame.visual.overlay_color, Some(Color::BLACK));

        let frame = engine.tick(11.0);
        assert!(frame.finished);
        assert!(frame.visual.is_identity());
        assert!(!engine.is_previewing());
    }

    #[test]
    fn test_kind_mappings() {
        let slide = transition_visual(
            TransitionKind::Slide {
                direction: Direction::Left,
            },
            1.0,
        );
        assert_eq!(slide.translate_x_percent, -100.0);

        let swirl = transition_visual(TransitionKind::Swirl, 0.5);
        assert_eq!(swirl.rotation_degrees, 180.0);
        assert!((swirl.scale - 0.7).abs() < 1e-12);

        let blur = transition_visual(TransitionKind::Blur, 0.5);
        assert!((blur.blur_px - MAX_BLUR_PX).abs() < 1e-9);

        let zoom = transition_visual(TransitionKind::Zoom { mode: ZoomMode::Out }, 1.0);
        assert_eq!(zoom.scale, 0.5);
        assert_eq!(zoom.opacity, 0.5);

        let wipe = transition_visual(
            TransitionKind::Wipe {
                direction: Direction::Up,
            },
            0.25,
        );
        assert_eq!(wipe.wipe.unwrap().revealed, 0.25);
    }

    #[test]
    fn test_fade_preview_has_hold_between_halves() {
        let fade = find_fade("fade-in-out").unwrap();
        let kind = PreviewKind::Fade(fade);
        assert_eq!(kind.duration_secs(), 3.0);

        assert_eq!(kind.visual_at(0.0).opacity, 0.0);
        assert_eq!(kind.visual_at(1.5).opacity, 1.0);
        assert!(kind.visual_at(1.5).overlay_color.is_none());
        assert!(kind.visual_at(2.9).opacity < 0.1);
    }

    #[test]
    fn test_fade_through_color_uses_overlay() {
        let fade = find_fade("fade-through-white").unwrap();
        let kind = PreviewKind::Fade(fade);
        let start = kind.visual_at(0.0);
        assert_eq!(start.opacity, 1.0);
        assert_eq!(start.overlay_color, Some(Color::WHITE));
        assert_eq!(start.overlay_opacity, 1.0);
        assert_eq!(kind.visual_at(1.2).overlay_opacity, 0.0);
    }

    #[test]
    fn test_cancel_returns_to_identity() {
        let mut s = session();
        let mut engine = PreviewEngine::new();
        engine.start_fade(&mut s, find_fade("slow-fade").unwrap(), 0.0);
        assert!(!engine.tick(0.5).visual.is_identity());
        assert!(engine.cancel().is_identity());
        assert!(!engine.is_previewing());
        assert!(!engine.tick(1.0).finished);
    }

    #[test]
    fn test_sample_preview_ends_on_identity() {
        let kind = PreviewKind::Transition(find_transition("swirl").unwrap());
        let samples = sample_preview(&kind, 30.0);
        assert_eq!(samples.first().unwrap().0, 0.0);
        let (t, last) = samples.last().unwrap();
        assert_eq!(*t, 1.2);
        assert!(last.is_identity());
    }
}
