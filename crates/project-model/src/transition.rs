//! Transition and fade choices plus the session's active selection.
//!
//! These settings drive the live preview only; the export pipeline renders
//! clips back-to-back without compositing transitions between them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Durations offered by the duration picker, in seconds.
pub const DURATION_PRESETS: [f64; 5] = [0.3, 0.5, 1.0, 1.5, 2.0];

/// Longest custom duration accepted, in seconds.
pub const MAX_CUSTOM_DURATION_SECS: f64 = 10.0;

/// Direction of motion for wipes and slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit vector in screen space (y grows downward).
    pub fn vector(self) -> (f64, f64) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }
}

/// Whether a zoom transition pushes in or pulls out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    In,
    Out,
}

/// The visual family of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionKind {
    Fade { color: Color },
    Crossfade { color: Color },
    Dissolve { color: Color },
    Wipe { direction: Direction },
    Slide { direction: Direction },
    Zoom { mode: ZoomMode },
    Blur,
    Swirl,
}

/// One entry of the transition catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionChoice {
    pub id: String,
    pub kind: TransitionKind,
    /// Default duration for this choice in seconds.
    pub duration_secs: f64,
}

impl TransitionChoice {
    fn new(id: &str, kind: TransitionKind, duration_secs: f64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            duration_secs,
        }
    }
}

/// One entry of the fade catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadeChoice {
    pub id: String,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// Fade through this color instead of the media's own opacity.
    pub through_color: Option<Color>,
}

impl FadeChoice {
    fn new(id: &str, fade_in_secs: f64, fade_out_secs: f64, through_color: Option<Color>) -> Self {
        Self {
            id: id.to_string(),
            fade_in_secs,
            fade_out_secs,
            through_color,
        }
    }

    /// A copy whose fade-in and fade-out both last `secs`.
    pub fn with_duration(&self, secs: f64) -> Self {
        Self {
            fade_in_secs: secs,
            fade_out_secs: secs,
            ..self.clone()
        }
    }
}

/// Every transition the editor offers.
pub fn transition_catalog() -> Vec<TransitionChoice> {
    use TransitionKind::*;
    vec![
        TransitionChoice::new("fade", Fade { color: Color::BLACK }, 1.0),
        TransitionChoice::new("crossfade", Crossfade { color: Color::WHITE }, 1.0),
        TransitionChoice::new("dissolve", Dissolve { color: Color::rgb(128, 128, 128) }, 1.5),
        TransitionChoice::new("wipe-left", Wipe { direction: Direction::Left }, 0.8),
        TransitionChoice::new("wipe-right", Wipe { direction: Direction::Right }, 0.8),
        TransitionChoice::new("wipe-up", Wipe { direction: Direction::Up }, 0.8),
        TransitionChoice::new("wipe-down", Wipe { direction: Direction::Down }, 0.8),
        TransitionChoice::new("slide-left", Slide { direction: Direction::Left }, 0.6),
        TransitionChoice::new("slide-right", Slide { direction: Direction::Right }, 0.6),
        TransitionChoice::new("slide-up", Slide { direction: Direction::Up }, 0.6),
        TransitionChoice::new("slide-down", Slide { direction: Direction::Down }, 0.6),
        TransitionChoice::new("zoom-in", Zoom { mode: ZoomMode::In }, 0.7),
        TransitionChoice::new("zoom-out", Zoom { mode: ZoomMode::Out }, 0.7),
        TransitionChoice::new("blur", Blur, 1.0),
        TransitionChoice::new("swirl", Swirl, 1.2),
    ]
}

/// Every fade the editor offers.
pub fn fade_catalog() -> Vec<FadeChoice> {
    vec![
        FadeChoice::new("fade-in-out", 1.0, 1.0, None),
        FadeChoice::new("fade-through-black", 0.8, 0.8, Some(Color::BLACK)),
        FadeChoice::new("fade-through-white", 0.8, 0.8, Some(Color::WHITE)),
        FadeChoice::new("quick-fade", 0.3, 0.3, None),
        FadeChoice::new("slow-fade", 2.0, 2.0, None),
    ]
}

pub fn find_transition(id: &str) -> Option<TransitionChoice> {
    transition_catalog().into_iter().find(|c| c.id == id)
}

pub fn find_fade(id: &str) -> Option<FadeChoice> {
    fade_catalog().into_iter().find(|c| c.id == id)
}

/// The session's active transition/fade and per-id duration overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionSettings {
    pub active_transition: Option<String>,
    pub active_fade: Option<String>,
    pub transition_durations: BTreeMap<String, f64>,
    pub fade_durations: BTreeMap<String, f64>,
}

impl TransitionSettings {
    pub fn select_transition(&mut self, id: &str) -> Result<(), TransitionError> {
        find_transition(id).ok_or_else(|| TransitionError::UnknownTransition(id.to_string()))?;
        self.active_transition = Some(id.to_string());
        Ok(())
    }

    pub fn select_fade(&mut self, id: &str) -> Result<(), TransitionError> {
        find_fade(id).ok_or_else(|| TransitionError::UnknownFade(id.to_string()))?;
        self.active_fade = Some(id.to_string());
        Ok(())
    }

    pub fn clear_transition(&mut self) {
        self.active_transition = None;
    }

    pub fn clear_fade(&mut self) {
        self.active_fade = None;
    }

    /// Store a custom duration for a transition id.
    pub fn set_transition_duration(&mut self, id: &str, secs: f64) -> Result<(), TransitionError> {
        find_transition(id).ok_or_else(|| TransitionError::UnknownTransition(id.to_string()))?;
        check_duration(secs)?;
        self.transition_durations.insert(id.to_string(), secs);
        Ok(())
    }

    /// Store a custom duration for a fade id (applies to both fade halves).
    pub fn set_fade_duration(&mut self, id: &str, secs: f64) -> Result<(), TransitionError> {
        find_fade(id).ok_or_else(|| TransitionError::UnknownFade(id.to_string()))?;
        check_duration(secs)?;
        self.fade_durations.insert(id.to_string(), secs);
        Ok(())
    }

    /// The active transition with any duration override applied.
    pub fn active_transition_choice(&self) -> Option<TransitionChoice> {
        let id = self.active_transition.as_deref()?;
        let mut choice = find_transition(id)?;
        if let Some(secs) = self.transition_durations.get(id) {
            choice.duration_secs = *secs;
        }
        Some(choice)
    }

    /// The active fade with any duration override applied.
    pub fn active_fade_choice(&self) -> Option<FadeChoice> {
        let id = self.active_fade.as_deref()?;
        let choice = find_fade(id)?;
        Some(match self.fade_durations.get(id) {
            Some(secs) => choice.with_duration(*secs),
            None => choice,
        })
    }
}

fn check_duration(secs: f64) -> Result<(), TransitionError> {
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_CUSTOM_DURATION_SECS {
        return Err(TransitionError::InvalidDuration { secs });
    }
    Ok(())
}

/// Errors raised when choosing transitions. Display strings are user-facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Unknown transition '{0}'")]
    UnknownTransition(String),

    #[error("Unknown fade '{0}'")]
    UnknownFade(String),

    #[error("Duration must be between 0 and 10 seconds (got {secs})")]
    InvalidDuration { secs: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<String> = transition_catalog().into_iter().map(|c| c.id).collect();
        ids.extend(fade_catalog().into_iter().map(|c| c.id));
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_override_replaces_default_duration() {
        let mut settings = TransitionSettings::default();
        settings.select_transition("swirl").unwrap();
        assert_eq!(settings.active_transition_choice().unwrap().duration_secs, 1.2);

        settings.set_transition_duration("swirl", 2.5).unwrap();
        assert_eq!(settings.active_transition_choice().unwrap().duration_secs, 2.5);

        // Overrides are per id.
        settings.select_transition("blur").unwrap();
        assert_eq!(settings.active_transition_choice().unwrap().duration_secs, 1.0);
    }

    #[test]
    fn test_fade_override_sets_both_halves() {
        let mut settings = TransitionSettings::default();
        settings.select_fade("fade-through-black").unwrap();
        settings.set_fade_duration("fade-through-black", 1.5).unwrap();
        let fade = settings.active_fade_choice().unwrap();
        assert_eq!(fade.fade_in_secs, 1.5);
        assert_eq!(fade.fade_out_secs, 1.5);
        assert_eq!(fade.through_color, Some(Color::BLACK));
    }

    #[test]
    fn test_rejects_unknown_ids_and_bad_durations() {
        let mut settings = TransitionSettings::default();
        assert!(settings.select_transition("teleport").is_err());
        assert!(settings.select_fade("teleport").is_err());
        assert!(settings.set_transition_duration("fade", 0.0).is_err());
        assert!(settings.set_transition_duration("fade", 11.0).is_err());
        assert!(settings.set_fade_duration("quick-fade", f64::NAN).is_err());
        assert_eq!(settings, TransitionSettings::default());
    }

    #[test]
    fn test_presets_are_valid_custom_values() {
        for secs in DURATION_PRESETS {
            assert!(check_duration(secs).is_ok());
        }
    }
}
