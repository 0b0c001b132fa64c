//! Time-boxed overlay layers: text overlays and picture-in-picture layers.
//!
//! Visibility windows are expressed in global timeline seconds and checked
//! with [`window_contains`] by both the preview and the export paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::{clamp_percent, PercentPoint, PercentRect};

/// Overlay layer identifier, unique across text and PiP layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// Addresses one layer of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LayerRef {
    Text(LayerId),
    Pip(LayerId),
}

impl LayerRef {
    pub fn id(self) -> LayerId {
        match self {
            LayerRef::Text(id) | LayerRef::Pip(id) => id,
        }
    }
}

/// Inclusive visibility test shared by preview and export.
pub fn window_contains(start_time: f64, end_time: f64, t: f64) -> bool {
    t >= start_time && t <= end_time
}

/// Font weight for text overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// A text label composited on top of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub id: LayerId,
    pub text: String,
    /// Anchor (top-left of the text box) in percent of the raster.
    pub x_percent: f64,
    pub y_percent: f64,
    pub font_size_px: f64,
    pub color: Color,
    pub font_family: String,
    #[serde(default)]
    pub font_weight: FontWeight,
    pub start_time: f64,
    pub end_time: f64,
}

impl TextOverlay {
    pub fn is_visible_at(&self, t: f64) -> bool {
        window_contains(self.start_time, self.end_time, t)
    }

    pub fn position(&self) -> PercentPoint {
        PercentPoint::new(self.x_percent, self.y_percent)
    }
}

/// What a PiP layer displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipKind {
    Image,
    Video,
}

/// A picture-in-picture layer. The decoded source behind `source` is owned
/// by the renderer's resource registry and released when the layer goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipLayer {
    pub id: LayerId,
    pub kind: PipKind,
    /// Location of the layer's media, resolved by the host application.
    pub source: String,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
    /// `[0, 1]`.
    pub opacity: f64,
    pub start_time: f64,
    pub end_time: f64,
}

impl PipLayer {
    pub fn is_visible_at(&self, t: f64) -> bool {
        window_contains(self.start_time, self.end_time, t)
    }

    pub fn position(&self) -> PercentPoint {
        PercentPoint::new(self.x_percent, self.y_percent)
    }

    pub fn rect(&self) -> PercentRect {
        PercentRect::new(
            self.x_percent,
            self.y_percent,
            self.width_percent,
            self.height_percent,
        )
    }
}

/// Fields a caller supplies when adding a text overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlaySpec {
    pub text: String,
    pub position: PercentPoint,
    pub font_size_px: f64,
    pub color: Color,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub start_time: f64,
    pub end_time: f64,
}

impl TextOverlaySpec {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            position: PercentPoint::new(50.0, 50.0),
            font_size_px: 48.0,
            color: Color::WHITE,
            font_family: "sans-serif".to_string(),
            font_weight: FontWeight::Normal,
            start_time,
            end_time,
        }
    }
}

/// Fields a caller supplies when adding a PiP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PipLayerSpec {
    pub kind: PipKind,
    pub source: String,
    pub rect: PercentRect,
    pub opacity: f64,
    pub start_time: f64,
    pub end_time: f64,
}

/// All overlay layers of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySet {
    #[serde(default)]
    texts: Vec<TextOverlay>,
    #[serde(default)]
    pips: Vec<PipLayer>,
    next_layer_id: u64,
}

impl Default for OverlaySet {
    fn default() -> Self {
        Self {
            texts: vec![],
            pips: vec![],
            next_layer_id: 1,
        }
    }
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> &[TextOverlay] {
        &self.texts
    }

    pub fn pips(&self) -> &[PipLayer] {
        &self.pips
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.pips.is_empty()
    }

    pub fn add_text(&mut self, spec: TextOverlaySpec) -> Result<LayerId, OverlayError> {
        check_window(spec.start_time, spec.end_time)?;
        let id = self.allocate_id();
        self.texts.push(TextOverlay {
            id,
            text: spec.text,
            x_percent: clamp_percent(spec.position.x),
            y_percent: clamp_percent(spec.position.y),
            font_size_px: spec.font_size_px.max(1.0),
            color: spec.color,
            font_family: spec.font_family,
            font_weight: spec.font_weight,
            start_time: spec.start_time,
            end_time: spec.end_time,
        });
        Ok(id)
    }

    pub fn add_pip(&mut self, spec: PipLayerSpec) -> Result<LayerId, OverlayError> {
        check_window(spec.start_time, spec.end_time)?;
        let id = self.allocate_id();
        self.pips.push(PipLayer {
            id,
            kind: spec.kind,
            source: spec.source,
            x_percent: clamp_percent(spec.rect.x),
            y_percent: clamp_percent(spec.rect.y),
            width_percent: clamp_percent(spec.rect.w).max(1.0),
            height_percent: clamp_percent(spec.rect.h).max(1.0),
            opacity: spec.opacity.clamp(0.0, 1.0),
            start_time: spec.start_time,
            end_time: spec.end_time,
        });
        Ok(id)
    }

    pub fn text(&self, id: LayerId) -> Option<&TextOverlay> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn pip(&self, id: LayerId) -> Option<&PipLayer> {
        self.pips.iter().find(|p| p.id == id)
    }

    /// Edit the text and style of an overlay in place.
    pub fn update_text(
        &mut self,
        id: LayerId,
        edit: impl FnOnce(&mut TextOverlay),
    ) -> Result<(), OverlayError> {
        let overlay = self
            .texts
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(OverlayError::UnknownLayer { id })?;
        let before = overlay.clone();
        edit(overlay);
        if let Err(err) = check_window(overlay.start_time, overlay.end_time) {
            *overlay = before;
            return Err(err);
        }
        overlay.x_percent = clamp_percent(overlay.x_percent);
        overlay.y_percent = clamp_percent(overlay.y_percent);
        Ok(())
    }

    /// Change a layer's visibility window.
    pub fn set_window(
        &mut self,
        layer: LayerRef,
        start_time: f64,
        end_time: f64,
    ) -> Result<(), OverlayError> {
        check_window(start_time, end_time)?;
        match layer {
            LayerRef::Text(id) => {
                let t = self
                    .texts
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or(OverlayError::UnknownLayer { id })?;
                t.start_time = start_time;
                t.end_time = end_time;
            }
            LayerRef::Pip(id) => {
                let p = self
                    .pips
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(OverlayError::UnknownLayer { id })?;
                p.start_time = start_time;
                p.end_time = end_time;
            }
        }
        Ok(())
    }

    /// Current anchor of a layer.
    pub fn position_of(&self, layer: LayerRef) -> Option<PercentPoint> {
        match layer {
            LayerRef::Text(id) => self.text(id).map(TextOverlay::position),
            LayerRef::Pip(id) => self.pip(id).map(PipLayer::position),
        }
    }

    /// Move a layer's anchor, clamped to `[0, 100]` on both axes.
    pub fn set_position(
        &mut self,
        layer: LayerRef,
        position: PercentPoint,
    ) -> Result<PercentPoint, OverlayError> {
        let clamped = PercentPoint::clamped(position.x, position.y);
        match layer {
            LayerRef::Text(id) => {
                let t = self
                    .texts
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or(OverlayError::UnknownLayer { id })?;
                t.x_percent = clamped.x;
                t.y_percent = clamped.y;
            }
            LayerRef::Pip(id) => {
                let p = self
                    .pips
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(OverlayError::UnknownLayer { id })?;
                p.x_percent = clamped.x;
                p.y_percent = clamped.y;
            }
        }
        Ok(clamped)
    }

    pub fn remove_text(&mut self, id: LayerId) -> Result<TextOverlay, OverlayError> {
        let index = self
            .texts
            .iter()
            .position(|t| t.id == id)
            .ok_or(OverlayError::UnknownLayer { id })?;
        Ok(self.texts.remove(index))
    }

    pub fn remove_pip(&mut self, id: LayerId) -> Result<PipLayer, OverlayError> {
        let index = self
            .pips
            .iter()
            .position(|p| p.id == id)
            .ok_or(OverlayError::UnknownLayer { id })?;
        Ok(self.pips.remove(index))
    }

    pub fn visible_texts(&self, t: f64) -> impl Iterator<Item = &TextOverlay> {
        self.texts.iter().filter(move |o| o.is_visible_at(t))
    }

    pub fn visible_pips(&self, t: f64) -> impl Iterator<Item = &PipLayer> {
        self.pips.iter().filter(move |p| p.is_visible_at(t))
    }

    /// Topmost visible layer under `point` at time `t`.
    ///
    /// Text overlays draw above PiP layers, and later layers above earlier
    /// ones, so the search runs in reverse draw order. Text hit boxes are
    /// estimated from the font size since glyph metrics live in the renderer.
    pub fn hit_test(
        &self,
        point: PercentPoint,
        t: f64,
        raster_width: u32,
        raster_height: u32,
    ) -> Option<LayerRef> {
        let text_hit = self.texts.iter().rev().find(|o| {
            if !o.is_visible_at(t) {
                return false;
            }
            let chars = o.text.chars().count().max(1) as f64;
            let w = chars * o.font_size_px * 0.6 / raster_width.max(1) as f64 * 100.0;
            let h = o.font_size_px * 1.2 / raster_height.max(1) as f64 * 100.0;
            PercentRect::new(o.x_percent, o.y_percent, w, h).contains(&point)
        });
        if let Some(o) = text_hit {
            return Some(LayerRef::Text(o.id));
        }
        self.pips
            .iter()
            .rev()
            .find(|p| p.is_visible_at(t) && p.rect().contains(&point))
            .map(|p| LayerRef::Pip(p.id))
    }

    /// Check every layer's window.
    pub fn validate(&self) -> Result<(), OverlayError> {
        for t in &self.texts {
            check_window(t.start_time, t.end_time)?;
        }
        for p in &self.pips {
            check_window(p.start_time, p.end_time)?;
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }
}

fn check_window(start_time: f64, end_time: f64) -> Result<(), OverlayError> {
    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 || start_time >= end_time
    {
        return Err(OverlayError::InvalidWindow {
            start_time,
            end_time,
        });
    }
    Ok(())
}

/// Errors raised by overlay edits. Display strings are user-facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverlayError {
    #[error("Overlay must start before it ends (got {start_time:.2}s to {end_time:.2}s)")]
    InvalidWindow { start_time: f64, end_time: f64 },

    #[error("Overlay {id} no longer exists")]
    UnknownLayer { id: LayerId },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pip_spec(start: f64, end: f64) -> PipLayerSpec {
        PipLayerSpec {
            kind: PipKind::Image,
            source: "logo.png".to_string(),
            rect: PercentRect::new(60.0, 60.0, 30.0, 30.0),
            opacity: 0.8,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_visibility_window_is_inclusive() {
        assert!(window_contains(2.0, 6.0, 4.0));
        assert!(window_contains(2.0, 6.0, 2.0));
        assert!(window_contains(2.0, 6.0, 6.0));
        assert!(!window_contains(2.0, 6.0, 7.0));
        assert!(!window_contains(2.0, 6.0, 1.99));
    }

    #[test]
    fn test_add_and_filter_visible_layers() {
        let mut set = OverlaySet::new();
        let title = set.add_text(TextOverlaySpec::new("Hello", 2.0, 6.0)).unwrap();
        let logo = set.add_pip(pip_spec(0.0, 3.0)).unwrap();
        assert_ne!(title, logo);

        let at4: Vec<LayerId> = set.visible_texts(4.0).map(|t| t.id).collect();
        assert_eq!(at4, vec![title]);
        assert_eq!(set.visible_texts(7.0).count(), 0);
        assert_eq!(set.visible_pips(2.5).count(), 1);
        assert_eq!(set.visible_pips(4.0).count(), 0);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let mut set = OverlaySet::new();
        assert!(matches!(
            set.add_text(TextOverlaySpec::new("x", 5.0, 5.0)),
            Err(OverlayError::InvalidWindow { .. })
        ));
        assert!(set.add_pip(pip_spec(-1.0, 2.0)).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_update_text_rolls_back_invalid_window() {
        let mut set = OverlaySet::new();
        let id = set.add_text(TextOverlaySpec::new("Hi", 0.0, 4.0)).unwrap();
        set.update_text(id, |t| t.text = "Hey".to_string()).unwrap();
        assert_eq!(set.text(id).unwrap().text, "Hey");

        let result = set.update_text(id, |t| {
            t.text = "broken".to_string();
            t.end_time = -1.0;
        });
        assert!(result.is_err());
        assert_eq!(set.text(id).unwrap().text, "Hey");
    }

    #[test]
    fn test_set_position_clamps() {
        let mut set = OverlaySet::new();
        let id = set.add_pip(pip_spec(0.0, 3.0)).unwrap();
        let applied = set
            .set_position(LayerRef::Pip(id), PercentPoint::new(120.0, -4.0))
            .unwrap();
        assert_eq!(applied, PercentPoint::new(100.0, 0.0));
        assert_eq!(set.position_of(LayerRef::Pip(id)), Some(applied));
    }

    #[test]
    fn test_hit_test_prefers_text_over_pip() {
        let mut set = OverlaySet::new();
        let pip = set.add_pip(pip_spec(0.0, 10.0)).unwrap();
        let mut spec = TextOverlaySpec::new("Caption", 0.0, 10.0);
        spec.position = PercentPoint::new(62.0, 62.0);
        let text = set.add_text(spec).unwrap();

        assert_eq!(
            set.hit_test(PercentPoint::new(63.0, 63.0), 1.0, 1080, 1920),
            Some(LayerRef::Text(text))
        );
        assert_eq!(
            set.hit_test(PercentPoint::new(85.0, 85.0), 1.0, 1080, 1920),
            Some(LayerRef::Pip(pip))
        );
        assert_eq!(
            set.hit_test(PercentPoint::new(10.0, 10.0), 1.0, 1080, 1920),
            None
        );
    }

    #[test]
    fn test_remove_unknown_layer() {
        let mut set = OverlaySet::new();
        let id = set.add_pip(pip_spec(0.0, 1.0)).unwrap();
        assert!(set.remove_pip(id).is_ok());
        assert_eq!(
            set.remove_pip(id),
            Err(OverlayError::UnknownLayer { id })
        );
    }
}
