//! Effect stack: filter preset, parametric adjustments, and rotation.
//!
//! [`EffectStack::compile`] turns the stack into a [`TransformDescriptor`],
//! the single description applied to every rendered frame in preview and in
//! export.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named color filter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterPreset {
    #[default]
    None,
    Grayscale,
    Sepia,
    Vintage,
    Warm,
    Cool,
    Vivid,
    Faded,
    Noir,
    Invert,
}

impl FilterPreset {
    pub const ALL: [FilterPreset; 10] = [
        FilterPreset::None,
        FilterPreset::Grayscale,
        FilterPreset::Sepia,
        FilterPreset::Vintage,
        FilterPreset::Warm,
        FilterPreset::Cool,
        FilterPreset::Vivid,
        FilterPreset::Faded,
        FilterPreset::Noir,
        FilterPreset::Invert,
    ];

    pub fn id(self) -> &'static str {
        match self {
            FilterPreset::None => "none",
            FilterPreset::Grayscale => "grayscale",
            FilterPreset::Sepia => "sepia",
            FilterPreset::Vintage => "vintage",
            FilterPreset::Warm => "warm",
            FilterPreset::Cool => "cool",
            FilterPreset::Vivid => "vivid",
            FilterPreset::Faded => "faded",
            FilterPreset::Noir => "noir",
            FilterPreset::Invert => "invert",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    /// The preset's base filter chain. `None` is the identity.
    pub fn base_ops(self) -> Vec<FilterOp> {
        use FilterOp::*;
        match self {
            FilterPreset::None => vec![],
            FilterPreset::Grayscale => vec![Grayscale(1.0)],
            FilterPreset::Sepia => vec![Sepia(1.0)],
            FilterPreset::Vintage => vec![Sepia(0.5), Contrast(1.2), Brightness(0.9)],
            FilterPreset::Warm => vec![Sepia(0.3), Saturate(1.3), HueRotate(-10.0)],
            FilterPreset::Cool => vec![Saturate(0.9), HueRotate(30.0), Brightness(1.05)],
            FilterPreset::Vivid => vec![Saturate(1.6), Contrast(1.1)],
            FilterPreset::Faded => vec![Contrast(0.8), Saturate(0.7), Brightness(1.1)],
            FilterPreset::Noir => vec![Grayscale(1.0), Contrast(1.5), Brightness(0.8)],
            FilterPreset::Invert => vec![Invert(1.0)],
        }
    }
}

/// One elementary color/blur operation. Factors follow CSS filter
/// semantics: `1.0` is the identity for scale operations, `0.0` for amounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FilterOp {
    Brightness(f64),
    Contrast(f64),
    Saturate(f64),
    Grayscale(f64),
    Sepia(f64),
    Invert(f64),
    /// Hue rotation in degrees.
    HueRotate(f64),
    /// Blur radius in pixels.
    Blur(f64),
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Brightness(v) => write!(f, "brightness({v:.2})"),
            FilterOp::Contrast(v) => write!(f, "contrast({v:.2})"),
            FilterOp::Saturate(v) => write!(f, "saturate({v:.2})"),
            FilterOp::Grayscale(v) => write!(f, "grayscale({v:.2})"),
            FilterOp::Sepia(v) => write!(f, "sepia({v:.2})"),
            FilterOp::Invert(v) => write!(f, "invert({v:.2})"),
            FilterOp::HueRotate(v) => write!(f, "hue-rotate({v:.0}deg)"),
            FilterOp::Blur(v) => write!(f, "blur({v:.0}px)"),
        }
    }
}

/// Continuous adjustment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Hue,
}

impl Adjustment {
    /// Canonical compile order.
    pub const ORDER: [Adjustment; 5] = [
        Adjustment::Brightness,
        Adjustment::Contrast,
        Adjustment::Saturation,
        Adjustment::Blur,
        Adjustment::Hue,
    ];

    /// Declared `(min, max)` domain.
    pub fn domain(self) -> (f64, f64) {
        match self {
            Adjustment::Brightness | Adjustment::Contrast | Adjustment::Saturation => {
                (0.0, 200.0)
            }
            Adjustment::Blur => (0.0, 20.0),
            Adjustment::Hue => (-180.0, 180.0),
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            Adjustment::Brightness | Adjustment::Contrast | Adjustment::Saturation => 100.0,
            Adjustment::Blur | Adjustment::Hue => 0.0,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "brightness" => Some(Adjustment::Brightness),
            "contrast" => Some(Adjustment::Contrast),
            "saturation" => Some(Adjustment::Saturation),
            "blur" => Some(Adjustment::Blur),
            "hue" => Some(Adjustment::Hue),
            _ => None,
        }
    }

    /// The elementary op this parameter contributes at `value`.
    fn to_op(self, value: f64) -> FilterOp {
        match self {
            Adjustment::Brightness => FilterOp::Brightness(value / 100.0),
            Adjustment::Contrast => FilterOp::Contrast(value / 100.0),
            Adjustment::Saturation => FilterOp::Saturate(value / 100.0),
            Adjustment::Blur => FilterOp::Blur(value),
            Adjustment::Hue => FilterOp::HueRotate(value),
        }
    }
}

/// Current parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Percent, 100 = unchanged.
    pub brightness: f64,
    /// Percent, 100 = unchanged.
    pub contrast: f64,
    /// Percent, 100 = unchanged.
    pub saturation: f64,
    /// Pixels.
    pub blur_radius: f64,
    /// Degrees.
    pub hue_degrees: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: Adjustment::Brightness.default_value(),
            contrast: Adjustment::Contrast.default_value(),
            saturation: Adjustment::Saturation.default_value(),
            blur_radius: Adjustment::Blur.default_value(),
            hue_degrees: Adjustment::Hue.default_value(),
        }
    }
}

impl Adjustments {
    pub fn get(&self, adjustment: Adjustment) -> f64 {
        match adjustment {
            Adjustment::Brightness => self.brightness,
            Adjustment::Contrast => self.contrast,
            Adjustment::Saturation => self.saturation,
            Adjustment::Blur => self.blur_radius,
            Adjustment::Hue => self.hue_degrees,
        }
    }

    fn slot(&mut self, adjustment: Adjustment) -> &mut f64 {
        match adjustment {
            Adjustment::Brightness => &mut self.brightness,
            Adjustment::Contrast => &mut self.contrast,
            Adjustment::Saturation => &mut self.saturation,
            Adjustment::Blur => &mut self.blur_radius,
            Adjustment::Hue => &mut self.hue_degrees,
        }
    }
}

/// The compiled, per-frame transform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformDescriptor {
    /// Clockwise rotation in degrees, `[0, 360)`. Applied before filters.
    pub rotation_degrees: f64,
    /// Filter chain in application order.
    pub ops: Vec<FilterOp>,
}

impl TransformDescriptor {
    pub fn is_identity(&self) -> bool {
        self.rotation_degrees == 0.0 && self.ops.is_empty()
    }

    /// Whether rotation swaps the output's width and height.
    pub fn swaps_dimensions(&self) -> bool {
        let quarter = (self.rotation_degrees / 90.0).round() as i64;
        (self.rotation_degrees - quarter as f64 * 90.0).abs() < 1e-9 && quarter % 2 == 1
    }

    /// Largest blur radius in the chain, if any.
    pub fn blur_radius(&self) -> Option<f64> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FilterOp::Blur(r) => Some(*r),
                _ => None,
            })
            .reduce(f64::max)
    }
}

impl fmt::Display for TransformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            write!(f, "none")?;
        } else {
            let chain: Vec<String> = self.ops.iter().map(|op| op.to_string()).collect();
            write!(f, "{}", chain.join(" "))?;
        }
        if self.rotation_degrees != 0.0 {
            write!(f, " rotate({:.0}deg)", self.rotation_degrees)?;
        }
        Ok(())
    }
}

/// Preset, adjustments, and rotation applied uniformly to every frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectStack {
    pub preset: FilterPreset,
    pub adjustments: Adjustments,
    /// Clockwise rotation in degrees, normalized to `[0, 360)`.
    pub rotation_degrees: f64,
}

impl EffectStack {
    /// Compile the stack: preset ops first, then every adjustment that
    /// differs from its default, in canonical order.
    pub fn compile(&self) -> TransformDescriptor {
        let mut ops = self.preset.base_ops();
        for adjustment in Adjustment::ORDER {
            let value = self.adjustments.get(adjustment);
            if (value - adjustment.default_value()).abs() > f64::EPSILON {
                ops.push(adjustment.to_op(value));
            }
        }
        TransformDescriptor {
            rotation_degrees: normalize_degrees(self.rotation_degrees),
            ops,
        }
    }

    /// Set an adjustment, clamped to its domain. Returns the stored value.
    pub fn set_adjustment(&mut self, adjustment: Adjustment, value: f64) -> f64 {
        let (lo, hi) = adjustment.domain();
        let value = if value.is_nan() {
            adjustment.default_value()
        } else {
            value.clamp(lo, hi)
        };
        *self.adjustments.slot(adjustment) = value;
        value
    }

    pub fn set_preset(&mut self, preset: FilterPreset) {
        self.preset = preset;
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation_degrees = normalize_degrees(degrees);
    }

    pub fn rotate_clockwise(&mut self) {
        self.set_rotation(self.rotation_degrees + 90.0);
    }

    pub fn rotate_counterclockwise(&mut self) {
        self.set_rotation(self.rotation_degrees - 90.0);
    }

    /// Back to the identity transform.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    if (normalized - 360.0).abs() < 1e-9 {
        0.0
    } else {
        normalized
    }
}
