//! Easing curves and envelopes used by the preview engine.

use serde::{Deserialize, Serialize};

/// Progress curve applied to a linear `[0, 1]` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// `1 - (1 - t)^3`: fast start, gentle landing.
    #[default]
    EaseOutCubic,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = clamp_unit(t);
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Rises 0 → 1 over the first half and falls back to 0 over the second.
pub fn triangle(t: f64) -> f64 {
    1.0 - (2.0 * clamp_unit(t) - 1.0).abs()
}

/// `sin(t·π)`: zero at both ends, one in the middle.
pub fn sine_bump(t: f64) -> f64 {
    (clamp_unit(t) * std::f64::consts::PI).sin()
}

fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_cubic_endpoints_and_shape() {
        assert_eq!(Easing::EaseOutCubic.apply(0.0), 0.0);
        assert_eq!(Easing::EaseOutCubic.apply(1.0), 1.0);
        assert!((Easing::EaseOutCubic.apply(0.5) - 0.875).abs() < 1e-12);
        assert_eq!(Easing::EaseOutCubic.apply(2.0), 1.0);
        assert_eq!(Easing::Linear.apply(0.25), 0.25);
    }

    #[test]
    fn test_envelopes() {
        assert_eq!(triangle(0.0), 0.0);
        assert_eq!(triangle(0.5), 1.0);
        assert_eq!(triangle(1.0), 0.0);
        assert!(sine_bump(0.0).abs() < 1e-12);
        assert!((sine_bump(0.5) - 1.0).abs() < 1e-12);
        assert!(sine_bump(1.0).abs() < 1e-12);
        assert_eq!(triangle(f64::NAN), 0.0);
    }
}
