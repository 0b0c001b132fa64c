//! Normalized layer geometry.
//!
//! Overlay positions are expressed in percent of the output raster,
//! `(0, 0)` top-left and `(100, 100)` bottom-right, so they survive any
//! change of output resolution.

use serde::{Deserialize, Serialize};

/// Upper bound of the percent coordinate space.
pub const PERCENT_MAX: f64 = 100.0;

/// A point in percent coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create a point clamped to `[0, 100]` on both axes.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_percent(x),
            y: clamp_percent(y),
        }
    }

    /// Convert a pixel position on a surface of the given size into percent.
    pub fn from_pixels(px: f64, py: f64, width: f64, height: f64) -> Self {
        Self {
            x: px / width.max(1.0) * PERCENT_MAX,
            y: py / height.max(1.0) * PERCENT_MAX,
        }
    }

    /// Pixel position on a surface of the given size.
    pub fn to_pixels(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x / PERCENT_MAX * width, self.y / PERCENT_MAX * height)
    }

    /// Component-wise difference `self - other`.
    pub fn offset_from(&self, other: &PercentPoint) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

/// A rectangle in percent coordinates (top-left anchored).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PercentRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Pixel rectangle `(x, y, w, h)` on a surface of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (i64, i64, u32, u32) {
        let (fw, fh) = (width as f64, height as f64);
        let x = (self.x / PERCENT_MAX * fw).round() as i64;
        let y = (self.y / PERCENT_MAX * fh).round() as i64;
        let w = (self.w / PERCENT_MAX * fw).round().max(1.0) as u32;
        let h = (self.h / PERCENT_MAX * fh).round().max(1.0) as u32;
        (x, y, w, h)
    }

    pub fn contains(&self, p: &PercentPoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }
}

/// Clamp a percent coordinate into `[0, 100]`.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, PERCENT_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_point() {
        let p = PercentPoint::clamped(-5.0, 140.0);
        assert_eq!(p, PercentPoint::new(0.0, 100.0));
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn test_pixel_round_trip_on_portrait_raster() {
        let p = PercentPoint::from_pixels(540.0, 480.0, 1080.0, 1920.0);
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 25.0).abs() < 1e-9);
        let (px, py) = p.to_pixels(1080.0, 1920.0);
        assert!((px - 540.0).abs() < 1e-9);
        assert!((py - 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_to_pixels_never_zero_sized() {
        let rect = PercentRect::new(10.0, 10.0, 0.01, 0.01);
        let (x, y, w, h) = rect.to_pixels(100, 100);
        assert_eq!((x, y), (10, 10));
        assert_eq!((w, h), (1, 1));
    }

    #[test]
    fn test_rect_contains() {
        let rect = PercentRect::new(20.0, 20.0, 30.0, 30.0);
        assert!(rect.contains(&PercentPoint::new(35.0, 49.0)));
        assert!(!rect.contains(&PercentPoint::new(60.0, 30.0)));
    }
}
