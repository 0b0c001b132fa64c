//! Closing watermark: a wordmark fading in over a solid background.

use image::{Rgba, RgbaImage};

use clipforge_common::clock::frames_for_duration;
use clipforge_project_model::color::Color;

use crate::fonts::Face;
use crate::text::{draw_text, measure, TextStyle};

/// Wordmark line height relative to the raster's shorter side.
const WORDMARK_SCALE: f64 = 0.12;

/// Renders the frames appended after the last clip.
#[derive(Debug, Clone)]
pub struct ClosingSequence {
    width: u32,
    height: u32,
    frame_count: u64,
    wordmark: String,
    face: Option<Face>,
    background: Color,
    ink: Color,
}

impl ClosingSequence {
    pub fn new(width: u32, height: u32, fps: u32, duration_secs: f64, wordmark: &str) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_count: frames_for_duration(duration_secs, fps),
            wordmark: wordmark.to_string(),
            face: None,
            background: Color::BLACK,
            ink: Color::WHITE,
        }
    }

    /// Face the wordmark is set in. Without one only the background is
    /// drawn.
    pub fn with_face(mut self, face: Option<Face>) -> Self {
        self.face = face;
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wordmark opacity at frame `index`: linear from 0 on the first frame
    /// to 1 on the last.
    pub fn opacity_at(&self, index: u64) -> f64 {
        if self.frame_count <= 1 {
            return 1.0;
        }
        (index as f64 / (self.frame_count - 1) as f64).clamp(0.0, 1.0)
    }

    pub fn render(&self, index: u64) -> RgbaImage {
        let mut canvas =
            RgbaImage::from_pixel(self.width, self.height, Rgba(self.background.to_array()));
        let Some(face) = self.face.as_ref().filter(|_| !self.wordmark.is_empty()) else {
            return canvas;
        };

        // Size the wordmark by its line height, then shrink it to fit the width.
        let short_side = self.width.min(self.height) as f64;
        let mut size_px = short_side * WORDMARK_SCALE;
        let (text_w, _) = measure(face, &self.wordmark, size_px);
        let max_w = self.width as f64 * 0.9;
        if text_w as f64 > max_w {
            size_px *= max_w / text_w as f64;
        }
        let (text_w, text_h) = measure(face, &self.wordmark, size_px);
        let x = (self.width as i64 - text_w as i64) / 2;
        let y = (self.height as i64 - text_h as i64) / 2;

        let style = TextStyle {
            size_px,
            color: self.ink,
            bold: true,
        };
        draw_text(&mut canvas, face, &self.wordmark, x, y, &style, self.opacity_at(index));
        canvas
    }
}
