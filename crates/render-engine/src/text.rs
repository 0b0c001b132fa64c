//! Text rasterization.
//!
//! Glyphs are laid out with the face's advances and kerning, rasterized to
//! a coverage mask, and blended onto the canvas with the text color's alpha
//! scaled by coverage. `size_px` is the line height of the face (ascent to
//! descent) in pixels.

use ab_glyph::{point, Font, GlyphId, PxScale, ScaleFont};
use image::{Pixel, Rgba, RgbaImage};

use clipforge_project_model::color::Color;

use crate::fonts::Face;

/// How to draw a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_px: f64,
    pub color: Color,
    pub bold: bool,
}

/// Glyph positions and box size of laid-out text.
struct Layout {
    glyphs: Vec<ab_glyph::Glyph>,
    width: u32,
    height: u32,
    embolden_px: u32,
}

fn layout(face: &Face, text: &str, size_px: f64) -> Layout {
    let scale = PxScale::from(size_px.max(1.0) as f32);
    let scaled = face.font.as_scaled(scale);
    let line_height = scaled.height() + scaled.line_gap();
    let embolden_px = if face.synthetic_bold {
        ((size_px / 24.0).round() as u32).max(1)
    } else {
        0
    };

    let mut glyphs = Vec::with_capacity(text.len());
    let mut widest = 0.0f32;
    let mut lines = 0usize;
    for (line_no, line) in text.split('\n').enumerate() {
        let baseline = scaled.ascent() + line_no as f32 * line_height;
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, baseline)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        widest = widest.max(caret);
        lines = line_no + 1;
    }

    let height = scaled.height() + lines.saturating_sub(1) as f32 * line_height;
    let width = if widest > 0.0 {
        widest.ceil() as u32 + embolden_px
    } else {
        0
    };
    Layout {
        glyphs,
        width,
        height: height.ceil().max(0.0) as u32,
        embolden_px,
    }
}

/// Pixel size `(width, height)` of `text` set in `face` at `size_px`.
pub fn measure(face: &Face, text: &str, size_px: f64) -> (u32, u32) {
    let layout = layout(face, text, size_px);
    (layout.width, layout.height)
}

/// Draw `text` with its top-left corner at `(x, y)`, blended at `opacity`.
pub fn draw_text(
    canvas: &mut RgbaImage,
    face: &Face,
    text: &str,
    x: i64,
    y: i64,
    style: &TextStyle,
    opacity: f64,
) {
    let color = style.color.with_opacity(opacity.clamp(0.0, 1.0));
    if color.a == 0 || text.is_empty() {
        return;
    }
    let layout = layout(face, text, style.size_px);
    let (mask_w, mask_h) = (layout.width as i64, layout.height as i64);
    if mask_w == 0 || mask_h == 0 {
        return;
    }

    let mut coverage = vec![0.0f32; (mask_w * mask_h) as usize];
    for glyph in layout.glyphs {
        let Some(outlined) = face.font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        let (left, top) = (bounds.min.x.floor() as i64, bounds.min.y.floor() as i64);
        outlined.draw(|gx, gy, c| {
            let my = top + gy as i64;
            if my < 0 || my >= mask_h {
                return;
            }
            for dx in 0..=layout.embolden_px as i64 {
                let mx = left + gx as i64 + dx;
                if mx < 0 || mx >= mask_w {
                    continue;
                }
                let cell = &mut coverage[(my * mask_w + mx) as usize];
                *cell = cell.max(c.clamp(0.0, 1.0));
            }
        });
    }

    let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);
    for my in 0..mask_h {
        let py = y + my;
        if py < 0 || py >= canvas_h {
            continue;
        }
        for mx in 0..mask_w {
            let px = x + mx;
            let c = coverage[(my * mask_w + mx) as usize];
            if c <= 0.0 || px < 0 || px >= canvas_w {
                continue;
            }
            let alpha = (color.a as f32 * c).round().clamp(0.0, 255.0) as u8;
            let ink = Rgba([color.r, color.g, color.b, alpha]);
            canvas.get_pixel_mut(px as u32, py as u32).blend(&ink);
        }
    }
}
