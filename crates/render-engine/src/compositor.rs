//! Frame compositor: combines the source frame, effects, and overlays.
//!
//! [`compute_compositions`] decides, for every output frame, which source
//! time to sample and which overlays are visible. [`Compositor`] then turns
//! a decoded frame plus those instructions into the output raster.

use std::borrow::Cow;

use image::imageops::{overlay, resize, FilterType};
use image::{Rgba, RgbaImage};

use clipforge_common::clock::{frame_time_secs, frames_for_duration};
use clipforge_project_model::effects::TransformDescriptor;
use clipforge_project_model::overlay::{FontWeight, LayerId, OverlaySet, PipLayer, TextOverlay};
use clipforge_project_model::timeline::Timeline;

use crate::filters::apply_transform;
use crate::fonts::FontBook;
use crate::text::{draw_text, TextStyle};

/// A single frame's composition instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameComposition {
    /// Output frame number across the whole export.
    pub frame_index: u64,

    /// Index of the clip the frame belongs to.
    pub clip_index: usize,

    /// Source time to sample.
    pub source_secs: f64,

    /// Timeline time, used for overlay visibility.
    pub global_secs: f64,

    /// Visible PiP layers in draw order.
    pub pips: Vec<LayerId>,

    /// Visible text overlays in draw order.
    pub texts: Vec<LayerId>,
}

/// Compositions for every frame of one clip. `first_frame_index` is the
/// output index of the clip's first frame.
pub fn clip_compositions(
    timeline: &Timeline,
    overlays: &OverlaySet,
    clip_index: usize,
    first_frame_index: u64,
    fps: u32,
) -> Vec<FrameComposition> {
    let clip = match timeline.clip(clip_index) {
        Some(clip) => clip,
        None => return Vec::new(),
    };
    let global_start = timeline.global_start_of(clip_index);
    let frame_count = frames_for_duration(clip.duration(), fps);

    (0..frame_count)
        .map(|f| {
            let offset = frame_time_secs(f, fps);
            let global_secs = global_start + offset;
            FrameComposition {
                frame_index: first_frame_index + f,
                clip_index,
                source_secs: clip.start + offset,
                global_secs,
                pips: overlays.visible_pips(global_secs).map(|p| p.id).collect(),
                texts: overlays.visible_texts(global_secs).map(|t| t.id).collect(),
            }
        })
        .collect()
}

/// Compute the composition for each frame of the timeline.
pub fn compute_compositions(
    timeline: &Timeline,
    overlays: &OverlaySet,
    fps: u32,
) -> Vec<FrameComposition> {
    let mut compositions = Vec::new();
    for index in 0..timeline.len() {
        let first = compositions.len() as u64;
        compositions.extend(clip_compositions(timeline, overlays, index, first, fps));
    }
    compositions
}

/// Draws composed frames onto a fixed-size raster.
#[derive(Debug, Clone)]
pub struct Compositor {
    width: u32,
    height: u32,
    descriptor: TransformDescriptor,
    fonts: FontBook,
}

impl Compositor {
    pub fn new(width: u32, height: u32, descriptor: TransformDescriptor) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            descriptor,
            fonts: FontBook::default(),
        }
    }

    /// Faces used for captions. Families must already be loaded.
    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Compose one output frame.
    ///
    /// `pip_frames` pairs each visible PiP layer with its decoded frame;
    /// layers are drawn in slice order, then text overlays on top.
    pub fn compose(
        &self,
        source_frame: &RgbaImage,
        composition: &FrameComposition,
        overlays: &OverlaySet,
        pip_frames: &[(&PipLayer, &RgbaImage)],
    ) -> RgbaImage {
        let mut canvas = self.draw_base(source_frame);
        for (layer, frame) in pip_frames {
            self.draw_pip(&mut canvas, layer, frame);
        }
        for id in &composition.texts {
            if let Some(text) = overlays.text(*id) {
                self.draw_caption(&mut canvas, text);
            }
        }
        canvas
    }

    /// The source frame with effects applied, fitted onto the raster.
    pub fn draw_base(&self, source_frame: &RgbaImage) -> RgbaImage {
        let filtered = if self.descriptor.is_identity() {
            Cow::Borrowed(source_frame)
        } else {
            Cow::Owned(apply_transform(source_frame, &self.descriptor))
        };
        if filtered.dimensions() == (self.width, self.height) {
            return filtered.into_owned();
        }
        letterbox(&filtered, self.width, self.height)
    }

    pub fn draw_pip(&self, canvas: &mut RgbaImage, layer: &PipLayer, frame: &RgbaImage) {
        let (x, y, w, h) = layer.rect().to_pixels(self.width, self.height);
        let mut scaled = resize(frame, w, h, FilterType::Triangle);
        if layer.opacity < 1.0 {
            apply_opacity(&mut scaled, layer.opacity);
        }
        overlay(canvas, &scaled, x, y);
    }

    pub fn draw_caption(&self, canvas: &mut RgbaImage, text: &TextOverlay) {
        let bold = text.font_weight == FontWeight::Bold;
        let Some(face) = self.fonts.get(&text.font_family, bold) else {
            tracing::debug!(
                layer = %text.id,
                family = %text.font_family,
                "No face loaded for caption"
            );
            return;
        };
        let (x, y) = text.position().to_pixels(self.width as f64, self.height as f64);
        let style = TextStyle {
            size_px: text.font_size_px,
            color: text.color,
            bold,
        };
        draw_text(canvas, face, &text.text, x.round() as i64, y.round() as i64, &style, 1.0);
    }
}

/// Multiply every pixel's alpha by `opacity`.
pub fn apply_opacity(image: &mut RgbaImage, opacity: f64) {
    let opacity = opacity.clamp(0.0, 1.0);
    for pixel in image.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f64 * opacity).round().clamp(0.0, 255.0) as u8;
    }
}

/// Scale `image` to fit inside `width`x`height`, centered on black.
pub fn letterbox(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 255]));
    let (w, h) = fit_within(image.width(), image.height(), width, height);
    let scaled = resize(image, w, h, FilterType::Triangle);
    let x = (width as i64 - w as i64) / 2;
    let y = (height as i64 - h as i64) / 2;
    overlay(&mut canvas, &scaled, x, y);
    canvas
}

/// Largest size with the source's aspect ratio that fits the box.
pub fn fit_within(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let (sw, sh) = (src_w.max(1) as f64, src_h.max(1) as f64);
    let scale = (box_w as f64 / sw).min(box_h as f64 / sh);
    let w = (sw * scale).round().max(1.0) as u32;
    let h = (sh * scale).round().max(1.0) as u32;
    (w.min(box_w.max(1)), h.min(box_h.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::clip::{Clip, ClipId};
    use clipforge_project_model::color::Color;
    use clipforge_project_model::effects::EffectStack;
    use clipforge_project_model::geometry::{PercentPoint, PercentRect};
    use clipforge_project_model::overlay::{PipKind, PipLayerSpec, TextOverlaySpec};

    fn two_clip_timeline() -> Timeline {
        let mut first = Clip::new(ClipId(1), 0.0, 10.0);
        first.end = 4.0;
        let mut second = Clip::new(ClipId(2), 0.0, 10.0);
        second.start = 6.0;
        Timeline::from_clips(vec![first, second]).unwrap()
    }

    #[test]
    fn test_frame_counts_per_clip() {
        let timeline = two_clip_timeline();
        let comps = compute_compositions(&timeline, &OverlaySet::new(), 30);
        assert_eq!(comps.len(), 240);
        assert_eq!(comps[120].clip_index, 1);
        assert_eq!(comps[120].frame_index, 120);
        assert_eq!(comps[120].source_secs, 6.0);
        assert_eq!(comps[120].global_secs, 4.0);
    }

    #[test]
    fn test_overlay_visibility_uses_timeline_time() {
        let timeline = two_clip_timeline();
        let mut overlays = OverlaySet::new();
        let id = overlays
            .add_text(TextOverlaySpec::new("Hi", 2.0, 6.0))
            .unwrap();
        let comps = compute_compositions(&timeline, &overlays, 30);

        // Global 4s (source 6s) shows the caption; global 7s does not.
        let at_4 = comps.iter().find(|c| (c.global_secs - 4.0).abs() < 1e-9).unwrap();
        assert_eq!(at_4.texts, vec![id]);
        let at_7 = comps.iter().find(|c| (c.global_secs - 7.0).abs() < 1e-9).unwrap();
        assert!(at_7.texts.is_empty());
        assert_eq!(at_7.source_secs, 9.0);
    }

    #[test]
    fn test_compose_draws_pip_then_text() {
        let mut overlays = OverlaySet::new();
        let pip_id = overlays
            .add_pip(PipLayerSpec {
                kind: PipKind::Image,
                source: "a.png".to_string(),
                rect: PercentRect::new(0.0, 0.0, 50.0, 50.0),
                opacity: 1.0,
                start_time: 0.0,
                end_time: 5.0,
            })
            .unwrap();
        let mut spec = TextOverlaySpec::new("H", 0.0, 5.0);
        spec.position = PercentPoint::new(0.0, 0.0);
        spec.font_size_px = 16.0;
        spec.font_weight = FontWeight::Bold;
        spec.color = Color::rgb(0, 255, 0);
        let text_id = overlays.add_text(spec).unwrap();

        let mut fonts = FontBook::system(&[]);
        fonts.load("sans-serif", true).unwrap();
        let compositor =
            Compositor::new(40, 40, EffectStack::default().compile()).with_fonts(fonts);
        let source = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let pip_frame = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let comp = FrameComposition {
            frame_index: 0,
            clip_index: 0,
            source_secs: 0.0,
            global_secs: 0.0,
            pips: vec![pip_id],
            texts: vec![text_id],
        };
        let pip = overlays.pip(pip_id).unwrap();
        let out = compositor.compose(&source, &comp, &overlays, &[(pip, &pip_frame)]);

        // Caption over the PiP, PiP elsewhere in its rect, source outside.
        let green = Rgba([0, 255, 0, 255]);
        assert!((0..16).any(|y| (0..16).any(|x| *out.get_pixel(x, y) == green)));
        assert_eq!(*out.get_pixel(18, 18), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(30, 30), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_caption_without_loaded_face_is_skipped() {
        let mut overlays = OverlaySet::new();
        let id = overlays.add_text(TextOverlaySpec::new("Hi", 0.0, 5.0)).unwrap();
        let compositor = Compositor::new(20, 20, EffectStack::default().compile());
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        compositor.draw_caption(&mut canvas, overlays.text(id).unwrap());
        assert!(canvas.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_base_frame_letterboxed_when_rotated() {
        let mut stack = EffectStack::default();
        stack.rotate_clockwise();
        let compositor = Compositor::new(40, 20, stack.compile());
        let source = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]));
        let out = compositor.draw_base(&source);
        assert_eq!(out.dimensions(), (40, 20));
        // Rotated frame is 20x40, fitted to 10x20 in the middle.
        assert_eq!(*out.get_pixel(0, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(20, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_letterbox_wide_image_into_portrait() {
        let wide = RgbaImage::from_pixel(200, 100, Rgba([255, 0, 0, 255]));
        let out = letterbox(&wide, 100, 200);
        assert_eq!(out.dimensions(), (100, 200));
        assert_eq!(*out.get_pixel(50, 10), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(50, 100), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(1920, 1080, 1080, 1920), (1080, 608));
        assert_eq!(fit_within(100, 100, 50, 80), (50, 50));
    }

    #[test]
    fn test_apply_opacity() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([9, 9, 9, 200]));
        apply_opacity(&mut img, 0.5);
        assert_eq!(img.get_pixel(0, 0).0[3], 100);
    }
}
