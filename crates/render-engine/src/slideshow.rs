//! Slideshow source: still images letterboxed onto a fixed raster.

use std::path::PathBuf;

use image::RgbaImage;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::media::{MediaKind, SourceMedia};

use crate::compositor::letterbox;
use crate::source::MediaSource;

/// Images shown back to back, each for `secs_per_slide`.
pub struct SlideshowSource {
    slides: Vec<RgbaImage>,
    secs_per_slide: f64,
    media: SourceMedia,
    current: Option<usize>,
}

impl SlideshowSource {
    /// Build from decoded images, letterboxing each onto `width`x`height`.
    pub fn from_images(
        images: Vec<RgbaImage>,
        secs_per_slide: f64,
        width: u32,
        height: u32,
    ) -> ClipforgeResult<Self> {
        if images.is_empty() {
            return Err(ClipforgeError::invalid_operation(
                "A slideshow needs at least one image",
            ));
        }
        if secs_per_slide.is_nan() || secs_per_slide <= 0.0 {
            return Err(ClipforgeError::invalid_operation(
                "Slide duration must be positive",
            ));
        }
        let slides: Vec<RgbaImage> = images
            .iter()
            .map(|img| letterbox(img, width, height))
            .collect();
        let media = SourceMedia::new(secs_per_slide * slides.len() as f64, width, height)
            .with_kind(MediaKind::Slideshow);
        Ok(Self {
            slides,
            secs_per_slide,
            media,
            current: None,
        })
    }

    /// Load images from disk.
    pub fn open(
        paths: &[PathBuf],
        secs_per_slide: f64,
        width: u32,
        height: u32,
    ) -> ClipforgeResult<Self> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let img = image::open(path).map_err(|e| {
                ClipforgeError::media(format!("Failed to load {}: {e}", path.display()))
            })?;
            images.push(img.to_rgba8());
        }
        tracing::info!(slides = images.len(), secs_per_slide, "Loaded slideshow");
        Self::from_images(images, secs_per_slide, width, height)
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn slide_index(&self, t: f64) -> usize {
        let index = (t.max(0.0) / self.secs_per_slide).floor() as usize;
        index.min(self.slides.len() - 1)
    }
}

#[async_trait::async_trait]
impl MediaSource for SlideshowSource {
    fn metadata(&self) -> &SourceMedia {
        &self.media
    }

    async fn seek(&mut self, source_secs: f64) -> ClipforgeResult<()> {
        self.current = Some(self.slide_index(source_secs));
        Ok(())
    }

    fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
        self.current
            .and_then(|i| self.slides.get(i))
            .ok_or_else(|| ClipforgeError::media("Slideshow has no current slide"))
    }

    fn name(&self) -> &str {
        "slideshow"
    }

    fn release(&mut self) {
        self.slides.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[tokio::test]
    async fn test_seek_selects_slide() {
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        let mut source = SlideshowSource::from_images(vec![red, blue], 2.0, 8, 8).unwrap();
        assert_eq!(source.metadata().duration_secs, 4.0);
        assert_eq!(source.metadata().kind, MediaKind::Slideshow);

        source.seek(2.5).await.unwrap();
        assert_eq!(*source.current_frame().unwrap().get_pixel(4, 4), Rgba([0, 0, 255, 255]));
        source.seek(99.0).await.unwrap();
        assert_eq!(*source.current_frame().unwrap().get_pixel(4, 4), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_empty_slideshow_rejected() {
        assert!(SlideshowSource::from_images(vec![], 1.0, 8, 8).is_err());
    }
}
