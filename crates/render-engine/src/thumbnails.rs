//! Per-clip thumbnails for the timeline strip.

use image::imageops;
use image::RgbaImage;

use clipforge_project_model::timeline::Timeline;

use crate::source::MediaSource;

/// Longest edge of a generated thumbnail.
pub const THUMBNAIL_SIZE: u32 = 160;

/// One thumbnail per clip, taken at the clip's midpoint and scaled to fit
/// `max_edge`. A clip whose frame cannot be read gets `None`.
pub async fn clip_thumbnails(
    timeline: &Timeline,
    source: &mut dyn MediaSource,
    max_edge: u32,
) -> Vec<Option<RgbaImage>> {
    let mut thumbs = Vec::with_capacity(timeline.len());
    for (index, clip) in timeline.clips().iter().enumerate() {
        let midpoint = clip.start + clip.duration() / 2.0;
        let thumb = match source.seek(midpoint).await {
            Ok(()) => match source.current_frame() {
                Ok(frame) => Some(fit_thumbnail(frame, max_edge)),
                Err(err) => {
                    tracing::warn!(clip = index, error = %err, "No frame for thumbnail");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(clip = index, at = midpoint, error = %err, "Thumbnail seek failed");
                None
            }
        };
        thumbs.push(thumb);
    }
    tracing::debug!(
        clips = timeline.len(),
        generated = thumbs.iter().filter(|t| t.is_some()).count(),
        "Generated clip thumbnails"
    );
    thumbs
}

/// Scale `frame` so its longest edge is at most `max_edge`.
pub fn fit_thumbnail(frame: &RgbaImage, max_edge: u32) -> RgbaImage {
    let max_edge = max_edge.max(1);
    let (w, h) = frame.dimensions();
    if w <= max_edge && h <= max_edge {
        return frame.clone();
    }
    let (tw, th) = crate::compositor::fit_within(w, h, max_edge, max_edge);
    imageops::thumbnail(frame, tw, th)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_common::error::{ClipforgeError, ClipforgeResult};
    use clipforge_project_model::clip::{Clip, ClipId};
    use clipforge_project_model::media::SourceMedia;

    use crate::source::TestPatternSource;

    #[tokio::test]
    async fn test_thumbnail_per_clip_at_midpoint() {
        let mut first = Clip::new(ClipId(1), 0.0, 10.0);
        first.end = 4.0;
        let mut second = Clip::new(ClipId(2), 0.0, 10.0);
        second.start = 6.0;
        let timeline = Timeline::from_clips(vec![first, second]).unwrap();
        let mut source = TestPatternSource::new(10.0, 640, 360);

        let thumbs = clip_thumbnails(&timeline, &mut source, 160).await;
        assert_eq!(thumbs.len(), 2);
        assert_eq!(source.seeks(), &[2.0, 8.0]);
        let first = thumbs[0].as_ref().unwrap();
        assert_eq!(first.dimensions(), (160, 90));
        assert_eq!(*first.get_pixel(0, 0), TestPatternSource::color_for(2.0));
    }

    struct Broken(SourceMedia);

    #[async_trait::async_trait]
    impl MediaSource for Broken {
        fn metadata(&self) -> &SourceMedia {
            &self.0
        }
        async fn seek(&mut self, _t: f64) -> ClipforgeResult<()> {
            Err(ClipforgeError::media("decoder gone"))
        }
        fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
            Err(ClipforgeError::media("decoder gone"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_failures_yield_none() {
        let timeline = Timeline::for_duration(5.0).unwrap();
        let mut source = Broken(SourceMedia::new(5.0, 10, 10));
        let thumbs = clip_thumbnails(&timeline, &mut source, 160).await;
        assert_eq!(thumbs, vec![None]);
    }

    #[test]
    fn test_small_frames_are_kept() {
        let frame = RgbaImage::new(20, 10);
        assert_eq!(fit_thumbnail(&frame, 160).dimensions(), (20, 10));
    }
}
