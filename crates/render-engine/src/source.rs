//! Media sources: seekable producers of RGBA frames.
//!
//! The export pipeline never decodes files itself; it drives a
//! [`MediaSource`], awaiting each seek before reading the frame. The
//! ffmpeg-backed source shells out the same way the encoder does.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::{Rgba, RgbaImage};
use serde::Deserialize;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::media::SourceMedia;

/// A seekable source of frames.
#[async_trait::async_trait]
pub trait MediaSource: Send {
    /// Natural properties of the media.
    fn metadata(&self) -> &SourceMedia;

    /// Seek to `source_secs`. Resolves once the frame at that time is ready.
    async fn seek(&mut self, source_secs: f64) -> ClipforgeResult<()>;

    /// Frame at the last completed seek.
    fn current_frame(&self) -> ClipforgeResult<&RgbaImage>;

    /// Source name for logging.
    fn name(&self) -> &str;

    /// Drop decoded resources. Owners call this exactly once.
    fn release(&mut self) {}
}

/// Video file decoded one frame at a time with the ffmpeg CLI.
pub struct FfmpegSource {
    path: PathBuf,
    name: String,
    media: SourceMedia,
    frame: Option<RgbaImage>,
}

impl FfmpegSource {
    /// Probe `path` with ffprobe and prepare to decode it.
    pub fn open(path: impl AsRef<Path>) -> ClipforgeResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ClipforgeError::FileNotFound { path });
        }
        let media = probe_media(&path)?;
        tracing::debug!(
            path = %path.display(),
            duration_secs = media.duration_secs,
            width = media.width,
            height = media.height,
            "Probed media"
        );
        Ok(Self {
            name: path.display().to_string(),
            path,
            media,
            frame: None,
        })
    }
}

#[async_trait::async_trait]
impl MediaSource for FfmpegSource {
    fn metadata(&self) -> &SourceMedia {
        &self.media
    }

    async fn seek(&mut self, source_secs: f64) -> ClipforgeResult<()> {
        // Seeking exactly to the container end yields no frame.
        let t = source_secs.clamp(0.0, (self.media.duration_secs - 0.001).max(0.0));
        let output = tokio::process::Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{t:.6}"), "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .output()
            .await
            .map_err(|e| ClipforgeError::media(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(ClipforgeError::media(format!(
                "ffmpeg decode failed at {t:.3}s (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let (w, h) = (self.media.width, self.media.height);
        let frame = RgbaImage::from_raw(w, h, output.stdout).ok_or_else(|| {
            ClipforgeError::media(format!("Decoded frame at {t:.3}s is not {w}x{h} RGBA"))
        })?;
        self.frame = Some(frame);
        Ok(())
    }

    fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
        self.frame
            .as_ref()
            .ok_or_else(|| ClipforgeError::media("No frame decoded yet"))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

/// A single image shown for a fixed duration.
pub struct StillImageSource {
    name: String,
    media: SourceMedia,
    image: Option<RgbaImage>,
}

impl StillImageSource {
    pub fn new(name: impl Into<String>, image: RgbaImage, duration_secs: f64) -> Self {
        let media = SourceMedia::new(duration_secs, image.width(), image.height());
        Self {
            name: name.into(),
            media,
            image: Some(image),
        }
    }

    pub fn open(path: impl AsRef<Path>, duration_secs: f64) -> ClipforgeResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| ClipforgeError::media(format!("Failed to load {}: {e}", path.display())))?
            .to_rgba8();
        Ok(Self::new(path.display().to_string(), image, duration_secs).with_path(path))
    }

    fn with_path(mut self, path: &Path) -> Self {
        self.media = self.media.with_path(path.display().to_string());
        self
    }
}

#[async_trait::async_trait]
impl MediaSource for StillImageSource {
    fn metadata(&self) -> &SourceMedia {
        &self.media
    }

    async fn seek(&mut self, _source_secs: f64) -> ClipforgeResult<()> {
        Ok(())
    }

    fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
        self.image
            .as_ref()
            .ok_or_else(|| ClipforgeError::media(format!("{} was released", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) {
        self.image = None;
    }
}

/// Synthetic source whose frame color encodes the seek time.
///
/// The red channel carries whole seconds and the green channel hundredths,
/// so a rendered frame can be traced back to the source time it sampled.
pub struct TestPatternSource {
    media: SourceMedia,
    frame: Option<RgbaImage>,
    seeks: Vec<f64>,
}

impl TestPatternSource {
    pub fn new(duration_secs: f64, width: u32, height: u32) -> Self {
        Self {
            media: SourceMedia::new(duration_secs, width, height),
            frame: None,
            seeks: Vec::new(),
        }
    }

    /// Every seek target, in order.
    pub fn seeks(&self) -> &[f64] {
        &self.seeks
    }

    /// Pixel color used for time `t`.
    pub fn color_for(t: f64) -> Rgba<u8> {
        let whole = t.floor().clamp(0.0, 255.0) as u8;
        let hundredths = ((t - t.floor()) * 100.0).round().clamp(0.0, 99.0) as u8;
        Rgba([whole, hundredths, 128, 255])
    }
}

#[async_trait::async_trait]
impl MediaSource for TestPatternSource {
    fn metadata(&self) -> &SourceMedia {
        &self.media
    }

    async fn seek(&mut self, source_secs: f64) -> ClipforgeResult<()> {
        if source_secs < 0.0 || source_secs > self.media.duration_secs {
            return Err(ClipforgeError::media(format!(
                "Seek to {source_secs:.3}s outside 0..{:.3}s",
                self.media.duration_secs
            )));
        }
        self.seeks.push(source_secs);
        self.frame = Some(RgbaImage::from_pixel(
            self.media.width,
            self.media.height,
            Self::color_for(source_secs),
        ));
        Ok(())
    }

    fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
        self.frame
            .as_ref()
            .ok_or_else(|| ClipforgeError::media("No frame rendered yet"))
    }

    fn name(&self) -> &str {
        "test-pattern"
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Read duration and natural size of the first video stream.
pub fn probe_media(path: &Path) -> ClipforgeResult<SourceMedia> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| ClipforgeError::media(format!("Failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(ClipforgeError::media(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let media = parse_probe_output(&output.stdout)?.with_path(path.display().to_string());
    if !media.is_usable() {
        return Err(ClipforgeError::media(format!(
            "{} has no playable video stream",
            path.display()
        )));
    }
    Ok(media)
}

fn parse_probe_output(raw: &[u8]) -> ClipforgeResult<SourceMedia> {
    let probe: ProbeOutput = serde_json::from_slice(raw)?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| ClipforgeError::media("No video stream found"))?;
    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    Ok(SourceMedia::new(
        duration_secs,
        stream.width.unwrap_or(0),
        stream.height.unwrap_or(0),
    ))
}

pub(crate) fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let raw = br#"{
            "programs": [],
            "streams": [{ "width": 1920, "height": 1080 }],
            "format": { "duration": "12.480000" }
        }"#;
        let media = parse_probe_output(raw).unwrap();
        assert_eq!(media.width, 1920);
        assert_eq!(media.height, 1080);
        assert!((media.duration_secs - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_without_stream_fails() {
        let raw = br#"{ "streams": [], "format": { "duration": "3.0" } }"#;
        assert!(parse_probe_output(raw).is_err());
    }

    #[tokio::test]
    async fn test_pattern_source_encodes_time() {
        let mut source = TestPatternSource::new(10.0, 4, 4);
        assert!(source.current_frame().is_err());
        source.seek(3.25).await.unwrap();
        let px = *source.current_frame().unwrap().get_pixel(0, 0);
        assert_eq!(px, Rgba([3, 25, 128, 255]));
        assert!(source.seek(11.0).await.is_err());
        assert_eq!(source.seeks(), &[3.25]);
    }

    #[tokio::test]
    async fn test_still_image_release() {
        let mut source =
            StillImageSource::new("logo", RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])), 5.0);
        source.seek(1.0).await.unwrap();
        assert_eq!(source.current_frame().unwrap().width(), 2);
        source.release();
        assert!(source.current_frame().is_err());
    }
}
