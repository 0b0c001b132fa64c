//! Frame sinks: where composed frames go.
//!
//! A sink is opened with the raster size and frame rate, receives frames in
//! order, and is finished into an [`EncodedAsset`]. The ffmpeg sink pipes raw
//! RGBA into an ffmpeg child process and reads the muxed file back.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

use clipforge_common::error::{ClipforgeError, ClipforgeResult};

use crate::source::command_exists;

/// The finished output handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAsset {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
    pub mime_type: String,
}

/// Output video codec and container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Vp9,
}

impl VideoCodec {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Some(Self::H264),
            "h265" | "hevc" => Some(Self::H265),
            "vp9" | "webm" => Some(Self::Vp9),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::H264 | Self::H265 => "mp4",
            Self::Vp9 => "webm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::H264 | Self::H265 => "video/mp4",
            Self::Vp9 => "video/webm",
        }
    }

    /// Encoder arguments placed after the input.
    pub fn codec_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::H264 => &[
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-profile:v",
                "high",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
            Self::H265 => &[
                "-c:v",
                "libx265",
                "-preset",
                "medium",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
            Self::Vp9 => &["-c:v", "libvpx-vp9", "-b:v", "0", "-crf", "32"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

/// Destination for composed frames.
#[async_trait::async_trait]
pub trait FrameSink: Send {
    /// Open the sink for frames of the given size and rate.
    async fn begin(&mut self, width: u32, height: u32, fps: u32) -> ClipforgeResult<()>;

    /// Append one frame.
    async fn push_frame(&mut self, frame: &RgbaImage) -> ClipforgeResult<()>;

    /// Close the stream and collect the output. `file_stem` names the asset.
    async fn finish(&mut self, file_stem: &str) -> ClipforgeResult<EncodedAsset>;

    /// Abandon the stream and discard partial output.
    async fn abort(&mut self);

    /// Check if this sink can run on the system.
    fn is_available(&self) -> bool;

    /// Sink name.
    fn name(&self) -> &str;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

struct RunningEncoder {
    child: Child,
    stdin: ChildStdin,
    output_path: PathBuf,
    expected_len: usize,
}

/// Encodes frames with the ffmpeg CLI.
pub struct FfmpegSink {
    codec: VideoCodec,
    running: Option<RunningEncoder>,
    frames_written: u64,
}

impl FfmpegSink {
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            codec,
            running: None,
            frames_written: 0,
        }
    }

    fn temp_output_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "clipforge-export-{}-{n}.{}",
            std::process::id(),
            self.codec.extension()
        ))
    }
}

#[async_trait::async_trait]
impl FrameSink for FfmpegSink {
    async fn begin(&mut self, width: u32, height: u32, fps: u32) -> ClipforgeResult<()> {
        if self.running.is_some() {
            return Err(ClipforgeError::encode("Encoder already running"));
        }
        let output_path = self.temp_output_path();
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-s".into(),
            format!("{width}x{height}"),
            "-r".into(),
            fps.to_string(),
            "-i".into(),
            "-".into(),
        ];
        args.extend(self.codec.codec_args());
        args.push(output_path.display().to_string());

        tracing::debug!(args = ?args, "Running ffmpeg encoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClipforgeError::encode(format!("Failed to start ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipforgeError::encode("Failed to capture ffmpeg stdin"))?;

        tracing::info!(
            pid = child.id(),
            width,
            height,
            fps,
            codec = ?self.codec,
            "ffmpeg encoder started"
        );
        self.frames_written = 0;
        self.running = Some(RunningEncoder {
            child,
            stdin,
            output_path,
            expected_len: width as usize * height as usize * 4,
        });
        Ok(())
    }

    async fn push_frame(&mut self, frame: &RgbaImage) -> ClipforgeResult<()> {
        let running = self
            .running
            .as_mut()
            .ok_or_else(|| ClipforgeError::encode("Encoder not started"))?;
        let raw = frame.as_raw();
        if raw.len() != running.expected_len {
            return Err(ClipforgeError::encode(format!(
                "Frame has {} bytes, expected {}",
                raw.len(),
                running.expected_len
            )));
        }
        running
            .stdin
            .write_all(raw)
            .await
            .map_err(|e| ClipforgeError::encode(format!("Failed writing frame to ffmpeg: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self, file_stem: &str) -> ClipforgeResult<EncodedAsset> {
        let RunningEncoder {
            child,
            mut stdin,
            output_path,
            ..
        } = self
            .running
            .take()
            .ok_or_else(|| ClipforgeError::encode("Encoder not started"))?;

        stdin
            .shutdown()
            .await
            .map_err(|e| ClipforgeError::encode(format!("Failed closing ffmpeg stdin: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClipforgeError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
        if !output.status.success() {
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(ClipforgeError::encode(format!(
                "ffmpeg encode failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let bytes = tokio::fs::read(&output_path).await?;
        if let Err(err) = tokio::fs::remove_file(&output_path).await {
            tracing::warn!(error = %err, path = %output_path.display(), "Failed to remove temp output");
        }
        tracing::info!(
            frames = self.frames_written,
            bytes = bytes.len(),
            "ffmpeg encoder finished"
        );
        Ok(EncodedAsset {
            bytes,
            suggested_filename: format!("{file_stem}.{}", self.codec.extension()),
            mime_type: self.codec.mime_type().to_string(),
        })
    }

    async fn abort(&mut self) {
        if let Some(mut running) = self.running.take() {
            let _ = running.child.kill().await;
            let _ = tokio::fs::remove_file(&running.output_path).await;
            tracing::debug!(frames = self.frames_written, "ffmpeg encoder aborted");
        }
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Keeps frames in memory; the asset is the concatenated raw RGBA.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<RgbaImage>,
    size: Option<(u32, u32, u32)>,
    /// Fail on this frame index, for exercising error paths.
    fail_at: Option<usize>,
    aborted: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects the frame at `index`.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    /// `(width, height, fps)` passed to `begin`.
    pub fn format(&self) -> Option<(u32, u32, u32)> {
        self.size
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

#[async_trait::async_trait]
impl FrameSink for MemorySink {
    async fn begin(&mut self, width: u32, height: u32, fps: u32) -> ClipforgeResult<()> {
        self.frames.clear();
        self.aborted = false;
        self.size = Some((width, height, fps));
        Ok(())
    }

    async fn push_frame(&mut self, frame: &RgbaImage) -> ClipforgeResult<()> {
        if self.fail_at == Some(self.frames.len()) {
            return Err(ClipforgeError::encode("Sink rejected frame"));
        }
        let (w, h, _) = self
            .size
            .ok_or_else(|| ClipforgeError::encode("Sink not started"))?;
        if frame.dimensions() != (w, h) {
            return Err(ClipforgeError::encode(format!(
                "Frame is {}x{}, expected {w}x{h}",
                frame.width(),
                frame.height()
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    async fn finish(&mut self, file_stem: &str) -> ClipforgeResult<EncodedAsset> {
        let bytes = self
            .frames
            .iter()
            .flat_map(|f| f.as_raw().iter().copied())
            .collect();
        Ok(EncodedAsset {
            bytes,
            suggested_filename: format!("{file_stem}.rgba"),
            mime_type: "application/octet-stream".to_string(),
        })
    }

    async fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}
