//! Export configuration and job management.
//!
//! An export walks the timeline clip by clip. For every output frame it
//! seeks the source, waits for the seek to settle, composes the filtered
//! frame with the visible overlays, and pushes it into a [`FrameSink`].
//! The closing watermark follows the last clip. Clip frames cover 0-90% of
//! the reported progress and the closing sequence the remaining 10%.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbaImage;

use clipforge_common::clock::{frame_interval, frames_for_duration};
use clipforge_common::config::{ExportDefaults, ExportPacing};
use clipforge_common::error::{ClipforgeError, ClipforgeResult};
use clipforge_project_model::media::MediaKind;
use clipforge_project_model::overlay::{FontWeight, PipLayer};
use clipforge_project_model::session::EditorSession;
use clipforge_project_model::timeline::Timeline;

use crate::closing::ClosingSequence;
use crate::compositor::{clip_compositions, Compositor};
use crate::encoder::{EncodedAsset, FfmpegSink, FrameSink, VideoCodec};
use crate::fonts::{Face, FontBook};
use crate::resources::{FileOpener, PipSources};
use crate::slideshow::SlideshowSource;
use crate::source::{FfmpegSource, MediaSource};

/// Share of the progress bar taken by clip frames.
const CLIP_PROGRESS_SHARE: f64 = 90.0;

/// Parameters for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub fps: u32,
    pub pacing: ExportPacing,
    pub closing_secs: f64,
    pub wordmark: String,
    pub wordmark_font: String,
    pub codec: VideoCodec,

    /// Searched for fonts before the system font directories.
    pub font_dirs: Vec<PathBuf>,

    /// Raster used when the session was opened on a slideshow.
    pub slideshow_size: (u32, u32),

    /// Name of the produced asset, without extension.
    pub file_stem: String,
}

impl ExportOptions {
    pub fn from_defaults(defaults: &ExportDefaults) -> Self {
        let codec = VideoCodec::from_name(&defaults.video_codec).unwrap_or_else(|| {
            tracing::warn!(codec = %defaults.video_codec, "Unknown video codec, using h264");
            VideoCodec::H264
        });
        Self {
            fps: defaults.fps.max(1),
            pacing: defaults.pacing,
            closing_secs: defaults.closing_secs.max(0.0),
            wordmark: defaults.wordmark.clone(),
            wordmark_font: defaults.wordmark_font.clone(),
            codec,
            font_dirs: defaults.font_dirs.clone(),
            slideshow_size: (defaults.slideshow_width, defaults.slideshow_height),
            file_stem: "clipforge-export".to_string(),
        }
    }

    pub fn with_pacing(mut self, pacing: ExportPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = stem.into();
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_defaults(&ExportDefaults::default())
    }
}

/// Frame budget of an export, computed before rendering starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPlan {
    /// Frames per clip, in timeline order.
    pub clip_frames: Vec<u64>,

    pub closing_frames: u64,

    /// Clip frames plus closing frames.
    pub total_frames: u64,

    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl ExportPlan {
    pub fn new(
        timeline: &Timeline,
        fps: u32,
        closing_secs: f64,
        width: u32,
        height: u32,
    ) -> Self {
        let clip_frames: Vec<u64> = timeline
            .clips()
            .iter()
            .map(|clip| frames_for_duration(clip.duration(), fps))
            .collect();
        let closing_frames = frames_for_duration(closing_secs, fps);
        let total_frames = clip_frames.iter().sum::<u64>() + closing_frames;
        Self {
            clip_frames,
            closing_frames,
            total_frames,
            width,
            height,
            fps,
        }
    }

    /// Plan for a session rendered from `source`.
    pub fn for_session(
        session: &EditorSession,
        source: &dyn MediaSource,
        options: &ExportOptions,
    ) -> Self {
        let (width, height) = match session.media.kind {
            MediaKind::Slideshow => options.slideshow_size,
            MediaKind::Video => {
                let media = source.metadata();
                (media.width, media.height)
            }
        };
        Self::new(
            &session.timeline,
            options.fps,
            options.closing_secs,
            width,
            height,
        )
    }

    pub fn clip_frame_total(&self) -> u64 {
        self.clip_frames.iter().sum()
    }

    /// Exported length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / self.fps.max(1) as f64
    }
}

/// Lifecycle of an [`ExportJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStatus {
    #[default]
    Idle,
    Running,
    Done,
    Failed,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Whole percent in `[0, 100]`.
    pub percent: u8,

    /// Frames pushed to the sink so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Closing,
    Finalizing,
    Complete,
    Failed,
    /// Progress cleared after a finished export.
    Idle,
}

struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
    total_frames: u64,
    frames_rendered: u64,
    percent: u8,
}

impl ProgressReporter {
    fn new(callback: Option<ProgressCallback>, total_frames: u64) -> Self {
        Self {
            callback,
            started: Instant::now(),
            total_frames,
            frames_rendered: 0,
            percent: 0,
        }
    }

    /// Report a new percentage. Values never go backwards.
    fn report(&mut self, percent: u8, stage: ExportStage) {
        self.percent = self.percent.max(percent.min(100));
        self.emit(stage);
    }

    /// Drop progress back to zero and tell the callback.
    fn reset(&mut self, stage: ExportStage) {
        self.percent = 0;
        self.emit(stage);
    }

    fn emit(&self, stage: ExportStage) {
        let Some(cb) = &self.callback else {
            return;
        };
        let elapsed = self.started.elapsed().as_secs_f64();
        let fraction = self.percent as f64 / 100.0;
        let eta_secs = if fraction > 0.0 {
            (elapsed / fraction - elapsed).max(0.0)
        } else {
            0.0
        };
        cb(ExportProgress {
            percent: self.percent,
            frames_rendered: self.frames_rendered,
            total_frames: self.total_frames,
            eta_secs,
            stage,
        });
    }
}

/// One export invocation's state.
#[derive(Debug, Clone)]
pub struct ExportJob {
    options: ExportOptions,
    fonts: FontBook,
    status: ExportStatus,
    progress_percent: u8,
}

impl ExportJob {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            fonts: FontBook::system(&options.font_dirs),
            options,
            status: ExportStatus::Idle,
            progress_percent: 0,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Render `session` into `sink`.
    ///
    /// PiP layers are drawn from `pips`; callers sync the registry with the
    /// session's overlays first. Once the asset is finished the progress
    /// callback receives a final zero report ([`ExportStage::Idle`]). On
    /// failure the sink is aborted, the callback receives a zero report
    /// with [`ExportStage::Failed`], and no asset is produced. A failed or
    /// finished job can be run again.
    pub async fn run(
        &mut self,
        session: &EditorSession,
        source: &mut dyn MediaSource,
        sink: &mut dyn FrameSink,
        pips: &mut PipSources,
        progress: Option<ProgressCallback>,
    ) -> ClipforgeResult<EncodedAsset> {
        if self.status == ExportStatus::Running {
            return Err(ClipforgeError::render("Export already running"));
        }
        self.status = ExportStatus::Running;
        self.progress_percent = 0;

        let plan = ExportPlan::for_session(session, source, &self.options);
        let mut reporter = ProgressReporter::new(progress, plan.total_frames);
        tracing::info!(
            clips = session.timeline.len(),
            frames = plan.total_frames,
            width = plan.width,
            height = plan.height,
            fps = plan.fps,
            sink = sink.name(),
            source = source.name(),
            "Starting export"
        );

        match self.render(session, &plan, source, sink, pips, &mut reporter).await {
            Ok(asset) => {
                tracing::info!(
                    file = %asset.suggested_filename,
                    bytes = asset.bytes.len(),
                    elapsed_secs = reporter.started.elapsed().as_secs_f64(),
                    "Export complete"
                );
                reporter.report(100, ExportStage::Complete);
                reporter.reset(ExportStage::Idle);
                self.status = ExportStatus::Done;
                self.progress_percent = 0;
                Ok(asset)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    frames_rendered = reporter.frames_rendered,
                    total_frames = plan.total_frames,
                    "Export failed"
                );
                sink.abort().await;
                reporter.reset(ExportStage::Failed);
                self.status = ExportStatus::Failed;
                self.progress_percent = 0;
                Err(err)
            }
        }
    }

    /// Back to idle with zero progress.
    pub fn reset(&mut self) {
        self.status = ExportStatus::Idle;
        self.progress_percent = 0;
    }

    async fn render(
        &mut self,
        session: &EditorSession,
        plan: &ExportPlan,
        source: &mut dyn MediaSource,
        sink: &mut dyn FrameSink,
        pips: &mut PipSources,
        reporter: &mut ProgressReporter,
    ) -> ClipforgeResult<EncodedAsset> {
        session
            .validate()
            .map_err(|e| ClipforgeError::render(format!("Session is not exportable: {e}")))?;
        if plan.width == 0 || plan.height == 0 {
            return Err(ClipforgeError::render("Source has no frame size"));
        }
        reporter.report(0, ExportStage::Preparing);

        let fps = plan.fps;
        let pacing = self.options.pacing;
        for text in session.overlays.texts() {
            self.fonts
                .load(&text.font_family, text.font_weight == FontWeight::Bold)?;
        }
        let wordmark_face = self.wordmark_face(plan);
        let compositor = Compositor::new(plan.width, plan.height, session.effects.compile())
            .with_fonts(self.fonts.clone());
        let clip_total = plan.clip_frame_total().max(1);

        sink.begin(plan.width, plan.height, fps).await?;

        let mut next_index = 0u64;
        for clip_index in 0..session.timeline.len() {
            let compositions = clip_compositions(
                &session.timeline,
                &session.overlays,
                clip_index,
                next_index,
                fps,
            );
            tracing::debug!(
                clip = clip_index,
                frames = compositions.len(),
                first_frame = next_index,
                "Rendering clip"
            );

            for comp in &compositions {
                source.seek(comp.source_secs).await.map_err(|e| {
                    ClipforgeError::render(format!(
                        "Seek to {:.3}s failed for frame {}: {e}",
                        comp.source_secs, comp.frame_index
                    ))
                })?;

                let mut pip_frames: Vec<(&PipLayer, RgbaImage)> = Vec::with_capacity(comp.pips.len());
                for id in &comp.pips {
                    let Some(layer) = session.overlays.pip(*id) else {
                        continue;
                    };
                    if let Some(frame) = pips.frame_at(layer, comp.global_secs).await? {
                        pip_frames.push((layer, frame.clone()));
                    }
                }
                let pip_refs: Vec<(&PipLayer, &RgbaImage)> =
                    pip_frames.iter().map(|(l, f)| (*l, f)).collect();

                let frame =
                    compositor.compose(source.current_frame()?, comp, &session.overlays, &pip_refs);
                sink.push_frame(&frame).await?;

                reporter.frames_rendered += 1;
                let percent = (reporter.frames_rendered as f64 / clip_total as f64
                    * CLIP_PROGRESS_SHARE)
                    .floor() as u8;
                reporter.report(percent, ExportStage::Rendering);
                self.progress_percent = reporter.percent;

                pace(pacing, fps).await;
            }
            next_index += compositions.len() as u64;
        }

        let closing = ClosingSequence::new(
            plan.width,
            plan.height,
            fps,
            self.options.closing_secs,
            &self.options.wordmark,
        )
        .with_face(wordmark_face);
        for index in 0..closing.frame_count() {
            sink.push_frame(&closing.render(index)).await?;
            reporter.frames_rendered += 1;
            let share = (index + 1) as f64 / closing.frame_count() as f64;
            let percent = (CLIP_PROGRESS_SHARE + share * (100.0 - CLIP_PROGRESS_SHARE)).floor() as u8;
            reporter.report(percent, ExportStage::Closing);
            self.progress_percent = reporter.percent;
            pace(pacing, fps).await;
        }

        reporter.report(reporter.percent, ExportStage::Finalizing);
        sink.finish(&self.options.file_stem).await
    }

    /// The closing wordmark is decoration: without a usable font the
    /// closing frames show only the background.
    fn wordmark_face(&mut self, plan: &ExportPlan) -> Option<Face> {
        if self.options.wordmark.is_empty() || plan.closing_frames == 0 {
            return None;
        }
        match self.fonts.load(&self.options.wordmark_font, true) {
            Ok(face) => Some(face),
            Err(e) => {
                tracing::warn!(error = %e, "Closing wordmark skipped");
                None
            }
        }
    }
}

async fn pace(pacing: ExportPacing, fps: u32) {
    if pacing == ExportPacing::RealTime {
        tokio::time::sleep(frame_interval(fps)).await;
    }
}

/// Export a session whose source lives on disk.
///
/// PiP sources are resolved relative to `base_dir`. This is the main entry
/// point for rendering with ffmpeg.
pub async fn export_session(
    session: &EditorSession,
    base_dir: &Path,
    options: ExportOptions,
    progress: Option<ProgressCallback>,
) -> ClipforgeResult<EncodedAsset> {
    let mut sink = FfmpegSink::new(options.codec);
    if !sink.is_available() {
        return Err(ClipforgeError::unsupported(
            "No supported encoder found (expected ffmpeg in PATH)",
        ));
    }
    tracing::info!(sink = sink.name(), "Using frame sink");

    let mut source = open_session_source(session, base_dir, &options)?;

    let mut pips = PipSources::new();
    let report = pips.sync(&session.overlays, &FileOpener::new(base_dir));
    if !report.failed.is_empty() {
        tracing::warn!(failed = report.failed.len(), "Some PiP layers will be skipped");
    }

    let mut job = ExportJob::new(options);
    let result = job
        .run(session, source.as_mut(), &mut sink, &mut pips, progress)
        .await;
    pips.teardown();
    source.release();
    result
}

/// Open the media a session was created on.
pub fn open_session_source(
    session: &EditorSession,
    base_dir: &Path,
    options: &ExportOptions,
) -> ClipforgeResult<Box<dyn MediaSource>> {
    let media = &session.media;
    match media.kind {
        MediaKind::Video => {
            let path = media
                .path
                .as_deref()
                .ok_or_else(|| ClipforgeError::render("Session media has no file path"))?;
            Ok(Box::new(FfmpegSource::open(base_dir.join(path))?))
        }
        MediaKind::Slideshow => {
            let secs_per_slide = media
                .secs_per_slide()
                .ok_or_else(|| ClipforgeError::render("Slideshow session has no images"))?;
            let paths: Vec<PathBuf> = media.slides.iter().map(|s| base_dir.join(s)).collect();
            let (width, height) = options.slideshow_size;
            Ok(Box::new(SlideshowSource::open(
                &paths,
                secs_per_slide,
                width,
                height,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::clip::{Clip, ClipId};
    use clipforge_project_model::media::SourceMedia;

    fn two_clip_timeline() -> Timeline {
        let mut first = Clip::new(ClipId(1), 0.0, 10.0);
        first.end = 4.0;
        let mut second = Clip::new(ClipId(2), 0.0, 10.0);
        second.start = 6.0;
        Timeline::from_clips(vec![first, second]).unwrap()
    }

    #[test]
    fn test_plan_counts_clip_and_closing_frames() {
        let plan = ExportPlan::new(&two_clip_timeline(), 30, 2.0, 64, 36);
        assert_eq!(plan.clip_frames, vec![120, 120]);
        assert_eq!(plan.closing_frames, 60);
        assert_eq!(plan.total_frames, 300);
        assert_eq!(plan.clip_frame_total(), 240);
        assert!((plan.duration_secs() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_rounds_partial_frames_up() {
        let mut clip = Clip::new(ClipId(1), 0.0, 10.0);
        clip.end = 1.01;
        let timeline = Timeline::from_clips(vec![clip]).unwrap();
        let plan = ExportPlan::new(&timeline, 30, 0.0, 8, 8);
        assert_eq!(plan.total_frames, 31);
    }

    #[test]
    fn test_slideshow_sessions_use_portrait_raster() {
        let media = SourceMedia::new(6.0, 400, 300).with_kind(MediaKind::Slideshow);
        let session = EditorSession::open(media).unwrap();
        let source = crate::source::TestPatternSource::new(6.0, 400, 300);
        let plan = ExportPlan::for_session(&session, &source, &ExportOptions::default());
        assert_eq!((plan.width, plan.height), (1080, 1920));
    }

    #[test]
    fn test_options_from_defaults() {
        let mut defaults = ExportDefaults::default();
        defaults.video_codec = "vp9".to_string();
        let options = ExportOptions::from_defaults(&defaults);
        assert_eq!(options.codec, VideoCodec::Vp9);
        assert_eq!(options.fps, 30);
        assert_eq!(options.pacing, ExportPacing::RealTime);

        defaults.video_codec = "nope".to_string();
        assert_eq!(ExportOptions::from_defaults(&defaults).codec, VideoCodec::H264);
    }

    #[test]
    fn test_reporter_never_goes_backwards() {
        let mut reporter = ProgressReporter::new(None, 10);
        reporter.report(40, ExportStage::Rendering);
        reporter.report(20, ExportStage::Rendering);
        assert_eq!(reporter.percent, 40);
        reporter.report(250, ExportStage::Complete);
        assert_eq!(reporter.percent, 100);
    }

    #[test]
    fn test_reporter_reset_reaches_the_callback() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let mut reporter = ProgressReporter::new(
            Some(Box::new(move |p: ExportProgress| {
                sink.lock().unwrap().push((p.percent, p.stage))
            })),
            10,
        );
        reporter.report(60, ExportStage::Rendering);
        reporter.reset(ExportStage::Failed);
        assert_eq!(reporter.percent, 0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(60, ExportStage::Rendering), (0, ExportStage::Failed)]
        );
    }

    #[test]
    fn test_options_carry_font_settings() {
        let mut defaults = ExportDefaults::default();
        defaults.font_dirs = vec![PathBuf::from("/opt/fonts")];
        defaults.wordmark_font = "DejaVu Serif".to_string();
        let options = ExportOptions::from_defaults(&defaults);
        assert_eq!(options.font_dirs, vec![PathBuf::from("/opt/fonts")]);
        assert_eq!(options.wordmark_font, "DejaVu Serif");
    }
}
