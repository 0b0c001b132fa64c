//! End-to-end export tests against synthetic sources and an in-memory sink.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::{Rgba, RgbaImage};

use clipforge_common::config::ExportPacing;
use clipforge_common::error::{ClipforgeResult, EXPORT_FAILED_MESSAGE};
use clipforge_project_model::clip::{Clip, ClipId};
use clipforge_project_model::color::Color;
use clipforge_project_model::geometry::{PercentPoint, PercentRect};
use clipforge_project_model::media::SourceMedia;
use clipforge_project_model::overlay::{
    FontWeight, PipKind, PipLayer, PipLayerSpec, TextOverlaySpec,
};
use clipforge_project_model::session::EditorSession;
use clipforge_project_model::timeline::Timeline;
use clipforge_render_engine::{
    ExportJob, ExportOptions, ExportProgress, ExportStage, ExportStatus, MediaSource,
    MemorySink, PipSources, ProgressCallback, SourceOpener, StillImageSource, TestPatternSource,
};

const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Clips `[0,4]` and `[6,10]` over a 10 s, 32x18 source.
fn two_clip_session() -> EditorSession {
    let mut session = EditorSession::open(SourceMedia::new(10.0, 32, 18)).unwrap();
    let mut first = Clip::new(ClipId(1), 0.0, 10.0);
    first.end = 4.0;
    let mut second = Clip::new(ClipId(2), 0.0, 10.0);
    second.start = 6.0;
    session.timeline = Timeline::from_clips(vec![first, second]).unwrap();
    session
}

fn options() -> ExportOptions {
    ExportOptions::default().with_pacing(ExportPacing::Unthrottled)
}

type Reports = Arc<Mutex<Vec<ExportProgress>>>;

fn recorder() -> (Reports, ProgressCallback) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    (reports, Box::new(move |p: ExportProgress| sink.lock().unwrap().push(p)))
}

/// Whether any pixel in the top-left 16x16 block is close to `ink`.
fn has_ink(frame: &RgbaImage, ink: Rgba<u8>) -> bool {
    (0..16).any(|y| {
        (0..16).any(|x| {
            let p = frame.get_pixel(x, y);
            (0..3).all(|c| (p.0[c] as i32 - ink.0[c] as i32).abs() <= 16)
        })
    })
}

struct RedOpener;

impl SourceOpener for RedOpener {
    fn open(&self, layer: &PipLayer) -> ClipforgeResult<Box<dyn MediaSource>> {
        Ok(Box::new(StillImageSource::new(
            layer.source.clone(),
            RgbaImage::from_pixel(4, 4, RED),
            layer.end_time - layer.start_time,
        )))
    }
}

#[tokio::test]
async fn test_frame_count_is_clip_frames_plus_closing() {
    let session = two_clip_session();
    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options().with_file_stem("trip"));

    let asset = job
        .run(&session, &mut source, &mut sink, &mut PipSources::new(), None)
        .await
        .unwrap();

    assert_eq!(sink.frames().len(), 120 + 120 + 60);
    assert_eq!(sink.format(), Some((32, 18, 30)));
    assert_eq!(asset.suggested_filename, "trip.rgba");
    assert_eq!(asset.bytes.len(), 300 * 32 * 18 * 4);
}

#[tokio::test]
async fn test_frames_sample_each_clip_in_source_time() {
    let session = two_clip_session();
    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options());
    job.run(&session, &mut source, &mut sink, &mut PipSources::new(), None)
        .await
        .unwrap();

    let seeks = source.seeks();
    assert_eq!(seeks.len(), 240);
    assert_eq!(seeks[0], 0.0);
    assert!((seeks[119] - 119.0 / 30.0).abs() < 1e-9);
    assert_eq!(seeks[120], 6.0);
    assert!(seeks.windows(2).filter(|w| w[1] < w[0]).count() == 0);

    // Frame 120 is the first frame of the second clip.
    assert_eq!(
        *sink.frames()[120].get_pixel(31, 17),
        TestPatternSource::color_for(6.0)
    );
}

#[tokio::test]
async fn test_text_overlay_uses_timeline_time() {
    let mut session = two_clip_session();
    let mut spec = TextOverlaySpec::new("H", 2.0, 6.0);
    spec.position = PercentPoint::new(0.0, 0.0);
    spec.font_size_px = 16.0;
    spec.font_weight = FontWeight::Bold;
    spec.color = Color::rgb(0, 255, 0);
    session.add_text(spec).unwrap();

    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options());
    job.run(&session, &mut source, &mut sink, &mut PipSources::new(), None)
        .await
        .unwrap();

    // Timeline 4s is frame 120 (source 6s): caption drawn.
    assert!(has_ink(&sink.frames()[120], GREEN));
    // Timeline 7s is frame 210 (source 9s): caption gone.
    assert!(!has_ink(&sink.frames()[210], GREEN));
    // Timeline 1s: not yet visible.
    assert!(!has_ink(&sink.frames()[30], GREEN));
}

#[tokio::test]
async fn test_pip_layer_drawn_inside_its_window() {
    let mut session = two_clip_session();
    session
        .add_pip(PipLayerSpec {
            kind: PipKind::Image,
            source: "logo.png".to_string(),
            rect: PercentRect::new(0.0, 0.0, 50.0, 50.0),
            opacity: 1.0,
            start_time: 2.0,
            end_time: 6.0,
        })
        .unwrap();

    let mut pips = PipSources::new();
    let report = pips.sync(&session.overlays, &RedOpener);
    assert_eq!(report.opened, 1);

    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options());
    job.run(&session, &mut source, &mut sink, &mut pips, None)
        .await
        .unwrap();

    assert_eq!(*sink.frames()[120].get_pixel(8, 4), RED);
    assert_ne!(*sink.frames()[210].get_pixel(8, 4), RED);
    assert_eq!(pips.teardown(), 1);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_resets_after_success() {
    let session = two_clip_session();
    let (reports, callback) = recorder();

    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options());
    job.run(
        &session,
        &mut source,
        &mut sink,
        &mut PipSources::new(),
        Some(callback),
    )
    .await
    .unwrap();

    let reports = reports.lock().unwrap();
    let (last, rendered) = reports.split_last().unwrap();
    let percents: Vec<u8> = rendered.iter().map(|p| p.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(rendered.first().unwrap().stage, ExportStage::Preparing);
    let complete = rendered.last().unwrap();
    assert_eq!((complete.stage, complete.percent), (ExportStage::Complete, 100));

    // The progress bar is cleared once the asset is handed off.
    assert_eq!((last.stage, last.percent), (ExportStage::Idle, 0));

    // Clip frames stop at 90; the closing sequence carries the rest.
    let last_clip = reports
        .iter()
        .filter(|p| p.stage == ExportStage::Rendering)
        .last()
        .unwrap();
    assert_eq!(last_clip.percent, 90);
    assert_eq!(last_clip.frames_rendered, 240);
    assert!(reports.iter().any(|p| p.stage == ExportStage::Closing));

    assert_eq!(job.status(), ExportStatus::Done);
    assert_eq!(job.progress_percent(), 0);
}

#[tokio::test]
async fn test_failure_discards_output_and_resets_progress() {
    let session = two_clip_session();
    let (reports, callback) = recorder();
    let mut source = TestPatternSource::new(10.0, 32, 18);
    let mut sink = MemorySink::failing_at(150);
    let mut job = ExportJob::new(options());

    let err = job
        .run(
            &session,
            &mut source,
            &mut sink,
            &mut PipSources::new(),
            Some(callback),
        )
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), EXPORT_FAILED_MESSAGE);
    assert!(sink.was_aborted());
    assert!(sink.frames().is_empty());
    assert_eq!(job.status(), ExportStatus::Failed);
    assert_eq!(job.progress_percent(), 0);

    // The callback saw real progress, then a cleared bar.
    let reports = reports.lock().unwrap();
    assert!(reports.iter().any(|p| p.percent >= 50));
    let last = reports.last().unwrap();
    assert_eq!((last.stage, last.percent), (ExportStage::Failed, 0));

    job.reset();
    assert_eq!(job.status(), ExportStatus::Idle);
}

#[tokio::test]
async fn test_seek_failure_aborts_export() {
    let session = two_clip_session();
    // Source shorter than the second clip: seeking to 6s fails.
    let mut source = TestPatternSource::new(5.0, 32, 18);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(options());

    let result = job
        .run(&session, &mut source, &mut sink, &mut PipSources::new(), None)
        .await;
    assert!(result.is_err());
    assert!(sink.was_aborted());
    assert_eq!(job.progress_percent(), 0);
}

#[tokio::test]
async fn test_real_time_pacing_waits_between_frames() {
    let mut session = EditorSession::open(SourceMedia::new(0.1, 8, 8)).unwrap();
    session.timeline = Timeline::for_duration(0.1).unwrap();
    let mut opts = ExportOptions::default();
    opts.closing_secs = 0.0;

    let mut source = TestPatternSource::new(0.1, 8, 8);
    let mut sink = MemorySink::new();
    let mut job = ExportJob::new(opts);
    let started = Instant::now();
    job.run(&session, &mut source, &mut sink, &mut PipSources::new(), None)
        .await
        .unwrap();

    assert_eq!(sink.frames().len(), 3);
    assert!(started.elapsed().as_secs_f64() >= 0.09);
}
