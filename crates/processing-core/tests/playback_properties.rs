use clipforge_common::config::EditorDefaults;
use clipforge_processing_core::playback::{correct, PlaybackAction};
use clipforge_project_model::timeline::Timeline;
use proptest::prelude::*;

fn split_timeline(duration: f64, cuts: &[f64]) -> Timeline {
    let mut timeline = Timeline::for_duration(duration).unwrap();
    for ratio in cuts {
        let last = timeline.len() - 1;
        let clip = *timeline.clip(last).unwrap();
        let _ = timeline.split(last, clip.start + clip.duration() * ratio, 0.05);
    }
    timeline
}

proptest! {
    #[test]
    fn correction_targets_are_clip_starts(
        duration in 1.0f64..20.0,
        cuts in prop::collection::vec(0.1f64..0.9, 0..4),
        active_ratio in 0.0f64..1.0,
        t in -2.0f64..25.0,
    ) {
        let timeline = split_timeline(duration, &cuts);
        let active = ((timeline.len() as f64 * active_ratio) as usize).min(timeline.len() - 1);
        let starts: Vec<f64> = timeline.clips().iter().map(|c| c.start).collect();

        match correct(&timeline, active, t, &EditorDefaults::default()) {
            PlaybackAction::None => {
                let clip = timeline.clip(active).unwrap();
                prop_assert!(t >= clip.start - 0.08 && t < clip.end - 0.05);
            }
            PlaybackAction::SeekTo { source_secs } => {
                prop_assert_eq!(source_secs, starts[active]);
            }
            PlaybackAction::Advance { index, seek_to } => {
                prop_assert_eq!(index, active + 1);
                prop_assert_eq!(seek_to, starts[index]);
            }
            PlaybackAction::WrapAndPause { seek_to } => {
                prop_assert_eq!(active, timeline.len() - 1);
                prop_assert_eq!(seek_to, starts[0]);
            }
        }
    }
}
