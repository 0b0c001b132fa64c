use clipforge_project_model::clip::TrimEdge;
use clipforge_project_model::timeline::Timeline;
use proptest::prelude::*;

const MARGIN: f64 = 0.05;
const MIN_LEN: f64 = 0.1;

#[derive(Debug, Clone)]
enum Edit {
    Split { index: usize, ratio: f64 },
    Trim { index: usize, start: bool, value: f64 },
    Move { from: usize, to: usize },
    Swap { a: usize, b: usize },
    Remove { index: usize },
    Select { index: usize },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..8, 0.0f64..1.0).prop_map(|(index, ratio)| Edit::Split { index, ratio }),
        (0usize..8, any::<bool>(), -5.0f64..40.0)
            .prop_map(|(index, start, value)| Edit::Trim { index, start, value }),
        (0usize..8, 0usize..8).prop_map(|(from, to)| Edit::Move { from, to }),
        (0usize..8, 0usize..8).prop_map(|(a, b)| Edit::Swap { a, b }),
        (0usize..8).prop_map(|index| Edit::Remove { index }),
        (0usize..8).prop_map(|index| Edit::Select { index }),
    ]
}

fn apply(timeline: &mut Timeline, edit: &Edit) {
    // Rejected edits are fine; they must simply leave the timeline valid.
    match *edit {
        Edit::Split { index, ratio } => {
            if let Some(clip) = timeline.clip(index).copied() {
                let at = clip.start + clip.duration() * ratio;
                let _ = timeline.split(index, at, MARGIN);
            }
        }
        Edit::Trim { index, start, value } => {
            let edge = if start { TrimEdge::Start } else { TrimEdge::End };
            let _ = timeline.trim(index, edge, value, MIN_LEN);
        }
        Edit::Move { from, to } => {
            let _ = timeline.move_clip(from, to);
        }
        Edit::Swap { a, b } => {
            let _ = timeline.swap(a, b);
        }
        Edit::Remove { index } => {
            let _ = timeline.remove(index);
        }
        Edit::Select { index } => {
            let _ = timeline.set_active(index);
        }
    }
}

proptest! {
    #[test]
    fn edits_preserve_timeline_invariants(
        duration in 1.0f64..30.0,
        edits in prop::collection::vec(edit_strategy(), 0..40),
    ) {
        let mut timeline = Timeline::for_duration(duration).unwrap();
        for edit in &edits {
            apply(&mut timeline, edit);

            prop_assert!(timeline.validate().is_ok(), "invalid after {:?}", edit);
            prop_assert!(!timeline.is_empty());
            prop_assert!(timeline.active_index() < timeline.len());
            for clip in timeline.clips() {
                prop_assert!(clip.original_start <= clip.start);
                prop_assert!(clip.start < clip.end);
                prop_assert!(clip.end <= clip.original_end);
                prop_assert!(clip.original_end <= duration + 1e-9);
            }
        }
    }

    #[test]
    fn global_mapping_round_trips_inside_clips(
        duration in 2.0f64..30.0,
        cuts in prop::collection::vec(0.1f64..0.9, 0..5),
        probe in 0.0f64..1.0,
    ) {
        let mut timeline = Timeline::for_duration(duration).unwrap();
        for ratio in cuts {
            let last = timeline.len() - 1;
            let clip = *timeline.clip(last).unwrap();
            let _ = timeline.split(last, clip.start + clip.duration() * ratio, MARGIN);
        }
        let total = timeline.total_duration();
        prop_assert!((total - duration).abs() < 1e-6);

        let global = probe * total * 0.999;
        let pos = timeline.locate_global(global);
        let back = timeline.to_global(pos.index, pos.source_secs);
        prop_assert!((back - global).abs() < 1e-6);
    }

    #[test]
    fn trim_is_idempotent(
        duration in 1.0f64..30.0,
        value in -10.0f64..40.0,
        start in any::<bool>(),
    ) {
        let mut timeline = Timeline::for_duration(duration).unwrap();
        let edge = if start { TrimEdge::Start } else { TrimEdge::End };
        let first = timeline.trim(0, edge, value, MIN_LEN).unwrap();
        let snapshot = timeline.clone();
        let second = timeline.trim(0, edge, value, MIN_LEN).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(snapshot, timeline);
    }
}
