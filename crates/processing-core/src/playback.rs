//! Playback correction: keeps the media clock inside the timeline's clips.
//!
//! The source media plays continuously in its own timebase, so on every
//! time update the reported position is checked against the active clip and
//! corrected. [`correct`] is pure; [`dispatch`] applies its decision to a
//! session and tells the caller what to do with the media handle.

use clipforge_common::config::EditorDefaults;
use clipforge_project_model::session::EditorSession;
use clipforge_project_model::timeline::Timeline;

/// Decision taken for one reported media time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackAction {
    /// The time is inside the active clip.
    None,
    /// The media drifted before the active clip; seek back to its start.
    SeekTo { source_secs: f64 },
    /// The active clip finished; activate `index` and seek to its start.
    Advance { index: usize, seek_to: f64 },
    /// The last clip finished; pause and park at the first clip's start.
    WrapAndPause { seek_to: f64 },
}

/// Command for the media handle after a time update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Continue,
    Seek(f64),
    SeekAndPause(f64),
}

/// Decide how to correct a reported time `t` (source seconds) for the clip
/// at `active_index`.
pub fn correct(
    timeline: &Timeline,
    active_index: usize,
    t: f64,
    limits: &EditorDefaults,
) -> PlaybackAction {
    let clip = match timeline.clip(active_index) {
        Some(clip) => clip,
        None => return PlaybackAction::None,
    };

    if t < clip.start - limits.seek_tolerance_secs {
        return PlaybackAction::SeekTo {
            source_secs: clip.start,
        };
    }

    if t >= clip.end - limits.edge_tolerance_secs {
        return match timeline.clip(active_index + 1) {
            Some(next) => PlaybackAction::Advance {
                index: active_index + 1,
                seek_to: next.start,
            },
            None => PlaybackAction::WrapAndPause {
                seek_to: timeline.clips()[0].start,
            },
        };
    }

    PlaybackAction::None
}

/// Apply a media time update to the session.
///
/// While playing, the correction from [`correct`] is applied. While paused,
/// an external scrub simply moves the playhead and activates whichever clip
/// contains it.
pub fn dispatch(session: &mut EditorSession, reported_secs: f64) -> MediaCommand {
    if !session.is_playing() {
        let location = session.timeline.locate_source(reported_secs);
        if location.within_bounds && location.index != session.timeline.active_index() {
            session.timeline.activate_clamped(location.index);
        }
        session.playhead_secs = reported_secs;
        return MediaCommand::Continue;
    }

    let active = session.timeline.active_index();
    match correct(&session.timeline, active, reported_secs, &session.limits) {
        PlaybackAction::None => {
            session.playhead_secs = reported_secs;
            MediaCommand::Continue
        }
        PlaybackAction::SeekTo { source_secs } => {
            tracing::debug!(reported = reported_secs, seek = source_secs, "Seek back into clip");
            session.playhead_secs = source_secs;
            MediaCommand::Seek(source_secs)
        }
        PlaybackAction::Advance { index, seek_to } => {
            tracing::debug!(from = active, to = index, seek = seek_to, "Advance to next clip");
            session.timeline.activate_clamped(index);
            session.playhead_secs = seek_to;
            MediaCommand::Seek(seek_to)
        }
        PlaybackAction::WrapAndPause { seek_to } => {
            tracing::debug!(seek = seek_to, "Reached end of timeline");
            session.timeline.activate_clamped(0);
            session.pause();
            session.playhead_secs = seek_to;
            MediaCommand::SeekAndPause(seek_to)
        }
    }
}

/// Simulate playback from the current playhead for `wall_secs` of wall-clock
/// time, sampling at `tick_hz`. Returns the global time at each tick.
///
/// The media clock is modeled as advancing `playback_rate / tick_hz` source
/// seconds per tick and jumping on every seek.
pub fn simulate(session: &mut EditorSession, wall_secs: f64, tick_hz: u32) -> Vec<f64> {
    let step = session.playback_rate / tick_hz.max(1) as f64;
    let ticks = (wall_secs.max(0.0) * tick_hz.max(1) as f64).round() as usize;
    let mut media_secs = session.playhead_secs;
    let mut samples = Vec::with_capacity(ticks);

    session.play();
    for _ in 0..ticks {
        media_secs += step;
        match dispatch(session, media_secs) {
            MediaCommand::Continue => {}
            MediaCommand::Seek(t) => media_secs = t,
            MediaCommand::SeekAndPause(t) => {
                samples.push(session.global_playhead());
                media_secs = t;
                break;
            }
        }
        samples.push(session.global_playhead());
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::clip::{Clip, ClipId};
    use clipforge_project_model::media::SourceMedia;

    fn limits() -> EditorDefaults {
        EditorDefaults::default()
    }

    fn two_clips() -> Timeline {
        Timeline::from_clips(vec![
            Clip::new(ClipId(1), 0.0, 5.0),
            Clip::new(ClipId(2), 5.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_tick_past_edge_advances() {
        let timeline = two_clips();
        assert_eq!(
            correct(&timeline, 0, 5.02, &limits()),
            PlaybackAction::Advance {
                index: 1,
                seek_to: 5.0
            }
        );
    }

    #[test]
    fn test_tick_inside_clip_is_left_alone() {
        let timeline = two_clips();
        assert_eq!(correct(&timeline, 0, 2.0, &limits()), PlaybackAction::None);
        assert_eq!(correct(&timeline, 0, 4.94, &limits()), PlaybackAction::None);
        // Within the seek tolerance before the start.
        assert_eq!(correct(&timeline, 1, 4.95, &limits()), PlaybackAction::None);
    }

    #[test]
    fn test_tick_before_start_seeks_back() {
        let timeline = two_clips();
        assert_eq!(
            correct(&timeline, 1, 4.5, &limits()),
            PlaybackAction::SeekTo { source_secs: 5.0 }
        );
    }

    #[test]
    fn test_last_clip_wraps_and_pauses() {
        let timeline = two_clips();
        assert_eq!(
            correct(&timeline, 1, 9.97, &limits()),
            PlaybackAction::WrapAndPause { seek_to: 0.0 }
        );
    }

    #[test]
    fn test_dispatch_advances_session() {
        let mut session = EditorSession::open(SourceMedia::new(10.0, 640, 360)).unwrap();
        session.playhead_secs = 5.0;
        session.split_at_playhead().unwrap();
        session.play();

        assert_eq!(dispatch(&mut session, 5.02), MediaCommand::Seek(5.0));
        assert_eq!(session.timeline.active_index(), 1);
        assert_eq!(session.playhead_secs, 5.0);

        assert_eq!(dispatch(&mut session, 9.99), MediaCommand::SeekAndPause(0.0));
        assert_eq!(session.timeline.active_index(), 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_paused_scrub_activates_owning_clip() {
        let mut session = EditorSession::open(SourceMedia::new(10.0, 640, 360)).unwrap();
        session.playhead_secs = 5.0;
        session.split_at_playhead().unwrap();

        assert_eq!(dispatch(&mut session, 7.0), MediaCommand::Continue);
        assert_eq!(session.timeline.active_index(), 1);
        assert_eq!(session.playhead_secs, 7.0);
    }

    #[test]
    fn test_simulation_skips_trimmed_gap() {
        let mut session = EditorSession::open(SourceMedia::new(10.0, 640, 360)).unwrap();
        session.playhead_secs = 4.0;
        session.split_at_playhead().unwrap();
        let second = session.timeline.clips()[1].id;
        // Cut [4, 6) out of the second clip by trimming its start.
        session
            .trim_clip(second, clipforge_project_model::clip::TrimEdge::Start, 6.0)
            .unwrap();
        session.playhead_secs = 0.0;

        let samples = simulate(&mut session, 20.0, 10);
        // Global time never exceeds the 8s timeline and playback stops.
        assert!(samples.iter().all(|t| *t <= 8.0 + 1e-9));
        assert!(!session.is_playing());
        assert_eq!(session.timeline.active_index(), 0);
        for pair in samples.windows(2).take(samples.len().saturating_sub(2)) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }
}
