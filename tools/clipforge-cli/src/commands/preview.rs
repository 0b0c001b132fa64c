//! Sample a transition, fade, or playback run without rendering.

use std::path::PathBuf;
use std::time::Duration;

use clipforge_common::clock::{EditorClock, RateController};
use clipforge_common::config::AppConfig;
use clipforge_processing_core::playback::simulate;
use clipforge_processing_core::preview::{PreviewEngine, PreviewFrame, VisualState};
use clipforge_project_model::session::{EditorSession, SessionError};

use super::{edit_error, load_session, save_session};

pub enum Target {
    Transition(String),
    Fade(String),
    /// Seconds of simulated playback.
    Playback(f64),
    /// Whatever transition or fade the session has selected.
    Active,
}

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    target: Target,
    duration: Option<f64>,
    rate: u32,
    live: bool,
) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let rate = rate.max(1);

    let mut engine = PreviewEngine::new();
    let seek = match target {
        Target::Playback(secs) => {
            play(&mut doc.session, secs, rate);
            return Ok(());
        }
        Target::Transition(id) => {
            select_transition(&mut doc.session, &id, duration)?;
            start_transition(&mut engine, &mut doc.session)?
        }
        Target::Fade(id) => {
            select_fade(&mut doc.session, &id, duration)?;
            start_fade(&mut engine, &mut doc.session)?
        }
        Target::Active => {
            if doc.session.transitions.active_transition.is_some() {
                start_transition(&mut engine, &mut doc.session)?
            } else if doc.session.transitions.active_fade.is_some() {
                start_fade(&mut engine, &mut doc.session)?
            } else {
                anyhow::bail!("No transition or fade selected; pass --transition or --fade");
            }
        }
    };
    save_session(&mut doc, &path)?;
    println!("Preview parked at source {seek:.2}s");

    if live {
        let clock = EditorClock::start();
        let mut ticker = RateController::new(rate);
        loop {
            let now = clock.now_secs();
            if ticker.should_tick(now) {
                let frame = engine.tick(now);
                print_frame(now, &frame);
                if frame.finished {
                    break;
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    } else {
        let mut tick = 0u64;
        loop {
            let now = tick as f64 / rate as f64;
            let frame = engine.tick(now);
            print_frame(now, &frame);
            if frame.finished {
                break;
            }
            tick += 1;
        }
    }
    Ok(())
}

/// Simulated playback; the session is not saved.
fn play(session: &mut EditorSession, secs: f64, rate: u32) {
    println!(
        "Playing {secs:.2}s from timeline {:.2}s at {}x",
        session.global_playhead(),
        session.playback_rate
    );
    for (tick, global) in simulate(session, secs, rate).iter().enumerate() {
        let clip = session.timeline.locate_global(*global).index;
        println!("  tick {tick:>4}  timeline {global:>7.3}s  clip {clip}");
    }
    println!("Stopped at timeline {:.3}s", session.global_playhead());
}

fn select_transition(
    session: &mut EditorSession,
    id: &str,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    session.select_transition(id).map_err(edit_error)?;
    if let Some(secs) = duration {
        session
            .transitions
            .set_transition_duration(id, secs)
            .map_err(|e| edit_error(SessionError::from(e)))?;
    }
    Ok(())
}

fn select_fade(session: &mut EditorSession, id: &str, duration: Option<f64>) -> anyhow::Result<()> {
    session.select_fade(id).map_err(edit_error)?;
    if let Some(secs) = duration {
        session
            .transitions
            .set_fade_duration(id, secs)
            .map_err(|e| edit_error(SessionError::from(e)))?;
    }
    Ok(())
}

fn start_transition(engine: &mut PreviewEngine, session: &mut EditorSession) -> anyhow::Result<f64> {
    let choice = session
        .transitions
        .active_transition_choice()
        .ok_or_else(|| anyhow::anyhow!("No transition selected"))?;
    println!("Transition '{}' ({:.2}s)", choice.id, choice.duration_secs);
    Ok(engine.start_transition(session, choice, 0.0))
}

fn start_fade(engine: &mut PreviewEngine, session: &mut EditorSession) -> anyhow::Result<f64> {
    let fade = session
        .transitions
        .active_fade_choice()
        .ok_or_else(|| anyhow::anyhow!("No fade selected"))?;
    println!(
        "Fade '{}' (in {:.2}s, out {:.2}s)",
        fade.id, fade.fade_in_secs, fade.fade_out_secs
    );
    Ok(engine.start_fade(session, fade, 0.0))
}

fn print_frame(now: f64, frame: &PreviewFrame) {
    let VisualState {
        opacity,
        overlay_color,
        overlay_opacity,
        blur_px,
        wipe,
        ..
    } = frame.visual;
    let mut line = format!(
        "  {now:>6.3}s  opacity {opacity:.3}  {}",
        frame.visual.css_transform()
    );
    if blur_px > 0.0 {
        line.push_str(&format!("  blur {blur_px:.1}px"));
    }
    if let Some(color) = overlay_color {
        line.push_str(&format!("  {color} @ {overlay_opacity:.3}"));
    }
    if let Some(wipe) = wipe {
        line.push_str(&format!("  wipe {:?} {:.3}", wipe.direction, wipe.revealed));
    }
    if frame.finished {
        line.push_str("  (done)");
    }
    println!("{line}");
}
