//! Trim one edge of a clip.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_project_model::clip::{ClipId, TrimEdge};

use super::{edit_error, load_session, print_clips, save_session};

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    clip: u64,
    edge: TrimEdge,
    to: f64,
) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let applied = doc
        .session
        .trim_clip(ClipId(clip), edge, to)
        .map_err(edit_error)?;
    save_session(&mut doc, &path)?;

    if (applied - to).abs() > 1e-9 {
        println!("Requested {to:.2}s, clamped to {applied:.2}s");
    }
    println!("Trimmed {:?} edge of {} to {applied:.2}s", edge, ClipId(clip));
    print_clips(&doc);
    Ok(())
}
