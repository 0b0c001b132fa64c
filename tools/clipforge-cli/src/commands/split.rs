//! Split the clip under a timeline time.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;

use super::{edit_error, load_session, print_clips, save_session};

pub fn run(config: &AppConfig, path: PathBuf, at: f64) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let source_secs = doc.session.seek_global(at);
    let new_id = doc.session.split_at_playhead().map_err(edit_error)?;
    save_session(&mut doc, &path)?;

    println!("Split at {at:.2}s (source {source_secs:.2}s), created {new_id}");
    print_clips(&doc);
    Ok(())
}
