//! Delete a clip.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_project_model::clip::ClipId;

use super::{load_session, print_clips, save_session};

pub fn run(config: &AppConfig, path: PathBuf, clip: u64) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let id = ClipId(clip);
    let index = doc
        .session
        .timeline
        .index_of(id)
        .ok_or_else(|| anyhow::anyhow!("No clip with id {clip}"))?;
    doc.session.delete_clip(index).map_err(super::edit_error)?;
    save_session(&mut doc, &path)?;

    println!("Deleted {id}");
    print_clips(&doc);
    Ok(())
}
