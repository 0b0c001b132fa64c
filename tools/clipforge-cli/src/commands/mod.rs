pub mod delete;
pub mod effect;
pub mod export;
pub mod info;
pub mod init;
pub mod pip;
pub mod preview;
pub mod reorder;
pub mod split;
pub mod text;
pub mod trim;
pub mod validate;

use std::path::{Path, PathBuf};

use clipforge_common::config::AppConfig;
use clipforge_project_model::session::{SessionDocument, SessionError};

/// Load a session document and apply the configured editor tolerances.
pub fn load_session(config: &AppConfig, path: &Path) -> anyhow::Result<SessionDocument> {
    let mut doc =
        SessionDocument::load(path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;
    doc.session.limits = config.editor;
    Ok(doc)
}

pub fn save_session(doc: &mut SessionDocument, path: &Path) -> anyhow::Result<()> {
    doc.save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save session: {e}"))
}

/// Turn a rejected edit into the message shown to the user.
pub fn edit_error(err: SessionError) -> anyhow::Error {
    if err.is_invalid_operation() {
        anyhow::anyhow!("{err}")
    } else {
        anyhow::anyhow!("Edit failed: {err}")
    }
}

/// Directory media paths in a session are resolved against.
pub fn session_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Print the clip list of a session.
pub fn print_clips(doc: &SessionDocument) {
    let timeline = &doc.session.timeline;
    println!(
        "Clips ({}, {:.2}s total):",
        timeline.len(),
        timeline.total_duration()
    );
    for (index, clip) in timeline.clips().iter().enumerate() {
        let marker = if index == timeline.active_index() { "*" } else { " " };
        println!(
            " {marker}[{index}] {} source {:.2}s..{:.2}s  timeline {:.2}s  ({:.2}s)",
            clip.id,
            clip.start,
            clip.end,
            timeline.global_start_of(index),
            clip.duration()
        );
    }
}
