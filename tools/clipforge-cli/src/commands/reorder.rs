//! Move a clip to another timeline position.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;

use super::{edit_error, load_session, print_clips, save_session};

pub fn run(config: &AppConfig, path: PathBuf, from: usize, to: usize) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    doc.session.move_clip(from, to).map_err(edit_error)?;
    save_session(&mut doc, &path)?;

    println!("Moved clip {from} to position {to}");
    print_clips(&doc);
    Ok(())
}
