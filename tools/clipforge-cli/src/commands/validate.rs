//! Validate a session document.

use std::path::{Path, PathBuf};

use clipforge_common::config::AppConfig;

use super::{load_session, session_dir};

pub fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    println!("Validating session at: {}", path.display());

    let doc = load_session(config, &path)?;
    let session = &doc.session;
    println!("  Name: {}", doc.name);
    println!("  Version: {}", doc.version);
    println!(
        "  Media: {}x{}, {:.2}s",
        session.media.width, session.media.height, session.media.duration_secs
    );
    println!("  Clips: {}", session.timeline.len());
    println!(
        "  Overlays: {} text, {} PiP",
        session.overlays.texts().len(),
        session.overlays.pips().len()
    );

    // Timeline and overlay invariants were checked on load; check files.
    let base = session_dir(&path);
    let mut missing = Vec::new();
    if let Some(media) = &session.media.path {
        check_file(&base, media, &mut missing);
    }
    for slide in &session.media.slides {
        check_file(&base, slide, &mut missing);
    }
    for pip in session.overlays.pips() {
        check_file(&base, &pip.source, &mut missing);
    }

    if missing.is_empty() {
        println!("  Sources: All present");
        println!("\nSession is valid.");
    } else {
        println!("\nValidation issues:");
        for file in &missing {
            println!("  - Missing file: {file}");
        }
        println!(
            "\n{} issue(s) found. Export will fail or skip layers.",
            missing.len()
        );
    }
    Ok(())
}

fn check_file(base: &Path, file: &str, missing: &mut Vec<String>) {
    if !base.join(file).exists() {
        missing.push(file.to_string());
    }
}
