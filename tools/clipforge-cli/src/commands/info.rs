//! Show session information.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_render_engine::export::{open_session_source, ExportOptions};
use clipforge_render_engine::thumbnails::{clip_thumbnails, THUMBNAIL_SIZE};

use super::{load_session, print_clips, session_dir};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    json: bool,
    thumbnails: Option<PathBuf>,
) -> anyhow::Result<()> {
    let doc = load_session(config, &path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let s = &doc.session;
    println!("Session: {}", doc.name);
    println!("  Version: {}", doc.version);
    println!("  Created: {}", doc.created_at);
    println!("  Modified: {}", doc.modified_at);
    println!();

    println!("Media:");
    println!("  Kind: {:?}", s.media.kind);
    if let Some(p) = &s.media.path {
        println!("  Path: {p}");
    }
    if !s.media.slides.is_empty() {
        println!("  Slides: {}", s.media.slides.len());
    }
    println!(
        "  Size: {}x{}, {:.2}s",
        s.media.width, s.media.height, s.media.duration_secs
    );
    println!();

    print_clips(&doc);
    println!("  Playhead: source {:.2}s (timeline {:.2}s)", s.playhead_secs, s.global_playhead());
    println!();

    println!("Effects:");
    println!("  Preset: {}", s.effects.preset.id());
    println!("  Rotation: {}°", s.effects.rotation_degrees);
    println!("  Filter chain: {:?}", s.effects.compile().ops);
    println!();

    println!("Overlays:");
    for text in s.overlays.texts() {
        println!(
            "  {} text \"{}\" {:.2}s..{:.2}s at ({:.0}%, {:.0}%)",
            text.id, text.text, text.start_time, text.end_time, text.x_percent, text.y_percent
        );
    }
    for pip in s.overlays.pips() {
        println!(
            "  {} {:?} {} {:.2}s..{:.2}s",
            pip.id, pip.kind, pip.source, pip.start_time, pip.end_time
        );
    }
    if s.overlays.is_empty() {
        println!("  (none)");
    }
    println!();

    println!("Preview:");
    println!(
        "  Transition: {}",
        s.transitions.active_transition.as_deref().unwrap_or("none")
    );
    println!("  Fade: {}", s.transitions.active_fade.as_deref().unwrap_or("none"));

    if let Some(dir) = thumbnails {
        write_thumbnails(config, &doc, &path, &dir).await?;
    }
    Ok(())
}

async fn write_thumbnails(
    config: &AppConfig,
    doc: &clipforge_project_model::session::SessionDocument,
    session_path: &std::path::Path,
    dir: &std::path::Path,
) -> anyhow::Result<()> {
    let options = ExportOptions::from_defaults(&config.export);
    let mut source = open_session_source(&doc.session, &session_dir(session_path), &options)
        .map_err(|e| anyhow::anyhow!("Failed to open media: {e}"))?;
    std::fs::create_dir_all(dir)?;

    let thumbs = clip_thumbnails(&doc.session.timeline, source.as_mut(), THUMBNAIL_SIZE).await;
    source.release();

    println!();
    println!("Thumbnails:");
    for (clip, thumb) in doc.session.timeline.clips().iter().zip(thumbs) {
        match thumb {
            Some(image) => {
                let file = dir.join(format!("{}.png", clip.id));
                image.save(&file)?;
                println!("  {} -> {}", clip.id, file.display());
            }
            None => println!("  {} -> (unavailable)", clip.id),
        }
    }
    Ok(())
}
