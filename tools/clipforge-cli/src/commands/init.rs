//! Create a new editor session.

use std::path::{Path, PathBuf};

use clipforge_common::config::AppConfig;
use clipforge_project_model::media::SourceMedia;
use clipforge_project_model::session::{EditorSession, SessionDocument};
use clipforge_render_engine::source::probe_media;

use super::{print_clips, save_session};

pub fn run(
    config: &AppConfig,
    media: Option<PathBuf>,
    slideshow: Vec<PathBuf>,
    slide_secs: f64,
    name: String,
    output: PathBuf,
) -> anyhow::Result<()> {
    let source = match media {
        Some(path) => {
            println!("Probing {}", path.display());
            probe_media(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read media: {e}"))?
                .with_path(absolute(&path).display().to_string())
        }
        None => slideshow_media(config, &slideshow, slide_secs)?,
    };

    let session = EditorSession::open(source)
        .map_err(|e| anyhow::anyhow!("Failed to open session: {e}"))?
        .with_limits(config.editor);
    let mut doc = SessionDocument::new(&name, session);

    let session_path = output.join(format!("{name}.session.json"));
    save_session(&mut doc, &session_path)?;

    let media = &doc.session.media;
    println!("Session created: {}", session_path.display());
    println!("  Media: {:?} {}x{}, {:.2}s", media.kind, media.width, media.height, media.duration_secs);
    if !media.slides.is_empty() {
        println!("  Slides: {}", media.slides.len());
    }
    print_clips(&doc);
    Ok(())
}

fn slideshow_media(
    config: &AppConfig,
    images: &[PathBuf],
    slide_secs: f64,
) -> anyhow::Result<SourceMedia> {
    if images.is_empty() {
        anyhow::bail!("A slideshow needs at least one image");
    }
    if !slide_secs.is_finite() || slide_secs <= 0.0 {
        anyhow::bail!("Slide duration must be positive");
    }
    for image in images {
        if !image.exists() {
            anyhow::bail!("Image not found: {}", image.display());
        }
    }
    let slides = images
        .iter()
        .map(|p| absolute(p).display().to_string())
        .collect();
    Ok(SourceMedia::new(
        slide_secs * images.len() as f64,
        config.export.slideshow_width,
        config.export.slideshow_height,
    )
    .with_slides(slides))
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
