//! Add or remove a text overlay.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_project_model::color::Color;
use clipforge_project_model::geometry::PercentPoint;
use clipforge_project_model::overlay::{FontWeight, LayerId, TextOverlaySpec};

use super::{edit_error, load_session, save_session};

pub struct TextArgs {
    pub text: String,
    pub start: f64,
    pub end: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: Color,
    pub bold: bool,
}

pub fn add(config: &AppConfig, path: PathBuf, args: TextArgs) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    // Overlay windows are in timeline time; default to the whole timeline.
    let end = args
        .end
        .unwrap_or_else(|| doc.session.timeline.total_duration());

    let mut spec = TextOverlaySpec::new(args.text, args.start, end);
    spec.position = PercentPoint::clamped(args.x, args.y);
    spec.font_size_px = args.size;
    spec.color = args.color;
    if args.bold {
        spec.font_weight = FontWeight::Bold;
    }

    let id = doc.session.add_text(spec).map_err(edit_error)?;
    save_session(&mut doc, &path)?;
    println!("Added text overlay {id} ({:.2}s..{end:.2}s)", args.start);
    Ok(())
}

pub fn remove(config: &AppConfig, path: PathBuf, id: u64) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let removed = doc.session.remove_text(LayerId(id)).map_err(edit_error)?;
    save_session(&mut doc, &path)?;
    println!("Removed text overlay {} \"{}\"", removed.id, removed.text);
    Ok(())
}
