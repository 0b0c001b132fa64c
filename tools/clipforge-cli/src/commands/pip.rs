//! Add or remove a picture-in-picture layer.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_project_model::geometry::PercentRect;
use clipforge_project_model::overlay::{LayerId, PipKind, PipLayerSpec};

use super::{edit_error, load_session, save_session};

pub struct PipArgs {
    pub source: String,
    pub video: bool,
    pub start: f64,
    pub end: Option<f64>,
    pub rect: Vec<f64>,
    pub opacity: f64,
}

pub fn add(config: &AppConfig, path: PathBuf, args: PipArgs) -> anyhow::Result<()> {
    let [x, y, w, h] = <[f64; 4]>::try_from(args.rect.as_slice())
        .map_err(|_| anyhow::anyhow!("--rect takes exactly four values: x,y,width,height"))?;

    let mut doc = load_session(config, &path)?;
    let end = args
        .end
        .unwrap_or_else(|| doc.session.timeline.total_duration());
    let spec = PipLayerSpec {
        kind: if args.video { PipKind::Video } else { PipKind::Image },
        source: args.source,
        rect: PercentRect::new(x, y, w, h),
        opacity: args.opacity,
        start_time: args.start,
        end_time: end,
    };

    let id = doc.session.add_pip(spec).map_err(edit_error)?;
    save_session(&mut doc, &path)?;
    println!("Added PiP layer {id} ({:.2}s..{end:.2}s)", args.start);
    Ok(())
}

pub fn remove(config: &AppConfig, path: PathBuf, id: u64) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let removed = doc.session.remove_pip(LayerId(id)).map_err(edit_error)?;
    save_session(&mut doc, &path)?;
    println!("Removed PiP layer {} ({})", removed.id, removed.source);
    Ok(())
}
