//! Change the effect stack.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_project_model::effects::{Adjustment, FilterPreset};

use super::{load_session, save_session};

pub struct EffectArgs {
    pub preset: Option<String>,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub saturation: Option<f64>,
    pub blur: Option<f64>,
    pub hue: Option<f64>,
    pub rotate: Option<String>,
    pub reset: bool,
}

pub fn run(config: &AppConfig, path: PathBuf, args: EffectArgs) -> anyhow::Result<()> {
    let mut doc = load_session(config, &path)?;
    let effects = &mut doc.session.effects;

    if args.reset {
        effects.reset();
    }
    if let Some(id) = &args.preset {
        let preset = FilterPreset::from_id(id).ok_or_else(|| {
            let known: Vec<&str> = FilterPreset::ALL.iter().map(|p| p.id()).collect();
            anyhow::anyhow!("Unknown preset '{id}'. Use: {}", known.join(", "))
        })?;
        effects.set_preset(preset);
    }

    let requested = [
        (Adjustment::Brightness, args.brightness),
        (Adjustment::Contrast, args.contrast),
        (Adjustment::Saturation, args.saturation),
        (Adjustment::Blur, args.blur),
        (Adjustment::Hue, args.hue),
    ];
    for (adjustment, value) in requested {
        if let Some(value) = value {
            let applied = effects.set_adjustment(adjustment, value);
            if (applied - value).abs() > 1e-9 {
                println!("{adjustment:?} clamped to {applied}");
            }
        }
    }

    match args.rotate.as_deref() {
        Some("cw") => effects.rotate_clockwise(),
        Some("ccw") => effects.rotate_counterclockwise(),
        Some(other) => anyhow::bail!("Unknown rotation '{other}'. Use: cw, ccw"),
        None => {}
    }

    let descriptor = effects.compile();
    save_session(&mut doc, &path)?;

    let effects = &doc.session.effects;
    println!("Effects:");
    println!("  Preset: {}", effects.preset.id());
    for adjustment in Adjustment::ORDER {
        println!("  {adjustment:?}: {}", effects.adjustments.get(adjustment));
    }
    println!("  Rotation: {}°", effects.rotation_degrees);
    println!("  Filter chain: {:?}", descriptor.ops);
    Ok(())
}
