//! Export a session to video.

use std::io::Write;
use std::path::PathBuf;

use clipforge_common::config::{AppConfig, ExportPacing};
use clipforge_render_engine::encoder::VideoCodec;
use clipforge_render_engine::export::{export_session, ExportOptions, ExportProgress, ExportStage};

use super::{load_session, session_dir};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    codec: Option<String>,
    unthrottled: bool,
) -> anyhow::Result<()> {
    println!("Exporting session at: {}", path.display());
    let doc = load_session(config, &path)?;

    let mut options = ExportOptions::from_defaults(&config.export).with_file_stem(&doc.name);
    if let Some(name) = codec {
        options.codec = VideoCodec::from_name(&name)
            .ok_or_else(|| anyhow::anyhow!("Unknown codec: {name}. Use: h264, h265, vp9"))?;
    }
    if unthrottled {
        options = options.with_pacing(ExportPacing::Unthrottled);
    }

    println!("  Codec: {:?}", options.codec);
    println!("  Frame rate: {}fps", options.fps);
    println!("  Clips: {}", doc.session.timeline.len());

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        if p.stage == ExportStage::Idle {
            return;
        }
        print!(
            "\r  Progress: {:>3}% ({}/{} frames, {:?}, ETA: {:.0}s)  ",
            p.percent, p.frames_rendered, p.total_frames, p.stage, p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    let base_dir = session_dir(&path);
    match export_session(&doc.session, &base_dir, options, Some(progress_cb)).await {
        Ok(asset) => {
            let output_path = output.unwrap_or_else(|| base_dir.join(&asset.suggested_filename));
            if let Some(parent) = output_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&output_path, &asset.bytes)?;
            println!(
                "\nExport complete: {} ({}, {} bytes)",
                output_path.display(),
                asset.mime_type,
                asset.bytes.len()
            );
            Ok(())
        }
        Err(e) => {
            println!();
            anyhow::bail!("{}", e.user_message())
        }
    }
}
