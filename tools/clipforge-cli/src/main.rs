//! Clipforge CLI: create, edit, preview, and export editor sessions.
//!
//! Usage:
//!   clipforge init <MEDIA>          Create a session on a video file
//!   clipforge info <SESSION>        Show session information
//!   clipforge validate <SESSION>    Validate a session document
//!   clipforge split <SESSION>       Split the clip under a timeline time
//!   clipforge trim <SESSION>        Trim one edge of a clip
//!   clipforge delete <SESSION>      Delete a clip
//!   clipforge move <SESSION>        Reorder clips
//!   clipforge text <SESSION>        Add or remove a text overlay
//!   clipforge pip <SESSION>         Add or remove a picture-in-picture layer
//!   clipforge effect <SESSION>      Change the effect stack
//!   clipforge preview <SESSION>     Sample a transition, fade, or playback run
//!   clipforge export <SESSION>      Render the session to a video file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clipforge_common::config::AppConfig;
use clipforge_project_model::clip::TrimEdge;
use clipforge_project_model::color::Color;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Non-destructive clip timeline editor and exporter",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session on a video file or a set of images
    Init {
        /// Video file to edit
        #[arg(required_unless_present = "slideshow")]
        media: Option<PathBuf>,

        /// Build a slideshow from these images instead of a video
        #[arg(long, num_args = 1.., conflicts_with = "media")]
        slideshow: Vec<PathBuf>,

        /// Seconds each slideshow image is shown
        #[arg(long, default_value = "3.0")]
        slide_secs: f64,

        /// Session name
        #[arg(short, long, default_value = "untitled")]
        name: String,

        /// Output directory (defaults to the configured sessions directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show session information
    Info {
        /// Path to the session document
        session: PathBuf,

        /// Print the raw session document as JSON
        #[arg(long)]
        json: bool,

        /// Write one PNG thumbnail per clip into this directory
        #[arg(long)]
        thumbnails: Option<PathBuf>,
    },

    /// Validate a session document
    Validate {
        /// Path to the session document
        session: PathBuf,
    },

    /// Split the clip under a timeline time
    Split {
        session: PathBuf,

        /// Timeline time in seconds
        #[arg(long)]
        at: f64,
    },

    /// Trim one edge of a clip
    Trim {
        session: PathBuf,

        /// Clip id (see `info`)
        #[arg(long)]
        clip: u64,

        /// Edge to move: start|end
        #[arg(long, value_parser = parse_edge)]
        edge: TrimEdge,

        /// New edge position in source seconds
        #[arg(long)]
        to: f64,
    },

    /// Delete a clip
    Delete {
        session: PathBuf,

        /// Clip id (see `info`)
        #[arg(long)]
        clip: u64,
    },

    /// Move a clip to another timeline position
    Move {
        session: PathBuf,

        /// Zero-based index of the clip to move
        #[arg(long)]
        from: usize,

        /// Zero-based destination index
        #[arg(long)]
        to: usize,
    },

    /// Add or remove a text overlay
    Text {
        session: PathBuf,

        /// Caption text
        #[arg(long, required_unless_present = "remove")]
        text: Option<String>,

        /// Timeline time the caption appears
        #[arg(long, default_value = "0.0")]
        start: f64,

        /// Timeline time the caption disappears
        #[arg(long)]
        end: Option<f64>,

        /// Horizontal position in percent of the frame
        #[arg(long, default_value = "50.0")]
        x: f64,

        /// Vertical position in percent of the frame
        #[arg(long, default_value = "50.0")]
        y: f64,

        /// Font size in pixels
        #[arg(long, default_value = "48.0")]
        size: f64,

        /// Text color (#RRGGBB or #RRGGBBAA)
        #[arg(long, default_value = "#ffffff")]
        color: Color,

        /// Bold weight
        #[arg(long)]
        bold: bool,

        /// Remove the overlay with this layer id instead of adding one
        #[arg(long, conflicts_with = "text")]
        remove: Option<u64>,
    },

    /// Add or remove a picture-in-picture layer
    Pip {
        session: PathBuf,

        /// Image or video file shown in the layer
        #[arg(long, required_unless_present = "remove")]
        source: Option<String>,

        /// Treat the source as a video
        #[arg(long)]
        video: bool,

        /// Timeline time the layer appears
        #[arg(long, default_value = "0.0")]
        start: f64,

        /// Timeline time the layer disappears
        #[arg(long)]
        end: Option<f64>,

        /// Layer rectangle in percent: x,y,width,height
        #[arg(long, value_delimiter = ',', default_values_t = [70.0, 5.0, 25.0, 25.0])]
        rect: Vec<f64>,

        /// Layer opacity in [0, 1]
        #[arg(long, default_value = "1.0")]
        opacity: f64,

        /// Remove the layer with this id instead of adding one
        #[arg(long, conflicts_with = "source")]
        remove: Option<u64>,
    },

    /// Change the effect stack
    Effect {
        session: PathBuf,

        /// Filter preset id (none, grayscale, sepia, vintage, warm, cool,
        /// vivid, faded, noir, invert)
        #[arg(long)]
        preset: Option<String>,

        /// Brightness in percent
        #[arg(long)]
        brightness: Option<f64>,

        /// Contrast in percent
        #[arg(long)]
        contrast: Option<f64>,

        /// Saturation in percent
        #[arg(long)]
        saturation: Option<f64>,

        /// Blur radius in pixels
        #[arg(long)]
        blur: Option<f64>,

        /// Hue rotation in degrees
        #[arg(long)]
        hue: Option<f64>,

        /// Rotate a quarter turn: cw|ccw
        #[arg(long)]
        rotate: Option<String>,

        /// Reset every effect before applying the other flags
        #[arg(long)]
        reset: bool,
    },

    /// Sample a transition, fade, or playback run
    Preview {
        session: PathBuf,

        /// Transition id to preview
        #[arg(long, conflicts_with_all = ["fade", "playback"])]
        transition: Option<String>,

        /// Fade id to preview
        #[arg(long, conflicts_with = "playback")]
        fade: Option<String>,

        /// Simulate this many seconds of playback across clip boundaries
        #[arg(long)]
        playback: Option<f64>,

        /// Custom duration in seconds, stored with the session
        #[arg(long)]
        duration: Option<f64>,

        /// Samples per second
        #[arg(long, default_value = "10")]
        rate: u32,

        /// Run against the wall clock instead of sampling instantly
        #[arg(long)]
        live: bool,
    },

    /// Render the session to a video file
    Export {
        session: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video codec: h264|h265|vp9
        #[arg(long)]
        codec: Option<String>,

        /// Render as fast as the encoder accepts frames
        #[arg(long)]
        unthrottled: bool,
    },
}

fn parse_edge(value: &str) -> Result<TrimEdge, String> {
    match value {
        "start" => Ok(TrimEdge::Start),
        "end" => Ok(TrimEdge::End),
        other => Err(format!("unknown edge '{other}', expected start or end")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipforge_common::logging::init_logging(&logging);
    tracing::debug!(sessions_dir = %config.sessions_dir.display(), "Loaded configuration");

    match cli.command {
        Commands::Init {
            media,
            slideshow,
            slide_secs,
            name,
            output,
        } => {
            let output = output.unwrap_or_else(|| config.sessions_dir.clone());
            commands::init::run(&config, media, slideshow, slide_secs, name, output)
        }
        Commands::Info {
            session,
            json,
            thumbnails,
        } => commands::info::run(&config, session, json, thumbnails).await,
        Commands::Validate { session } => commands::validate::run(&config, session),
        Commands::Split { session, at } => commands::split::run(&config, session, at),
        Commands::Trim {
            session,
            clip,
            edge,
            to,
        } => commands::trim::run(&config, session, clip, edge, to),
        Commands::Delete { session, clip } => commands::delete::run(&config, session, clip),
        Commands::Move { session, from, to } => commands::reorder::run(&config, session, from, to),
        Commands::Text {
            session,
            text,
            start,
            end,
            x,
            y,
            size,
            color,
            bold,
            remove,
        } => match remove {
            Some(id) => commands::text::remove(&config, session, id),
            None => commands::text::add(
                &config,
                session,
                commands::text::TextArgs {
                    text: text.unwrap_or_default(),
                    start,
                    end,
                    x,
                    y,
                    size,
                    color,
                    bold,
                },
            ),
        },
        Commands::Pip {
            session,
            source,
            video,
            start,
            end,
            rect,
            opacity,
            remove,
        } => match remove {
            Some(id) => commands::pip::remove(&config, session, id),
            None => commands::pip::add(
                &config,
                session,
                commands::pip::PipArgs {
                    source: source.unwrap_or_default(),
                    video,
                    start,
                    end,
                    rect,
                    opacity,
                },
            ),
        },
        Commands::Effect {
            session,
            preset,
            brightness,
            contrast,
            saturation,
            blur,
            hue,
            rotate,
            reset,
        } => commands::effect::run(
            &config,
            session,
            commands::effect::EffectArgs {
                preset,
                brightness,
                contrast,
                saturation,
                blur,
                hue,
                rotate,
                reset,
            },
        ),
        Commands::Preview {
            session,
            transition,
            fade,
            playback,
            duration,
            rate,
            live,
        } => {
            let target = match (transition, fade, playback) {
                (Some(id), _, _) => commands::preview::Target::Transition(id),
                (None, Some(id), _) => commands::preview::Target::Fade(id),
                (None, None, Some(secs)) => commands::preview::Target::Playback(secs),
                (None, None, None) => commands::preview::Target::Active,
            };
            commands::preview::run(&config, session, target, duration, rate, live)
        }
        Commands::Export {
            session,
            output,
            codec,
            unthrottled,
        } => commands::export::run(&config, session, output, codec, unthrottled).await,
    }
}
