//! Reframe CLI: record crop tracks and replay them against frame sequences.
//!
//! Usage:
//!   reframe record --input <JSONL>    Record editor updates into a track
//!   reframe info <TRACK>              Show track information
//!   reframe resolve <TRACK> --at <S>  Show the keyframe applied at a time
//!   reframe render <TRACK> ...        Render stills from a frame sequence
//!   reframe play <TRACK> ...          Autoplay through the live render loop
//!   reframe validate <TRACK>          Check a track for bad samples

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reframe_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reframe",
    about = "Record crop keyframes and replay them deterministically",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session from a file of editor updates (one JSON object per line)
    Record {
        /// Editor updates to replay
        #[arg(short, long)]
        input: PathBuf,

        /// Exported track path (defaults to the configured filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show track information
    Info {
        /// Path to the exported track
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the keyframe that applies at a playback time
    Resolve {
        /// Path to the exported track
        path: PathBuf,

        /// Playback time (seconds)
        #[arg(long)]
        at: f64,

        /// Resolution strategy: last-at-or-before|first-at-or-after
        #[arg(long, default_value = "last-at-or-before")]
        strategy: String,
    },

    /// Render stills of a track over a directory of video frames
    Render {
        /// Path to the exported track
        path: PathBuf,

        /// Directory of numbered PNG/JPEG frames
        #[arg(long)]
        frames: PathBuf,

        /// Frame rate of the sequence
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Display size the crops were drawn on, e.g. 640x360
        #[arg(long)]
        display: Option<String>,

        /// Render the instant at this time (seconds)
        #[arg(long, conflicts_with = "walk")]
        at: Option<f64>,

        /// Render one still per keyframe
        #[arg(long)]
        walk: bool,

        /// Also write the crop at native resolution (with --at)
        #[arg(long, requires = "at")]
        native: bool,

        /// Output width (defaults to the configured width)
        #[arg(long)]
        width: Option<u32>,

        /// Output PNG path, or directory with --walk
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Autoplay a track over a directory of video frames
    Play {
        /// Path to the exported track
        path: PathBuf,

        /// Directory of numbered PNG/JPEG frames
        #[arg(long)]
        frames: PathBuf,

        /// Frame rate of the sequence
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Display size the crops were drawn on, e.g. 640x360
        #[arg(long)]
        display: Option<String>,

        /// Write the last drawn frame as PNG
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check a track for out-of-range samples
    Validate {
        /// Path to the exported track
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reframe_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Record { input, output } => {
            commands::record::run(&config, input, output).await?;
        }
        Commands::Info { path, json } => {
            commands::info::run(path, json)?;
        }
        Commands::Resolve { path, at, strategy } => {
            commands::resolve::run(path, at, strategy)?;
        }
        Commands::Render {
            path,
            frames,
            fps,
            display,
            at,
            walk,
            native,
            width,
            out,
        } => {
            commands::render::run(
                &config,
                commands::render::RenderArgs {
                    path,
                    frames,
                    fps,
                    display,
                    at,
                    walk,
                    native,
                    width,
                    out,
                },
            )?;
        }
        Commands::Play {
            path,
            frames,
            fps,
            display,
            out,
        } => {
            commands::play::run(
                &config,
                commands::play::PlayArgs {
                    path,
                    frames,
                    fps,
                    display,
                    out,
                },
            )
            .await?;
        }
        Commands::Validate { path } => {
            commands::validate::run(path)?;
        }
    }

    Ok(())
}
