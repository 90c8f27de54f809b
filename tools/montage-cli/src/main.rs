//! Montage CLI: assemble media files into a timeline, preview it, and
//! export it to video.
//!
//! Usage:
//!   montage export <FILES>...       Render the files, in order, to one video
//!   montage preview <FILES>...      Save the preview frame at a timeline time
//!   montage transition <A> <B>      Render a transition between two stills
//!   montage info <FILES>...         Show how files would be imported
//!   montage check                   Check external tools and fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Timeline video editing from the command line",
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
    /// Render media files, in timeline order, to a single video
    Export {
        /// Media files (images, videos, audio)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rotate a clip clockwise: INDEX:DEGREES (multiple of 90)
        #[arg(long, value_name = "INDEX:DEGREES")]
        rotate: Vec<String>,

        /// Trim a video clip: INDEX:START:END (seconds)
        #[arg(long, value_name = "INDEX:START:END")]
        trim: Vec<String>,

        /// Overlay text on a clip: INDEX:TEXT
        #[arg(long, value_name = "INDEX:TEXT")]
        text: Vec<String>,

        /// Output format: mp4|webm
        #[arg(long)]
        format: Option<String>,

        /// Display duration of still images (seconds)
        #[arg(long)]
        image_duration: Option<f64>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Write numbered PNG frames into this directory instead of encoding
        #[arg(long)]
        frames_dir: Option<PathBuf>,
    },

    /// Save the preview frame shown at a timeline position
    Preview {
        /// Media files (images, videos, audio)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Timeline position (seconds)
        #[arg(long, default_value = "0")]
        at: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,
    },

    /// Render a transition between two images as a PNG sequence
    Transition {
        /// Outgoing image
        from: PathBuf,

        /// Incoming image
        to: PathBuf,

        /// Transition kind: fade|slide|zoom
        #[arg(long, default_value = "fade")]
        kind: String,

        /// Transition length (milliseconds)
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Output directory
        #[arg(short, long, default_value = "transition")]
        output: PathBuf,
    },

    /// Show how files would be imported
    Info {
        /// Media files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check external tools and fonts
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = montage_common::config::AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    montage_common::logging::init_logging(&config.logging);
    tracing::debug!(
        config = %montage_common::config::config_file_path().display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Export {
            files,
            output,
            rotate,
            trim,
            text,
            format,
            image_duration,
            width,
            height,
            fps,
            frames_dir,
        } => {
            let edits = commands::export::ClipEdits::parse(&rotate, &trim, &text)?;
            let options = commands::export::ExportOptions {
                output,
                format,
                image_duration,
                width,
                height,
                fps,
                frames_dir,
            };
            commands::export::run(config, files, edits, options).await
        }
        Commands::Preview { files, at, output } => {
            commands::preview::run(config, files, at, output).await
        }
        Commands::Transition {
            from,
            to,
            kind,
            duration_ms,
            output,
        } => commands::transition::run(config, from, to, kind, duration_ms, output),
        Commands::Info { files, json } => commands::info::run(files, json),
        Commands::Check => commands::check::run(&config),
    }
}
