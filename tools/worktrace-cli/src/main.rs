//! Worktrace CLI: exertion and productivity analysis from detector output.
//!
//! Usage:
//!   worktrace analyze <FRAMES>     Analyze one video's detections
//!   worktrace batch <DIR>          Analyze every video in a directory
//!   worktrace rollup <METRICS>     Reduce saved per-video metrics
//!   worktrace validate <FRAMES>    Report malformed detector records
//!   worktrace config               Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use worktrace_common::AppConfig;

mod commands;

use commands::AnalysisArgs;

#[derive(Parser)]
#[command(
    name = "worktrace",
    about = "Worker exertion and productivity from hand keypoints and tool detections",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/worktrace/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one video's detector output
    Analyze {
        /// Detector output (JSONL, one record per frame)
        path: PathBuf,

        /// Video id (defaults to the file stem)
        #[arg(long)]
        video_id: Option<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Write the classified frames as JSONL
        #[arg(long)]
        frames_out: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze every *.jsonl video in a directory and roll the results up
    Batch {
        /// Directory of detector outputs, one file per video
        dir: PathBuf,

        /// Videos analyzed concurrently
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Write the batch report (pretty JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write per-video metrics as JSONL (input for `rollup`)
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Build a site rollup from saved per-video metrics
    Rollup {
        /// Metrics file (JSONL)
        path: PathBuf,
    },

    /// Check detector output for malformed records without scoring
    Validate {
        /// Detector output (JSONL)
        path: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Save the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    worktrace_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Analyze {
            path,
            video_id,
            analysis,
            frames_out,
            json,
        } => commands::analyze::run(
            path,
            video_id,
            analysis.apply(config.analysis),
            analysis.source_fps,
            frames_out,
            json,
        ),
        Commands::Batch {
            dir,
            jobs,
            analysis,
            output,
            metrics_out,
        } => {
            commands::batch::run(
                dir,
                jobs,
                analysis.apply(config.analysis),
                analysis.source_fps,
                output,
                metrics_out,
            )
            .await
        }
        Commands::Rollup { path } => commands::rollup::run(path),
        Commands::Validate { path } => commands::validate::run(path, &config.analysis),
        Commands::Config { write } => commands::config::run(&config, cli.config, write),
    }
}
