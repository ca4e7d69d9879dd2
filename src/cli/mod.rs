//! Command-line interface
//!
//! The CLI stands in for the surrounding application: it picks the input
//! file, drives a transcode job and hands the finished file back to disk.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;

pub mod args;
pub mod commands;

pub use args::{ClipArgs, InspectArgs};

/// Video clip extraction and transcoding pipeline
#[derive(Parser)]
#[command(name = "clipforge")]
#[command(about = "Extract and transcode clips from video files")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Extract a clip from a video file
    Clip(ClipArgs),
    /// Inspect a video file without processing it
    Inspect(InspectArgs),
}

/// Execute the parsed command line
pub async fn execute(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load_or_default(cli.config.as_deref());
    match cli.command {
        Commands::Clip(args) => commands::execute_clip(args, config).await,
        Commands::Inspect(args) => commands::execute_inspect(args, config).await,
    }
}
