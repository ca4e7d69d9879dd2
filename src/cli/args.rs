//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the clip command
#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Input video file
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Clip start (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(long)]
    pub start: String,

    /// Clip end (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(long)]
    pub end: String,

    /// Production mode: copy or reencode
    #[arg(long, default_value = "copy")]
    pub mode: String,

    /// Output file path (defaults next to the input)
    #[arg(long = "out")]
    pub output: Option<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Print metadata as JSON
    #[arg(long)]
    pub json: bool,
}
