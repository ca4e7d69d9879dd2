//! ClipForge CLI
//!
//! Extracts clips from video files using lossless stream copy or
//! re-encoding, driven by the shared transcoding pipeline.
//!
//! # Usage
//!
//! ```bash
//! clipforge clip --in holiday.mov --start 0:10 --end 0:40
//! clipforge clip --in talk.mp4 --start 00:01:00 --end 00:02:30 --mode reencode
//! clipforge inspect --in holiday.mov
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clipforge::cli::{self, Cli};

/// Main entry point for the ClipForge CLI
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    cli::execute(cli).await
}
