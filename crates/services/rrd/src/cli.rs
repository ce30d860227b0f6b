//! Command-line interface of the RR daemon.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rrd")]
#[command(about = "RR - Build, index and serve run reports")]
pub struct Cli {
    /// Path to the configuration file (can also be set via RR_CONFIG environment variable)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
