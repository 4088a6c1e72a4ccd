use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed project planner with working-day scheduling.
/// Projects are stored as JSON files in ~/.plan unless --dir or the config
/// file says otherwise.
#[derive(Parser)]
#[command(name = "plan", version, about = "Plan projects, schedule tasks, track progress")]
pub struct Cli {
    /// Directory holding the project files.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Project to operate on (defaults to the configured or most recent one).
    #[arg(long, short, global = true)]
    pub project: Option<String>,

    /// Path to config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
