//! # plan - calendar-aware project planner
//!
//! A command-line planner for engineering projects. Tasks belong to ordered
//! milestones, depend on each other by task number and are placed on a
//! working-day calendar by a forward or backward scheduler.
//!
//! ## Key Features
//!
//! - **Working-day scheduling**: Forward from a start date or backward from a
//!   deadline, skipping weekends and holidays
//! - **Manual date locks**: Pinned start or end dates are respected and
//!   conflicts are reported as warnings
//! - **Progress tracking**: A dated progress log drives status and actual dates
//! - **Multi-project support**: One JSON file per project, templates, archive,
//!   comparison and CSV export/import
//! - **Gantt view**: A terminal chart of the current schedule
//!
//! ## Quick Start
//!
//! ```bash
//! # New project from the built-in APQP template
//! plan project new "Widget" --from builtin
//!
//! # Schedule backwards from the launch date
//! plan schedule backward 2025-06-30 --holidays
//!
//! # Record progress and review it
//! plan progress record 1.1 40 --note "first drafts done"
//! plan stats
//! plan gantt
//! ```
//!
//! Data is stored locally in `~/.plan/` with each project as a separate
//! `<name>_plan.json` file. Set `PLAN_LOG=debug` or pass `-v` for logs.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod calendar;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod csv;
pub mod db;
pub mod error;
pub mod fields;
pub mod graph;
pub mod personnel;
pub mod progress;
pub mod project;
pub mod report;
pub mod schedule;
pub mod task;
pub mod template;
pub mod tui {
    pub mod colors;
    pub mod gantt;
    pub mod run;
}

use cli::Cli;
use cmd::Context;
use config::Config;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let data_dir = cli.dir.clone().unwrap_or_else(|| config.data_dir());
    cmd::ensure_data_dir(&data_dir)?;

    let ctx = Context {
        data_dir,
        config,
        project: cli.project,
    };
    cmd::run(&ctx, cli.command)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
