//! `lidar` command line entry point.

use clap::Parser;
use lidar_runner::{run, Cli};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}
