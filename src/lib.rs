pub mod audio;
pub mod catalog;
pub mod commands;
pub mod diagnostics;
pub mod engine;
pub mod persistence;
pub mod quiz;
pub mod speech;
pub mod state;

use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::Cli;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tamil_thulir_lib={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Tamil Thulir v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(commands::dispatch(cli));
    // A blocking stdin read may still be parked after the quiz ends
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}
