//! Binary crate for the `weather-bridge` host process.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Wiring concrete providers into the core pipeline
//! - Turning start-up, watch requests and timers into pipeline runs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_tracing(cmd.verbose);
    cmd.run().await
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
