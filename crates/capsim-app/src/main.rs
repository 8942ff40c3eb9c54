use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

fn main() -> Result<()> {
    // Diagnostics go to stderr so the report on stdout can be piped.
    // RUST_LOG=debug shows capture resyncs, RUST_LOG=trace every tick.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = cli::Args::parse();
    info!("capsim v{}", env!("CARGO_PKG_VERSION"));

    match app::run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            Err(e)
        }
    }
}
