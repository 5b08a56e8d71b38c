//! # Tilestream Engine
//!
//! Headless driver for the Tilestream chunk-streaming engine.
//!
//! Loads `tilestream.toml` (or the path given as the first argument),
//! streams a world around a moving viewer for a fixed number of frames and
//! reports streaming counters.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod perf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tilestream=info".parse()?))
        .init();

    info!("Tilestream starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load_from_args();
    config.validate();

    app::run(&config)?;

    info!("Tilestream shutdown complete");
    Ok(())
}
