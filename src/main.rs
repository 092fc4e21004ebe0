//! Breakwater service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                      BREAKWATER                      │
//!   Request       │  ┌───────────┐    ┌──────────────┐    ┌───────────┐  │
//!   ──────────────┼─▶│   http    │───▶│  rate_limit  │───▶│   drill   │  │
//!                 │  │  server   │    │  middleware  │    │  routes   │  │
//!                 │  └─────┬─────┘    └──────┬───────┘    └─────┬─────┘  │
//!                 │        │                 │                  │        │
//!                 │        ▼                 ▼                  ▼        │
//!                 │  ┌───────────┐    ┌──────────────┐    ┌───────────┐  │
//!                 │  │   admin   │    │   storage    │    │ registry  │  │
//!                 │  │    API    │───▶│ memory/redis │    │ + breakers│  │
//!                 │  └───────────┘    └──────────────┘    └───────────┘  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use breakwater::error::Error;
use breakwater::lifecycle::{signals, startup, Shutdown};
use breakwater::HttpServer;

#[derive(Parser)]
#[command(name = "breakwater")]
#[command(about = "Circuit breaker and rate limiter service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = startup::load(args.config.as_deref())?;
    let startup::Startup { state, listener } = startup::start(config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::forward_ctrl_c(shutdown.clone()));

    HttpServer::new(state).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
