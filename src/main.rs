//! HSK mock-exam backend
//!
//! - Question generation from per-level corpus files (cloze, meaning lookup,
//!   grammar fill-in-blank, writing prompts)
//! - Axum HTTP + WebSocket API over isolated exam sessions
//!
//! Important env variables:
//!   PORT            : u16 (default 3000)
//!   HSK_CONFIG_PATH : path to TOML config (weights, thresholds, exam lengths)
//!   HSK_DATA_DIR    : corpus directory, overrides `data_dir` from the config
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod pinyin;
mod corpus;
mod distractor;
mod builder;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;

#[cfg(test)]
mod testutil;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "hsk_mock", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "hsk_mock", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "hsk_mock", error = %e, "Failed to listen for shutdown signal");
  }
}
