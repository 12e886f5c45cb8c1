//! QuizDeck · Study Quiz Backend
//!
//! - Axum HTTP API over the application store
//! - Optional Supabase persistence and auth (via environment variables)
//! - Quiz and flashcard generation through an OpenAI-compatible endpoint
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   SUPABASE_URL         : project URL; with SUPABASE_ANON_KEY enables persistence + auth
//!   SUPABASE_ANON_KEY    : project anon key
//!   GENERATOR_API_KEY    : enables quiz generation
//!   GENERATOR_BASE_URL   : default "https://api.openai.com/v1"
//!   GENERATOR_MODEL      : default "gpt-4o-mini"
//!   QUIZDECK_CONFIG_PATH : path to TOML config (prompts + limits)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod stats;
mod error;
mod remote;
mod auth;
mod generator;
mod grading;
mod store;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::from_env();

  // Shared state: store (+ optional Supabase backend), generator, auth client, prompts.
  let state = Arc::new(AppState::new(&cfg)?);

  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizdeck_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quizdeck_backend", error = %e, "Failed to listen for shutdown signal");
    return;
  }
  info!(target: "quizdeck_backend", "Shutdown signal received");
}
