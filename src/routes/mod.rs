//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
  routing::{delete, get, patch, post, put},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) for the SPA dev server
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/v1/health", get(http::http_health))
    .route("/api/v1/state", get(http::http_get_state))
    // Auth
    .route("/api/v1/auth/sign_in", post(http::http_post_sign_in))
    .route("/api/v1/auth/sign_up", post(http::http_post_sign_up))
    .route("/api/v1/auth/sign_out", post(http::http_post_sign_out))
    .route("/api/v1/profile", patch(http::http_patch_profile))
    .route("/api/v1/sync", post(http::http_post_sync))
    // Quizzes and results
    .route("/api/v1/quizzes/generate", post(http::http_post_generate))
    .route("/api/v1/quizzes", post(http::http_post_quiz))
    .route("/api/v1/quizzes/:id/attempts", post(http::http_post_attempt))
    .route("/api/v1/results", post(http::http_post_result))
    .route("/api/v1/results/:completed_at", delete(http::http_delete_result))
    // Goals, badges, preferences
    .route("/api/v1/goals", post(http::http_post_goal))
    .route("/api/v1/goals/:id", delete(http::http_delete_goal))
    .route("/api/v1/goals/:id/progress", post(http::http_post_goal_progress))
    .route("/api/v1/badges/:id/unlock", post(http::http_post_badge_unlock))
    .route("/api/v1/preferences", patch(http::http_patch_preferences))
    .route("/api/v1/preferences/theme/toggle", post(http::http_post_toggle_theme))
    .route("/api/v1/preferences/theme_color", put(http::http_put_theme_color))
    .route("/api/v1/preferences/layout/toggle", post(http::http_post_toggle_layout))
    .route("/api/v1/preferences/reduce_motion/toggle", post(http::http_post_toggle_reduce_motion))
    // State + CORS + HTTP tracing
    .with_state(state)
    .layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any),
    )
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
