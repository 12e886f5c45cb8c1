//! Error types for the external collaborators and the HTTP surface.
//!
//! Store actions never return these for remote-side failures; they log and move on.
//! Only auth and content generation propagate errors to the caller.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Failures talking to the persistence backend.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("backend returned HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("could not decode row: {0}")]
  Decode(String),
}

/// Auth failures, already simplified for display.
#[derive(Debug, Error)]
pub enum AuthError {
  #[error("Please enter your email address.")]
  MissingEmail,
  #[error("Please enter a valid email address.")]
  InvalidEmail,
  #[error("Invalid email or password.")]
  InvalidCredentials,
  #[error("Connection failed. Please check your internet connection or project configuration.")]
  Connection,
  #[error("Account created, but auto-login failed. Email confirmation may still be required.")]
  ConfirmationRequired,
  #[error("Authentication is not configured.")]
  NotConfigured,
  #[error("{0}")]
  Rejected(String),
}

/// Content-generation failures, classified so the view can show them verbatim.
#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("API key is missing. Set GENERATOR_API_KEY.")]
  MissingApiKey,
  #[error("You are using the placeholder API key. Please paste your real key.")]
  PlaceholderApiKey,
  #[error("Invalid API key. Please check that you copied it correctly.")]
  InvalidApiKey,
  #[error("No response from AI")]
  EmptyResponse,
  #[error("Malformed generator response: {0}")]
  Malformed(String),
  #[error("Generator HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("Generator request failed: {0}")]
  Transport(String),
}

/// A client-supplied record that breaks a data-model invariant.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Error returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Auth(#[from] AuthError),
  #[error(transparent)]
  Generate(#[from] GenerateError),
  #[error(transparent)]
  Invalid(#[from] ValidationError),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Unauthorized(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Auth(AuthError::Connection) => StatusCode::BAD_GATEWAY,
      ApiError::Auth(AuthError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
      ApiError::Generate(GenerateError::MissingApiKey | GenerateError::PlaceholderApiKey) => {
        StatusCode::SERVICE_UNAVAILABLE
      }
      ApiError::Generate(_) => StatusCode::BAD_GATEWAY,
      ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
  }
}
