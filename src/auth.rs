//! Password auth against the Supabase auth (GoTrue) endpoints.
//!
//! Errors are simplified to short, human-readable messages before they reach the view.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::SupabaseConfig;
use crate::domain::Session;
use crate::error::AuthError;

#[derive(Clone)]
pub struct SupabaseAuth {
  client: reqwest::Client,
  base_url: String,
  anon_key: String,
}

/// Trim + lowercase, then a minimal `local@domain.tld` shape check.
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
  let email = raw.trim().to_lowercase();
  if email.is_empty() {
    return Err(AuthError::MissingEmail);
  }
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split_once('.').map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
    }
    None => false,
  };
  if valid { Ok(email) } else { Err(AuthError::InvalidEmail) }
}

/// Map a backend message to the simplified message shown to users.
pub fn simplify_auth_message(raw: &str) -> AuthError {
  let msg = raw.replace("AuthApiError: ", "");
  if msg.contains("Invalid login") {
    AuthError::InvalidCredentials
  } else if msg.contains("Failed to fetch") {
    AuthError::Connection
  } else {
    AuthError::Rejected(msg)
  }
}

fn extract_auth_error(body: &str) -> String {
  #[derive(Deserialize)]
  struct GoTrueErr {
    #[serde(default)] msg: Option<String>,
    #[serde(default)] error_description: Option<String>,
    #[serde(default)] message: Option<String>,
  }
  serde_json::from_str::<GoTrueErr>(body)
    .ok()
    .and_then(|e| e.error_description.or(e.msg).or(e.message))
    .unwrap_or_else(|| "Authentication failed.".into())
}

impl SupabaseAuth {
  pub fn new(cfg: &SupabaseConfig) -> Result<Self, AuthError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|_| AuthError::NotConfigured)?;
    Ok(Self { client, base_url: cfg.url.clone(), anon_key: cfg.anon_key.clone() })
  }

  async fn post(&self, path: &str, body: serde_json::Value, bearer: Option<&str>) -> Result<reqwest::Response, AuthError> {
    let url = format!("{}/auth/v1/{}", self.base_url, path);
    let mut req = self.client.post(url)
      .header(USER_AGENT, "quizdeck-backend/0.1")
      .header("apikey", &self.anon_key)
      .json(&body);
    if let Some(token) = bearer {
      req = req.bearer_auth(token);
    }
    let res = req.send().await.map_err(|e| {
      warn!(target: "auth", error = %e, "auth request failed");
      AuthError::Connection
    })?;
    if res.status().is_success() {
      return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(simplify_auth_message(&extract_auth_error(&body)))
  }

  #[instrument(level = "info", skip(self, password), target = "auth")]
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    let email = normalize_email(email)?;
    let res = self
      .post("token?grant_type=password", json!({ "email": email, "password": password }), None)
      .await?;
    let session: Session = res.json().await.map_err(|e| AuthError::Rejected(e.to_string()))?;
    info!(target: "auth", user_id = %session.user.id, "signed in");
    Ok(session)
  }

  /// Create the account; if no session comes back, try signing in once.
  #[instrument(level = "info", skip(self, password, name), target = "auth")]
  pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session, AuthError> {
    let email = normalize_email(email)?;
    let name = match name.trim() {
      "" => "Student",
      n => n,
    };
    let res = self
      .post("signup", json!({ "email": email, "password": password, "data": { "name": name } }), None)
      .await?;
    // With email confirmation enabled the body is a bare user, not a session.
    let body: serde_json::Value = res.json().await.map_err(|e| AuthError::Rejected(e.to_string()))?;
    if body.get("access_token").is_some() {
      return serde_json::from_value::<Session>(body).map_err(|e| AuthError::Rejected(e.to_string()));
    }

    warn!(target: "auth", "sign-up returned no session; attempting sign-in");
    self.sign_in(&email, password).await.map_err(|_| AuthError::ConfirmationRequired)
  }

  #[instrument(level = "info", skip(self, session), target = "auth")]
  pub async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
    self.post("logout", json!({}), Some(&session.access_token)).await?;
    Ok(())
  }
}
