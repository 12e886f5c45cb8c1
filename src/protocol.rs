//! Request and response bodies for the HTTP API (serde ready).
//! Store snapshots and domain records are returned as-is; only the extra shapes live here.

use serde::{Deserialize, Serialize};

use crate::domain::AnswerRecord;

#[derive(Debug, Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub persistence: bool,
  pub generator: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignInIn {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpIn {
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GoalProgressIn {
  pub increment: i64,
}

/// A finished attempt at a saved quiz. `finishedAt` defaults to now.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIn {
  #[serde(default)]
  pub answers: Vec<AnswerRecord>,
  pub started_at: i64,
  #[serde(default)]
  pub finished_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChangedOut {
  pub changed: bool,
}
