//! Wire rows for the persistence tables and the normalization to/from domain records.
//!
//! Columns are snake_case and timestamps are ISO-8601 strings on the wire;
//! the domain side uses camelCase and epoch milliseconds.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{ColorTheme, Flashcard, Goal, GoalCategory, Question, Quiz, QuizResult};
use crate::error::RemoteError;

/// Epoch ms -> ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_iso8601(ms: i64) -> Result<String, RemoteError> {
  DateTime::<Utc>::from_timestamp_millis(ms)
    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    .ok_or_else(|| RemoteError::Decode(format!("timestamp {ms} ms is out of range")))
}

/// ISO-8601 (with or without offset) -> epoch ms. Offset-less values are read as UTC.
pub fn from_iso8601(s: &str) -> Result<i64, RemoteError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.timestamp_millis());
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
    .map(|naive| naive.and_utc().timestamp_millis())
    .map_err(|e| RemoteError::Decode(format!("bad timestamp {s:?}: {e}")))
}

/// Row ids may come back as uuid strings or integers.
fn id_to_string(v: &serde_json::Value) -> Option<String> {
  match v {
    serde_json::Value::String(s) => Some(s.clone()),
    serde_json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// JSON/JSONB columns may arrive as arrays or as JSON-encoded strings.
fn decode_json_column<T: DeserializeOwned>(v: serde_json::Value, column: &str) -> Result<Vec<T>, RemoteError> {
  let parsed = match v {
    serde_json::Value::Null => return Ok(Vec::new()),
    serde_json::Value::String(s) => serde_json::from_str(&s),
    other => serde_json::from_value(other),
  };
  parsed.map_err(|e| RemoteError::Decode(format!("{column}: {e}")))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileRow {
  pub id: String,
  #[serde(default)] pub name: Option<String>,
  #[serde(default)] pub title: Option<String>,
}

// --- results ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
  pub user_id: String,
  pub quiz_id: String,
  pub quiz_title: String,
  pub score: u32,
  #[serde(default)] pub total_questions: u32,
  #[serde(default)] pub correct_count: u32,
  #[serde(default)] pub time_spent: u64,
  pub completed_at: String,
}

impl ResultRow {
  pub fn from_result(user_id: &str, r: &QuizResult) -> Result<Self, RemoteError> {
    Ok(Self {
      user_id: user_id.to_string(),
      quiz_id: r.quiz_id.clone(),
      quiz_title: r.quiz_title.clone(),
      score: r.score,
      total_questions: r.total_questions,
      correct_count: r.correct_count,
      time_spent: r.time_spent_seconds,
      completed_at: to_iso8601(r.completed_at)?,
    })
  }

  /// Per-answer picks are not stored remotely, so they come back empty.
  pub fn into_result(self) -> Result<QuizResult, RemoteError> {
    Ok(QuizResult {
      completed_at: from_iso8601(&self.completed_at)?,
      quiz_id: self.quiz_id,
      quiz_title: self.quiz_title,
      score: self.score,
      total_questions: self.total_questions,
      correct_count: self.correct_count,
      time_spent_seconds: self.time_spent,
      answers: Vec::new(),
    })
  }
}

// --- quizzes ---

/// Insert shape: the backend assigns the row id.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NewQuizRow {
  pub user_id: String,
  pub title: String,
  pub topic: String,
  pub questions: Vec<Question>,
  pub flashcards: Vec<Flashcard>,
  pub created_at: String,
}

impl NewQuizRow {
  pub fn from_quiz(user_id: &str, q: &Quiz) -> Result<Self, RemoteError> {
    Ok(Self {
      user_id: user_id.to_string(),
      title: q.title.clone(),
      topic: q.topic.clone(),
      questions: q.questions.clone(),
      flashcards: q.flashcards.clone(),
      created_at: to_iso8601(q.created_at)?,
    })
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct QuizRow {
  #[serde(default)] pub id: serde_json::Value,
  pub title: String,
  #[serde(default)] pub topic: String,
  #[serde(default)] pub questions: serde_json::Value,
  #[serde(default)] pub flashcards: serde_json::Value,
  pub created_at: String,
}

impl QuizRow {
  pub fn into_quiz(self) -> Result<Quiz, RemoteError> {
    let id = id_to_string(&self.id).ok_or_else(|| RemoteError::Decode("quizzes.id missing".into()))?;
    Ok(Quiz {
      id,
      title: self.title,
      topic: self.topic,
      questions: decode_json_column(self.questions, "quizzes.questions")?,
      flashcards: decode_json_column(self.flashcards, "quizzes.flashcards")?,
      created_at: from_iso8601(&self.created_at)?,
    })
  }
}

// --- goals ---

/// `deadline` has no column; it lives only in memory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GoalRow {
  pub id: String,
  #[serde(default)] pub user_id: String,
  pub title: String,
  #[serde(default)] pub description: Option<String>,
  pub target: u32,
  #[serde(default)] pub current: u32,
  pub unit: String,
  pub category: GoalCategory,
  pub color_theme: ColorTheme,
}

impl GoalRow {
  pub fn from_goal(user_id: &str, g: &Goal) -> Self {
    Self {
      id: g.id.clone(),
      user_id: user_id.to_string(),
      title: g.title.clone(),
      description: Some(g.description.clone()),
      target: g.target,
      current: g.current,
      unit: g.unit.clone(),
      category: g.category,
      color_theme: g.color_theme,
    }
  }

  pub fn into_goal(self) -> Goal {
    Goal {
      id: self.id,
      title: self.title,
      description: self.description.unwrap_or_default(),
      // Rows written by other clients may violate the clamp.
      current: self.current.min(self.target),
      target: self.target,
      unit: self.unit,
      category: self.category,
      color_theme: self.color_theme,
      deadline: None,
    }
  }
}
