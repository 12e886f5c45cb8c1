//! Domain records held by the store: profile, quizzes, results, goals, badges, stats.
//!
//! These are the in-memory shapes the view layer consumes (camelCase JSON).
//! The snake_case wire rows used by the persistence backend live in `remote::rows`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::util::ms_fits_timestamp;

/// Every multiple-choice question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
  pub id: String,
  pub name: String,
  pub email: String,
  pub title: String,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
  #[serde(default)] pub name: Option<String>,
  #[serde(default)] pub title: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  pub text: String,
  pub options: Vec<String>,
  pub correct_answer_index: usize,
  #[serde(default)] pub explanation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flashcard {
  pub id: String,
  pub front: String,
  pub back: String,
}

/// A generated quiz. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: String,
  pub title: String,
  pub topic: String,
  pub questions: Vec<Question>,
  #[serde(default)] pub flashcards: Vec<Flashcard>,
  /// Epoch milliseconds.
  pub created_at: i64,
}

impl Question {
  /// `position` is only used in the message.
  pub fn validate(&self, position: usize) -> Result<(), ValidationError> {
    if self.options.len() != OPTIONS_PER_QUESTION {
      return Err(ValidationError(format!(
        "question {position}: expected {OPTIONS_PER_QUESTION} options, got {}",
        self.options.len()
      )));
    }
    if self.correct_answer_index >= self.options.len() {
      return Err(ValidationError(format!(
        "question {position}: correctAnswerIndex {} out of range for {} options",
        self.correct_answer_index,
        self.options.len()
      )));
    }
    Ok(())
  }
}

impl Quiz {
  pub fn validate(&self) -> Result<(), ValidationError> {
    for (i, q) in self.questions.iter().enumerate() {
      q.validate(i)?;
    }
    if !ms_fits_timestamp(self.created_at) {
      return Err(ValidationError(format!("createdAt {} is not a valid timestamp", self.created_at)));
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
  pub question_id: String,
  pub selected_index: usize,
}

/// One completed attempt. `completed_at` doubles as the attempt identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
  pub quiz_id: String,
  pub quiz_title: String,
  /// Percentage, 0..=100.
  pub score: u32,
  pub total_questions: u32,
  pub correct_count: u32,
  pub time_spent_seconds: u64,
  /// Epoch milliseconds.
  pub completed_at: i64,
  #[serde(default)] pub answers: Vec<AnswerRecord>,
}

impl QuizResult {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.score > 100 {
      return Err(ValidationError(format!("score {} is outside 0..=100", self.score)));
    }
    if self.correct_count > self.total_questions {
      return Err(ValidationError(format!(
        "correctCount {} exceeds totalQuestions {}",
        self.correct_count, self.total_questions
      )));
    }
    if !ms_fits_timestamp(self.completed_at) {
      return Err(ValidationError(format!("completedAt {} is not a valid timestamp", self.completed_at)));
    }
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
  Quiz,
  Streak,
  Score,
  Time,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
  Blue,
  Purple,
  Orange,
  Green,
}

/// A learner goal. `current` always stays within `0..=target`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
  pub id: String,
  pub title: String,
  #[serde(default)] pub description: String,
  pub current: u32,
  pub target: u32,
  pub unit: String,
  pub category: GoalCategory,
  pub color_theme: ColorTheme,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<i64>,
}

impl Goal {
  /// Apply a signed increment, clamped to `0..=target`. Returns the new value.
  pub fn apply_increment(&mut self, increment: i64) -> u32 {
    let next = (self.current as i64 + increment).clamp(0, self.target as i64);
    self.current = next as u32;
    self.current
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BadgeIcon {
  Trophy,
  Flame,
  Target,
  Zap,
  Brain,
  Star,
  Rocket,
  Crown,
  Sun,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub description: String,
  pub icon_name: BadgeIcon,
  pub is_locked: bool,
  pub current_progress: u32,
  pub max_progress: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unlocked_at: Option<i64>,
}

/// Statistics derived from quiz history. Never persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
  pub total_quizzes: u32,
  pub average_score: u32,
  pub study_streak: u32,
  pub total_questions_answered: u64,
  pub xp: u64,
  pub level: u64,
}

impl Default for UserStats {
  fn default() -> Self {
    Self {
      total_quizzes: 0,
      average_score: 0,
      study_streak: 0,
      total_questions_answered: 0,
      xp: 0,
      level: 1,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}
impl Default for Difficulty {
  fn default() -> Self { Difficulty::Medium }
}
impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    };
    f.write_str(s)
  }
}

// --- Local UI preferences (never synced) ---

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
  #[default]
  Indigo,
  Blue,
  Purple,
  Rose,
  Orange,
  Teal,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DashboardLayout {
  #[default]
  Grid,
  List,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
  pub theme: Theme,
  pub theme_color: ThemeColor,
  pub dashboard_layout: DashboardLayout,
  pub reduce_motion: bool,
}

impl Preferences {
  pub fn toggle_theme(&mut self) -> Theme {
    self.theme = match self.theme {
      Theme::Light => Theme::Dark,
      Theme::Dark => Theme::Light,
    };
    self.theme
  }

  pub fn toggle_dashboard_layout(&mut self) -> DashboardLayout {
    self.dashboard_layout = match self.dashboard_layout {
      DashboardLayout::Grid => DashboardLayout::List,
      DashboardLayout::List => DashboardLayout::Grid,
    };
    self.dashboard_layout
  }

  pub fn toggle_reduce_motion(&mut self) -> bool {
    self.reduce_motion = !self.reduce_motion;
    self.reduce_motion
  }

  /// Set every value the patch names; the rest stay as they are.
  pub fn apply(&mut self, patch: &PreferencesPatch) {
    if let Some(theme) = patch.theme {
      self.theme = theme;
    }
    if let Some(color) = patch.theme_color {
      self.theme_color = color;
    }
    if let Some(layout) = patch.dashboard_layout {
      self.dashboard_layout = layout;
    }
    if let Some(reduce_motion) = patch.reduce_motion {
      self.reduce_motion = reduce_motion;
    }
  }
}

/// Desired preference values; omitted fields are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
  pub theme: Option<Theme>,
  pub theme_color: Option<ThemeColor>,
  pub dashboard_layout: Option<DashboardLayout>,
  pub reduce_motion: Option<bool>,
}

// --- Auth session ---

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMetadata {
  #[serde(default)] pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
  pub id: String,
  #[serde(default)] pub email: Option<String>,
  #[serde(default)] pub user_metadata: UserMetadata,
}

/// Authenticated session as returned by the auth backend.
/// Deserializes directly from a GoTrue token response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
  pub access_token: String,
  #[serde(default)] pub refresh_token: Option<String>,
  pub user: SessionUser,
}
