//! Remote persistence: the system of record for profiles, quizzes, results and goals.
//!
//! `RemoteStore` is the seam the application store talks through. The production
//! implementation is `supabase::SupabaseRest` (PostgREST over HTTP); tests use an
//! in-memory double.

use async_trait::async_trait;

use crate::domain::{ProfileUpdate, Session};
use crate::error::RemoteError;

pub mod rows;
pub mod supabase;

#[cfg(test)]
pub mod memory;

pub use rows::{GoalRow, NewQuizRow, ProfileRow, QuizRow, ResultRow};

/// Row-oriented CRUD over the four tables, scoped to the session's user.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// `Ok(None)` when the user has no profile row yet.
  async fn fetch_profile(&self, session: &Session) -> Result<Option<ProfileRow>, RemoteError>;

  async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<(), RemoteError>;

  /// Newest first (`created_at desc`).
  async fn list_quizzes(&self, session: &Session) -> Result<Vec<QuizRow>, RemoteError>;

  async fn insert_quiz(&self, session: &Session, row: &NewQuizRow) -> Result<(), RemoteError>;

  /// Newest first (`completed_at desc`).
  async fn list_results(&self, session: &Session) -> Result<Vec<ResultRow>, RemoteError>;

  async fn insert_result(&self, session: &Session, row: &ResultRow) -> Result<(), RemoteError>;

  async fn list_goals(&self, session: &Session) -> Result<Vec<GoalRow>, RemoteError>;

  async fn insert_goal(&self, session: &Session, row: &GoalRow) -> Result<(), RemoteError>;

  async fn update_goal_current(&self, session: &Session, goal_id: &str, current: u32) -> Result<(), RemoteError>;

  async fn delete_goal(&self, session: &Session, goal_id: &str) -> Result<(), RemoteError>;
}
