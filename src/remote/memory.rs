//! In-memory `RemoteStore` used by the store and router tests.
//! Keeps wire rows (so normalization is exercised) and counts every call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{GoalRow, NewQuizRow, ProfileRow, QuizRow, RemoteStore, ResultRow};
use crate::domain::{ProfileUpdate, Session};
use crate::error::RemoteError;

#[derive(Default)]
pub struct MemoryRemote {
  pub profiles: Mutex<Vec<ProfileRow>>,
  pub quizzes: Mutex<Vec<(String, NewQuizRow)>>,
  pub results: Mutex<Vec<ResultRow>>,
  pub goals: Mutex<Vec<GoalRow>>,
  pub fail_reads: AtomicBool,
  pub fail_writes: AtomicBool,
  calls: AtomicUsize,
  next_id: AtomicUsize,
}

impl MemoryRemote {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn read(&self) -> Result<(), RemoteError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(RemoteError::Http { status: 503, message: "reads disabled".into() });
    }
    Ok(())
  }

  fn write(&self) -> Result<(), RemoteError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(RemoteError::Http { status: 500, message: "writes disabled".into() });
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
  async fn fetch_profile(&self, session: &Session) -> Result<Option<ProfileRow>, RemoteError> {
    self.read()?;
    let profiles = self.profiles.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    Ok(profiles.iter().find(|p| p.id == session.user.id).cloned())
  }

  async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<(), RemoteError> {
    self.write()?;
    let mut profiles = self.profiles.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    if let Some(p) = profiles.iter_mut().find(|p| p.id == session.user.id) {
      if update.name.is_some() { p.name = update.name.clone(); }
      if update.title.is_some() { p.title = update.title.clone(); }
    }
    Ok(())
  }

  async fn list_quizzes(&self, session: &Session) -> Result<Vec<QuizRow>, RemoteError> {
    self.read()?;
    let quizzes = self.quizzes.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    let mut rows: Vec<QuizRow> = quizzes
      .iter()
      .filter(|(_, q)| q.user_id == session.user.id)
      .map(|(id, q)| QuizRow {
        id: json!(id),
        title: q.title.clone(),
        topic: q.topic.clone(),
        questions: json!(q.questions),
        flashcards: json!(q.flashcards),
        created_at: q.created_at.clone(),
      })
      .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(rows)
  }

  async fn insert_quiz(&self, _session: &Session, row: &NewQuizRow) -> Result<(), RemoteError> {
    self.write()?;
    let id = format!("row-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
    let mut quizzes = self.quizzes.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    quizzes.push((id, row.clone()));
    Ok(())
  }

  async fn list_results(&self, session: &Session) -> Result<Vec<ResultRow>, RemoteError> {
    self.read()?;
    let results = self.results.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    let mut rows: Vec<ResultRow> = results.iter().filter(|r| r.user_id == session.user.id).cloned().collect();
    rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    Ok(rows)
  }

  async fn insert_result(&self, _session: &Session, row: &ResultRow) -> Result<(), RemoteError> {
    self.write()?;
    let mut results = self.results.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    results.push(row.clone());
    Ok(())
  }

  async fn list_goals(&self, session: &Session) -> Result<Vec<GoalRow>, RemoteError> {
    self.read()?;
    let goals = self.goals.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    Ok(goals.iter().filter(|g| g.user_id == session.user.id).cloned().collect())
  }

  async fn insert_goal(&self, _session: &Session, row: &GoalRow) -> Result<(), RemoteError> {
    self.write()?;
    let mut goals = self.goals.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    goals.push(row.clone());
    Ok(())
  }

  async fn update_goal_current(&self, _session: &Session, goal_id: &str, current: u32) -> Result<(), RemoteError> {
    self.write()?;
    let mut goals = self.goals.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    if let Some(g) = goals.iter_mut().find(|g| g.id == goal_id) {
      g.current = current;
    }
    Ok(())
  }

  async fn delete_goal(&self, _session: &Session, goal_id: &str) -> Result<(), RemoteError> {
    self.write()?;
    let mut goals = self.goals.lock().map_err(|e| RemoteError::Decode(e.to_string()))?;
    goals.retain(|g| g.id != goal_id);
    Ok(())
  }
}
