//! The application store: one learner's session, history, saved quizzes, goals,
//! badges, derived stats and local preferences.
//!
//! Every user-scoped action mutates local state first (optimistic) and then hands
//! the remote write to a background task. The returned `Reconcile` handle can be
//! dropped (fire-and-forget) or awaited. Remote failures are logged and never
//! rolled back; the remote backend stays the system of record and the next
//! `fetch_user_data` realigns local state with it.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
  Badge, DashboardLayout, Goal, Preferences, PreferencesPatch, ProfileUpdate, Quiz, QuizResult, Session, Theme, ThemeColor,
  UserProfile, UserStats,
};
use crate::error::RemoteError;
use crate::remote::{GoalRow, NewQuizRow, QuizRow, RemoteStore, ResultRow};
use crate::seeds::seed_badges;
use crate::stats::compute_stats;
use crate::util::now_ms;

const DEFAULT_NAME: &str = "Student";
const DEFAULT_TITLE: &str = "Student";

/// Background remote work spawned by an action. `None` when nothing was sent.
pub type Reconcile = Option<JoinHandle<()>>;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
  pub is_authenticated: bool,
  pub is_loading: bool,
  pub user: Option<UserProfile>,
  #[serde(skip)]
  pub session: Option<Session>,
  pub history: Vec<QuizResult>,
  pub saved_quizzes: Vec<Quiz>,
  pub goals: Vec<Goal>,
  pub badges: Vec<Badge>,
  pub user_stats: UserStats,
  pub preferences: Preferences,
}

impl Default for StoreState {
  fn default() -> Self {
    Self {
      is_authenticated: false,
      is_loading: true,
      user: None,
      session: None,
      history: Vec::new(),
      saved_quizzes: Vec::new(),
      goals: Vec::new(),
      badges: seed_badges(),
      user_stats: UserStats::default(),
      preferences: Preferences::default(),
    }
  }
}

impl StoreState {
  /// Drop everything scoped to the signed-in user. Badges and preferences survive.
  fn clear_user_scope(&mut self) {
    self.is_authenticated = false;
    self.user = None;
    self.session = None;
    self.history.clear();
    self.saved_quizzes.clear();
    self.goals.clear();
    self.user_stats = UserStats::default();
  }
}

type UserData = (Vec<Quiz>, Vec<QuizResult>, Vec<Goal>);

fn normalize_rows(quizzes: Vec<QuizRow>, results: Vec<ResultRow>, goals: Vec<GoalRow>) -> Result<UserData, RemoteError> {
  let quizzes = quizzes.into_iter().map(QuizRow::into_quiz).collect::<Result<Vec<_>, _>>()?;
  let history = results.into_iter().map(ResultRow::into_result).collect::<Result<Vec<_>, _>>()?;
  let goals = goals.into_iter().map(GoalRow::into_goal).collect();
  Ok((quizzes, history, goals))
}

#[derive(Clone)]
pub struct AppStore {
  state: Arc<RwLock<StoreState>>,
  remote: Option<Arc<dyn RemoteStore>>,
}

/// What a remote write needs: the backend, the session, and the owning user id.
struct RemoteCtx {
  remote: Arc<dyn RemoteStore>,
  session: Session,
  user_id: String,
}

impl AppStore {
  /// `remote = None` runs the store purely in memory.
  pub fn new(remote: Option<Arc<dyn RemoteStore>>) -> Self {
    Self { state: Arc::new(RwLock::new(StoreState::default())), remote }
  }

  pub async fn snapshot(&self) -> StoreState {
    self.state.read().await.clone()
  }

  pub async fn is_authenticated(&self) -> bool {
    self.state.read().await.is_authenticated
  }

  /// The active remote session, if any.
  pub async fn session(&self) -> Option<Session> {
    self.state.read().await.session.clone()
  }

  pub fn has_remote(&self) -> bool {
    self.remote.is_some()
  }

  fn remote_ctx(&self, st: &StoreState) -> Option<RemoteCtx> {
    let remote = self.remote.clone()?;
    let session = st.session.clone()?;
    let user_id = st.user.as_ref()?.id.clone();
    Some(RemoteCtx { remote, session, user_id })
  }

  /// Spawn a remote write, followed by a full re-sync when `resync` is set and the write landed.
  fn spawn_write<F>(&self, what: &'static str, resync: bool, write: F) -> Reconcile
  where
    F: Future<Output = Result<(), RemoteError>> + Send + 'static,
  {
    let store = self.clone();
    Some(tokio::spawn(async move {
      match write.await {
        Ok(()) if resync => store.fetch_user_data().await,
        Ok(()) => {}
        // No re-sync: the optimistic entry must survive a refused write.
        Err(e) => error!(target: "store", action = what, error = %e, "Remote write failed; keeping optimistic state"),
      }
    }))
  }

  // --- Session lifecycle ---

  /// Enter or leave the authenticated state.
  ///
  /// With a session: resolve the profile (falling back to session metadata when
  /// the row is missing or unreadable), mark authenticated and kick off a sync.
  /// Without: tear down all user-scoped state.
  #[instrument(level = "info", skip(self, session), fields(has_session = session.is_some()), target = "store")]
  pub async fn handle_session(&self, session: Option<Session>) -> Reconcile {
    let Some(session) = session else {
      let mut st = self.state.write().await;
      st.clear_user_scope();
      st.is_loading = false;
      info!(target: "store", "Session cleared");
      return None;
    };

    let profile = match &self.remote {
      Some(remote) => match remote.fetch_profile(&session).await {
        Ok(p) => p,
        Err(e) => {
          error!(target: "store", error = %e, "Error fetching profile; using defaults");
          None
        }
      },
      None => None,
    };

    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    let (profile_name, profile_title) = match profile {
      Some(p) => (non_empty(p.name), non_empty(p.title)),
      None => (None, None),
    };
    let user = UserProfile {
      id: session.user.id.clone(),
      name: profile_name
        .or_else(|| non_empty(session.user.user_metadata.name.clone()))
        .unwrap_or_else(|| DEFAULT_NAME.into()),
      email: session.user.email.clone().unwrap_or_default(),
      title: profile_title.unwrap_or_else(|| DEFAULT_TITLE.into()),
    };

    {
      let mut st = self.state.write().await;
      let switching = st.user.as_ref().map_or(false, |u| u.id != user.id);
      if switching {
        st.clear_user_scope();
      }
      info!(target: "store", user_id = %user.id, "Session established");
      st.user = Some(user);
      st.session = Some(session);
      st.is_authenticated = true;
      st.is_loading = false;
    }

    let store = self.clone();
    Some(tokio::spawn(async move { store.fetch_user_data().await }))
  }

  /// Local login without a remote session; remote writes stay disabled.
  pub async fn login(&self, user: UserProfile) {
    let mut st = self.state.write().await;
    st.user = Some(user);
    st.session = None;
    st.is_authenticated = true;
    st.is_loading = false;
  }

  /// Tear down user-scoped state. Returns the session that was active so the caller can revoke it.
  #[instrument(level = "info", skip(self), target = "store")]
  pub async fn logout(&self) -> Option<Session> {
    let mut st = self.state.write().await;
    let session = st.session.take();
    st.clear_user_scope();
    session
  }

  #[instrument(level = "info", skip(self, update), target = "store")]
  pub async fn update_user(&self, update: ProfileUpdate) -> Reconcile {
    let ctx = {
      let mut st = self.state.write().await;
      let Some(user) = st.user.as_mut() else {
        debug!(target: "store", "update_user ignored: not signed in");
        return None;
      };
      if let Some(name) = &update.name {
        user.name = name.clone();
      }
      if let Some(title) = &update.title {
        user.title = title.clone();
      }
      self.remote_ctx(&st)?
    };
    let RemoteCtx { remote, session, .. } = ctx;
    self.spawn_write("update_user", false, async move { remote.update_profile(&session, &update).await })
  }

  // --- Sync ---

  /// Pull quizzes, results and goals, normalize, recompute stats and replace local
  /// state in one write. Any failure leaves local state untouched.
  #[instrument(level = "info", skip(self), target = "store")]
  pub async fn fetch_user_data(&self) {
    let ctx = {
      let st = self.state.read().await;
      if st.user.is_none() {
        return;
      }
      match self.remote_ctx(&st) {
        Some(ctx) => ctx,
        None => return,
      }
    };

    let fetched = tokio::try_join!(
      ctx.remote.list_quizzes(&ctx.session),
      ctx.remote.list_results(&ctx.session),
      ctx.remote.list_goals(&ctx.session),
    );
    let (quiz_rows, result_rows, goal_rows) = match fetched {
      Ok(rows) => rows,
      Err(e) => {
        error!(target: "store", error = %e, "Error fetching user data; keeping previous state");
        return;
      }
    };

    let (saved_quizzes, history, goals) = match normalize_rows(quiz_rows, result_rows, goal_rows) {
      Ok(v) => v,
      Err(e) => {
        error!(target: "store", error = %e, "Error normalizing user data; keeping previous state");
        return;
      }
    };
    let user_stats = compute_stats(&history);

    let mut st = self.state.write().await;
    if st.user.as_ref().map(|u| u.id.as_str()) != Some(ctx.user_id.as_str()) {
      warn!(target: "store", user_id = %ctx.user_id, "Discarding fetched data: session changed mid-fetch");
      return;
    }
    info!(
      target: "store",
      quizzes = saved_quizzes.len(),
      results = history.len(),
      goals = goals.len(),
      "User data synced"
    );
    st.saved_quizzes = saved_quizzes;
    st.history = history;
    st.goals = goals;
    st.user_stats = user_stats;
  }

  // --- Results ---

  /// Prepend the result, recompute stats, then insert remotely and re-sync.
  #[instrument(level = "info", skip(self, result), fields(quiz_id = %result.quiz_id, score = result.score), target = "store")]
  pub async fn add_result(&self, result: QuizResult) -> Reconcile {
    let ctx = {
      let mut st = self.state.write().await;
      if st.user.is_none() {
        debug!(target: "store", "add_result ignored: not signed in");
        return None;
      }
      if let Err(e) = result.validate() {
        warn!(target: "store", error = %e, "add_result rejected: invalid result");
        return None;
      }
      st.history.insert(0, result.clone());
      st.user_stats = compute_stats(&st.history);
      self.remote_ctx(&st)?
    };
    let RemoteCtx { remote, session, user_id } = ctx;
    let row = match ResultRow::from_result(&user_id, &result) {
      Ok(row) => row,
      Err(e) => {
        error!(target: "store", error = %e, "add_result not persisted; keeping optimistic state");
        return None;
      }
    };
    self.spawn_write("add_result", true, async move { remote.insert_result(&session, &row).await })
  }

  /// Local-only removal of the first result with this timestamp. Returns whether one was removed.
  pub async fn remove_result(&self, completed_at: i64) -> bool {
    let mut st = self.state.write().await;
    if st.user.is_none() {
      return false;
    }
    let Some(pos) = st.history.iter().position(|r| r.completed_at == completed_at) else {
      return false;
    };
    st.history.remove(pos);
    st.user_stats = compute_stats(&st.history);
    true
  }

  // --- Quizzes ---

  #[instrument(level = "info", skip(self, quiz), fields(quiz_id = %quiz.id), target = "store")]
  pub async fn save_quiz(&self, quiz: Quiz) -> Reconcile {
    let ctx = {
      let mut st = self.state.write().await;
      if st.user.is_none() {
        debug!(target: "store", "save_quiz ignored: not signed in");
        return None;
      }
      if let Err(e) = quiz.validate() {
        warn!(target: "store", error = %e, "save_quiz rejected: invalid quiz");
        return None;
      }
      st.saved_quizzes.insert(0, quiz.clone());
      self.remote_ctx(&st)?
    };
    let RemoteCtx { remote, session, user_id } = ctx;
    let row = match NewQuizRow::from_quiz(&user_id, &quiz) {
      Ok(row) => row,
      Err(e) => {
        error!(target: "store", error = %e, "save_quiz not persisted; keeping optimistic state");
        return None;
      }
    };
    self.spawn_write("save_quiz", true, async move { remote.insert_quiz(&session, &row).await })
  }

  pub async fn find_quiz(&self, quiz_id: &str) -> Option<Quiz> {
    self.state.read().await.saved_quizzes.iter().find(|q| q.id == quiz_id).cloned()
  }

  // --- Goals ---

  #[instrument(level = "info", skip(self, goal), fields(goal_id = %goal.id), target = "store")]
  pub async fn add_goal(&self, mut goal: Goal) -> Reconcile {
    goal.current = goal.current.min(goal.target);
    let ctx = {
      let mut st = self.state.write().await;
      if st.user.is_none() {
        return None;
      }
      st.goals.push(goal.clone());
      self.remote_ctx(&st)?
    };
    let RemoteCtx { remote, session, user_id } = ctx;
    let row = GoalRow::from_goal(&user_id, &goal);
    self.spawn_write("add_goal", false, async move { remote.insert_goal(&session, &row).await })
  }

  #[instrument(level = "info", skip(self), target = "store")]
  pub async fn remove_goal(&self, goal_id: &str) -> Reconcile {
    let ctx = {
      let mut st = self.state.write().await;
      if st.user.is_none() {
        return None;
      }
      st.goals.retain(|g| g.id != goal_id);
      self.remote_ctx(&st)?
    };
    let RemoteCtx { remote, session, .. } = ctx;
    let goal_id = goal_id.to_string();
    self.spawn_write("remove_goal", false, async move { remote.delete_goal(&session, &goal_id).await })
  }

  /// `current = clamp(current + increment, 0, target)`. Unknown ids are a no-op.
  #[instrument(level = "info", skip(self), target = "store")]
  pub async fn update_goal_progress(&self, goal_id: &str, increment: i64) -> Reconcile {
    let (ctx, current) = {
      let mut st = self.state.write().await;
      if st.user.is_none() {
        return None;
      }
      let goal = st.goals.iter_mut().find(|g| g.id == goal_id)?;
      let current = goal.apply_increment(increment);
      (self.remote_ctx(&st)?, current)
    };
    let RemoteCtx { remote, session, .. } = ctx;
    let goal_id = goal_id.to_string();
    self.spawn_write("update_goal_progress", false, async move {
      remote.update_goal_current(&session, &goal_id, current).await
    })
  }

  // --- Badges ---

  /// Unlock once; an already unlocked badge keeps its original timestamp.
  /// Returns whether the badge changed.
  pub async fn unlock_badge(&self, badge_id: &str) -> bool {
    let mut st = self.state.write().await;
    if st.user.is_none() {
      return false;
    }
    match st.badges.iter_mut().find(|b| b.id == badge_id) {
      Some(badge) if badge.is_locked => {
        badge.is_locked = false;
        badge.unlocked_at = Some(now_ms());
        info!(target: "store", %badge_id, "Badge unlocked");
        true
      }
      _ => false,
    }
  }

  // --- Preferences (local only, never guarded) ---

  pub async fn toggle_theme(&self) -> Theme {
    self.state.write().await.preferences.toggle_theme()
  }

  pub async fn set_theme_color(&self, color: ThemeColor) {
    self.state.write().await.preferences.theme_color = color;
  }

  pub async fn toggle_dashboard_layout(&self) -> DashboardLayout {
    self.state.write().await.preferences.toggle_dashboard_layout()
  }

  pub async fn toggle_reduce_motion(&self) -> bool {
    self.state.write().await.preferences.toggle_reduce_motion()
  }

  /// Set the named preferences under one write lock.
  pub async fn apply_preferences(&self, patch: &PreferencesPatch) -> Preferences {
    let mut st = self.state.write().await;
    st.preferences.apply(patch);
    st.preferences.clone()
  }

  pub async fn preferences(&self) -> Preferences {
    self.state.read().await.preferences.clone()
  }
}
