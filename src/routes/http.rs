//! HTTP endpoint handlers. These are thin wrappers that forward to the store,
//! the auth client and the generator. Each handler is instrumented.
//!
//! Data actions answer with the optimistic snapshot; their remote writes keep
//! running in the background. Sign-in and sign-up wait for the first sync.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  Json,
  response::IntoResponse,
};
use tracing::{error, info, instrument, warn};

use crate::domain::{DashboardLayout, Goal, Preferences, PreferencesPatch, ProfileUpdate, Quiz, QuizResult, Theme, ThemeColor};
use crate::error::ApiError;
use crate::generator::GenerateRequest;
use crate::grading::grade_attempt;
use crate::protocol::*;
use crate::state::AppState;
use crate::store::{Reconcile, StoreState};
use crate::util::now_ms;

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn settle(handle: Reconcile) {
  if let Some(h) = handle {
    if let Err(e) = h.await {
      error!(target: "store", error = %e, "Background sync task failed");
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    persistence: state.store.has_remote(),
    generator: state.generator.has_api_key(),
  })
}

#[instrument(level = "debug", skip(state))]
pub async fn http_get_state(State(state): State<Arc<AppState>>) -> Json<StoreState> {
  Json(state.store.snapshot().await)
}

// --- Auth ---

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_sign_in(State(state): State<Arc<AppState>>, Json(body): Json<SignInIn>) -> ApiResult<StoreState> {
  let session = state.auth()?.sign_in(&body.email, &body.password).await?;
  settle(state.store.handle_session(Some(session)).await).await;
  Ok(Json(state.store.snapshot().await))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_sign_up(State(state): State<Arc<AppState>>, Json(body): Json<SignUpIn>) -> ApiResult<StoreState> {
  let session = state.auth()?.sign_up(&body.email, &body.password, &body.name).await?;
  settle(state.store.handle_session(Some(session)).await).await;
  Ok(Json(state.store.snapshot().await))
}

/// Revoke the token remotely (best effort), then tear down local state.
#[instrument(level = "info", skip(state))]
pub async fn http_post_sign_out(State(state): State<Arc<AppState>>) -> Json<StoreState> {
  if let (Some(session), Some(auth)) = (state.store.session().await, &state.auth) {
    if let Err(e) = auth.sign_out(&session).await {
      warn!(target: "auth", error = %e, "Remote sign-out failed; clearing local session anyway");
    }
  }
  state.store.logout().await;
  Json(state.store.snapshot().await)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_patch_profile(State(state): State<Arc<AppState>>, Json(body): Json<ProfileUpdate>) -> Json<StoreState> {
  state.store.update_user(body).await;
  Json(state.store.snapshot().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_sync(State(state): State<Arc<AppState>>) -> Json<StoreState> {
  state.store.fetch_user_data().await;
  Json(state.store.snapshot().await)
}

// --- Quizzes and results ---

/// Generate a quiz. Nothing is saved; the client posts it to `/quizzes` if kept.
#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, questions = body.question_count))]
pub async fn http_post_generate(State(state): State<Arc<AppState>>, Json(body): Json<GenerateRequest>) -> ApiResult<Quiz> {
  Ok(Json(state.generator.generate_quiz(&state.prompts, &body).await?))
}

#[instrument(level = "info", skip(state, body), fields(quiz_id = %body.id))]
pub async fn http_post_quiz(State(state): State<Arc<AppState>>, Json(body): Json<Quiz>) -> ApiResult<StoreState> {
  body.validate()?;
  state.store.save_quiz(body).await;
  Ok(Json(state.store.snapshot().await))
}

/// Grade an attempt at a saved quiz and record the result.
#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Path(quiz_id): Path<String>,
  Json(body): Json<AttemptIn>,
) -> ApiResult<QuizResult> {
  if !state.store.is_authenticated().await {
    return Err(ApiError::Unauthorized("Sign in to record quiz attempts.".into()));
  }
  let quiz = state.store.find_quiz(&quiz_id).await
    .ok_or_else(|| ApiError::NotFound(format!("Quiz {quiz_id} not found.")))?;
  let finished_at = body.finished_at.unwrap_or_else(now_ms);
  let result = grade_attempt(&quiz, body.answers, body.started_at, finished_at);
  result.validate()?;
  info!(target: "store", %quiz_id, score = result.score, correct = result.correct_count, "Attempt graded");
  state.store.add_result(result.clone()).await;
  Ok(Json(result))
}

#[instrument(level = "info", skip(state, body), fields(quiz_id = %body.quiz_id))]
pub async fn http_post_result(State(state): State<Arc<AppState>>, Json(body): Json<QuizResult>) -> ApiResult<StoreState> {
  body.validate()?;
  state.store.add_result(body).await;
  Ok(Json(state.store.snapshot().await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_result(State(state): State<Arc<AppState>>, Path(completed_at): Path<i64>) -> Json<ChangedOut> {
  Json(ChangedOut { changed: state.store.remove_result(completed_at).await })
}

// --- Goals, badges, preferences ---

#[instrument(level = "info", skip(state, body), fields(goal_id = %body.id))]
pub async fn http_post_goal(State(state): State<Arc<AppState>>, Json(body): Json<Goal>) -> Json<StoreState> {
  state.store.add_goal(body).await;
  Json(state.store.snapshot().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_goal(State(state): State<Arc<AppState>>, Path(goal_id): Path<String>) -> Json<StoreState> {
  state.store.remove_goal(&goal_id).await;
  Json(state.store.snapshot().await)
}

#[instrument(level = "info", skip(state, body), fields(increment = body.increment))]
pub async fn http_post_goal_progress(
  State(state): State<Arc<AppState>>,
  Path(goal_id): Path<String>,
  Json(body): Json<GoalProgressIn>,
) -> Json<StoreState> {
  state.store.update_goal_progress(&goal_id, body.increment).await;
  Json(state.store.snapshot().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_badge_unlock(State(state): State<Arc<AppState>>, Path(badge_id): Path<String>) -> Json<ChangedOut> {
  Json(ChangedOut { changed: state.store.unlock_badge(&badge_id).await })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_patch_preferences(State(state): State<Arc<AppState>>, Json(body): Json<PreferencesPatch>) -> Json<Preferences> {
  Json(state.store.apply_preferences(&body).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_toggle_theme(State(state): State<Arc<AppState>>) -> Json<Theme> {
  Json(state.store.toggle_theme().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_put_theme_color(State(state): State<Arc<AppState>>, Json(color): Json<ThemeColor>) -> Json<Preferences> {
  state.store.set_theme_color(color).await;
  Json(state.store.preferences().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_toggle_layout(State(state): State<Arc<AppState>>) -> Json<DashboardLayout> {
  Json(state.store.toggle_dashboard_layout().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_toggle_reduce_motion(State(state): State<Arc<AppState>>) -> Json<bool> {
  Json(state.store.toggle_reduce_motion().await)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::body::Body;
  use axum::http::{Method, Request, StatusCode};
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use crate::config::{GeneratorConfig, Prompts, DEFAULT_MAX_SOURCE_CHARS};
  use crate::domain::UserProfile;
  use crate::generator::QuizGenerator;
  use crate::routes::build_router;
  use crate::store::AppStore;

  fn app_state(generator: GeneratorConfig) -> Arc<AppState> {
    let generator = QuizGenerator::new(&generator, DEFAULT_MAX_SOURCE_CHARS).expect("generator");
    Arc::new(AppState::from_parts(AppStore::new(None), generator, None, Prompts::default()))
  }

  async fn signed_in_state() -> Arc<AppState> {
    let state = app_state(GeneratorConfig::default());
    state.store
      .login(UserProfile { id: "u-1".into(), name: "Ada".into(), email: "ada@example.com".into(), title: "Student".into() })
      .await;
    state
  }

  async fn call(state: &Arc<AppState>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    let req = match body {
      Some(b) => req.body(Body::from(b.to_string())),
      None => req.body(Body::empty()),
    }
    .expect("request");
    let res = build_router(state.clone()).oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
    (status, value)
  }

  fn quiz_json() -> Value {
    json!({
      "id": "quiz-1", "title": "Cells", "topic": "Biology", "createdAt": 1_000,
      "questions": [
        { "id": "q-0", "text": "A?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 0, "explanation": "" },
        { "id": "q-1", "text": "B?", "options": ["a", "b", "c", "d"], "correctAnswerIndex": 3, "explanation": "" }
      ],
      "flashcards": []
    })
  }

  #[tokio::test]
  async fn health_reports_collaborators() {
    let (status, body) = call(&app_state(GeneratorConfig::default()), Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "persistence": false, "generator": false }));
  }

  #[tokio::test]
  async fn state_is_camel_case_and_hides_session() {
    let (_, body) = call(&signed_in_state().await, Method::GET, "/api/v1/state", None).await;
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["userStats"]["level"], 1);
    assert_eq!(body["badges"].as_array().map(Vec::len), Some(8));
    assert!(body.get("session").is_none());
  }

  #[tokio::test]
  async fn sign_in_without_backend_is_unavailable() {
    let body = json!({ "email": "ada@example.com", "password": "pw" });
    let (status, body) = call(&app_state(GeneratorConfig::default()), Method::POST, "/api/v1/auth/sign_in", Some(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Authentication is not configured.");
  }

  #[tokio::test]
  async fn generate_without_key_reports_missing_key() {
    let body = json!({ "topic": "Cells", "questionCount": 3 });
    let (status, body) = call(&app_state(GeneratorConfig::default()), Method::POST, "/api/v1/quizzes/generate", Some(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "API key is missing. Set GENERATOR_API_KEY.");
  }

  #[tokio::test]
  async fn attempt_is_graded_and_recorded() {
    let state = signed_in_state().await;
    let (status, _) = call(&state, Method::POST, "/api/v1/quizzes", Some(quiz_json())).await;
    assert_eq!(status, StatusCode::OK);

    let attempt = json!({
      "answers": [{ "questionId": "q-0", "selectedIndex": 0 }, { "questionId": "q-1", "selectedIndex": 1 }],
      "startedAt": 10_000, "finishedAt": 40_000
    });
    let (status, result) = call(&state, Method::POST, "/api/v1/quizzes/quiz-1/attempts", Some(attempt)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], 50);
    assert_eq!(result["correctCount"], 1);
    assert_eq!(result["timeSpentSeconds"], 30);

    let (_, snap) = call(&state, Method::GET, "/api/v1/state", None).await;
    assert_eq!(snap["history"][0]["completedAt"], 40_000);
    assert_eq!(snap["userStats"]["xp"], 70);

    let (_, removed) = call(&state, Method::DELETE, "/api/v1/results/40000", None).await;
    assert_eq!(removed["changed"], true);
  }

  #[tokio::test]
  async fn attempt_rules() {
    let anon = app_state(GeneratorConfig::default());
    let attempt = json!({ "answers": [], "startedAt": 0 });
    let (status, _) = call(&anon, Method::POST, "/api/v1/quizzes/quiz-1/attempts", Some(attempt.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let state = signed_in_state().await;
    let (status, body) = call(&state, Method::POST, "/api/v1/quizzes/missing/attempts", Some(attempt)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Quiz missing not found.");
  }

  #[tokio::test]
  async fn goal_progress_over_http_is_clamped() {
    let state = signed_in_state().await;
    let goal = json!({
      "id": "g-1", "title": "Quizzes", "current": 0, "target": 3, "unit": "quizzes",
      "category": "quiz", "colorTheme": "green"
    });
    call(&state, Method::POST, "/api/v1/goals", Some(goal)).await;
    let (_, snap) = call(&state, Method::POST, "/api/v1/goals/g-1/progress", Some(json!({ "increment": 10 }))).await;
    assert_eq!(snap["goals"][0]["current"], 3);
    let (_, snap) = call(&state, Method::POST, "/api/v1/goals/g-1/progress", Some(json!({ "increment": -7 }))).await;
    assert_eq!(snap["goals"][0]["current"], 0);

    let (_, snap) = call(&state, Method::DELETE, "/api/v1/goals/g-1", None).await;
    assert_eq!(snap["goals"], json!([]));
  }

  #[tokio::test]
  async fn badge_unlocks_once() {
    let state = signed_in_state().await;
    let (_, first) = call(&state, Method::POST, "/api/v1/badges/b-1/unlock", None).await;
    let (_, second) = call(&state, Method::POST, "/api/v1/badges/b-1/unlock", None).await;
    assert_eq!(first["changed"], true);
    assert_eq!(second["changed"], false);
  }

  #[tokio::test]
  async fn preferences_patch_sets_values() {
    let state = app_state(GeneratorConfig::default());
    let patch = json!({ "theme": "dark", "themeColor": "teal", "reduceMotion": true });
    let (_, prefs) = call(&state, Method::PATCH, "/api/v1/preferences", Some(patch.clone())).await;
    assert_eq!(prefs, json!({ "theme": "dark", "themeColor": "teal", "dashboardLayout": "grid", "reduceMotion": true }));

    // Same request again is idempotent.
    let (_, again) = call(&state, Method::PATCH, "/api/v1/preferences", Some(patch)).await;
    assert_eq!(again, prefs);
  }

  #[tokio::test]
  async fn invalid_bodies_are_unprocessable() {
    let state = signed_in_state().await;
    let result = json!({
      "quizId": "quiz-1", "quizTitle": "Cells", "score": 250, "totalQuestions": 1,
      "correctCount": 9, "timeSpentSeconds": 3, "completedAt": 1_000
    });
    let (status, body) = call(&state, Method::POST, "/api/v1/results", Some(result)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "score 250 is outside 0..=100");

    let mut quiz = quiz_json();
    quiz["questions"][1]["options"] = json!([]);
    quiz["questions"][1]["correctAnswerIndex"] = json!(9);
    let (status, body) = call(&state, Method::POST, "/api/v1/quizzes", Some(quiz)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some_and(|e| e.starts_with("question 1:")));

    let (_, snap) = call(&state, Method::GET, "/api/v1/state", None).await;
    assert_eq!(snap["history"], json!([]));
    assert_eq!(snap["savedQuizzes"], json!([]));
    assert_eq!(snap["userStats"]["averageScore"], 0);
  }

  #[tokio::test]
  async fn attempt_with_unrepresentable_finish_is_rejected() {
    let state = signed_in_state().await;
    call(&state, Method::POST, "/api/v1/quizzes", Some(quiz_json())).await;
    let attempt = json!({ "answers": [], "startedAt": i64::MIN, "finishedAt": i64::MAX });
    let (status, _) = call(&state, Method::POST, "/api/v1/quizzes/quiz-1/attempts", Some(attempt)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, snap) = call(&state, Method::GET, "/api/v1/state", None).await;
    assert_eq!(snap["history"], json!([]));
  }

  #[tokio::test]
  async fn preference_toggles() {
    let state = app_state(GeneratorConfig::default());
    let (_, theme) = call(&state, Method::POST, "/api/v1/preferences/theme/toggle", None).await;
    assert_eq!(theme, json!("dark"));
    let (_, layout) = call(&state, Method::POST, "/api/v1/preferences/layout/toggle", None).await;
    assert_eq!(layout, json!("list"));
    let (_, reduce) = call(&state, Method::POST, "/api/v1/preferences/reduce_motion/toggle", None).await;
    assert_eq!(reduce, json!(true));
    let (_, prefs) = call(&state, Method::PUT, "/api/v1/preferences/theme_color", Some(json!("orange"))).await;
    assert_eq!(prefs["themeColor"], "orange");
  }

  #[tokio::test]
  async fn sign_out_clears_local_state() {
    let state = signed_in_state().await;
    let (_, snap) = call(&state, Method::POST, "/api/v1/auth/sign_out", None).await;
    assert_eq!(snap["isAuthenticated"], false);
    assert_eq!(snap["user"], Value::Null);
  }
}
