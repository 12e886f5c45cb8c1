//! PostgREST client for a Supabase project.
//!
//! Every request carries the project's anon key (`apikey`) and the user's access
//! token (`Authorization: Bearer`), so row-level security scopes reads and writes.
//! Calls are instrumented; row contents are never logged, only counts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{GoalRow, NewQuizRow, ProfileRow, QuizRow, RemoteStore, ResultRow};
use crate::config::SupabaseConfig;
use crate::domain::{ProfileUpdate, Session};
use crate::error::RemoteError;

const PROFILES: &str = "profiles";
const QUIZZES: &str = "quizzes";
const RESULTS: &str = "results";
const GOALS: &str = "goals";

#[derive(Clone)]
pub struct SupabaseRest {
  client: reqwest::Client,
  base_url: String,
  anon_key: String,
}

impl SupabaseRest {
  pub fn new(cfg: &SupabaseConfig) -> Result<Self, RemoteError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()?;
    Ok(Self { client, base_url: cfg.url.clone(), anon_key: cfg.anon_key.clone() })
  }

  fn request(&self, method: Method, table: &str, session: &Session) -> RequestBuilder {
    let url = format!("{}/rest/v1/{}", self.base_url, table);
    self.client.request(method, url)
      .header(USER_AGENT, "quizdeck-backend/0.1")
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
  }

  #[instrument(level = "debug", skip(self, session, query), target = "remote")]
  async fn select<T: DeserializeOwned>(
    &self,
    session: &Session,
    table: &str,
    query: &[(&str, String)],
  ) -> Result<Vec<T>, RemoteError> {
    let res = self.request(Method::GET, table, session).query(query).send().await?;
    let rows: Vec<T> = check(res).await?.json().await?;
    debug!(target: "remote", %table, rows = rows.len(), "select ok");
    Ok(rows)
  }

  #[instrument(level = "debug", skip(self, session, row), target = "remote")]
  async fn insert<T: Serialize + Sync>(&self, session: &Session, table: &str, row: &T) -> Result<(), RemoteError> {
    let res = self.request(Method::POST, table, session)
      .header(CONTENT_TYPE, "application/json")
      .header("Prefer", "return=minimal")
      .json(row)
      .send()
      .await?;
    check(res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self, session, body), target = "remote")]
  async fn patch_by_id<T: Serialize + Sync>(
    &self,
    session: &Session,
    table: &str,
    id: &str,
    body: &T,
  ) -> Result<(), RemoteError> {
    let res = self.request(Method::PATCH, table, session)
      .query(&[("id", format!("eq.{id}"))])
      .header(CONTENT_TYPE, "application/json")
      .header("Prefer", "return=minimal")
      .json(body)
      .send()
      .await?;
    check(res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self, session), target = "remote")]
  async fn delete_by_id(&self, session: &Session, table: &str, id: &str) -> Result<(), RemoteError> {
    let res = self.request(Method::DELETE, table, session)
      .query(&[("id", format!("eq.{id}"))])
      .send()
      .await?;
    check(res).await?;
    Ok(())
  }
}

fn owned_by(session: &Session) -> (&'static str, String) {
  ("user_id", format!("eq.{}", session.user.id))
}

/// Turn a non-2xx response into `RemoteError::Http` with the PostgREST message if present.
async fn check(res: Response) -> Result<Response, RemoteError> {
  if res.status().is_success() {
    return Ok(res);
  }
  let status = res.status().as_u16();
  let body = res.text().await.unwrap_or_default();
  let message = extract_postgrest_error(&body).unwrap_or(body);
  Err(RemoteError::Http { status, message })
}

fn extract_postgrest_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct PgErr { message: String }
  serde_json::from_str::<PgErr>(body).ok().map(|e| e.message)
}

#[derive(Serialize)]
struct ProfilePatch<'a> {
  #[serde(skip_serializing_if = "Option::is_none")] name: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")] title: Option<&'a str>,
}

#[derive(Serialize)]
struct GoalCurrentPatch { current: u32 }

#[async_trait]
impl RemoteStore for SupabaseRest {
  async fn fetch_profile(&self, session: &Session) -> Result<Option<ProfileRow>, RemoteError> {
    let query = [("select", "*".to_string()), ("id", format!("eq.{}", session.user.id))];
    let rows: Vec<ProfileRow> = self.select(session, PROFILES, &query).await?;
    Ok(rows.into_iter().next())
  }

  async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<(), RemoteError> {
    let body = ProfilePatch { name: update.name.as_deref(), title: update.title.as_deref() };
    self.patch_by_id(session, PROFILES, &session.user.id, &body).await
  }

  async fn list_quizzes(&self, session: &Session) -> Result<Vec<QuizRow>, RemoteError> {
    let query = [("select", "*".to_string()), owned_by(session), ("order", "created_at.desc".to_string())];
    self.select(session, QUIZZES, &query).await
  }

  async fn insert_quiz(&self, session: &Session, row: &NewQuizRow) -> Result<(), RemoteError> {
    self.insert(session, QUIZZES, row).await
  }

  async fn list_results(&self, session: &Session) -> Result<Vec<ResultRow>, RemoteError> {
    let query = [("select", "*".to_string()), owned_by(session), ("order", "completed_at.desc".to_string())];
    self.select(session, RESULTS, &query).await
  }

  async fn insert_result(&self, session: &Session, row: &ResultRow) -> Result<(), RemoteError> {
    self.insert(session, RESULTS, row).await
  }

  async fn list_goals(&self, session: &Session) -> Result<Vec<GoalRow>, RemoteError> {
    let query = [("select", "*".to_string()), owned_by(session)];
    self.select(session, GOALS, &query).await
  }

  async fn insert_goal(&self, session: &Session, row: &GoalRow) -> Result<(), RemoteError> {
    self.insert(session, GOALS, row).await
  }

  async fn update_goal_current(&self, session: &Session, goal_id: &str, current: u32) -> Result<(), RemoteError> {
    self.patch_by_id(session, GOALS, goal_id, &GoalCurrentPatch { current }).await
  }

  async fn delete_goal(&self, session: &Session, goal_id: &str) -> Result<(), RemoteError> {
    self.delete_by_id(session, GOALS, goal_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{SessionUser, UserMetadata};
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn session() -> Session {
    Session {
      access_token: "tok-123".into(),
      refresh_token: None,
      user: SessionUser { id: "u-1".into(), email: Some("a@b.co".into()), user_metadata: UserMetadata::default() },
    }
  }

  fn client(server: &MockServer) -> SupabaseRest {
    SupabaseRest::new(&SupabaseConfig { url: server.uri(), anon_key: "anon".into() }).expect("client")
  }

  #[tokio::test]
  async fn results_select_is_ordered_and_authenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/results"))
      .and(query_param("order", "completed_at.desc"))
      .and(query_param("user_id", "eq.u-1"))
      .and(header("apikey", "anon"))
      .and(header("authorization", "Bearer tok-123"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
        "id": 1, "user_id": "u-1", "quiz_id": "quiz-1", "quiz_title": "Cells",
        "score": 80, "total_questions": 10, "correct_count": 8, "time_spent": 61,
        "completed_at": "2023-11-14T22:13:20+00:00"
      }])))
      .expect(1)
      .mount(&server)
      .await;

    let rows = client(&server).list_results(&session()).await.expect("rows");
    assert_eq!(rows.len(), 1);
    let r = rows[0].clone().into_result().expect("normalize");
    assert_eq!(r.time_spent_seconds, 61);
    assert_eq!(r.completed_at, 1_700_000_000_000);
  }

  #[tokio::test]
  async fn missing_profile_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/profiles"))
      .and(query_param("id", "eq.u-1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let profile = client(&server).fetch_profile(&session()).await.expect("ok");
    assert!(profile.is_none());
  }

  #[tokio::test]
  async fn goal_progress_patches_only_current() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
      .and(path("/rest/v1/goals"))
      .and(query_param("id", "eq.g-9"))
      .and(body_json(json!({ "current": 4 })))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client(&server).update_goal_current(&session(), "g-9", 4).await.expect("patched");
  }

  #[tokio::test]
  async fn http_errors_carry_postgrest_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/rest/v1/goals"))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({
        "code": "42501", "message": "new row violates row-level security policy"
      })))
      .mount(&server)
      .await;

    let row = GoalRow {
      id: "g-1".into(),
      user_id: "u-1".into(),
      title: "t".into(),
      description: None,
      target: 3,
      current: 0,
      unit: "quizzes".into(),
      category: crate::domain::GoalCategory::Quiz,
      color_theme: crate::domain::ColorTheme::Blue,
    };
    let err = client(&server).insert_goal(&session(), &row).await.expect_err("403");
    match err {
      RemoteError::Http { status, message } => {
        assert_eq!(status, 403);
        assert!(message.contains("row-level security"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
