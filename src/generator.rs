//! Minimal OpenAI-compatible client used to generate quizzes and flashcards.
//!
//! We only call chat.completions and request a strict JSON object, then coerce the
//! loosely-typed model output into exact `Quiz` shapes.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::{GeneratorConfig, Prompts};
use crate::domain::{Difficulty, Flashcard, Question, Quiz};
use crate::error::GenerateError;
use crate::util::{fill_template, now_ms, trunc_for_log, truncate_chars};

/// Keys that are clearly copied from setup docs rather than real.
const PLACEHOLDER_KEYS: &[&str] = &["your_api_key_here", "sk-...", "your_openai_key_here"];

/// What the view asks for.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
  #[serde(default)] pub source_text: String,
  pub topic: String,
  #[serde(default)] pub difficulty: Difficulty,
  pub question_count: u32,
  #[serde(default)] pub flashcard_count: u32,
}

#[derive(Clone)]
pub struct QuizGenerator {
  client: reqwest::Client,
  api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  max_source_chars: usize,
}

// --- Model output (loosely typed) ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenQuiz {
  quiz_title: String,
  questions: Vec<GenQuestion>,
  #[serde(default)] flashcards: Option<Vec<GenFlashcard>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenQuestion {
  #[serde(default)] id: Option<String>,
  text: String,
  options: Vec<String>,
  correct_answer_index: serde_json::Value,
  #[serde(default)] explanation: String,
}

#[derive(Deserialize)]
struct GenFlashcard {
  #[serde(default)] id: Option<String>,
  front: String,
  back: String,
}

/// Accepts 2, 2.0 or "2".
fn coerce_index(v: &serde_json::Value) -> Option<usize> {
  match v {
    serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
    serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
    _ => None,
  }
  .map(|i| i as usize)
}

fn non_empty(id: Option<String>) -> Option<String> {
  id.filter(|s| !s.trim().is_empty())
}

/// Turn model output into a `Quiz`: cast indices, backfill ids, stamp id/topic/time.
fn into_quiz(gen: GenQuiz, topic: &str) -> Result<Quiz, GenerateError> {
  let mut questions = Vec::with_capacity(gen.questions.len());
  for (i, q) in gen.questions.into_iter().enumerate() {
    let idx = coerce_index(&q.correct_answer_index)
      .ok_or_else(|| GenerateError::Malformed(format!("question {i}: correctAnswerIndex is not an integer")))?;
    let question = Question {
      id: non_empty(q.id).unwrap_or_else(|| format!("q-{i}")),
      text: q.text,
      options: q.options,
      correct_answer_index: idx,
      explanation: q.explanation,
    };
    question.validate(i).map_err(|e| GenerateError::Malformed(e.to_string()))?;
    questions.push(question);
  }

  let flashcards = gen
    .flashcards
    .unwrap_or_default()
    .into_iter()
    .enumerate()
    .map(|(i, f)| Flashcard {
      id: non_empty(f.id).unwrap_or_else(|| format!("f-{i}")),
      front: f.front,
      back: f.back,
    })
    .collect();

  Ok(Quiz {
    id: Uuid::new_v4().to_string(),
    title: gen.quiz_title,
    topic: topic.to_string(),
    questions,
    flashcards,
    created_at: now_ms(),
  })
}

impl QuizGenerator {
  pub fn new(cfg: &GeneratorConfig, max_source_chars: usize) -> Result<Self, GenerateError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(|e| GenerateError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model.clone(),
      max_source_chars,
    })
  }

  pub fn has_api_key(&self) -> bool {
    self.api_key.is_some()
  }

  fn checked_key(&self) -> Result<&str, GenerateError> {
    let key = self.api_key.as_deref().ok_or(GenerateError::MissingApiKey)?;
    if PLACEHOLDER_KEYS.contains(&key) || key.contains("Your_Actual_Key_Here") {
      return Err(GenerateError::PlaceholderApiKey);
    }
    Ok(key)
  }

  /// JSON-object chat completion, returning the raw content string.
  #[instrument(level = "info", skip(self, key, system, user), fields(model = %self.model), target = "generator")]
  async fn chat_json_text(&self, key: &str, system: &str, user: &str, temperature: f32) -> Result<String, GenerateError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: ResponseFormat { r#type: "json_object".into() },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quizdeck-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", key))
      .json(&req).send().await.map_err(|e| GenerateError::Transport(e.to_string()))?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      if status.as_u16() == 400 || status.as_u16() == 401 {
        return Err(GenerateError::InvalidApiKey);
      }
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerateError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| GenerateError::Malformed(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(target: "generator", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Generator usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();
    if text.trim().is_empty() {
      return Err(GenerateError::EmptyResponse);
    }
    Ok(text)
  }

  /// Generate a quiz (and flashcards) from optional source text.
  #[instrument(
    level = "info",
    skip(self, prompts, req),
    fields(topic = %req.topic, difficulty = %req.difficulty, questions = req.question_count, flashcards = req.flashcard_count, source_len = req.source_text.len()),
    target = "generator"
  )]
  pub async fn generate_quiz(&self, prompts: &Prompts, req: &GenerateRequest) -> Result<Quiz, GenerateError> {
    let key = self.checked_key()?;

    let difficulty = req.difficulty.to_string();
    let count = req.question_count.to_string();
    let flashcard_count = req.flashcard_count.to_string();
    let user = fill_template(
      &prompts.quiz_user_template,
      &[
        ("difficulty", difficulty.as_str()),
        ("topic", req.topic.as_str()),
        ("count", count.as_str()),
        ("flashcard_count", flashcard_count.as_str()),
        ("source_text", truncate_chars(&req.source_text, self.max_source_chars)),
      ],
    );

    let start = Instant::now();
    let result = self.chat_json_text(key, &prompts.quiz_system, &user, 0.7).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => {
        info!(target: "generator", ?elapsed, response_len = t.len(), "Model response received");
        t
      }
      Err(e) => {
        error!(target: "generator", ?elapsed, error = %e, "Quiz generation failed");
        return Err(e);
      }
    };

    let gen: GenQuiz = serde_json::from_str(&text).map_err(|e| {
      error!(target: "generator", error = %e, raw = %trunc_for_log(&text, 300), "Model returned unparseable JSON");
      GenerateError::Malformed(e.to_string())
    })?;
    let quiz = into_quiz(gen, &req.topic)?;
    info!(
      target: "generator",
      quiz_id = %quiz.id,
      questions = quiz.questions.len(),
      flashcards = quiz.flashcards.len(),
      "Quiz generated"
    );
    Ok(quiz)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  response_format: ResponseFormat,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
