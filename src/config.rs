//! Service configuration: environment variables plus an optional TOML file
//! (prompt overrides and limits).
//!
//! See `FileConfig` and `Prompts` for the TOML schema.

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_MAX_SOURCE_CHARS: usize = 15_000;

/// Everything read from the environment at startup.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
  pub port: u16,
  pub supabase: Option<SupabaseConfig>,
  pub generator: GeneratorConfig,
  pub prompts: Prompts,
  pub limits: Limits,
}

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
  pub url: String,
  pub anon_key: String,
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
  /// Kept optional: a missing key is reported at generation time, not at startup.
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: "https://api.openai.com/v1".into(),
      model: "gpt-4o-mini".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Limits {
  #[serde(default = "default_max_source_chars")]
  pub max_source_chars: usize,
}

fn default_max_source_chars() -> usize { DEFAULT_MAX_SOURCE_CHARS }

impl Default for Limits {
  fn default() -> Self { Self { max_source_chars: DEFAULT_MAX_SOURCE_CHARS } }
}

/// Optional TOML file pointed to by QUIZDECK_CONFIG_PATH.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
}

/// Prompts used by the quiz generator.
/// Placeholders: {difficulty} {topic} {count} {flashcard_count} {source_text}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You are a study-material generator. Respond ONLY with strict JSON.".into(),
      quiz_user_template: concat!(
        "Generate a {difficulty} difficulty quiz about \"{topic}\".\n",
        "The quiz should have exactly {count} multiple-choice questions with 4 options each.\n",
        "ALSO generate exactly {flashcard_count} high-quality flashcards for key concepts defined in the text.\n",
        "Base everything on the following text content:\n\"{source_text}\"\n",
        "If the text is empty or too short, use your general knowledge about the topic.\n",
        "Return JSON: {\"quizTitle\": string, \"questions\": [{\"id\": string, \"text\": string, ",
        "\"options\": [string], \"correctAnswerIndex\": integer, \"explanation\": string}], ",
        "\"flashcards\": [{\"id\": string, \"front\": string, \"back\": string}]}"
      )
      .into(),
    }
  }
}

impl AppConfig {
  /// Read env vars and the optional TOML file. Never fails; bad values fall back to defaults.
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(3000);

    let supabase = match (std::env::var("SUPABASE_URL"), std::env::var("SUPABASE_ANON_KEY")) {
      (Ok(url), Ok(anon_key)) if url.starts_with("http") && !anon_key.is_empty() => {
        Some(SupabaseConfig { url: url.trim_end_matches('/').to_string(), anon_key })
      }
      _ => None,
    };

    let defaults = GeneratorConfig::default();
    let generator = GeneratorConfig {
      api_key: std::env::var("GENERATOR_API_KEY").ok().filter(|k| !k.is_empty()),
      base_url: std::env::var("GENERATOR_BASE_URL").unwrap_or(defaults.base_url),
      model: std::env::var("GENERATOR_MODEL").unwrap_or(defaults.model),
    };

    let file = load_file_config_from_env().unwrap_or_default();

    Self { port, supabase, generator, prompts: file.prompts, limits: file.limits }
  }
}

/// Attempt to load `FileConfig` from QUIZDECK_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("QUIZDECK_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_file_config(&s) {
      Ok(cfg) => {
        info!(target: "quizdeck_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizdeck_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizdeck_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_file_config(s: &str) -> Result<FileConfig, toml::de::Error> {
  toml::from_str::<FileConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = parse_file_config("[prompts]\nquiz_system = \"Be terse.\"\n").expect("toml");
    assert_eq!(cfg.prompts.quiz_system, "Be terse.");
    assert!(cfg.prompts.quiz_user_template.contains("{topic}"));
    assert_eq!(cfg.limits.max_source_chars, DEFAULT_MAX_SOURCE_CHARS);
  }

  #[test]
  fn limits_override() {
    let cfg = parse_file_config("[limits]\nmax_source_chars = 200\n").expect("toml");
    assert_eq!(cfg.limits.max_source_chars, 200);
  }
}
