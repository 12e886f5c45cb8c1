//! Shared application state handed to every handler.
//!
//! This module owns:
//!   - the application store (with its optional Supabase backend)
//!   - the quiz generator client
//!   - the optional auth client
//!   - the prompts (from TOML or defaults)

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::SupabaseAuth;
use crate::config::{AppConfig, Prompts};
use crate::generator::QuizGenerator;
use crate::remote::supabase::SupabaseRest;
use crate::remote::RemoteStore;
use crate::store::AppStore;

#[derive(Clone)]
pub struct AppState {
  pub store: AppStore,
  pub generator: QuizGenerator,
  pub auth: Option<SupabaseAuth>,
  pub prompts: Prompts,
}

impl AppState {
  /// Build state from config: Supabase clients when configured, the generator always.
  #[instrument(level = "info", skip_all)]
  pub fn new(cfg: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
    let (remote, auth) = match &cfg.supabase {
      Some(sb) => {
        let rest: Arc<dyn RemoteStore> = Arc::new(SupabaseRest::new(sb)?);
        info!(target: "quizdeck_backend", url = %sb.url, "Supabase enabled.");
        (Some(rest), Some(SupabaseAuth::new(sb)?))
      }
      None => {
        warn!(target: "quizdeck_backend", "Supabase disabled (no SUPABASE_URL/SUPABASE_ANON_KEY). Store runs local-only.");
        (None, None)
      }
    };

    let generator = QuizGenerator::new(&cfg.generator, cfg.limits.max_source_chars)?;
    if generator.has_api_key() {
      info!(target: "quizdeck_backend", base_url = %generator.base_url, model = %generator.model, "Generator enabled.");
    } else {
      warn!(target: "quizdeck_backend", "Generator has no GENERATOR_API_KEY; generation requests will fail.");
    }

    Ok(Self::from_parts(AppStore::new(remote), generator, auth, cfg.prompts.clone()))
  }

  pub fn from_parts(store: AppStore, generator: QuizGenerator, auth: Option<SupabaseAuth>, prompts: Prompts) -> Self {
    Self { store, generator, auth, prompts }
  }

  pub fn auth(&self) -> Result<&SupabaseAuth, crate::error::AuthError> {
    self.auth.as_ref().ok_or(crate::error::AuthError::NotConfigured)
  }
}
