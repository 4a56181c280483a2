//! Process-wide configuration, loaded once at startup.

use crate::error::{Error, Result};
use crate::stage::{DEFAULT_MODEL, SearchContextSize, StageConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRACE_VIEWER: &str = "https://platform.openai.com/traces/trace";

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "MARKET_REPORT_MODEL";
pub const SEARCH_CONTEXT_VAR: &str = "MARKET_REPORT_SEARCH_CONTEXT";
pub const TRACE_VIEWER_VAR: &str = "MARKET_REPORT_TRACE_VIEWER";

/// Immutable settings handed to the service client and every stage.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub search_context_size: SearchContextSize,
    /// Base URL of the external trace viewer; the run's trace id is appended
    pub trace_viewer: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("search_context_size", &self.search_context_size)
            .field("trace_viewer", &self.trace_viewer)
            .finish()
    }
}

impl Settings {
    /// Settings with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            search_context_size: SearchContextSize::default(),
            trace_viewer: DEFAULT_TRACE_VIEWER.to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn search_context_size(mut self, size: SearchContextSize) -> Self {
        self.search_context_size = size;
        self
    }

    pub fn trace_viewer(mut self, url: impl Into<String>) -> Self {
        self.trace_viewer = url.into();
        self
    }

    /// Load `.env` (overriding existing variables) and read the environment.
    pub fn load() -> Result<Self> {
        load_dotenv();
        Self::from_env()
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_VAR)
            .ok_or_else(|| Error::Config(format!("{} is not set", API_KEY_VAR)))?;

        let mut settings = Settings::new(api_key);
        if let Some(url) = get(BASE_URL_VAR) {
            settings = settings.base_url(url);
        }
        if let Some(model) = get(MODEL_VAR) {
            settings = settings.model(model);
        }
        if let Some(size) = get(SEARCH_CONTEXT_VAR) {
            settings = settings.search_context_size(size.parse()?);
        }
        if let Some(url) = get(TRACE_VIEWER_VAR) {
            settings = settings.trace_viewer(url);
        }
        Ok(settings)
    }

    /// Stage configuration derived from these settings.
    pub fn stage_config(&self) -> StageConfig {
        StageConfig::new(self.model.clone()).search_context_size(self.search_context_size)
    }

    /// Link to the trace viewer for a run.
    pub fn trace_url(&self, trace_id: &str) -> String {
        format!("{}?trace_id={}", self.trace_viewer, trace_id)
    }
}

/// Load a local `.env` file, letting it override variables already set.
///
/// A missing file is not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv_override() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env"),
    }
}
