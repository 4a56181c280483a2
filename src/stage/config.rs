//! Stage configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Default model for every stage.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// How much search context the hosted web-search tool should gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchContextSize {
    #[default]
    Low,
    Medium,
    High,
}

impl SearchContextSize {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchContextSize::Low => "low",
            SearchContextSize::Medium => "medium",
            SearchContextSize::High => "high",
        }
    }
}

impl fmt::Display for SearchContextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchContextSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SearchContextSize::Low),
            "medium" => Ok(SearchContextSize::Medium),
            "high" => Ok(SearchContextSize::High),
            other => Err(Error::Config(format!(
                "unknown search context size '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

/// Configuration shared by the pipeline stages.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Temperature for sampling; `None` leaves the service default
    pub temperature: Option<f32>,
    /// Maximum output tokens; `None` leaves the service default
    pub max_output_tokens: Option<u32>,
    /// Search context size for stages that use web search
    pub search_context_size: SearchContextSize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_output_tokens: None,
            search_context_size: SearchContextSize::Low,
        }
    }
}

impl StageConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the max output tokens.
    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    /// Set the web-search context size.
    pub fn search_context_size(mut self, size: SearchContextSize) -> Self {
        self.search_context_size = size;
        self
    }
}
