//! Remote analysis stages.
//!
//! A stage wraps exactly one call to the reasoning service: fixed
//! instructions, a tool policy and an expected output schema. The reply is
//! pulled out of the response text and coerced into the stage's record.
//! Nothing is retried here; a failed call fails the stage.

mod config;
mod events;
pub mod prompt;

pub use config::{DEFAULT_MODEL, SearchContextSize, StageConfig};
pub use events::{EventCallback, StageCallbacks, StageEvent, verbose_callbacks};

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{Contract, StageOutput};
use crate::service::{OutputFormat, ReasoningService, StageRequest, Tool, ToolChoice};

/// Matches a fenced ```json block
static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json|JSON)?\s*\n([\s\S]*?)```").expect("fenced JSON pattern is valid")
});

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Competitor,
    Market,
    Financial,
    Writer,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Competitor,
        StageKind::Market,
        StageKind::Financial,
        StageKind::Writer,
    ];

    /// Agent name reported to the reasoning service.
    pub fn agent_name(self) -> &'static str {
        match self {
            StageKind::Competitor => "competitor_analysis_agent",
            StageKind::Market => "market_agent",
            StageKind::Financial => "financial_estimator_agent",
            StageKind::Writer => "writer_agent",
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            StageKind::Competitor => prompt::COMPETITOR_INSTRUCTIONS,
            StageKind::Market => prompt::MARKET_INSTRUCTIONS,
            StageKind::Financial => prompt::FINANCIAL_INSTRUCTIONS,
            StageKind::Writer => prompt::WRITER_INSTRUCTIONS,
        }
    }

    /// Competitor and market stages must search the web; the others only
    /// reason over the text they are given.
    pub fn uses_web_search(self) -> bool {
        matches!(self, StageKind::Competitor | StageKind::Market)
    }

    pub fn tools(self, config: &StageConfig) -> Vec<Tool> {
        if self.uses_web_search() {
            vec![Tool::WebSearch {
                search_context_size: config.search_context_size,
            }]
        } else {
            Vec::new()
        }
    }

    pub fn tool_choice(self) -> ToolChoice {
        if self.uses_web_search() {
            ToolChoice::Required
        } else {
            ToolChoice::None
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Competitor => "competitor",
            StageKind::Market => "market",
            StageKind::Financial => "financial",
            StageKind::Writer => "writer",
        })
    }
}

/// One remote analysis stage producing a `T`.
pub struct Stage<T> {
    kind: StageKind,
    config: StageConfig,
    contract: Contract<T>,
    callbacks: StageCallbacks,
}

impl<T: StageOutput> Stage<T> {
    /// Create a stage, generating and compiling the schema for `T`.
    pub fn new(kind: StageKind, config: StageConfig) -> Result<Self> {
        Ok(Self {
            kind,
            config,
            contract: Contract::new()?,
            callbacks: StageCallbacks::default(),
        })
    }

    /// Attach observability callbacks.
    pub fn with_callbacks(mut self, callbacks: StageCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn contract(&self) -> &Contract<T> {
        &self.contract
    }

    /// Build the service request for `prompt`.
    pub fn request(&self, prompt: &str) -> Result<StageRequest> {
        if prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt(self.kind));
        }

        Ok(StageRequest {
            stage: self.kind,
            agent_name: self.kind.agent_name(),
            model: self.config.model.clone(),
            instructions: self.kind.instructions(),
            input: prompt.to_string(),
            tools: self.kind.tools(&self.config),
            tool_choice: self.kind.tool_choice(),
            output: OutputFormat {
                name: self.contract.name().to_string(),
                schema: self.contract.schema().clone(),
            },
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        })
    }

    /// Call the service once and coerce its reply into a `T`.
    pub async fn run<S>(&self, service: &S, prompt: &str) -> Result<T>
    where
        S: ReasoningService,
    {
        self.emit(StageEvent::Started { stage: self.kind });

        let result = self.call(service, prompt).await;
        match &result {
            Ok(_) => self.emit(StageEvent::Validated { stage: self.kind }),
            Err(e) => self.emit(StageEvent::Error {
                stage: self.kind,
                message: e.to_string(),
            }),
        }
        result
    }

    async fn call<S>(&self, service: &S, prompt: &str) -> Result<T>
    where
        S: ReasoningService,
    {
        let request = self.request(prompt)?;

        self.emit(StageEvent::Request {
            stage: self.kind,
            model: request.model.clone(),
            prompt_chars: request.input.chars().count(),
        });

        let text = service.respond(request).await?;

        self.emit(StageEvent::Response {
            stage: self.kind,
            content: text.clone(),
        });

        let value = extract_json(&text).ok_or_else(|| {
            Error::mismatch(self.kind, "response does not contain a JSON object")
        })?;
        self.contract.coerce(self.kind, value)
    }

    fn emit(&self, event: StageEvent) {
        self.callbacks.emit(&event);
    }
}

/// Pull a JSON value out of a model reply.
///
/// Tries the whole reply, then a fenced ```json block, then the outermost
/// `{...}` span.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(cap) = FENCED_JSON.captures(trimmed)
        && let Some(body) = cap.get(1)
        && let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim())
    {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FinancialEstimationResult, MarketResearchOutput};
    use crate::testing::ScriptedService;
    use serde_json::json;

    fn market_reply() -> String {
        json!({
            "market_size": "$45B (2024)",
            "growth_rate": "7.2% CAGR",
            "short_term_trends": ["Single-origin subscriptions"],
            "mid_term_trends": [],
            "long_term_trends": [],
            "major_players": ["Trade", "Atlas Coffee Club"],
            "barriers_to_entry": ["Roaster relationships"],
            "opportunities": [],
            "threats": ["Churn"],
            "citations": ["https://example.com/coffee"]
        })
        .to_string()
    }

    #[test]
    fn test_extract_json_plain() {
        let value = extract_json(r#"  {"a": 1}  "#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here is the result:\n\n```json\n{\"a\": [1, 2]}\n```\n\nDone.";
        assert_eq!(extract_json(text).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_extract_json_embedded() {
        let text = "Result follows {\"a\": {\"b\": true}} end";
        assert_eq!(extract_json(text).unwrap(), json!({"a": {"b": true}}));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_tool_policy() {
        let config = StageConfig::default();
        assert_eq!(StageKind::Competitor.tools(&config).len(), 1);
        assert_eq!(StageKind::Market.tool_choice(), ToolChoice::Required);
        assert!(StageKind::Financial.tools(&config).is_empty());
        assert_eq!(StageKind::Writer.tool_choice(), ToolChoice::None);
    }

    #[test]
    fn test_request_rejects_empty_prompt() {
        let stage =
            Stage::<MarketResearchOutput>::new(StageKind::Market, StageConfig::default()).unwrap();
        assert!(matches!(
            stage.request("   \n"),
            Err(Error::EmptyPrompt(StageKind::Market))
        ));
    }

    #[test]
    fn test_request_carries_schema_and_instructions() {
        let stage = Stage::<FinancialEstimationResult>::new(
            StageKind::Financial,
            StageConfig::new("gpt-4o").temperature(0.1),
        )
        .unwrap();
        let request = stage.request("context").unwrap();

        assert_eq!(request.agent_name, "financial_estimator_agent");
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.instructions, prompt::FINANCIAL_INSTRUCTIONS);
        assert_eq!(request.output.name, "FinancialEstimationResult");
        assert!(request.output.schema["properties"]["TAM"].is_object());
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_run_coerces_reply() {
        let service = ScriptedService::new([Ok(market_reply())]);
        let stage =
            Stage::<MarketResearchOutput>::new(StageKind::Market, StageConfig::default()).unwrap();

        let output = stage
            .run(&service, "A subscription box for artisanal coffee")
            .await
            .unwrap();
        assert_eq!(output.growth_rate, "7.2% CAGR");
        assert_eq!(service.requests().len(), 1);
        assert_eq!(service.requests()[0].stage, StageKind::Market);
    }

    #[tokio::test]
    async fn test_run_reports_mismatch() {
        let service = ScriptedService::new([Ok("I could not find anything.".to_string())]);
        let stage =
            Stage::<MarketResearchOutput>::new(StageKind::Market, StageConfig::default()).unwrap();

        let err = stage.run(&service, "coffee").await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { stage: StageKind::Market, .. }));
    }

    #[tokio::test]
    async fn test_run_propagates_transport_error_without_retry() {
        let service = ScriptedService::new([
            Err(Error::Transport("HTTP error 429".into())),
            Ok(market_reply()),
        ]);
        let stage =
            Stage::<MarketResearchOutput>::new(StageKind::Market, StageConfig::default()).unwrap();

        let err = stage.run(&service, "coffee").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(service.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_run_emits_events() {
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = seen.clone();
        let service = ScriptedService::new([Ok(market_reply())]);
        let stage =
            Stage::<MarketResearchOutput>::new(StageKind::Market, StageConfig::default())
                .unwrap()
                .with_callbacks(StageCallbacks::default().on_event(move |e| {
                    let name = match e {
                        StageEvent::Started { .. } => "started",
                        StageEvent::Request { .. } => "request",
                        StageEvent::Response { .. } => "response",
                        StageEvent::Validated { .. } => "validated",
                        StageEvent::Error { .. } => "error",
                    };
                    sink.lock().unwrap().push(name.to_string());
                }));

        stage.run(&service, "coffee").await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["started", "request", "response", "validated"]
        );
    }
}
