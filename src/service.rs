//! The remote reasoning service boundary.
//!
//! Stages talk to the hosted model through [`ReasoningService`]. The
//! production implementation, [`OpenAiResponses`], posts to an OpenAI
//! Responses-compatible endpoint and asks for structured output matching the
//! stage's JSON Schema. The service itself runs any web search the request
//! permits; this crate never sees the search results directly.

use std::future::Future;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::stage::{SearchContextSize, StageKind};

/// A tool the service may use while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    WebSearch {
        search_context_size: SearchContextSize,
    },
}

/// Whether tool use is mandatory for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Required,
    None,
}

impl ToolChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolChoice::Required => "required",
            ToolChoice::None => "none",
        }
    }
}

/// The structured output a request must conform to.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    pub name: String,
    pub schema: Value,
}

/// One call to the reasoning service.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stage: StageKind,
    pub agent_name: &'static str,
    pub model: String,
    pub instructions: &'static str,
    pub input: String,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub output: OutputFormat,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// A hosted model that answers one request with one text reply.
pub trait ReasoningService: Send + Sync {
    /// Send `request` and return the reply text.
    ///
    /// Failures of the call itself are [`Error::Transport`]; whether the text
    /// matches the requested schema is the caller's concern.
    fn respond(&self, request: StageRequest) -> impl Future<Output = Result<String>> + Send;
}

/// Client for an OpenAI Responses-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiResponses {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl OpenAiResponses {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.api_key.clone(), settings.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    /// Blocking POST; run off the async executor.
    fn post(agent: &ureq::Agent, url: &str, api_key: &str, body: &Value) -> Result<String> {
        let mut response = agent
            .post(url)
            .header("Authorization", &format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .send_json(body)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::Transport(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                api_error_message(&text).unwrap_or(text)
            )));
        }

        let reply: ResponsesReply = response.body_mut().read_json()?;
        reply.into_text()
    }
}

impl ReasoningService for OpenAiResponses {
    fn respond(&self, request: StageRequest) -> impl Future<Output = Result<String>> + Send {
        let agent = self.agent.clone();
        let url = self.endpoint();
        let api_key = self.api_key.clone();
        let body = request_body(&request);
        let stage = request.stage;

        async move {
            tracing::debug!(%stage, %url, "Posting stage request");
            tokio::task::spawn_blocking(move || Self::post(&agent, &url, &api_key, &body))
                .await
                .map_err(|e| Error::Transport(format!("request task failed: {}", e)))?
        }
    }
}

/// Build the Responses API payload for a stage request.
pub fn request_body(request: &StageRequest) -> Value {
    let mut schema = request.output.schema.clone();
    if let Some(map) = schema.as_object_mut() {
        map.remove("$schema");
    }

    let mut body = json!({
        "model": request.model,
        "instructions": request.instructions,
        "input": request.input,
        "metadata": { "agent": request.agent_name },
        "text": {
            "format": {
                "type": "json_schema",
                "name": request.output.name,
                "schema": schema,
                "strict": false
            }
        }
    });

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| match tool {
                Tool::WebSearch {
                    search_context_size,
                } => json!({
                    "type": "web_search_preview",
                    "search_context_size": search_context_size.as_str()
                }),
            })
            .collect();
        body["tools"] = Value::Array(tools);
        body["tool_choice"] = json!(request.tool_choice.as_str());
    }
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    if let Some(n) = request.max_output_tokens {
        body["max_output_tokens"] = json!(n);
    }

    body
}

fn api_error_message(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    OutputText { text: String },
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

impl ResponsesReply {
    /// Concatenate the reply's output text.
    fn into_text(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(Error::Transport(format!("API error: {}", error.message)));
        }

        let mut text = String::new();
        for item in self.output {
            let OutputItem::Message { content } = item else {
                continue;
            };
            for part in content {
                match part {
                    ContentPart::OutputText { text: chunk } => text.push_str(&chunk),
                    ContentPart::Refusal { refusal } => {
                        return Err(Error::Transport(format!("Model refused: {}", refusal)));
                    }
                    ContentPart::Other => {}
                }
            }
        }
        Ok(text)
    }
}
