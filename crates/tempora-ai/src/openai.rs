//! OpenAI-compatible scheduling backend.
//!
//! Wire contract: POST `{model, messages, functions, function_call,
//! temperature, max_tokens}` to `/chat/completions`; the success path reads
//! `choices[0].message.function_call.arguments` as JSON matching the
//! schedule schema. Any non-2xx status, missing payload, or decode failure
//! is `Error::ExternalService`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use tempora_core::{defaults, Error, Result};

use crate::provider::{OptimizeOutcome, SchedulingBackend};
use crate::request::{
    schedule_function_schema, system_prompt, user_prompt, OptimizeRequest, SCHEDULE_FUNCTION_NAME,
};
use crate::schema::OptimizedSchedule;

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for schedule generation.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Sampling temperature.
    pub temperature: f32,
    /// Max completion tokens.
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            model: defaults::SCHEDULING_MODEL.to_string(),
            timeout_seconds: defaults::OPTIMIZE_TIMEOUT_SECS,
            temperature: defaults::SCHEDULING_TEMPERATURE,
            max_tokens: defaults::SCHEDULING_MAX_TOKENS,
        }
    }
}

/// OpenAI-compatible scheduling backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            subsystem = "ai",
            component = "openai",
            url = %config.base_url,
            model = %config.model,
            "Initializing scheduling backend"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAiConfig::default())
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_API_KEY` | unset |
    /// | `OPENAI_SCHEDULING_MODEL` | `gpt-4o-mini` |
    /// | `OPENAI_TIMEOUT` | `120` |
    pub fn from_env() -> Result<Self> {
        let config = OpenAiConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| defaults::OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("OPENAI_SCHEDULING_MODEL")
                .unwrap_or_else(|_| defaults::SCHEDULING_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::OPTIMIZE_TIMEOUT_SECS),
            ..OpenAiConfig::default()
        };
        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {api_key}"));
        }
        req.header("Content-Type", "application/json")
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct FunctionCallTarget {
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    functions: Vec<JsonValue>,
    function_call: FunctionCallTarget,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[allow(dead_code)]
    #[serde(default)]
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i32,
    #[serde(default)]
    completion_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl SchedulingBackend for OpenAiBackend {
    async fn optimize_schedule(&self, request: &OptimizeRequest) -> Result<OptimizeOutcome> {
        debug!(
            subsystem = "ai",
            component = "openai",
            op = "optimize",
            model = %self.config.model,
            task_count = request.tasks.len(),
            "Requesting schedule optimization"
        );

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            functions: vec![schedule_function_schema()],
            function_call: FunctionCallTarget {
                name: SCHEDULE_FUNCTION_NAME,
            },
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|b| b.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::ExternalService(format!(
                "provider returned {status}: {message}"
            )));
        }

        let reply: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("unreadable provider reply: {e}")))?;

        let (prompt_tokens, completion_tokens) = reply
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));
        let model = reply.model.unwrap_or_else(|| self.config.model.clone());

        let function_call = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.function_call)
            .ok_or_else(|| {
                Error::ExternalService("provider reply carries no function call".to_string())
            })?;

        let schedule = OptimizedSchedule::from_arguments(&function_call.arguments)?;

        debug!(
            subsystem = "ai",
            component = "openai",
            op = "optimize",
            slot_count = schedule.schedule_slots.len(),
            prompt_tokens,
            completion_tokens,
            "Schedule received"
        );

        Ok(OptimizeOutcome {
            schedule,
            prompt_tokens,
            completion_tokens,
            model,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_published_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, defaults::OPENAI_URL);
        assert_eq!(config.model, defaults::SCHEDULING_MODEL);
        assert_eq!(config.timeout_seconds, defaults::OPTIMIZE_TIMEOUT_SECS);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn backend_construction_succeeds() {
        let backend = OpenAiBackend::with_defaults().unwrap();
        assert_eq!(backend.model_name(), defaults::SCHEDULING_MODEL);
    }
}
