//! Anthropic Messages API backend.
//!
//! `POST {base_url}/messages` with native tool use: tool schemas go in
//! `tools`, requests come back as `tool_use` blocks, and results are sent
//! as `tool_result` blocks in the next user message. A closing round keeps
//! the tool list but sends `tool_choice: none`.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    ContentBlock, GenerationModel, GenerationRequest, LlmError, ModelTurn, StopReason, ToolChoice,
};
use crate::config::GenerationConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicModel {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicModel {
    /// Build a client from config. The API key is read from the variable
    /// named by `api_key_env`.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            endpoint: format!("{}/messages", config.base_url.trim_end_matches('/')),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        build_payload(&self.model, self.max_tokens, self.temperature, request)
    }
}

pub fn build_payload(
    model: &str,
    max_tokens: u32,
    temperature: f32,
    request: &GenerationRequest,
) -> Value {
    let mut payload = json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "system": request.system,
        "messages": request.messages,
    });
    if !request.tools.is_empty() {
        let choice = match request.tool_choice {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
        };
        payload["tools"] = json!(request.tools);
        payload["tool_choice"] = json!({ "type": choice });
    }
    payload
}

/// Turn a Messages API response body into a [`ModelTurn`].
pub fn parse_response(data: &Value) -> Result<ModelTurn, LlmError> {
    let content = data
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| LlmError::Parse("No content array in response".to_string()))?;

    let content: Vec<ContentBlock> = content
        .iter()
        .map(|block| serde_json::from_value(block.clone()))
        .collect::<Result<_, _>>()
        .map_err(|e| LlmError::Parse(e.to_string()))?;

    let stop_reason = data
        .get("stop_reason")
        .and_then(|s| s.as_str())
        .map(StopReason::parse)
        .unwrap_or(StopReason::Other);

    Ok(ModelTurn {
        content,
        stop_reason,
    })
}

#[async_trait]
impl GenerationModel for AnthropicModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, LlmError> {
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "calling generation model"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(text),
                429 => LlmError::RateLimited,
                _ => LlmError::InvalidRequest(format!("{}: {}", status, text)),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parse_response(&data)
    }
}
