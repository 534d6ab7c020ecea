//! Async LLM client for instruction routing
//!
//! This is a model-agnostic HTTP client for calling LLM APIs.
//! Supports both Anthropic and OpenAI-compatible APIs (OpenAI, DeepSeek, etc).
//! The model only classifies the instruction and extracts parameters; it never
//! produces the deep link itself.

use crate::core::config::RunnerConfig;
use crate::core::error::{Result, RunnerError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Something that can answer a system + user prompt with text
///
/// The parser is written against this trait so it can be driven by a
/// scripted backend in tests.
pub trait CompletionBackend {
    /// Models to try, in order
    fn models(&self) -> &[String];

    /// Ask one model for a completion
    fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    models: Vec<String>,
    max_tokens: u32,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new LLM client with explicit configuration
    pub fn new(api_key: String, api_url: String, models: Vec<String>) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            models,
            max_tokens: 512,
            api_format,
        }
    }

    /// Create a client from runner configuration
    ///
    /// Fails with a configuration error when no API key is configured, before
    /// any request is attempted.
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunnerError::Llm(e.to_string()))?;

        let mut llm = Self::new(api_key, config.api_url.clone(), config.models.clone());
        llm.client = client;
        llm.max_tokens = config.max_tokens;
        Ok(llm)
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // DeepSeek, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    async fn complete_anthropic(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: model.into(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RunnerError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RunnerError::Llm(format!("API error {}: {}", status, error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| RunnerError::Llm(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| RunnerError::Llm("Empty response".into()))
    }

    async fn complete_openai(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: model.into(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RunnerError::Llm(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RunnerError::Llm(format!("API error {}: {}", status, error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| RunnerError::Llm(e.to_string()))?;

        completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| RunnerError::Llm("Empty response".into()))
    }
}

impl CompletionBackend for LlmClient {
    fn models(&self) -> &[String] {
        &self.models
    }

    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(model, system, user).await,
            ApiFormat::OpenAI => self.complete_openai(model, system, user).await,
        }
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
