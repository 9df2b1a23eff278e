use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::LlmClient;
use crate::util::SecretString;

// ============================================================================
// OpenAI Client
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self> {
        Self::with_base_url(
            api_key,
            model,
            "https://api.openai.com/v1".to_string(),
            max_tokens,
        )
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            client: Client::builder()
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    fn build_request(&self, system: &str, prompt: &str) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(system, prompt);

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, self.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request);

        // Local servers run without a key
        if !self.api_key.expose().is_empty() {
            req = req.header("authorization", format!("Bearer {}", self.api_key.expose()));
        }

        let response = req
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, error_text);
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .context("No choices in OpenAI response")
    }
}

// ============================================================================
// Anthropic Client
// ============================================================================

pub struct AnthropicClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self> {
        Self::with_base_url(
            api_key,
            model,
            "https://api.anthropic.com/v1".to_string(),
            max_tokens,
        )
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            client: Client::builder()
                .build()
                .context("failed to build HTTP client")?,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: 0.0,
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("Calling Anthropic API with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {}: {}", status, error_text);
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .context("No content in Anthropic response")
    }
}

// ============================================================================
// Tests
// ============================================================================
