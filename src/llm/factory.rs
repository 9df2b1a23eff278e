use anyhow::{bail, Result};

use super::client::LlmClient;
use super::client::MockLlmClient;
use super::client_impl::{AnthropicClient, OpenAIClient};
use crate::config::Config;

/// Create a client for the configured provider using an explicit key.
pub fn create_client(config: &Config, api_key: String) -> Result<Box<dyn LlmClient>> {
    let max_tokens = config.llm.get_max_tokens();

    match config.llm.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIClient::new(
            api_key,
            config.llm.model.clone(),
            max_tokens,
        )?)),

        "openai-compatible" => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

            Ok(Box::new(OpenAIClient::with_base_url(
                api_key,
                config.llm.model.clone(),
                base_url,
                max_tokens,
            )?))
        }

        "anthropic" => Ok(Box::new(AnthropicClient::new(
            api_key,
            config.llm.model.clone(),
            max_tokens,
        )?)),

        unknown => bail!("Unknown LLM provider: {}", unknown),
    }
}

/// Decide whether generation is available for this run.
///
/// Returns `Ok(None)` when no API key is present (default-blueprint mode),
/// a mock client for `dry_run`, and a real client otherwise.
pub fn resolve_client(config: &Config, dry_run: bool) -> Result<Option<Box<dyn LlmClient>>> {
    if dry_run {
        return Ok(Some(Box::new(MockLlmClient::new())));
    }

    match config.get_api_key() {
        Some(api_key) => create_client(config, api_key).map(Some),
        None => Ok(None),
    }
}
