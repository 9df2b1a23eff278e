use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user message pair and return the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Offline client used by `--dry-run`: always answers with a fenced copy of
/// the built-in blueprint.
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        let preface = if prompt.contains("Compiler output:") {
            "Here is the corrected blueprint:"
        } else {
            "Here is a minimal blueprint:"
        };
        Ok(format!(
            "{}\n\n```rust\n{}```\n",
            preface,
            crate::pipeline::workspace::DEFAULT_BLUEPRINT
        ))
    }
}
