use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::extract::extract_source;
use super::outcome_log::{OutcomeLog, RunEntry};
use super::report::Report;
use super::verifier::{CommandVerifier, Verification, Verifier};
use super::workspace::Workspace;
use crate::config::GenerationConfig;
use crate::llm::client::LlmClient;
use crate::llm::prompts;

/// Everything a generate run touches on disk, plus the verification argv.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub workspace: PathBuf,
    pub descriptor: PathBuf,
    pub source: PathBuf,
    pub report: PathBuf,
    pub results: PathBuf,
    pub verify_command: Vec<String>,
    pub timeout: Option<Duration>,
}

impl From<&GenerationConfig> for GeneratorConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            workspace: config.workspace.clone(),
            descriptor: config.workspace.join("Cargo.toml"),
            source: config.workspace.join("src").join("lib.rs"),
            report: config.report.clone(),
            results: config.results.clone(),
            verify_command: config.verify_command.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Passed,
    VerificationFailed,
    /// The generation service call itself failed
    ServiceError,
    /// The source file or report could not be written mid-run
    StorageError,
}

/// Terminal result of one run; exactly one is logged per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: OutcomeStatus,
    /// 0 or 1
    pub retry_count: u32,
    pub output: String,
}

impl Outcome {
    fn verified(verification: Verification, retry_count: u32) -> Self {
        let status = if verification.passed() {
            OutcomeStatus::Passed
        } else {
            OutcomeStatus::VerificationFailed
        };
        Self {
            status,
            retry_count,
            output: verification.output,
        }
    }

    fn aborted(status: OutcomeStatus, error: &anyhow::Error) -> Self {
        Self {
            status,
            retry_count: 0,
            output: format!("{:#}", error),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }
}

#[derive(Debug, Error)]
enum GenerationError {
    #[error("generation service error: {0:#}")]
    Service(anyhow::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Generates a blueprint, tests it, and asks the model for one fix if the
/// test fails.
pub struct Generator {
    client: Option<Box<dyn LlmClient>>,
    verifier: Box<dyn Verifier>,
    workspace: Workspace,
    report: Report,
    log: OutcomeLog,
}

impl Generator {
    /// `client` is `None` when no generation service is available; the run
    /// then tests the built-in blueprint only.
    pub fn new(config: GeneratorConfig, client: Option<Box<dyn LlmClient>>) -> Result<Self> {
        let verifier =
            CommandVerifier::from_argv(&config.verify_command)?.with_timeout(config.timeout);

        Ok(Self {
            client,
            verifier: Box::new(verifier),
            workspace: Workspace::with_paths(config.workspace, config.descriptor, config.source),
            report: Report::new(config.report),
            log: OutcomeLog::new(config.results),
        })
    }

    #[allow(dead_code)]
    pub fn with_verifier(mut self, verifier: Box<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[allow(dead_code)]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run one generate-and-test cycle and record its outcome.
    ///
    /// Service failures, write failures mid-run and failing tests all come
    /// back as a recorded [`Outcome`]. `Err` means the workspace could not
    /// be created or the outcome log could not be written.
    pub async fn run(&self, prompt: &str) -> Result<Outcome> {
        self.workspace.ensure_dirs()?;
        self.workspace.ensure_descriptor()?;

        let result = match self.client.as_deref() {
            None => {
                info!("No generation service configured; testing the default blueprint");
                self.run_default().map_err(GenerationError::Storage)
            }
            Some(client) => self.run_with_model(client, prompt).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(GenerationError::Service(e)) => {
                warn!("Error during generation: {:#}", e);
                Outcome::aborted(OutcomeStatus::ServiceError, &e)
            }
            Err(GenerationError::Storage(e)) => {
                warn!("Run aborted: {:#}", e);
                Outcome::aborted(OutcomeStatus::StorageError, &e)
            }
        };

        self.log.append(RunEntry::new(
            self.workspace.root(),
            outcome.passed(),
            outcome.retry_count,
            &outcome.output,
        ))?;

        Ok(outcome)
    }

    fn run_default(&self) -> Result<Outcome> {
        self.workspace.write_default_source()?;
        let verification = self.verify_and_report("initial run")?;
        Ok(Outcome::verified(verification, 0))
    }

    async fn run_with_model(
        &self,
        client: &dyn LlmClient,
        prompt: &str,
    ) -> Result<Outcome, GenerationError> {
        info!("Calling model to generate blueprint...");
        let reply = client
            .complete(prompts::SYSTEM_PROMPT, prompt)
            .await
            .map_err(GenerationError::Service)?;

        match extract_source(&reply) {
            Some(code) => {
                self.workspace.write_source(&code)?;
                info!(
                    "Wrote model-generated code to {}",
                    self.workspace.source_path().display()
                );
            }
            None => {
                warn!("Failed to extract code from model response. Writing fallback blueprint.");
                self.workspace.write_default_source()?;
            }
        }

        let first = self.verify_and_report("attempt 1")?;
        if first.passed() {
            info!("Tests passed on attempt 1.");
            return Ok(Outcome::verified(first, 0));
        }

        warn!(
            "Tests failed on attempt 1 (exit code {}). Asking the model for one fix.",
            first.exit_code
        );
        let reply = client
            .complete(
                prompts::SYSTEM_PROMPT,
                &prompts::repair_prompt(prompt, &first.output),
            )
            .await
            .map_err(GenerationError::Service)?;

        let Some(code) = extract_source(&reply) else {
            warn!("Model did not return code on retry. Aborting.");
            return Ok(Outcome {
                status: OutcomeStatus::VerificationFailed,
                retry_count: 1,
                output: format!("{}\n\nModel retry produced no code.", first.output),
            });
        };

        self.workspace.write_source(&code)?;
        info!(
            "Wrote retry code to {}",
            self.workspace.source_path().display()
        );

        let second = self.verify_and_report("attempt 2")?;
        if second.passed() {
            info!("Tests passed on retry.");
        } else {
            warn!(
                "Retry failed. See {} and {} for details.",
                self.report.path().display(),
                self.log.path().display()
            );
        }
        Ok(Outcome::verified(second, 1))
    }

    fn verify_and_report(&self, label: &str) -> Result<Verification> {
        // The descriptor may have been removed since the run started
        self.workspace.ensure_descriptor()?;

        let verification = self.verifier.verify(self.workspace.root());
        self.report.append_section(
            &format!("2 — {} output ({})", self.verifier.command_line(), label),
            &verification.output,
        )?;
        Ok(verification)
    }
}
