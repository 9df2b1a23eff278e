use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::factory;
use crate::llm::prompts::DEFAULT_PROMPT;
use crate::pipeline::{Generator, GeneratorConfig, Outcome, OutcomeStatus};

/// Exit status for a run whose tests failed (after the retry, if any).
pub const EXIT_VERIFICATION_FAILED: u8 = 1;
/// Exit status for a run aborted by a generation service error.
pub const EXIT_SERVICE_ERROR: u8 = 2;
/// Exit status for a run aborted because the source or report could not be written.
pub const EXIT_STORAGE_ERROR: u8 = 3;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    prompt: Option<String>,
    config_path: Option<String>,
    model_override: Option<String>,
    provider_override: Option<String>,
    workspace_override: Option<PathBuf>,
    verify_override: Option<Vec<String>>,
    offline: bool,
    dry_run: bool,
) -> Result<ExitCode> {
    let mut config = Config::load_with_path(config_path)?;

    if let Some(ref provider) = provider_override {
        info!("CLI override: provider = {}", provider);
        config.llm.provider = provider.clone();
    }
    resolve_model(&mut config, model_override);
    if let Some(ref workspace) = workspace_override {
        info!("CLI override: workspace = {}", workspace.display());
        config.generation.workspace = workspace.clone();
    }
    if let Some(ref verify) = verify_override {
        info!("CLI override: verify command = {}", verify.join(" "));
        config.generation.verify_command = verify.clone();
    }

    let client = if offline {
        info!("Offline: skipping the generation service");
        None
    } else {
        factory::resolve_client(&config, dry_run)?
    };
    if client.is_none() {
        let key_env = config.llm.api_key_env.as_deref().unwrap_or("API key");
        info!(
            "{} not set; writing default blueprint and running tests on generated package.",
            key_env
        );
    }

    let generator = Generator::new(GeneratorConfig::from(&config.generation), client)?;
    let prompt = prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let outcome = generator.run(&prompt).await?;

    report_outcome(&outcome);
    Ok(exit_code(&outcome))
}

/// `--model` wins over the model environment variable, which wins over the
/// config file.
fn resolve_model(config: &mut Config, model_override: Option<String>) {
    if let Some(model) = model_override {
        info!("CLI override: model = {}", model);
        config.llm.model = model;
    } else if let Some(model) = config.llm.model_from_env() {
        info!("Environment override: model = {}", model);
        config.llm.model = model;
    }
}

fn report_outcome(outcome: &Outcome) {
    match outcome.status {
        OutcomeStatus::Passed => info!("Done. Tests passed (retries: {}).", outcome.retry_count),
        OutcomeStatus::VerificationFailed => warn!(
            "Done. Tests failed (retries: {}). Paste any errors here if it failed.",
            outcome.retry_count
        ),
        OutcomeStatus::ServiceError => warn!("Done. Generation service error: {}", outcome.output),
        OutcomeStatus::StorageError => warn!("Done. Run aborted: {}", outcome.output),
    }
}

pub fn exit_code(outcome: &Outcome) -> ExitCode {
    match outcome.status {
        OutcomeStatus::Passed => ExitCode::SUCCESS,
        OutcomeStatus::VerificationFailed => ExitCode::from(EXIT_VERIFICATION_FAILED),
        OutcomeStatus::ServiceError => ExitCode::from(EXIT_SERVICE_ERROR),
        OutcomeStatus::StorageError => ExitCode::from(EXIT_STORAGE_ERROR),
    }
}
