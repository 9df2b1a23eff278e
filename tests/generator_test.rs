// End-to-end generate runs against scripted model replies and test results
use anyhow::Result;
use kbsmith::llm::client::LlmClient;
use kbsmith::pipeline::outcome_log::OutcomeLog;
use kbsmith::pipeline::verifier::{Verification, Verifier};
use kbsmith::pipeline::workspace::{DEFAULT_BLUEPRINT, DEFAULT_DESCRIPTOR};
use kbsmith::pipeline::{Generator, GeneratorConfig, OutcomeStatus};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const GOOD_CODE: &str = "use scrypto::prelude::*;\n\n#[blueprint]\nmod good {\n    struct Good {}\n}";
const FIXED_CODE: &str = "use scrypto::prelude::*;\n\n#[blueprint]\nmod fixed {\n    struct Fixed {}\n}";

fn fenced(code: &str) -> String {
    format!("Sure, here you go:\n\n```rust\n{}\n```\n", code)
}

/// Returns queued exit codes in order, failing once the queue is empty.
/// Records the source file contents seen by each call.
#[derive(Clone, Default)]
struct ScriptedVerifier {
    exit_codes: Arc<Mutex<Vec<i32>>>,
    seen_sources: Arc<Mutex<Vec<String>>>,
}

impl ScriptedVerifier {
    fn new(exit_codes: &[i32]) -> Self {
        Self {
            exit_codes: Arc::new(Mutex::new(exit_codes.iter().rev().copied().collect())),
            seen_sources: Arc::default(),
        }
    }

    fn calls(&self) -> usize {
        self.seen_sources.lock().unwrap().len()
    }

    fn seen_sources(&self) -> Vec<String> {
        self.seen_sources.lock().unwrap().clone()
    }
}

impl Verifier for ScriptedVerifier {
    fn verify(&self, workdir: &Path) -> Verification {
        let source = fs::read_to_string(workdir.join("src/lib.rs")).unwrap_or_default();
        self.seen_sources.lock().unwrap().push(source);
        let exit_code = self.exit_codes.lock().unwrap().pop().unwrap_or(1);
        Verification {
            exit_code,
            output: format!("test result: exit {}", exit_code),
        }
    }

    fn command_line(&self) -> String {
        "cargo scrypto test".to_string()
    }
}

/// Replays replies in order and records every prompt. Clones share state,
/// so a test can keep one handle while the generator owns another.
/// A reply of `Err` simulates a failed service call.
#[derive(Clone, Default)]
struct ScriptedLlmClient {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLlmClient {
    fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            prompts: Arc::default(),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => anyhow::bail!(message),
            None => anyhow::bail!("scripted client has no replies left"),
        }
    }
}

struct Fixture {
    _dir: TempDir,
    config: GeneratorConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path().join("output").join("trivial_blueprint");
        let config = GeneratorConfig {
            descriptor: workspace.join("Cargo.toml"),
            source: workspace.join("src").join("lib.rs"),
            workspace,
            report: dir.path().join("README.md"),
            results: dir.path().join("results.json"),
            ..GeneratorConfig::default()
        };
        Self { _dir: dir, config }
    }

    fn generator(
        &self,
        client: Option<Box<dyn LlmClient>>,
        verifier: &ScriptedVerifier,
    ) -> Generator {
        Generator::new(self.config.clone(), client)
            .unwrap()
            .with_verifier(Box::new(verifier.clone()))
    }

    fn source(&self) -> String {
        fs::read_to_string(&self.config.source).unwrap()
    }

    fn report_sections(&self) -> usize {
        fs::read_to_string(&self.config.report)
            .map(|r| r.matches("Timestamp: ").count())
            .unwrap_or(0)
    }

    fn log(&self) -> OutcomeLog {
        OutcomeLog::new(self.config.results.clone())
    }

    fn results_path(&self) -> PathBuf {
        self.config.results.clone()
    }
}

#[tokio::test]
async fn test_unavailable_service_tests_default_blueprint() -> Result<()> {
    let fx = Fixture::new();
    let verifier = ScriptedVerifier::new(&[0]);

    let outcome = fx.generator(None, &verifier).run("ignored prompt").await?;

    assert_eq!(outcome.status, OutcomeStatus::Passed);
    assert_eq!(outcome.retry_count, 0);
    assert_eq!(fx.source(), DEFAULT_BLUEPRINT);
    assert_eq!(
        fs::read_to_string(&fx.config.descriptor)?,
        DEFAULT_DESCRIPTOR
    );
    assert_eq!(verifier.calls(), 1);
    assert_eq!(fx.report_sections(), 1);

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(runs[0].passed);
    assert_eq!(runs[0].retry_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_service_records_failing_default() -> Result<()> {
    let fx = Fixture::new();
    let verifier = ScriptedVerifier::new(&[101]);

    let outcome = fx.generator(None, &verifier).run("p").await?;

    assert_eq!(outcome.status, OutcomeStatus::VerificationFailed);
    assert_eq!(verifier.calls(), 1);
    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].passed);
    assert_eq!(runs[0].retry_count, 0);
    assert_eq!(runs[0].output, "test result: exit 101");
    Ok(())
}

#[tokio::test]
async fn test_first_attempt_passes() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([Ok(fenced(GOOD_CODE))]);
    let verifier = ScriptedVerifier::new(&[0]);

    let outcome = fx
        .generator(Some(Box::new(client.clone())), &verifier)
        .run("make a blueprint")
        .await?;

    assert!(outcome.passed());
    assert_eq!(outcome.retry_count, 0);
    assert_eq!(fx.source(), GOOD_CODE);
    assert_eq!(fx.report_sections(), 1);
    assert_eq!(client.prompts(), vec!["make a blueprint".to_string()]);

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(runs[0].passed);
    assert_eq!(runs[0].retry_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_retry_fixes_failing_attempt() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([
        Ok(fenced(GOOD_CODE)),
        Ok(fenced(FIXED_CODE)),
    ]);
    let verifier = ScriptedVerifier::new(&[1, 0]);

    let outcome = fx
        .generator(Some(Box::new(client.clone())), &verifier)
        .run("make a blueprint")
        .await?;

    assert!(outcome.passed());
    assert_eq!(outcome.retry_count, 1);
    assert_eq!(fx.source(), FIXED_CODE);
    assert_eq!(verifier.seen_sources(), vec![GOOD_CODE, FIXED_CODE]);
    assert_eq!(fx.report_sections(), 2);

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].starts_with("make a blueprint"));
    assert!(prompts[1].contains("test result: exit 1"));
    assert!(prompts[1].contains("```rust"));

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(runs[0].passed);
    assert_eq!(runs[0].retry_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_retry_without_code_keeps_first_artifact() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([
        Ok(fenced(GOOD_CODE)),
        Ok("I'm not sure how to fix that.".to_string()),
    ]);
    let verifier = ScriptedVerifier::new(&[1]);

    let outcome = fx
        .generator(Some(Box::new(client)), &verifier)
        .run("p")
        .await?;

    assert_eq!(outcome.status, OutcomeStatus::VerificationFailed);
    assert_eq!(outcome.retry_count, 1);
    assert_eq!(fx.source(), GOOD_CODE);
    assert_eq!(verifier.calls(), 1);
    assert_eq!(fx.report_sections(), 1);

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].passed);
    assert_eq!(runs[0].retry_count, 1);
    assert_eq!(
        runs[0].output,
        "test result: exit 1\n\nModel retry produced no code."
    );
    Ok(())
}

#[tokio::test]
async fn test_retry_is_attempted_only_once() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([
        Ok(fenced(GOOD_CODE)),
        Ok(fenced(FIXED_CODE)),
        Ok(fenced(GOOD_CODE)),
    ]);
    let verifier = ScriptedVerifier::new(&[1, 1, 1]);

    let outcome = fx
        .generator(Some(Box::new(client.clone())), &verifier)
        .run("p")
        .await?;

    assert_eq!(outcome.status, OutcomeStatus::VerificationFailed);
    assert_eq!(outcome.retry_count, 1);
    assert_eq!(client.prompts().len(), 2);
    assert_eq!(verifier.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unextractable_reply_falls_back_to_default() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([Ok("Blueprints are great!".to_string())]);
    let verifier = ScriptedVerifier::new(&[0]);

    let outcome = fx
        .generator(Some(Box::new(client)), &verifier)
        .run("p")
        .await?;

    assert!(outcome.passed());
    assert_eq!(verifier.seen_sources(), vec![DEFAULT_BLUEPRINT]);
    Ok(())
}

#[tokio::test]
async fn test_service_error_is_recorded_not_raised() -> Result<()> {
    let fx = Fixture::new();
    let client = ScriptedLlmClient::new([Err("401 Unauthorized".to_string())]);
    let verifier = ScriptedVerifier::new(&[]);

    let outcome = fx
        .generator(Some(Box::new(client)), &verifier)
        .run("p")
        .await?;

    assert_eq!(outcome.status, OutcomeStatus::ServiceError);
    assert_eq!(outcome.retry_count, 0);
    assert_eq!(verifier.calls(), 0);

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].passed);
    assert!(runs[0].output.contains("401 Unauthorized"));
    Ok(())
}

#[tokio::test]
async fn test_log_grows_by_one_entry_per_run() -> Result<()> {
    let fx = Fixture::new();
    let verifier = ScriptedVerifier::new(&[0, 1, 0, 1]);
    let generator = fx.generator(None, &verifier);

    for n in 1..=4 {
        generator.run("p").await?;
        let raw = fs::read_to_string(fx.results_path())?;
        let doc: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(doc["runs"].as_array().map(Vec::len), Some(n));
    }

    let passed: Vec<bool> = fx.log().load().runs.iter().map(|r| r.passed).collect();
    assert_eq!(passed, vec![true, false, true, false]);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_log_is_replaced() -> Result<()> {
    let fx = Fixture::new();
    fs::write(fx.results_path(), "{ this is not json")?;
    let verifier = ScriptedVerifier::new(&[0]);

    fx.generator(None, &verifier).run("p").await?;

    assert_eq!(fx.log().load().runs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_existing_descriptor_is_preserved() -> Result<()> {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.config.workspace)?;
    let custom = "[package]\nname = \"my_blueprint\"\nversion = \"0.2.0\"\n";
    fs::write(&fx.config.descriptor, custom)?;
    let verifier = ScriptedVerifier::new(&[0]);

    fx.generator(None, &verifier).run("p").await?;

    assert_eq!(fs::read_to_string(&fx.config.descriptor)?, custom);
    Ok(())
}

#[tokio::test]
async fn test_results_use_stable_field_names() -> Result<()> {
    let fx = Fixture::new();
    let verifier = ScriptedVerifier::new(&[0]);

    fx.generator(None, &verifier).run("p").await?;

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(fx.results_path())?)?;
    let entry = &doc["runs"][0];
    for key in ["timestamp", "package", "passed", "retry_count", "last_stdout"] {
        assert!(entry.get(key).is_some(), "missing field {}", key);
    }
    assert!(entry["timestamp"].as_str().unwrap().ends_with('Z'));
    Ok(())
}

#[tokio::test]
async fn test_missing_test_tool_is_a_failed_run() -> Result<()> {
    let fx = Fixture::new();
    let mut config = fx.config.clone();
    config.verify_command = vec!["kbsmith-no-such-tool".to_string(), "test".to_string()];

    let outcome = Generator::new(config, None)?.run("p").await?;

    assert_eq!(outcome.status, OutcomeStatus::VerificationFailed);
    assert_eq!(outcome.output, "kbsmith-no-such-tool not found in PATH");
    Ok(())
}

#[tokio::test]
async fn test_unwritable_report_is_recorded_as_failed_run() -> Result<()> {
    let mut fx = Fixture::new();
    fx.config.report = fx.config.workspace.with_file_name("README.md");
    fs::create_dir_all(&fx.config.report)?;
    let client = ScriptedLlmClient::new([Ok(fenced(GOOD_CODE))]);
    let verifier = ScriptedVerifier::new(&[0]);

    let outcome = fx
        .generator(Some(Box::new(client)), &verifier)
        .run("p")
        .await?;

    assert_eq!(outcome.status, OutcomeStatus::StorageError);
    assert_eq!(outcome.retry_count, 0);
    assert!(outcome.output.contains("README.md"));

    let runs = fx.log().load().runs;
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].passed);
    assert_eq!(runs[0].retry_count, 0);
    Ok(())
}
