use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "openai-compatible" or "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable that, when set, overrides `model`
    #[serde(default = "default_model_env")]
    pub model_env: Option<String>,
    /// Environment variable holding the API key. Its presence selects
    /// generation mode; without it only the default blueprint is tested.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>, // For OpenAI-compatible APIs
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn get_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(1500)
    }

    /// Model named by the `model_env` variable, if it is set and non-empty.
    pub fn model_from_env(&self) -> Option<String> {
        let env_var = self.model_env.as_deref()?;
        env::var(env_var).ok().filter(|model| !model.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            model_env: default_model_env(),
            api_key_env: default_api_key_env(),
            base_url: None,
            max_tokens: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_model_env() -> Option<String> {
    Some("OPENAI_MODEL".to_string())
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Package directory that receives `Cargo.toml` and `src/lib.rs`
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Human-readable log; one section is appended per test run
    #[serde(default = "default_report")]
    pub report: PathBuf,

    /// Structured outcome log (`{"runs": [...]}`)
    #[serde(default = "default_results")]
    pub results: PathBuf,

    /// Program and arguments used to verify the package
    #[serde(default = "default_verify_command")]
    pub verify_command: Vec<String>,

    /// Kill the verification command after this many seconds (default: wait forever)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            report: default_report(),
            results: default_results(),
            verify_command: default_verify_command(),
            timeout_secs: None,
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from("output").join("trivial_blueprint")
}

fn default_report() -> PathBuf {
    PathBuf::from("README.md")
}

fn default_results() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_verify_command() -> Vec<String> {
    vec!["cargo".to_string(), "scrypto".to_string(), "test".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_clean_dir")]
    pub clean_dir: PathBuf,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            clean_dir: default_clean_dir(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("kb/raw")
}

fn default_clean_dir() -> PathBuf {
    PathBuf::from("kb/clean")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Folders summarised in the README, in display order
    #[serde(default = "default_stats_folders")]
    pub folders: Vec<String>,
    #[serde(default = "default_report")]
    pub readme: PathBuf,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            folders: default_stats_folders(),
            readme: default_report(),
        }
    }
}

fn default_stats_folders() -> Vec<String> {
    vec!["kb/raw".to_string(), "kb/clean".to_string()]
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path));
        }

        // Per-repo config first
        if let Ok(config) = Self::load_from_path("kbsmith.toml") {
            debug!("Loaded config from ./kbsmith.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("kbsmith").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// API key for the generation service, if one is configured and set.
    ///
    /// `None` is a supported mode (default blueprint only), not an error.
    pub fn get_api_key(&self) -> Option<String> {
        let env_var = self.llm.api_key_env.as_deref()?;
        if env_var.eq_ignore_ascii_case("none") {
            // Local OpenAI-compatible servers run without a key
            return Some(String::new());
        }
        env::var(env_var).ok().filter(|key| !key.is_empty())
    }
}
