//! Configuration defaults and file loading

use anyhow::Result;
use kbsmith::config::Config;
use kbsmith::pipeline::GeneratorConfig;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert!(!config.llm.provider.is_empty());
    assert!(!config.llm.model.is_empty());
    assert_eq!(config.generation.report, PathBuf::from("README.md"));
    assert_eq!(config.generation.results, PathBuf::from("results.json"));
    assert_eq!(config.clean.clean_dir, PathBuf::from("kb/clean"));
    assert_eq!(config.stats.readme, PathBuf::from("README.md"));

    Ok(())
}

#[test]
fn test_empty_file_is_all_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("kbsmith.toml");
    fs::write(&path, "")?;

    let config = Config::load_with_path(Some(path.display().to_string()))?;
    assert_eq!(config.llm.provider, "openai");
    assert_eq!(
        config.generation.verify_command,
        vec!["cargo", "scrypto", "test"]
    );

    Ok(())
}

#[test]
fn test_invalid_toml_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("kbsmith.toml");
    fs::write(&path, "[generation\nworkspace = ")?;

    let err = Config::load_with_path(Some(path.display().to_string())).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load config"));

    Ok(())
}

#[test]
fn test_generator_config_follows_generation_section() -> Result<()> {
    let config: Config = toml::from_str(
        r#"
[generation]
workspace = "build/pkg"
report = "REPORT.md"
results = "out/runs.json"
verify_command = ["scrypto", "test"]
timeout_secs = 90
"#,
    )?;

    let generator = GeneratorConfig::from(&config.generation);
    assert_eq!(generator.workspace, PathBuf::from("build/pkg"));
    assert_eq!(generator.descriptor, PathBuf::from("build/pkg/Cargo.toml"));
    assert_eq!(generator.source, PathBuf::from("build/pkg/src/lib.rs"));
    assert_eq!(generator.report, PathBuf::from("REPORT.md"));
    assert_eq!(generator.results, PathBuf::from("out/runs.json"));
    assert_eq!(generator.verify_command, vec!["scrypto", "test"]);
    assert_eq!(generator.timeout, Some(Duration::from_secs(90)));

    Ok(())
}
