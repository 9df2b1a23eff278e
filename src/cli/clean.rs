use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::clean::clean_tree;
use crate::config::Config;

pub fn run(
    config_path: Option<String>,
    raw_override: Option<PathBuf>,
    out_override: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load_with_path(config_path)?;
    let raw_dir = raw_override.unwrap_or(config.clean.raw_dir);
    let clean_dir = out_override.unwrap_or(config.clean.clean_dir);

    info!(
        "Cleaning {} -> {}",
        raw_dir.display(),
        clean_dir.display()
    );
    let summary = clean_tree(&raw_dir, &clean_dir)?;
    info!(
        "Cleaned {} file(s), skipped {}",
        summary.cleaned, summary.skipped
    );
    Ok(())
}
