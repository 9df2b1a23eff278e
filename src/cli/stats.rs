use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::stats::update_readme;

pub fn run(config_path: Option<String>, readme_override: Option<PathBuf>) -> Result<()> {
    let config = Config::load_with_path(config_path)?;
    let readme = readme_override.unwrap_or(config.stats.readme);
    update_readme(Path::new("."), &config.stats.folders, &readme)
}
