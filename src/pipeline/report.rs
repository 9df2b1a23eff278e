use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only human-readable log of verifier output.
pub struct Report {
    path: PathBuf,
}

impl Report {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped section with `content` in a fenced block.
    pub fn append_section(&self, heading: &str, content: &str) -> Result<()> {
        let section = format_section(
            heading,
            &Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            content,
        );

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?
            .write_all(section.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        info!("Appended test log to {}", self.path.display());
        Ok(())
    }
}

fn format_section(heading: &str, timestamp: &str, content: &str) -> String {
    format!(
        "\n## {}\n\nTimestamp: {}\n\n```\n{}\n```\n",
        heading, timestamp, content
    )
}
