//! Structured, append-only record of generate runs (`results.json`).

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::util::truncate_chars;

/// Maximum characters of captured output stored per entry.
pub const MAX_OUTPUT_CHARS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    /// ISO-8601 UTC, e.g. `2026-10-18T09:14:03.120Z`
    pub timestamp: String,
    #[serde(rename = "package")]
    pub workspace: String,
    pub passed: bool,
    pub retry_count: u32,
    #[serde(rename = "last_stdout")]
    pub output: String,
}

impl RunEntry {
    /// Stamp a new entry with the current time, truncating `output`.
    pub fn new(workspace: &Path, passed: bool, retry_count: u32, output: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            workspace: workspace.display().to_string(),
            passed,
            retry_count,
            output: truncate_chars(output, MAX_OUTPUT_CHARS).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeDocument {
    #[serde(default)]
    pub runs: Vec<RunEntry>,
}

pub struct OutcomeLog {
    path: PathBuf,
}

impl OutcomeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. Missing or unparseable files load as empty.
    pub fn load(&self) -> OutcomeDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return OutcomeDocument::default(),
        };
        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Ignoring unreadable outcome log {}: {}",
                    self.path.display(),
                    e
                );
                OutcomeDocument::default()
            }
        }
    }

    /// Append one entry and rewrite the document.
    ///
    /// The new document is written to a sibling temp file and renamed into
    /// place, so a crash never leaves a half-written log.
    pub fn append(&self, entry: RunEntry) -> Result<()> {
        let mut doc = self.load();
        doc.runs.push(entry);

        let json = serde_json::to_string_pretty(&doc).context("Failed to serialize outcome log")?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp outcome log")?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write temp outcome log")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!("Wrote results to {}", self.path.display());
        Ok(())
    }
}
