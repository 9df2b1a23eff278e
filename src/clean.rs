//! Strip markup and code noise from raw knowledge-base documents.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Applied in order; each match is replaced by the paired text.
static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"<[^>]+>", " "),                  // HTML tags
        (r"!\[.*?\]\(.*?\)", " "),          // images
        (r"\[([^\]]+)\]\([^)]+\)", "$1"),   // links keep their text
        (r"```[\s\S]*?```", " "),           // fenced code
        (r"`[^`]+`", " "),                  // inline code
        (r"<!--.*?-->", " "),               // HTML comments
        (r"#.*", " "),                      // headings and hash comments
        (r"//.*", " "),                     // line comments
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid cleaning regex"),
            replacement,
        )
    })
    .collect()
});

/// Reduce a document to plain prose on a single line.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for (re, replacement) in RULES.iter() {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }
    cleaned.trim().to_string()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub cleaned: usize,
    pub skipped: usize,
}

/// Mirror every file under `raw_dir` into `clean_dir` through [`clean_text`].
///
/// Files that cannot be read or written are logged and skipped.
pub fn clean_tree(raw_dir: &Path, clean_dir: &Path) -> Result<CleanSummary> {
    fs::create_dir_all(clean_dir)
        .with_context(|| format!("Failed to create {}", clean_dir.display()))?;

    let mut summary = CleanSummary::default();
    if !raw_dir.is_dir() {
        warn!("Raw directory {} does not exist", raw_dir.display());
        return Ok(summary);
    }

    for entry in WalkBuilder::new(raw_dir).standard_filters(false).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let raw_path = entry.path();
        let rel_path = raw_path.strip_prefix(raw_dir).unwrap_or(raw_path);
        match clean_file(raw_path, &clean_dir.join(rel_path)) {
            Ok(()) => {
                info!("Cleaned: {}", rel_path.display());
                summary.cleaned += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", rel_path.display(), e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn clean_file(raw_path: &Path, clean_path: &Path) -> Result<()> {
    let bytes = fs::read(raw_path).context("read failed")?;
    let cleaned = clean_text(&String::from_utf8_lossy(&bytes));
    if let Some(parent) = clean_path.parent() {
        fs::create_dir_all(parent).context("create dir failed")?;
    }
    fs::write(clean_path, cleaned).context("write failed")?;
    Ok(())
}
