//! Knowledge-base folder statistics for the README "Data Foundation" section.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const SECTION_START: &str = "## 1. Data Foundation";
/// Heading that ends the generated section when present
pub const NEXT_SECTION: &str = "## 2.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderStats {
    pub total_files: usize,
    /// Newest file mtime; the Unix epoch for an empty or missing folder
    pub latest_modified: DateTime<Utc>,
}

impl FolderStats {
    pub fn latest_display(&self) -> String {
        self.latest_modified
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
    }
}

/// Count files under `dir` recursively and find the newest modification time.
pub fn folder_stats(dir: &Path) -> FolderStats {
    let mut total_files = 0;
    let mut latest_modified = DateTime::<Utc>::UNIX_EPOCH;

    if dir.is_dir() {
        let files = WalkBuilder::new(dir)
            .standard_filters(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()));

        for entry in files {
            total_files += 1;
            if let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                latest_modified = latest_modified.max(DateTime::<Utc>::from(modified));
            }
        }
    }

    debug!("{}: {} files", dir.display(), total_files);
    FolderStats {
        total_files,
        latest_modified,
    }
}

/// Id of the commit HEAD points to, or `"unknown"` outside a repository.
pub fn commit_hash(repo_dir: &Path) -> String {
    git2::Repository::discover(repo_dir)
        .and_then(|repo| {
            let commit = repo.head()?.peel_to_commit()?;
            Ok(commit.id().to_string())
        })
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Render the README section for `(folder, stats)` pairs in order.
pub fn build_section(stats: &[(String, FolderStats)], commit_hash: &str) -> String {
    let mut section = format!("{}\n\n## KB Folder Stats\n\n", SECTION_START);
    for (folder, folder_stats) in stats {
        section.push_str(&format!(
            "### /{}\n- Total files: {}\n- Latest modified: {}\n\n",
            folder.trim_start_matches('/'),
            folder_stats.total_files,
            folder_stats.latest_display()
        ));
    }
    section.push_str(&format!(
        "### Repo Commit\n- Commit hash: `{}`\n",
        commit_hash
    ));
    section
}

/// Replace the existing section (up to the next `## 2.` heading or the end),
/// or append it when the README has none.
pub fn splice_section(readme: Option<&str>, section: &str) -> String {
    let Some(content) = readme else {
        return section.to_string();
    };

    match content.find(SECTION_START) {
        Some(start) => {
            let end = content[start..]
                .find(NEXT_SECTION)
                .map(|offset| start + offset)
                .unwrap_or(content.len());
            format!("{}{}{}", &content[..start], section, &content[end..])
        }
        None => format!("{}\n{}", content, section),
    }
}

/// Collect stats for `folders` (relative to `root`) and rewrite `readme`.
pub fn update_readme(root: &Path, folders: &[String], readme: &Path) -> Result<()> {
    let stats: Vec<(String, FolderStats)> = folders
        .iter()
        .map(|folder| (folder.clone(), folder_stats(&root.join(folder))))
        .collect();
    let section = build_section(&stats, &commit_hash(root));

    let existing = match fs::read_to_string(readme) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", readme.display()))
        }
    };

    fs::write(readme, splice_section(existing.as_deref(), &section))
        .with_context(|| format!("Failed to write {}", readme.display()))?;
    info!("{} updated successfully.", readme.display());
    Ok(())
}
