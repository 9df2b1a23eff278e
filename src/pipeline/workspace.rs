use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Manifest written when the package has none. Never rewritten afterwards
/// so local edits survive between runs.
pub const DEFAULT_DESCRIPTOR: &str = r#"[package]
name = "trivial_blueprint"
version = "0.1.0"
edition = "2021"

[dependencies]
scrypto = "1.3.0"
"#;

/// Known-good blueprint used without a model or when a reply has no code.
pub const DEFAULT_BLUEPRINT: &str = r#"use scrypto::prelude::*;

blueprint! {
    struct Trivial {}

    impl Trivial {
        pub fn new() -> ComponentAddress {
            Self {}.instantiate().globalize()
        }

        pub fn hello(&self) -> String {
            "hello from trivial blueprint".to_string()
        }
    }
}
"#;

/// The generated package on disk: a descriptor plus one source file.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    descriptor: PathBuf,
    source: PathBuf,
}

impl Workspace {
    /// Standard layout: `<root>/Cargo.toml` and `<root>/src/lib.rs`.
    #[allow(dead_code)]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let descriptor = root.join("Cargo.toml");
        let source = root.join("src").join("lib.rs");
        Self::with_paths(root, descriptor, source)
    }

    pub fn with_paths(root: PathBuf, descriptor: PathBuf, source: PathBuf) -> Self {
        Self {
            root,
            descriptor,
            source,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[allow(dead_code)]
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// Create the package directories. Safe to call repeatedly.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;
        if let Some(parent) = self.source.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        if let Some(parent) = self.descriptor.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(())
    }

    /// Write [`DEFAULT_DESCRIPTOR`] unless a descriptor already exists.
    /// Returns whether a file was written.
    pub fn ensure_descriptor(&self) -> Result<bool> {
        if self.descriptor.exists() {
            return Ok(false);
        }
        fs::write(&self.descriptor, DEFAULT_DESCRIPTOR)
            .with_context(|| format!("Failed to write {}", self.descriptor.display()))?;
        info!("Wrote default {}", self.descriptor.display());
        Ok(true)
    }

    /// Replace the source file wholesale.
    pub fn write_source(&self, code: &str) -> Result<()> {
        fs::write(&self.source, code)
            .with_context(|| format!("Failed to write {}", self.source.display()))
    }

    pub fn write_default_source(&self) -> Result<()> {
        self.write_source(DEFAULT_BLUEPRINT)?;
        info!("Wrote default {}", self.source.display());
        Ok(())
    }
}
