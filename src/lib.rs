//! kbsmith - utilities for a Scrypto knowledge-base pipeline
//!
//! Cleans raw documents into plain text, drives an LLM to generate a sample
//! Scrypto blueprint that is tested with `cargo scrypto test` (retrying once
//! with the compiler output on failure), and refreshes the README statistics
//! section from folder metadata and the current git commit.

pub mod clean;
pub mod cli;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod stats;
pub mod util;
