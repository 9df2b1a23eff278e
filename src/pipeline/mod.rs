//! Generate-and-test pipeline for the sample blueprint package.

pub mod extract;
pub mod generator;
pub mod outcome_log;
pub mod report;
pub mod verifier;
pub mod workspace;

pub use generator::{Generator, GeneratorConfig, Outcome, OutcomeStatus};
