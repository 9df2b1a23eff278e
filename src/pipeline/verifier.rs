use anyhow::{bail, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

use crate::util::{run_cmd_combined, CombinedOutput, CommandError};

/// Exit code reported when the verification program is not installed.
pub const NOT_FOUND_EXIT_CODE: i32 = 127;
/// Exit code reported when the verification program was killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Result of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub exit_code: i32,
    /// stdout and stderr interleaved as written
    pub output: String,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builds and tests the package in a workspace directory.
///
/// Implementations report every failure, including a missing tool, as a
/// failing [`Verification`] rather than an error.
pub trait Verifier: Send + Sync {
    fn verify(&self, workdir: &Path) -> Verification;

    /// Shown in progress messages and report headings.
    fn command_line(&self) -> String;
}

/// Runs an external command (by default `cargo scrypto test`).
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandVerifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Build from a full argv, e.g. `["cargo", "scrypto", "test"]`.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        match argv.split_first() {
            Some((program, args)) if !program.is_empty() => {
                Ok(Self::new(program.clone(), args.to_vec()))
            }
            _ => bail!("Verification command is empty"),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn execute(&self, workdir: &Path) -> Result<CombinedOutput, CommandError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(workdir);
        run_cmd_combined(cmd, self.timeout)
    }
}

impl Verifier for CommandVerifier {
    fn verify(&self, workdir: &Path) -> Verification {
        info!("Running: {} in {}", self.command_line(), workdir.display());

        match self.execute(workdir) {
            Ok(result) => {
                // Killed by a signal: no exit code
                let exit_code = result.status.code().unwrap_or(-1);
                debug!("{} exited with {}", self.program, exit_code);
                Verification {
                    exit_code,
                    output: String::from_utf8_lossy(&result.output).into_owned(),
                }
            }
            Err(e) if e.is_not_found() => Verification {
                exit_code: NOT_FOUND_EXIT_CODE,
                output: format!("{} not found in PATH", self.program),
            },
            Err(e @ CommandError::Timeout(_)) => Verification {
                exit_code: TIMEOUT_EXIT_CODE,
                output: format!("{}: {}", self.command_line(), e),
            },
            Err(e) => Verification {
                exit_code: -1,
                output: format!("{}: {}", self.command_line(), e),
            },
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
