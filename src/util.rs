//! Shared utilities for the kbsmith codebase

use std::fmt;
use std::io::{self, PipeReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

/// A string wrapper that masks its contents in Debug/Display output.
/// Prevents accidental logging of API keys and other secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    #[allow(dead_code)]
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Intentionally access the raw secret value (for headers)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for SecretString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Return at most `max_chars` characters of `text`, never splitting a
/// multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Kill a process by PID. Uses SIGKILL on Unix (Linux, macOS, WSL).
#[cfg(unix)]
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_process(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Failure to obtain a child process's output.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn command: {0}")]
    Spawn(#[source] io::Error),

    #[error("Failed to execute command: {0}")]
    Wait(#[source] io::Error),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

impl CommandError {
    /// True when the program itself could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommandError::Spawn(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Exit status and the interleaved stdout/stderr of a finished child.
#[derive(Debug)]
pub struct CombinedOutput {
    pub status: ExitStatus,
    pub output: Vec<u8>,
}

fn collect_output(mut reader: PipeReader, mut child: Child) -> io::Result<CombinedOutput> {
    let mut output = Vec::new();
    reader.read_to_end(&mut output)?;
    let status = child.wait()?;
    Ok(CombinedOutput { status, output })
}

/// Run a command with stdout and stderr sharing one pipe, so the captured
/// text keeps the order the child wrote it in.
///
/// With a timeout the child is killed on expiry.
pub fn run_cmd_combined(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> Result<CombinedOutput, CommandError> {
    let (reader, writer) = io::pipe().map_err(CommandError::Spawn)?;
    let stderr_writer = writer.try_clone().map_err(CommandError::Spawn)?;
    let child = cmd
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer)
        .spawn()
        .map_err(CommandError::Spawn)?;
    // The command still holds our copies of the write end; the reader only
    // sees EOF once they are closed.
    drop(cmd);

    let Some(timeout) = timeout else {
        return collect_output(reader, child).map_err(CommandError::Wait);
    };

    let pid = child.id();
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = sender.send(collect_output(reader, child));
    });

    match receiver.recv_timeout(timeout) {
        Ok(result) => result.map_err(CommandError::Wait),
        Err(_) => {
            kill_process(pid);
            Err(CommandError::Timeout(timeout))
        }
    }
}
