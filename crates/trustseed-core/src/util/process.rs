//! Process execution utilities.

use std::path::Path;
use trustseed_types::{Result, SetupError};

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Full command line, for diagnostics
    pub command: String,
    /// Exit status, `None` when terminated by a signal
    pub status: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a failed invocation into a `ToolInvocation` error.
    pub fn check(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(SetupError::ToolInvocation {
                command: self.command,
                status: self.status,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }

    fn from_output(command: String, output: std::process::Output) -> Self {
        Self {
            command,
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Render a command line for display.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push_str(&format!("'{}'", arg));
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Execute a command asynchronously.
pub async fn run_async(program: &str, args: &[String]) -> Result<ProcessOutput> {
    let command = command_line(program, args);
    tracing::debug!("Running: {}", command);

    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| spawn_error(&command, e))?;

    Ok(ProcessOutput::from_output(command, output))
}

/// Execute a command asynchronously from `dir`.
pub async fn run_async_in(dir: &Path, program: &str, args: &[String]) -> Result<ProcessOutput> {
    let command = command_line(program, args);
    tracing::debug!("Running in {}: {}", dir.display(), command);

    let output = tokio::process::Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| spawn_error(&command, e))?;

    Ok(ProcessOutput::from_output(command, output))
}

// A program that cannot be started is reported like a failed invocation.
fn spawn_error(command: &str, error: std::io::Error) -> SetupError {
    SetupError::ToolInvocation {
        command: command.to_string(),
        status: None,
        stdout: String::new(),
        stderr: format!("failed to start: {}", error),
    }
}
