//! Common enumerations used throughout trustseed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{SetupError, Result};

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl LogLevel {
    /// Derive a level from `-v`/`-q` counts, starting at `Info`.
    pub fn from_verbosity(verbose: u8, quiet: u8) -> Self {
        match i16::from(verbose) - i16::from(quiet) {
            i16::MIN..=-2 => LogLevel::Error,
            -1 => LogLevel::Warn,
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(SetupError::Config(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_directive().to_uppercase())
    }
}

/// What to do when the operating system entropy source is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntropyPolicy {
    /// Refuse to generate anything without OS entropy
    Strict,
    /// Warn and fall back to a clock-seeded pseudo-random generator
    #[default]
    BestEffort,
}

impl FromStr for EntropyPolicy {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(EntropyPolicy::Strict),
            "best-effort" | "best_effort" => Ok(EntropyPolicy::BestEffort),
            _ => Err(SetupError::Config(format!("Invalid entropy policy: {}", s))),
        }
    }
}

impl fmt::Display for EntropyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyPolicy::Strict => write!(f, "strict"),
            EntropyPolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// Certificate backend used for key generation, signing and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Shell out to the `openssl` command-line tool
    #[default]
    Openssl,
    /// In-process generation with rcgen and x509-parser
    Native,
}

impl FromStr for BackendKind {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openssl" => Ok(BackendKind::Openssl),
            "native" => Ok(BackendKind::Native),
            _ => Err(SetupError::Config(format!("Invalid certificate backend: {}", s))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Openssl => write!(f, "openssl"),
            BackendKind::Native => write!(f, "native"),
        }
    }
}

/// Result of running one component task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task created or updated persisted state
    Changed,
    /// Everything the task manages already existed
    Unchanged,
}

impl TaskOutcome {
    /// `Changed` if `changed` is true.
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            TaskOutcome::Changed
        } else {
            TaskOutcome::Unchanged
        }
    }

    /// Combine two outcomes; any change wins.
    pub fn merge(self, other: TaskOutcome) -> Self {
        Self::from_changed(self.is_changed() || other.is_changed())
    }

    /// Whether anything changed.
    pub fn is_changed(&self) -> bool {
        matches!(self, TaskOutcome::Changed)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Changed => write!(f, "changed"),
            TaskOutcome::Unchanged => write!(f, "already set"),
        }
    }
}
