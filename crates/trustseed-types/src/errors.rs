//! Error types for trustseed operations.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for trustseed operations.
///
/// Every variant is fatal to a run: the driver stops at the first error and
/// relies on idempotent tasks plus operator re-invocation instead of retries.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The persisted secret document exists but cannot be parsed
    #[error("Secret file {path} is malformed: {message}\n\nFix or remove the file and run again.")]
    MalformedState {
        /// Location of the secret document
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// The secret document could not be written
    #[error("Could not write secret file {path}: {source}\n\nUnsaved content follows so nothing is lost:\n{content}")]
    Persistence {
        /// Location of the secret document
        path: PathBuf,
        /// Full in-memory document that failed to persist
        content: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// An external cryptographic tool exited unsuccessfully
    #[error("Command failed with status {}: {command}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}", fmt_status(.status))]
    ToolInvocation {
        /// Full command line
        command: String,
        /// Exit status, if the process exited normally
        status: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// An issued certificate does not verify against the CA
    #[error("Certificate {certificate} failed verification against the CA:\n{diagnostic}")]
    Verification {
        /// Certificate that failed
        certificate: PathBuf,
        /// Raw verifier output
        diagnostic: String,
    },

    /// Strict entropy policy and no operating system entropy
    #[error("Entropy error: {0}")]
    Entropy(String),

    /// In-process certificate generation or parsing failed
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal bug - should never happen in production
    #[error("Bug detected: {0}\n\nThis is an internal error. Please report it.")]
    Bug(String),
}

impl SetupError {
    /// Process exit status for this error.
    ///
    /// Tool failures propagate the tool's own status when it is a usable
    /// exit code; everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SetupError::ToolInvocation { status: Some(code), .. } if (1..=255).contains(code) => *code,
            _ => 1,
        }
    }
}

fn fmt_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

/// A specialized Result type for trustseed operations.
pub type Result<T> = std::result::Result<T, SetupError>;

/// Helper macro to bail out with a message-carrying SetupError variant
///
/// ```ignore
/// if !valid {
///     bail!(Config, "Invalid subject field: {}", reason);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::SetupError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::SetupError::$variant(format!($fmt, $($arg)*)))
    };
}
