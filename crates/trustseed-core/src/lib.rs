//! # trustseed Core
//!
//! Core utilities, configuration management, logging, and common functionality
//! for the trustseed bootstrap tool.
//!
//! This crate provides:
//!
//! - **Configuration**: Layered configuration (defaults, YAML file, flags) with schema validation
//! - **Logging**: Structured logging to the console and an optional log file
//! - **Terminal**: Colored run report lines
//! - **Process Execution**: Captured command execution for external tools
//! - **File Operations**: Atomic writes and permission handling
//! - **Time Utilities**: Duration formatting and openssl ledger timestamps

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod term;
pub mod util;
pub mod time;

// Re-export commonly used items
pub use config::Config;
pub use trustseed_types::{SetupError, Result};

/// trustseed application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// trustseed application name
pub const APP_NAME: &str = "trustseed";
