//! # trustseed Types
//!
//! Core types, enums, and errors shared across all trustseed crates.
//!
//! This crate provides the fundamental building blocks for the trustseed
//! bootstrap tool, including:
//!
//! - The `SetupError` taxonomy and its result alias
//! - Enums for entropy policy, certificate backends, log levels and task outcomes
//! - The resolved `SetupConfig` that every component reads
//!
//! ## Example
//!
//! ```
//! use trustseed_types::{EntropyPolicy, SetupConfig};
//!
//! let config = SetupConfig::default();
//! assert_eq!(config.entropy, EntropyPolicy::BestEffort);
//! assert_eq!(config.common_name_for("mesos"), "mesos.example.com");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod enums;
pub mod config;

// Re-export common types for convenience
pub use errors::{SetupError, Result};
pub use enums::{BackendKind, EntropyPolicy, LogLevel, TaskOutcome};
pub use config::{SetupConfig, SubjectFields, CA_COMMON_NAME};
