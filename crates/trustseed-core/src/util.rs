//! Common utility functions.

pub mod data;
pub mod process;
pub mod fs;

// Re-export commonly used items
pub use data::deep_merge;
pub use process::{run_async, run_async_in, ProcessOutput};
pub use fs::{expand_path, set_mode, write_atomic, write_private};
