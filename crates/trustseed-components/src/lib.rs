//! # trustseed Components
//!
//! The services trustseed prepares, each as an ordered list of idempotent
//! tasks, and the driver that runs them.
//!
//! Components run in the order of [`Component::registry`]. Every task is a
//! load/mutate/commit transaction over the secret document, so an
//! interrupted run can simply be repeated.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod registry;
pub mod driver;

pub mod certificates;
pub mod nginx;
pub mod consul;
pub mod marathon;
pub mod zookeeper;
pub mod mesos;

pub use context::TaskContext;
pub use registry::{Component, Task};
pub use driver::{Driver, RunReport, TaskReport};
