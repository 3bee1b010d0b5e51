//! Runs components in registry order.

use chrono::{Duration, Utc};
use colored::*;
use trustseed_core::term::{component_header, task_line, warning_line};
use trustseed_core::time::pretty_duration;
use trustseed_types::{Result, TaskOutcome};

use crate::context::TaskContext;
use crate::registry::{Component, Task};

/// Outcome of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    /// Owning component
    pub component: Component,
    /// The task
    pub task: Task,
    /// What it did
    pub outcome: TaskOutcome,
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Every task in the order it ran
    pub tasks: Vec<TaskReport>,
    /// Warnings raised by tasks, in the order they were raised
    pub warnings: Vec<String>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of tasks that changed something.
    pub fn changed(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_changed()).count()
    }

    /// Outcome of `task`, if it ran.
    pub fn outcome_of(&self, task: Task) -> Option<TaskOutcome> {
        self.tasks.iter().find(|t| t.task == task).map(|t| t.outcome)
    }
}

/// Sequential task runner.
pub struct Driver {
    components: Vec<Component>,
    progress: bool,
}

impl Driver {
    /// Driver over the full registry, printing progress.
    pub fn new() -> Self {
        Self::with_components(Component::registry().to_vec())
    }

    /// Driver over an explicit component list.
    pub fn with_components(components: Vec<Component>) -> Self {
        Self {
            components,
            progress: true,
        }
    }

    /// Suppress progress output.
    pub fn quiet(mut self) -> Self {
        self.progress = false;
        self
    }

    /// Components in run order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Human-readable listing of components and their tasks.
    pub fn plan(&self) -> String {
        let mut text = String::new();
        for component in &self.components {
            text.push_str(component.name());
            text.push('\n');
            for task in component.tasks() {
                text.push_str(&format!("  - {}\n", task.description()));
            }
        }
        text
    }

    /// Run every task, stopping at the first failure.
    ///
    /// Tasks that completed before a failure have already been persisted.
    pub async fn run(&self, ctx: &mut TaskContext) -> Result<RunReport> {
        let started = Utc::now();
        let mut tasks = Vec::new();
        let mut warnings = Vec::new();

        for component in &self.components {
            if self.progress {
                println!("{}", component_header(component.name()));
            }
            for task in component.tasks() {
                tracing::debug!("Running {}: {}", component, task.description());
                let outcome = task.run(ctx).await.map_err(|e| {
                    tracing::debug!("{} task '{}' failed", component, task.description());
                    e
                })?;
                let raised = ctx.take_warnings();
                if self.progress {
                    println!("{}", task_line(task.description(), outcome));
                    for warning in &raised {
                        println!("{}", warning_line(warning));
                    }
                }
                warnings.extend(raised);
                tasks.push(TaskReport {
                    component: *component,
                    task: *task,
                    outcome,
                });
            }
        }

        let report = RunReport {
            tasks,
            warnings,
            elapsed: Utc::now() - started,
        };
        tracing::info!(
            "{} of {} tasks changed state in {}",
            report.changed(),
            report.tasks.len(),
            pretty_duration(report.elapsed)
        );
        if self.progress {
            println!();
            println!(
                "{} {}",
                "Security setup complete".green().bold(),
                format!("({})", pretty_duration(report.elapsed)).dimmed()
            );
        }
        Ok(report)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_lists_every_task() {
        let plan = Driver::new().plan();
        assert!(plan.starts_with("certificates\n"));
        assert!(plan.contains("  - set a gossip encryption key\n"));
        assert_eq!(plan.lines().filter(|l| l.starts_with("  - ")).count(), 15);
    }
}
