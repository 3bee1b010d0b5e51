//! Terminal utilities for operator-facing output.
//!
//! Progress lines go to standard output regardless of the log level; they are
//! the run report, not diagnostics.

use colored::*;
use std::io::{self, IsTerminal};
use trustseed_types::TaskOutcome;

/// Check if we're running in a controlling terminal.
pub fn in_controlling_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Disable colors when stdout is not a terminal.
pub fn configure_colors() {
    if !in_controlling_terminal() {
        colored::control::set_override(false);
    }
}

/// Heading printed before a component's tasks.
pub fn component_header(name: &str) -> String {
    format!("{} {}", "==>".blue().bold(), name.bold())
}

/// One line describing a finished task.
pub fn task_line(description: &str, outcome: TaskOutcome) -> String {
    let marker = match outcome {
        TaskOutcome::Changed => "changed".green().bold(),
        TaskOutcome::Unchanged => "ok".cyan(),
    };
    format!("    [{}] {}", marker, description)
}

/// A problem the operator should look at; the run continues.
pub fn warning_line(message: &str) -> String {
    format!("    [{}] {}", "warning".yellow().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_line_mentions_description() {
        colored::control::set_override(false);
        assert_eq!(
            task_line("set a gossip encryption key", TaskOutcome::Unchanged),
            "    [ok] set a gossip encryption key"
        );
        assert_eq!(component_header("consul"), "==> consul");
        assert_eq!(
            warning_line("certificate authority is half initialized"),
            "    [warning] certificate authority is half initialized"
        );
    }
}
