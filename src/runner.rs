//! Command execution seam
//!
//! The run engine never spawns processes directly; it goes through
//! `CommandRunner` so tests can substitute counting or failing runners.

use std::io;
use std::process::{Command, ExitStatus};

/// Executes a stage's prepared command
pub trait CommandRunner {
    /// Run the command to completion and return its exit status
    fn run(&self, command: &mut Command) -> io::Result<ExitStatus>;
}

/// Runner that executes commands on the host, inheriting stdio so stage
/// output streams to the terminal
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &mut Command) -> io::Result<ExitStatus> {
        command.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_runner_reports_exit_status() {
        let ok = SystemRunner
            .run(Command::new("sh").args(["-c", "true"]))
            .unwrap();
        assert!(ok.success());

        let failed = SystemRunner
            .run(Command::new("sh").args(["-c", "exit 3"]))
            .unwrap();
        assert!(!failed.success());
    }
}
