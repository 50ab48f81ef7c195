//! External command execution.
//!
//! The signing and encoding tools run as blocking subprocesses with the
//! working directory pinned to the ephemeral workspace, so they only ever see
//! the fixed file names the pipeline writes there.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{PackagerError, StageFailure};

pub struct CommandRunner;

impl CommandRunner {
    /// Run a command to completion, discarding its stdout.
    pub fn run(program: &str, args: &[&str], cwd: &Path) -> Result<(), StageFailure> {
        Self::execute(program, args, cwd).map(drop)
    }

    /// Run a command to completion and return its raw stdout.
    pub fn check_output(program: &str, args: &[&str], cwd: &Path) -> Result<Vec<u8>, StageFailure> {
        Self::execute(program, args, cwd)
    }

    fn execute(program: &str, args: &[&str], cwd: &Path) -> Result<Vec<u8>, StageFailure> {
        debug!(command = %format!("{program} {}", args.join(" ")), "running external command");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| StageFailure::new(format!("failed to spawn `{program}`: {e}")))?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(StageFailure {
            detail: format!("`{program}` failed: {}", stderr.trim()),
            exit_code: output.status.code(),
        })
    }

    /// Verify all required commands are reachable through PATH.
    pub fn require(programs: &[&str]) -> Result<(), PackagerError> {
        let missing: Vec<&str> = programs
            .iter()
            .copied()
            .filter(|program| which::which(program).is_err())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PackagerError::ToolAvailability(missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_commands() {
        let result = CommandRunner::require(&["sxg-pack-no-such-tool"]);
        match result {
            Err(PackagerError::ToolAvailability(missing)) => {
                assert_eq!(missing, "sxg-pack-no-such-tool");
            }
            other => panic!("expected ToolAvailability, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_command_keeps_exit_code() {
        // `false` is POSIX and exits 1 without output.
        let err = CommandRunner::run("false", &[], Path::new(".")).unwrap_err();
        assert_eq!(err.exit_code, Some(1));
    }

    #[test]
    fn test_check_output_captures_stdout() {
        let out = CommandRunner::check_output("echo", &["hello"], Path::new(".")).unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }
}
