//! Launching external tools (Doorstop, pip).

use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
};

use crate::targets::ActionError;

/// Result of running an external tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the tool exited successfully.
    pub success: bool,

    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,

    /// Captured standard output; empty when the output was streamed.
    pub stdout: String,

    /// Captured standard error; empty when the output was streamed.
    pub stderr: String,
}

impl ToolOutput {
    /// Converts an unsuccessful exit into [`ActionError::ToolFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the tool did not exit successfully.
    pub fn ensure_success(self, program: &str) -> Result<Self, ActionError> {
        if self.success {
            Ok(self)
        } else {
            Err(ActionError::ToolFailed {
                program: program.to_string(),
                status: self.status,
            })
        }
    }
}

/// The seam through which build actions run external programs.
pub trait ToolRunner {
    /// Runs `program` in `dir` with the terminal's standard streams.
    ///
    /// Arguments are passed through unchanged, so paths need not be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Launch`] if the program cannot be started. A
    /// non-zero exit is reported through [`ToolOutput::success`].
    fn run(&self, dir: &Path, program: &str, args: &[OsString])
    -> Result<ToolOutput, ActionError>;

    /// Runs `program` in `dir`, capturing standard output and error.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Launch`] if the program cannot be started.
    fn capture(
        &self,
        dir: &Path,
        program: &str,
        args: &[OsString],
    ) -> Result<ToolOutput, ActionError>;
}

/// Runs tools as child processes of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(dir: &Path, program: &str, args: &[OsString]) -> Command {
        let rendered: Vec<_> = args.iter().map(|arg| arg.to_string_lossy()).collect();
        tracing::info!("+ {program} {}", rendered.join(" "));
        let mut command = Command::new(program);
        command.current_dir(dir).args(args);
        command
    }

    fn launch_error(program: &str, source: std::io::Error) -> ActionError {
        ActionError::Launch {
            program: program.to_string(),
            source,
        }
    }
}

impl ToolRunner for SystemRunner {
    fn run(
        &self,
        dir: &Path,
        program: &str,
        args: &[OsString],
    ) -> Result<ToolOutput, ActionError> {
        let status = Self::command(dir, program, args)
            .status()
            .map_err(|e| Self::launch_error(program, e))?;

        Ok(ToolOutput {
            success: status.success(),
            status: status.to_string(),
            ..ToolOutput::default()
        })
    }

    fn capture(
        &self,
        dir: &Path,
        program: &str,
        args: &[OsString],
    ) -> Result<ToolOutput, ActionError> {
        let Output {
            status,
            stdout,
            stderr,
        } = Self::command(dir, program, args)
            .output()
            .map_err(|e| Self::launch_error(program, e))?;

        Ok(ToolOutput {
            success: status.success(),
            status: status.to_string(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}
