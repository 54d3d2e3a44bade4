//! Execution of external commands.
//!
//! Running a command never fails at the Rust level: a non-zero exit, a
//! missing binary or an unreadable stream all come back as a [`StageOutput`]
//! with `success == false`. Whether that ends the workflow is decided by the
//! caller, guided by [`CommandSpec::required`].

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tokio::process::Command;

/// A command to run, with the metadata the pipeline needs to judge its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Human readable name of the step, used in logs and failure reports.
    pub description: String,
    pub program: String,
    pub args: Vec<String>,
    /// Whether a failure of this command must stop the surrounding workflow.
    pub required: bool,
    /// Working directory; the current directory when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a required command.
    pub fn new(description: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            program: program.into(),
            args: Vec::new(),
            required: true,
            cwd: None,
        }
    }

    /// Build a command from an argv vector (program first).
    ///
    /// An empty argv yields a command with an empty program, which fails at run time.
    pub fn from_argv(description: impl Into<String>, argv: Vec<String>) -> Self {
        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_default();
        Self::new(description, program).args(argv)
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if the process could not be started or was killed by a signal.
    pub exit_code: Option<i32>,
}

impl StageOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// A failed output with the given stderr and exit code.
    pub fn failed(stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// The most useful error text: stderr, or stdout when the tool reported on stdout.
    pub fn error_text(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Runs commands to completion and captures their output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec) -> impl Future<Output = StageOutput> + Send;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> StageOutput {
        tracing::debug!(description = %command.description, command = %command, "Running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, program = %command.program, "Failed to spawn command");
                return StageOutput::failed(
                    format!("failed to run `{}`: {}", command.program, e),
                    None,
                );
            }
        };

        let result = StageOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        tracing::debug!(
            description = %command.description,
            success = result.success,
            exit_code = ?result.exit_code,
            stdout = %result.stdout.trim(),
            stderr = %result.stderr.trim(),
            "Command finished"
        );

        result
    }
}
