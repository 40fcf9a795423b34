//! External command execution.
//!
//! Every side effect of the pipeline goes through an [`Executor`] so steps can
//! be exercised against a recording fake. [`SystemExecutor`] is the only
//! implementation that spawns processes.
use std::path::Path;
use std::process::{Command, Output, Stdio};

use anyhow::{Context as _, Result};

use crate::error::CommandError;

/// Copy `args`, masking the value that follows any `--*password` flag.
///
/// ```
/// use bench_setup::exec::redact_args;
///
/// assert_eq!(
///     redact_args(&["new-site", "a.test", "--admin-password", "hunter2"]),
///     vec!["new-site", "a.test", "--admin-password", "******"]
/// );
/// ```
#[must_use]
pub fn redact_args(args: &[&str]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push("******".to_string());
            mask_next = false;
            continue;
        }
        if let Some((flag, _)) = arg.split_once('=')
            && flag.starts_with("--")
            && flag.ends_with("password")
        {
            redacted.push(format!("{flag}=******"));
            continue;
        }
        mask_next = arg.starts_with("--") && arg.ends_with("password");
        redacted.push((*arg).to_string());
    }
    redacted
}

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (empty for interactive commands).
    pub stdout: String,
    /// Captured standard error (empty for interactive commands).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful result with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed result with the given exit code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    /// Convert an unsuccessful result into a [`CommandError`].
    ///
    /// # Errors
    ///
    /// Returns the [`CommandError`] describing the invocation when
    /// `self.success` is `false`.
    pub fn check(self, program: &str, args: &[&str]) -> Result<Self, CommandError> {
        if self.success {
            Ok(self)
        } else {
            Err(CommandError {
                program: program.to_string(),
                args: redact_args(args),
                code: self.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution.
///
/// All methods block until the child exits. Checked variants fail with a
/// [`CommandError`] (wrapped in [`anyhow::Error`]) on non-zero exit.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and capture its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command in a specific directory. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command attached to the operator's terminal (stdin, stdout and
    /// stderr inherited). Used for tools that ask their own questions, such
    /// as `mysql_secure_installation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run_interactive(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Execute a command and return the result, failing on non-zero exit.
fn execute_checked(mut cmd: Command, program: &str, args: &[&str]) -> Result<ExecResult> {
    tracing::debug!("exec: {program} {}", redact_args(args).join(" "));
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {program}"))?;
    Ok(ExecResult::from(output).check(program, args)?)
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program, args)
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        execute_checked(cmd, program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        tracing::debug!("check: {program} {}", redact_args(args).join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;

        Ok(ExecResult::from(output))
    }

    fn run_interactive(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        tracing::debug!("exec (interactive): {program} {}", redact_args(args).join(" "));
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        let result = ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: status.success(),
            code: status.code(),
        };
        Ok(result.check(program, args)?)
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
