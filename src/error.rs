//! Typed errors raised inside the wizard.
//!
//! Modules return these wrapped in [`anyhow::Error`]. At the step boundary
//! [`FailureKind::classify`] looks through the context chain to decide
//! whether a failure sends the operator back to the menu or halts the run:
//!
//! ```text
//! ConfigError      config file, profile and step names
//! ValidationError  operator input; back to the menu
//! CommandError     external command exited non-zero; halt
//! PlatformError    superuser and identity lookup
//! PromptError      terminal I/O, unanswered scripted prompts
//! ```

use std::fmt;

use thiserror::Error;

/// Errors that arise from configuration loading and profile resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested profile is not defined.
    #[error("unknown profile '{name}' (available: {available})")]
    UnknownProfile {
        /// Requested profile name.
        name: String,
        /// Comma-separated list of defined profiles.
        available: String,
    },

    /// A menu entry references a step id that does not exist.
    #[error("unknown step '{0}'")]
    UnknownStep(String),

    /// The TOML file contains a syntax or type error.
    #[error("invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// File that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Operator input that cannot be acted upon.
///
/// Non-fatal: the step is abandoned and the operator is returned to the menu.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value was left empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A bench or site name that is not a single directory entry.
    #[error("{what} '{name}' must be a single directory name")]
    InvalidName {
        /// What the name is for.
        what: &'static str,
        /// The rejected name.
        name: String,
    },

    /// The referenced bench directory does not exist.
    #[error("bench '{0}' does not exist; initialise it first")]
    MissingBench(String),

    /// The referenced site does not exist in the bench.
    #[error("site '{site}' does not exist in bench '{bench}'")]
    MissingSite {
        /// Bench directory name.
        bench: String,
        /// Site name.
        site: String,
    },
}

/// An external command exited unsuccessfully.
///
/// Carries the full invocation and captured output so the failure can be
/// logged distinctly from other error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// Program that was executed.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        match self.code {
            Some(code) => write!(f, " failed (exit {code})")?,
            None => write!(f, " terminated by signal")?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

/// Errors that arise from the operator's platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The program was started with an effective UID of 0.
    #[error("do not run as root; run as the user that will own the bench (sudo is used where needed)")]
    Superuser,

    /// The current user could not be resolved.
    #[error("cannot resolve user for uid {0}")]
    UnknownUser(u32),

    /// A required environment variable is unset.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Errors from collecting operator input.
#[derive(Error, Debug)]
pub enum PromptError {
    /// Terminal interaction failed.
    #[error("terminal prompt failed: {0}")]
    Terminal(String),

    /// A scripted run had no answer and no default for a prompt.
    #[error("no answer for prompt '{0}'")]
    Unanswered(String),
}

/// How a step failure affects the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad operator input; return to the menu.
    Validation,
    /// External command failure; halt the process.
    Command,
    /// Anything else; halt the process.
    Other,
}

impl FailureKind {
    /// Classify an error produced by a step.
    #[must_use]
    pub fn classify(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<ValidationError>().is_some() {
            Self::Validation
        } else if err.downcast_ref::<CommandError>().is_some() {
            Self::Command
        } else {
            Self::Other
        }
    }

    /// Whether the failure terminates the pipeline.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Validation)
    }
}
