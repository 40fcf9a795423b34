//! Bench CLI installation and bench directory resources.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState, is_plain_name};
use crate::error::ValidationError;
use crate::exec::Executor;

/// Location of the `bench` program.
///
/// With a pre-activated virtual environment `bench` is taken from `PATH`;
/// otherwise it lives in `<root>/env/bin`.
#[must_use]
pub fn bench_program(root: &Path, virtualenv: Option<&Path>) -> PathBuf {
    if virtualenv.is_some() {
        PathBuf::from("bench")
    } else {
        root.join("env").join("bin").join("bench")
    }
}

/// The `bench` command-line tool, installed with pip into a virtual
/// environment.
#[derive(Debug)]
pub struct BenchCli<'a> {
    /// Root directory holding `env/`.
    pub root: PathBuf,
    /// Pre-activated virtual environment, if any.
    pub virtualenv: Option<PathBuf>,
    /// Python interpreter used to create the environment.
    pub python: String,
    /// pip requirement to install.
    pub pip_package: String,
    executor: &'a dyn Executor,
}

impl<'a> BenchCli<'a> {
    /// Create a new bench CLI resource.
    #[must_use]
    pub fn new(
        root: &Path,
        virtualenv: Option<PathBuf>,
        python: impl Into<String>,
        pip_package: impl Into<String>,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            virtualenv,
            python: python.into(),
            pip_package: pip_package.into(),
            executor,
        }
    }

    /// The virtual environment `bench` is installed into.
    #[must_use]
    pub fn env_dir(&self) -> PathBuf {
        self.virtualenv
            .clone()
            .unwrap_or_else(|| self.root.join("env"))
    }
}

impl Applicable for BenchCli<'_> {
    fn description(&self) -> String {
        format!("{} in {}", self.pip_package, self.env_dir().display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let env = self.env_dir();
        if !env.join("bin").join("pip").exists() {
            let env_arg = env.to_string_lossy();
            self.executor
                .run_in(&self.root, &self.python, &["-m", "venv", &env_arg])?;
        }
        let pip = env.join("bin").join("pip");
        self.executor.run_in(
            &self.root,
            &pip.to_string_lossy(),
            &["install", &self.pip_package],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for BenchCli<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if self.virtualenv.is_some() {
            return Ok(if self.executor.which("bench") {
                ResourceState::Correct
            } else {
                ResourceState::Incorrect {
                    current: "virtual environment active, bench not installed".to_string(),
                }
            });
        }
        let env = self.env_dir();
        if env.join("bin").join("bench").exists() {
            Ok(ResourceState::Correct)
        } else if env.exists() {
            Ok(ResourceState::Incorrect {
                current: "virtual environment without bench".to_string(),
            })
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

/// A bench directory created by `bench init`.
#[derive(Debug)]
pub struct BenchResource<'a> {
    /// Directory the bench is created in.
    pub root: PathBuf,
    /// Bench directory name.
    pub name: String,
    /// Framework branch passed to `--frappe-branch`.
    pub branch: String,
    /// Path of the `bench` program.
    pub program: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> BenchResource<'a> {
    /// Create a new bench resource.
    #[must_use]
    pub fn new(
        root: &Path,
        name: impl Into<String>,
        branch: impl Into<String>,
        program: PathBuf,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            name: name.into(),
            branch: branch.into(),
            program,
            executor,
        }
    }

    /// Full path of the bench directory.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Delete the bench directory so it can be initialised again.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the name is not a single directory
    /// entry of the root, or an I/O error if the directory cannot be removed.
    pub fn remove(&self) -> Result<()> {
        if !is_plain_name(&self.name) {
            return Err(ValidationError::InvalidName {
                what: "bench name",
                name: self.name.clone(),
            }
            .into());
        }
        let path = self.path();
        std::fs::remove_dir_all(&path).with_context(|| format!("remove {}", path.display()))
    }
}

/// Whether `path` looks like an initialised bench.
#[must_use]
pub fn is_bench(path: &Path) -> bool {
    path.join("apps").join("frappe").is_dir() && path.join("sites").is_dir()
}

impl Applicable for BenchResource<'_> {
    fn description(&self) -> String {
        format!("bench {} ({})", self.path().display(), self.branch)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor.run_in(
            &self.root,
            &self.program.to_string_lossy(),
            &["init", "--frappe-branch", &self.branch, &self.name],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for BenchResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let path = self.path();
        if !path.exists() {
            Ok(ResourceState::Missing)
        } else if is_bench(&path) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "directory exists but is not an initialised bench".to_string(),
            })
        }
    }
}
