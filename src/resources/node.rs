//! Node.js runtime and yarn resources.
use std::io::Write as _;

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::fetch::Fetcher;

/// Parse the major version out of `node --version` output (`v18.19.0`).
///
/// ```
/// use bench_setup::resources::node::parse_node_major;
///
/// assert_eq!(parse_node_major("v16.20.2\n"), Some(16));
/// assert_eq!(parse_node_major("20.11.1"), Some(20));
/// assert_eq!(parse_node_major("garbage"), None);
/// ```
#[must_use]
pub fn parse_node_major(version: &str) -> Option<u32> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    version.split('.').next()?.parse().ok()
}

/// Whether an installed version string requires a reinstall.
///
/// Unparseable versions are treated as too old.
#[must_use]
pub fn needs_upgrade(version: &str, min_major: u32) -> bool {
    parse_node_major(version).is_none_or(|major| major < min_major)
}

/// The Node.js runtime, installed from the NodeSource apt repository.
pub struct NodeRuntime<'a> {
    /// Minimum acceptable major version.
    pub min_major: u32,
    /// URL of the NodeSource setup script.
    pub setup_url: String,
    executor: &'a dyn Executor,
    fetcher: &'a dyn Fetcher,
}

impl std::fmt::Debug for NodeRuntime<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRuntime")
            .field("min_major", &self.min_major)
            .field("setup_url", &self.setup_url)
            .finish_non_exhaustive()
    }
}

impl<'a> NodeRuntime<'a> {
    /// Create a new Node.js runtime resource.
    #[must_use]
    pub fn new(
        min_major: u32,
        setup_url: impl Into<String>,
        executor: &'a dyn Executor,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            min_major,
            setup_url: setup_url.into(),
            executor,
            fetcher,
        }
    }

    /// The installed version string, or `None` when `node` is not runnable.
    ///
    /// # Errors
    ///
    /// Returns an error only if the version check cannot be spawned for a reason
    /// other than the program being absent.
    pub fn installed_version(&self) -> Result<Option<String>> {
        if !self.executor.which("node") {
            return Ok(None);
        }
        let result = self.executor.run_unchecked("node", &["--version"])?;
        Ok(result.success.then(|| result.stdout.trim().to_string()))
    }
}

/// Write `body` to a fresh private file (created exclusively, mode 0600).
/// The file is deleted when the handle drops.
fn stage_script(body: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("bench-setup-nodesource-")
        .suffix(".sh")
        .tempfile()
        .context("create setup script file")?;
    let path = file.path().display().to_string();
    file.write_all(body.as_bytes())
        .with_context(|| format!("write {path}"))?;
    file.flush().with_context(|| format!("write {path}"))?;
    Ok(file)
}

impl Applicable for NodeRuntime<'_> {
    fn description(&self) -> String {
        format!("Node.js >= {}", self.min_major)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let body = self.fetcher.fetch(&self.setup_url)?;
        let script = stage_script(&body)?;
        let path = script.path().to_string_lossy().into_owned();
        self.executor.run("sudo", &["-E", "bash", &path])?;
        drop(script);
        self.executor
            .run("sudo", &["apt-get", "install", "-y", "nodejs"])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for NodeRuntime<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(match self.installed_version()? {
            None => ResourceState::Missing,
            Some(version) if needs_upgrade(&version, self.min_major) => {
                ResourceState::Incorrect { current: version }
            }
            Some(_) => ResourceState::Correct,
        })
    }
}

/// The yarn package manager, installed globally through npm.
#[derive(Debug)]
pub struct YarnResource<'a> {
    executor: &'a dyn Executor,
}

impl<'a> YarnResource<'a> {
    /// Create a new yarn resource.
    #[must_use]
    pub const fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }
}

impl Applicable for YarnResource<'_> {
    fn description(&self) -> String {
        "yarn (npm global)".to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor
            .run("sudo", &["npm", "install", "-g", "yarn"])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for YarnResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if self.executor.which("yarn") {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
