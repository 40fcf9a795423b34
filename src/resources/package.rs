//! apt package resource.
use std::collections::HashSet;

use anyhow::Result;

use super::ResourceState;
use crate::exec::Executor;

/// A Debian package that must be installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, executor: &'a dyn Executor) -> Self {
        Self { name, executor }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query which of `names` are installed, in a single `dpkg-query` call.
///
/// `dpkg-query` exits non-zero when any name is unknown to it but still
/// reports the known ones, so the exit status is ignored and only lines whose
/// status reads `install ok installed` count.
///
/// # Errors
///
/// Returns an error if `dpkg-query` cannot be spawned.
pub fn get_installed_packages(names: &[String], executor: &dyn Executor) -> Result<HashSet<String>> {
    if names.is_empty() {
        return Ok(HashSet::new());
    }
    let mut args = vec!["-W", "-f=${Package} ${Status}\\n"];
    args.extend(names.iter().map(String::as_str));
    let result = executor.run_unchecked("dpkg-query", &args)?;

    Ok(result
        .stdout
        .lines()
        .filter_map(|line| {
            let (name, status) = line.trim().split_once(' ')?;
            // Multi-arch packages are reported as `name:arch`.
            let name = name.split(':').next().unwrap_or(name);
            (status.trim() == "install ok installed").then(|| name.to_string())
        })
        .collect())
}

/// Install a batch of packages with one `apt-get install` call.
///
/// # Errors
///
/// Returns an error if `apt-get` exits non-zero.
pub fn batch_install_packages(resources: &[&PackageResource<'_>]) -> Result<()> {
    let Some(first) = resources.first() else {
        return Ok(());
    };
    let mut args = vec!["apt-get", "install", "-y"];
    args.extend(resources.iter().map(|r| r.name.as_str()));
    first.executor.run("sudo", &args)?;
    Ok(())
}

/// Refresh the apt package index.
///
/// # Errors
///
/// Returns an error if `apt-get update` exits non-zero.
pub fn refresh_index(executor: &dyn Executor) -> Result<()> {
    executor.run("sudo", &["apt-get", "update"])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn state_from_installed() {
        let executor = MockExecutor::ok("");
        let resource = PackageResource::new("git".to_string(), &executor);
        let mut installed = HashSet::new();
        assert_eq!(
            resource.state_from_installed(&installed),
            ResourceState::Missing
        );
        installed.insert("git".to_string());
        assert_eq!(
            resource.state_from_installed(&installed),
            ResourceState::Correct
        );
    }

    #[test]
    fn installed_set_only_counts_fully_installed() {
        let executor = MockExecutor::with_responses(vec![(
            false,
            "git install ok installed\n\
             redis-server deinstall ok config-files\n\
             libssl3:amd64 install ok installed\n"
                .to_string(),
        )]);
        let installed =
            get_installed_packages(&names(&["git", "redis-server", "libssl3", "nginx"]), &executor)
                .unwrap();
        assert!(installed.contains("git"));
        assert!(installed.contains("libssl3"));
        assert!(!installed.contains("redis-server"));
        assert!(!installed.contains("nginx"));
    }

    #[test]
    fn installed_set_queries_requested_names() {
        let executor = MockExecutor::ok("");
        get_installed_packages(&names(&["git", "curl"]), &executor).unwrap();
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("dpkg-query -W"));
        assert!(calls[0].ends_with("git curl"));
    }

    #[test]
    fn installed_set_empty_request_runs_nothing() {
        let executor = MockExecutor::ok("");
        assert!(get_installed_packages(&[], &executor).unwrap().is_empty());
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn batch_install_runs_single_command() {
        let executor = MockExecutor::ok("");
        let a = PackageResource::new("nginx".to_string(), &executor);
        let b = PackageResource::new("supervisor".to_string(), &executor);
        batch_install_packages(&[&a, &b]).unwrap();
        assert_eq!(
            executor.calls(),
            vec!["sudo apt-get install -y nginx supervisor".to_string()]
        );
    }

    #[test]
    fn batch_install_empty_is_noop() {
        batch_install_packages(&[]).unwrap();
    }

    #[test]
    fn batch_install_failure_propagates() {
        let executor = MockExecutor::fail();
        let a = PackageResource::new("nginx".to_string(), &executor);
        assert!(batch_install_packages(&[&a]).is_err());
    }
}
