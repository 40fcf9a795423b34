//! Host state the wizard converges: inspect what is there, then change only
//! what differs.
pub mod bench;
pub mod database;
pub mod git_identity;
pub mod nginx_assets;
pub mod node;
pub mod package;
pub mod service_link;
pub mod site;
pub mod ssh_key;

use std::path::{Component, Path};

use anyhow::Result;

/// Something the wizard can describe and bring into its desired state.
pub trait Applicable {
    /// Short label used in progress and dry-run messages, such as
    /// `bench /home/frappe/frappe-bench (version-15)`.
    fn description(&self) -> String;

    /// Make the change. Callers inspect first; `apply` does not re-check.
    ///
    /// # Errors
    ///
    /// Returns an error if an external command fails or the filesystem
    /// cannot be updated.
    fn apply(&self) -> Result<ResourceChange>;
}

/// What an inspection found.
///
/// ```
/// use bench_setup::resources::ResourceState;
///
/// let old_node = ResourceState::Incorrect { current: "v16.20.2".into() };
/// let no_server = ResourceState::Invalid { reason: "mysql not installed".into() };
///
/// assert_ne!(old_node, ResourceState::Correct);
/// assert_ne!(no_server, ResourceState::Missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing there yet.
    Missing,
    /// Present and as wanted.
    Correct,
    /// Present in some other form, described by `current`.
    Incorrect {
        /// What was found instead.
        current: String,
    },
    /// Cannot be converged on this host; the step is skipped with `reason`.
    Invalid {
        /// Why the resource cannot be applied.
        reason: String,
    },
}

/// What [`Applicable::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// The host was changed.
    Applied,
    /// Nothing needed doing after all.
    AlreadyCorrect,
    /// Left alone; `reason` is shown to the operator.
    Skipped {
        /// Why nothing was done.
        reason: String,
    },
}

/// A resource that can report its own [`ResourceState`].
pub trait Resource: Applicable {
    /// Inspect the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the inspection itself cannot run, for example when a
    /// program cannot be spawned. An inspection that runs and finds nothing is
    /// [`ResourceState::Missing`], not an error.
    fn current_state(&self) -> Result<ResourceState>;
}

/// Whether `name` is a single directory entry, so that `parent.join(name)`
/// stays directly inside `parent`.
///
/// ```
/// use bench_setup::resources::is_plain_name;
///
/// assert!(is_plain_name("frappe-bench"));
/// assert!(is_plain_name("erp.example.com"));
/// assert!(!is_plain_name(".."));
/// assert!(!is_plain_name("a/b"));
/// ```
#[must_use]
pub fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::test_helpers::MockExecutor;
    use super::*;
    use crate::error::CommandError;
    use crate::exec::Executor as _;

    #[test]
    fn plain_names_stay_inside_parent() {
        for name in ["frappe-bench", "erp.example.com", "bench_15", ".hidden"] {
            assert!(is_plain_name(name), "{name}");
        }
        for name in ["", ".", "..", "/", "/home/frappe", "a/b", "a/", "./a", "..\\x"] {
            assert!(!is_plain_name(name), "{name:?}");
        }
    }

    #[test]
    fn mock_records_calls_and_fails_with_command_error() {
        let executor = MockExecutor::fail();
        let err = executor.run("sudo", &["apt-get", "update"]).unwrap_err();
        assert!(err.downcast_ref::<CommandError>().is_some());
        assert_eq!(executor.calls(), vec!["sudo apt-get update".to_string()]);
    }

    #[test]
    fn mock_exhausted_script_fails_unchecked_calls_too() {
        let executor = MockExecutor::with_responses(vec![(true, "v18.19.0\n".to_string())]);
        assert!(executor.run_unchecked("node", &["--version"]).unwrap().success);
        let second = executor.run_unchecked("node", &["--version"]).unwrap();
        assert!(!second.success);
        assert_eq!(second.stdout, "unexpected call");
        assert_eq!(executor.call_count(), 2);
    }
}
