//! Database server hardening resource.
use std::path::PathBuf;

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Arguments of the unsecured-root check: a password-less `root` login
/// over TCP, ignoring option files.
///
/// It runs as the operator, not through `sudo`, so a root account that
/// authenticates through `unix_socket` does not count as open.
pub const ROOT_LOGIN_CHECK: [&str; 9] = [
    "--no-defaults",
    "--protocol=TCP",
    "-h",
    "127.0.0.1",
    "-u",
    "root",
    "--connect-timeout=5",
    "-e",
    "SELECT 1",
];

/// The MariaDB root account, secured with `mysql_secure_installation`.
///
/// The server counts as unsecured while `root` can log in over TCP without
/// a password.
#[derive(Debug)]
pub struct DatabaseRootResource<'a> {
    /// Directory the interactive wizard runs in.
    pub workdir: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> DatabaseRootResource<'a> {
    /// Create a new database root resource.
    #[must_use]
    pub const fn new(workdir: PathBuf, executor: &'a dyn Executor) -> Self {
        Self { workdir, executor }
    }
}

impl Applicable for DatabaseRootResource<'_> {
    fn description(&self) -> String {
        "MariaDB root account".to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor
            .run_interactive(&self.workdir, "sudo", &["mysql_secure_installation"])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DatabaseRootResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.executor.which("mysql") {
            return Ok(ResourceState::Invalid {
                reason: "database client not installed".to_string(),
            });
        }
        let login = self.executor.run_unchecked("mysql", &ROOT_LOGIN_CHECK)?;
        if login.success {
            return Ok(ResourceState::Incorrect {
                current: "root login without password".to_string(),
            });
        }
        // 2002/2003: no server listening.
        if ["ERROR 2002", "ERROR 2003"]
            .iter()
            .any(|code| login.stderr.contains(code))
        {
            return Ok(ResourceState::Invalid {
                reason: "database server is not running".to_string(),
            });
        }
        Ok(ResourceState::Correct)
    }
}
