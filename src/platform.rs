//! Operator identity and runtime-environment detection.
use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::PlatformError;
use crate::exec::Executor;

/// The user the wizard runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Effective user id.
    pub euid: u32,
    /// Login name of the effective user.
    pub user: String,
    /// Home directory of the effective user.
    pub home: PathBuf,
}

impl Identity {
    /// Create an identity with explicit values.
    #[must_use]
    pub fn new(euid: u32, user: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            euid,
            user: user.into(),
            home: home.into(),
        }
    }

    /// Detect the effective user of this process.
    ///
    /// # Errors
    ///
    /// Returns an error if the user database has no entry for the effective
    /// UID and `HOME`/`USER` are not set either.
    pub fn detect() -> Result<Self, PlatformError> {
        let euid = nix::unistd::geteuid();
        if let Ok(Some(user)) = nix::unistd::User::from_uid(euid) {
            return Ok(Self::new(euid.as_raw(), user.name, user.dir));
        }
        let user = std::env::var("USER").map_err(|_| PlatformError::UnknownUser(euid.as_raw()))?;
        let home = std::env::var("HOME").map_err(|_| PlatformError::MissingEnv("HOME"))?;
        Ok(Self::new(euid.as_raw(), user, home))
    }

    /// Whether this identity is the superuser.
    #[must_use]
    pub const fn is_superuser(&self) -> bool {
        self.euid == 0
    }

    /// Refuse to continue as the superuser.
    ///
    /// Benches must be owned by an unprivileged user; the wizard elevates
    /// individual commands with `sudo` instead.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Superuser`] when the effective UID is 0.
    pub const fn ensure_unprivileged(&self) -> Result<(), PlatformError> {
        if self.is_superuser() {
            Err(PlatformError::Superuser)
        } else {
            Ok(())
        }
    }
}

/// Path of an already-activated Python virtual environment, if any.
#[must_use]
pub fn active_virtualenv() -> Option<PathBuf> {
    std::env::var_os("VIRTUAL_ENV")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Addresses assigned to this host, as reported by `hostname -I`.
///
/// Returns an empty list when the lookup fails; callers treat that as
/// "unknown".
#[must_use]
pub fn host_addresses(executor: &dyn Executor) -> Vec<IpAddr> {
    executor
        .run_unchecked("hostname", &["-I"])
        .ok()
        .filter(|r| r.success)
        .map(|r| {
            r.stdout
                .split_whitespace()
                .filter_map(|token| token.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}
