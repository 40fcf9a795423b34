//! Global git identity resource.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// The `user.name` / `user.email` pair from the global git configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`, if set.
    pub name: Option<String>,
    /// `user.email`, if set.
    pub email: Option<String>,
}

impl GitIdentity {
    /// Read the identity from the user's global git configuration.
    ///
    /// A missing configuration file yields an empty identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration exists but cannot be parsed.
    pub fn read_global() -> Result<Self> {
        let mut config = match git2::Config::open_default() {
            Ok(config) => config,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::from_config(&mut config)
    }

    /// Read the identity from an opened git configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a consistent snapshot cannot be taken.
    pub fn from_config(config: &mut git2::Config) -> Result<Self> {
        let snapshot = config.snapshot()?;
        let get = |key: &str| {
            snapshot
                .get_string(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        Ok(Self {
            name: get("user.name"),
            email: get("user.email"),
        })
    }
}

/// One global git config entry that must hold a given value.
#[derive(Debug)]
pub struct GitConfigResource<'a> {
    /// Config key (e.g. `user.email`).
    pub key: String,
    /// Desired value.
    pub desired_value: String,
    current: Option<String>,
    executor: &'a dyn Executor,
}

impl<'a> GitConfigResource<'a> {
    /// Create a config resource given the value currently configured.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        desired_value: impl Into<String>,
        current: Option<String>,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            key: key.into(),
            desired_value: desired_value.into(),
            current,
            executor,
        }
    }
}

impl Applicable for GitConfigResource<'_> {
    fn description(&self) -> String {
        format!("{} = {}", self.key, self.desired_value)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor.run(
            "git",
            &["config", "--global", &self.key, &self.desired_value],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for GitConfigResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(match &self.current {
            None => ResourceState::Missing,
            Some(current) if *current == self.desired_value => ResourceState::Correct,
            Some(current) => ResourceState::Incorrect {
                current: current.clone(),
            },
        })
    }
}
