//! Static-asset location in a bench's generated nginx configuration.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::nginx::{AssetsLocation, NginxConfig};

/// `config/nginx.conf` of a bench with its asset location set as desired.
#[derive(Debug, Clone)]
pub struct NginxAssetsResource {
    /// Path of the nginx configuration file.
    pub path: PathBuf,
    /// Desired asset location.
    pub assets: AssetsLocation,
}

impl NginxAssetsResource {
    /// Create a new asset-location resource.
    #[must_use]
    pub const fn new(path: PathBuf, assets: AssetsLocation) -> Self {
        Self { path, assets }
    }

    fn load(&self) -> Result<NginxConfig> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        NginxConfig::parse(&text).with_context(|| format!("parse {}", self.path.display()))
    }
}

impl Applicable for NginxAssetsResource {
    fn description(&self) -> String {
        format!("{} location /assets", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut config = self.load()?;
        if config.has_assets_location(&self.assets) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        if config.set_assets_location(&self.assets) == 0 {
            return Ok(ResourceChange::Skipped {
                reason: "no server blocks".to_string(),
            });
        }
        std::fs::write(&self.path, config.render())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for NginxAssetsResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} does not exist", self.path.display()),
            });
        }
        let config = self.load()?;
        if config.servers().is_empty() {
            Ok(ResourceState::Invalid {
                reason: "no server blocks".to_string(),
            })
        } else if config.has_assets_location(&self.assets) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "asset location differs".to_string(),
            })
        }
    }
}
