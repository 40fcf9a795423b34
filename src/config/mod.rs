//! Configuration: package list, version thresholds, production settings and
//! profiles, loaded from an optional TOML file.
//!
//! ```toml
//! packages = ["git", "redis-server", "mariadb-server"]
//!
//! [node]
//! min_major = 18
//!
//! [production]
//! cache_control = "max-age=31536000, immutable"
//!
//! [profiles.custom]
//! title = "Custom bench"
//! apps = ["hrms"]
//!
//! [[profiles.custom.menu]]
//! label = "Initialise bench"
//! steps = ["init-bench"]
//! ```
//!
//! Profiles in the file are added to the built-in `frappe` and `erpnext`
//! profiles; a profile with a built-in name replaces it.
pub mod profiles;
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::nginx::AssetsLocation;

/// Packages installed by the `packages` step on a fresh Debian/Ubuntu host.
pub const DEFAULT_PACKAGES: &[&str] = &[
    "git",
    "curl",
    "python3-dev",
    "python3-pip",
    "python3-venv",
    "python3-setuptools",
    "software-properties-common",
    "mariadb-server",
    "mariadb-client",
    "libmysqlclient-dev",
    "pkg-config",
    "redis-server",
    "xvfb",
    "libfontconfig",
    "wkhtmltopdf",
    "cron",
    "nginx",
    "supervisor",
    "certbot",
    "python3-certbot-nginx",
];

/// Node.js requirements.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSettings {
    /// Minimum acceptable major version.
    pub min_major: u32,
    /// NodeSource setup script URL.
    pub setup_url: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            min_major: 18,
            setup_url: "https://deb.nodesource.com/setup_18.x".to_string(),
        }
    }
}

/// Bench CLI installation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BenchSettings {
    /// Interpreter used to create the virtual environment.
    pub python: String,
    /// pip requirement for the bench CLI.
    pub pip_package: String,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            pip_package: "frappe-bench".to_string(),
        }
    }
}

/// Production web-server settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProductionSettings {
    /// `Cache-Control` for `/assets`.
    pub cache_control: String,
    /// `access_log` argument for `/assets`.
    pub access_log: String,
}

impl Default for ProductionSettings {
    fn default() -> Self {
        Self {
            cache_control: AssetsLocation::DEFAULT_CACHE_CONTROL.to_string(),
            access_log: "off".to_string(),
        }
    }
}

impl ProductionSettings {
    /// Asset location for a bench at `bench`.
    #[must_use]
    pub fn assets_for(&self, bench: &Path) -> AssetsLocation {
        AssetsLocation::new(bench.join("sites").join("assets").to_string_lossy())
            .with_cache_control(&self.cache_control)
            .with_access_log(&self.access_log)
    }
}

/// All loaded configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// apt packages for the `packages` step.
    pub packages: Vec<String>,
    /// Node.js requirements.
    pub node: NodeSettings,
    /// Bench CLI installation settings.
    pub bench: BenchSettings,
    /// Production web-server settings.
    pub production: ProductionSettings,
    /// Profile definitions by name.
    pub profiles: BTreeMap<String, profiles::ProfileDef>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages: DEFAULT_PACKAGES.iter().map(ToString::to_string).collect(),
            node: NodeSettings::default(),
            bench: BenchSettings::default(),
            production: ProductionSettings::default(),
            profiles: profiles::builtin(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::error::ConfigError) if the file cannot
    /// be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = toml_loader::load_config(path)?;
        Ok(config.with_builtin_profiles())
    }

    /// Add built-in profiles not redefined by the file.
    fn with_builtin_profiles(mut self) -> Self {
        for (name, def) in profiles::builtin() {
            self.profiles.entry(name).or_insert(def);
        }
        self
    }

    /// Resolve a profile by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::error::ConfigError) if the profile is
    /// unknown or references an unknown step.
    pub fn profile(&self, name: &str) -> Result<profiles::Profile> {
        Ok(profiles::resolve(&self.profiles, name)?)
    }
}

/// Default configuration file location:
/// `$XDG_CONFIG_HOME/bench-setup/config.toml`, else
/// `~/.config/bench-setup/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("bench-setup").join("config.toml"))
}
