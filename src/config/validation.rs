//! Configuration warnings reported before a run.
use std::collections::HashSet;

use super::profiles::ProfileDef;
use super::{Config, NodeSettings};
use crate::resources::is_plain_name;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g. "packages", "profiles.frappe").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.item.is_empty() {
            write!(f, "{}: {}", self.source, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.source, self.item, self.message)
        }
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self) -> Vec<ValidationWarning>;

    /// Return a human-readable name for this validator.
    fn name(&self) -> &'static str;
}

/// Validator for the package list.
#[derive(Debug)]
pub struct PackageValidator<'a> {
    packages: &'a [String],
}

impl<'a> PackageValidator<'a> {
    /// Create a package validator.
    #[must_use]
    pub const fn new(packages: &'a [String]) -> Self {
        Self { packages }
    }
}

impl ConfigValidator for PackageValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if self.packages.is_empty() {
            warnings.push(ValidationWarning::new(
                "packages",
                "",
                "package list is empty; the packages step will do nothing",
            ));
        }

        let mut seen = HashSet::new();
        for package in self.packages {
            if package.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    "packages",
                    package,
                    "package name is empty",
                ));
            } else if !seen.insert(package.as_str()) {
                warnings.push(ValidationWarning::new(
                    "packages",
                    package,
                    "package listed more than once",
                ));
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "packages"
    }
}

/// Validator for the Node.js settings.
#[derive(Debug)]
pub struct NodeValidator<'a> {
    node: &'a NodeSettings,
}

impl<'a> NodeValidator<'a> {
    /// Create a Node.js settings validator.
    #[must_use]
    pub const fn new(node: &'a NodeSettings) -> Self {
        Self { node }
    }
}

impl ConfigValidator for NodeValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if self.node.min_major == 0 {
            warnings.push(ValidationWarning::new(
                "node",
                "min_major",
                "threshold of zero accepts any installed version",
            ));
        }
        if !self.node.setup_url.starts_with("https://") {
            warnings.push(ValidationWarning::new(
                "node",
                "setup_url",
                "setup script is not fetched over HTTPS",
            ));
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "node"
    }
}

/// Validator for one profile definition.
#[derive(Debug)]
pub struct ProfileValidator<'a> {
    name: &'a str,
    def: &'a ProfileDef,
}

impl<'a> ProfileValidator<'a> {
    /// Create a profile validator.
    #[must_use]
    pub const fn new(name: &'a str, def: &'a ProfileDef) -> Self {
        Self { name, def }
    }
}

impl ConfigValidator for ProfileValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let source = format!("profiles.{}", self.name);
        let mut warnings = Vec::new();

        if self.def.menu.is_empty() {
            warnings.push(ValidationWarning::new(
                &source,
                "menu",
                "menu is empty; only Exit will be offered",
            ));
        }
        if self.def.bench_name.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                &source,
                "bench_name",
                "default bench name is empty",
            ));
        } else if !is_plain_name(self.def.bench_name.trim()) {
            warnings.push(ValidationWarning::new(
                &source,
                "bench_name",
                "default bench name must be a single directory name",
            ));
        }

        let mut labels = HashSet::new();
        for entry in &self.def.menu {
            if !labels.insert(entry.label.as_str()) {
                warnings.push(ValidationWarning::new(
                    &source,
                    &entry.label,
                    "duplicate menu label",
                ));
            }
            if entry.steps.is_empty() {
                warnings.push(ValidationWarning::new(
                    &source,
                    &entry.label,
                    "menu entry has no steps",
                ));
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "profiles"
    }
}

/// Run all validators against `config`.
#[must_use]
pub fn validate_all(config: &Config) -> Vec<ValidationWarning> {
    let mut validators: Vec<Box<dyn ConfigValidator + '_>> = vec![
        Box::new(PackageValidator::new(&config.packages)),
        Box::new(NodeValidator::new(&config.node)),
    ];
    for (name, def) in &config.profiles {
        validators.push(Box::new(ProfileValidator::new(name, def)));
    }

    validators
        .iter()
        .flat_map(|validator| {
            let warnings = validator.validate();
            if !warnings.is_empty() {
                tracing::debug!("{} validator: {} warning(s)", validator.name(), warnings.len());
            }
            warnings
        })
        .collect()
}
