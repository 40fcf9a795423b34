//! Profiles: named menus with their bench defaults.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::steps::StepId;

/// Label of the menu item that ends the interactive loop.
pub const EXIT_LABEL: &str = "Exit";

/// Profile used when none is requested.
pub const DEFAULT_PROFILE: &str = "frappe";

/// Raw profile definition from the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileDef {
    /// Menu heading.
    pub title: String,
    /// Default bench directory name.
    #[serde(default = "default_bench_name")]
    pub bench_name: String,
    /// Default framework branch for `bench init`.
    #[serde(default = "default_branch")]
    pub frappe_branch: String,
    /// Apps offered by default when installing apps.
    #[serde(default)]
    pub apps: Vec<String>,
    /// Menu entries, in display order. `Exit` is appended automatically.
    #[serde(default)]
    pub menu: Vec<MenuEntryDef>,
}

/// Raw menu entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MenuEntryDef {
    /// Text shown to the operator.
    pub label: String,
    /// Step ids run when the entry is chosen.
    #[serde(default)]
    pub steps: Vec<String>,
}

fn default_bench_name() -> String {
    "frappe-bench".to_string()
}

fn default_branch() -> String {
    "version-15".to_string()
}

fn entry(label: &str, steps: &[&str]) -> MenuEntryDef {
    MenuEntryDef {
        label: label.to_string(),
        steps: steps.iter().map(ToString::to_string).collect(),
    }
}

/// Built-in profile definitions.
#[must_use]
pub fn builtin() -> BTreeMap<String, ProfileDef> {
    let frappe = ProfileDef {
        title: "Frappe bench setup".to_string(),
        bench_name: default_bench_name(),
        frappe_branch: default_branch(),
        apps: Vec::new(),
        menu: vec![
            entry(
                "Install system dependencies",
                &["packages", "node", "database", "bench-cli"],
            ),
            entry("Configure SSH key and git identity", &["ssh-key", "git-identity"]),
            entry("Initialise bench", &["init-bench"]),
            entry("Create site", &["new-site"]),
            entry("Install app", &["install-app"]),
            entry("Set up production", &["production"]),
            entry("Issue TLS certificate", &["certificate"]),
        ],
    };
    let erpnext = ProfileDef {
        title: "ERPNext setup".to_string(),
        bench_name: "erpnext-bench".to_string(),
        frappe_branch: default_branch(),
        apps: vec!["erpnext".to_string()],
        menu: vec![
            entry("Initialise ERPNext bench", &["init-bench"]),
            entry("Create site with ERPNext", &["new-site", "install-app"]),
            entry("Set up production with TLS", &["production", "certificate"]),
        ],
    };
    BTreeMap::from([
        ("frappe".to_string(), frappe),
        ("erpnext".to_string(), erpnext),
    ])
}

/// A menu item with its steps resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Text shown to the operator.
    pub label: String,
    /// Steps to run; empty for the exit item.
    pub steps: Vec<StepId>,
}

impl MenuItem {
    /// Whether choosing this item ends the loop.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.steps.is_empty() && self.label == EXIT_LABEL
    }
}

/// A resolved profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// Menu heading.
    pub title: String,
    /// Default bench directory name.
    pub bench_name: String,
    /// Default framework branch.
    pub frappe_branch: String,
    /// Default apps.
    pub apps: Vec<String>,
    /// Menu items, ending with `Exit`.
    pub menu: Vec<MenuItem>,
}

impl Profile {
    /// Every step of every menu item, in menu order, duplicates kept once.
    #[must_use]
    pub fn pipeline(&self) -> Vec<StepId> {
        let mut steps: Vec<StepId> = Vec::new();
        for id in self.menu.iter().flat_map(|item| &item.steps) {
            if !steps.contains(id) {
                steps.push(*id);
            }
        }
        steps
    }
}

/// Resolve `name` against the defined profiles.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownProfile`] if `name` is not defined and
/// [`ConfigError::UnknownStep`] if a menu entry names a step that does not
/// exist.
pub fn resolve(defs: &BTreeMap<String, ProfileDef>, name: &str) -> Result<Profile, ConfigError> {
    let def = defs.get(name).ok_or_else(|| ConfigError::UnknownProfile {
        name: name.to_string(),
        available: defs.keys().cloned().collect::<Vec<_>>().join(", "),
    })?;

    let mut menu = def
        .menu
        .iter()
        .map(|entry| {
            let steps = entry
                .steps
                .iter()
                .map(|s| s.parse::<StepId>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MenuItem {
                label: entry.label.clone(),
                steps,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    menu.push(MenuItem {
        label: EXIT_LABEL.to_string(),
        steps: Vec::new(),
    });

    Ok(Profile {
        name: name.to_string(),
        title: def.title.clone(),
        bench_name: def.bench_name.clone(),
        frappe_branch: def.frappe_branch.clone(),
        apps: def.apps.clone(),
        menu,
    })
}
