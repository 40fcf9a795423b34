//! Site and app resources inside a bench.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// The fields of `sites/<site>/site_config.json` the wizard cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Database name created for the site.
    pub db_name: Option<String>,
}

/// Path of a site's directory.
#[must_use]
pub fn site_dir(bench: &Path, site: &str) -> PathBuf {
    bench.join("sites").join(site)
}

/// Read and parse a site's `site_config.json`.
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid JSON.
pub fn read_site_config(bench: &Path, site: &str) -> Result<SiteConfig> {
    let path = site_dir(bench, site).join("site_config.json");
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Derive an app name from what the operator typed: either a plain name or
/// a git URL.
///
/// ```
/// use bench_setup::resources::site::app_name_from_source;
///
/// assert_eq!(app_name_from_source("erpnext"), "erpnext");
/// assert_eq!(app_name_from_source("https://github.com/frappe/hrms.git"), "hrms");
/// assert_eq!(app_name_from_source("git@github.com:acme/custom_app/"), "custom_app");
/// ```
#[must_use]
pub fn app_name_from_source(source: &str) -> String {
    let trimmed = source.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// A site created with `bench new-site`.
#[derive(Debug)]
pub struct SiteResource<'a> {
    /// Bench directory.
    pub bench: PathBuf,
    /// Site name.
    pub site: String,
    /// Path of the `bench` program.
    pub program: PathBuf,
    admin_password: String,
    db_root_password: String,
    force: bool,
    executor: &'a dyn Executor,
}

impl<'a> SiteResource<'a> {
    /// Create a new site resource.
    #[must_use]
    pub fn new(
        bench: &Path,
        site: impl Into<String>,
        program: PathBuf,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            bench: bench.to_path_buf(),
            site: site.into(),
            program,
            admin_password: String::new(),
            db_root_password: String::new(),
            force: false,
            executor,
        }
    }

    /// Set the credentials passed to `bench new-site`.
    #[must_use]
    pub fn with_credentials(mut self, admin: &str, db_root: &str) -> Self {
        self.admin_password = admin.to_string();
        self.db_root_password = db_root.to_string();
        self
    }

    /// Recreate the site even if it exists.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Make this site the bench default with `bench use`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bench use` exits non-zero.
    pub fn set_default(&self) -> Result<()> {
        self.executor.run_in(
            &self.bench,
            &self.program.to_string_lossy(),
            &["use", &self.site],
        )?;
        Ok(())
    }
}

impl Applicable for SiteResource<'_> {
    fn description(&self) -> String {
        format!("site {} in {}", self.site, self.bench.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut args = vec![
            "new-site",
            self.site.as_str(),
            "--admin-password",
            self.admin_password.as_str(),
            "--mariadb-root-password",
            self.db_root_password.as_str(),
        ];
        if self.force {
            args.push("--force");
        }
        self.executor
            .run_in(&self.bench, &self.program.to_string_lossy(), &args)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SiteResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !site_dir(&self.bench, &self.site).is_dir() {
            return Ok(ResourceState::Missing);
        }
        Ok(match read_site_config(&self.bench, &self.site) {
            Ok(SiteConfig {
                db_name: Some(_), ..
            }) => ResourceState::Correct,
            Ok(_) => ResourceState::Incorrect {
                current: "site_config.json has no db_name".to_string(),
            },
            Err(e) => ResourceState::Incorrect {
                current: format!("{e:#}"),
            },
        })
    }
}

/// An app fetched into a bench and installed on one of its sites.
#[derive(Debug)]
pub struct AppResource<'a> {
    /// Bench directory.
    pub bench: PathBuf,
    /// Site to install on.
    pub site: String,
    /// App name, or git URL to fetch it from.
    pub source: String,
    /// Branch to fetch.
    pub branch: Option<String>,
    /// Path of the `bench` program.
    pub program: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> AppResource<'a> {
    /// Create a new app resource.
    #[must_use]
    pub fn new(
        bench: &Path,
        site: impl Into<String>,
        source: impl Into<String>,
        program: PathBuf,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            bench: bench.to_path_buf(),
            site: site.into(),
            source: source.into(),
            branch: None,
            program,
            executor,
        }
    }

    /// Fetch a specific branch.
    #[must_use]
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch.filter(|b| !b.is_empty());
        self
    }

    /// The app's name.
    #[must_use]
    pub fn name(&self) -> String {
        app_name_from_source(&self.source)
    }

    /// Whether the app's source is present under `apps/`.
    #[must_use]
    pub fn is_fetched(&self) -> bool {
        self.bench.join("apps").join(self.name()).is_dir()
    }

    /// Whether the app is listed in `sites/apps.txt`.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        let name = self.name();
        std::fs::read_to_string(self.bench.join("sites").join("apps.txt"))
            .is_ok_and(|text| text.lines().any(|line| line.trim() == name))
    }

    /// Whether `bench --site <site> list-apps` reports the app.
    fn is_installed_on_site(&self) -> bool {
        let name = self.name();
        self.executor
            .run_in(
                &self.bench,
                &self.program.to_string_lossy(),
                &["--site", &self.site, "list-apps"],
            )
            .is_ok_and(|r| {
                r.stdout
                    .lines()
                    .filter_map(|line| line.split_whitespace().next())
                    .any(|app| app == name)
            })
    }
}

impl Applicable for AppResource<'_> {
    fn description(&self) -> String {
        format!("app {} on {}", self.name(), self.site)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let program = self.program.to_string_lossy();
        if !self.is_fetched() {
            let mut args = vec!["get-app"];
            if let Some(branch) = &self.branch {
                args.extend(["--branch", branch.as_str()]);
            }
            args.push(&self.source);
            self.executor.run_in(&self.bench, &program, &args)?;
        }
        let name = self.name();
        self.executor.run_in(
            &self.bench,
            &program,
            &["--site", &self.site, "install-app", &name],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for AppResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.is_fetched() {
            return Ok(ResourceState::Missing);
        }
        if self.is_registered() && self.is_installed_on_site() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("fetched, not installed on {}", self.site),
            })
        }
    }
}
