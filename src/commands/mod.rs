//! Top-level subcommand orchestration.
pub mod menu;
pub mod run;
pub mod steps;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::profiles::DEFAULT_PROFILE;
use crate::config::validation::validate_all;
use crate::config::{Config, default_config_path};
use crate::exec::Executor;
use crate::logging::{Log, Logger};
use crate::platform::{Identity, active_virtualenv};
use crate::prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
use crate::steps::Context;

/// Environment variable naming the root directory.
pub const ROOT_ENV: &str = "BENCH_SETUP_ROOT";

/// Shared setup for the commands that run steps: identity check, root
/// resolution, configuration, profile and prompter.
#[derive(Debug)]
pub struct CommandSetup {
    /// Context the steps run in.
    pub ctx: Context,
}

impl CommandSetup {
    /// Build the step context for `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if `identity` is the superuser, the configuration
    /// cannot be loaded, the profile cannot be resolved, or the answers file
    /// cannot be read.
    pub fn init(
        global: &GlobalOpts,
        identity: Identity,
        log: Arc<Logger>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        identity.ensure_unprivileged()?;

        let root = resolve_root(global, &identity);
        log.debug(&format!("root: {}", root.display()));

        log.stage("Loading configuration");
        let config = match global.config.clone().or_else(default_config_path) {
            Some(path) => {
                log.debug(&format!("config file: {}", path.display()));
                Config::load(&path)?
            }
            None => Config::default(),
        };
        for warning in validate_all(&config) {
            log.warn(&warning.to_string());
        }

        let name = global.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let profile = config.profile(name)?;
        log.info(&format!(
            "profile: {} ({} packages, {} menu items)",
            profile.name,
            config.packages.len(),
            profile.menu.len()
        ));

        let prompter: Arc<dyn Prompter> = match &global.answers {
            Some(path) => {
                log.info(&format!("answers: {}", path.display()));
                Arc::new(ScriptedPrompter::load(path)?)
            }
            None => Arc::new(TerminalPrompter),
        };
        let virtualenv = active_virtualenv();
        if let Some(env) = &virtualenv {
            log.info(&format!("using active virtual environment {}", env.display()));
        }

        let ctx = Context::new(config, profile, identity, root, log as Arc<dyn Log>, executor)
            .with_prompter(prompter)
            .with_virtualenv(virtualenv)
            .with_dry_run(global.dry_run);
        Ok(Self { ctx })
    }
}

/// Resolve the root directory: `--root`, else `BENCH_SETUP_ROOT`, else the
/// operator's home. Existing directories are canonicalised.
#[must_use]
pub fn resolve_root(global: &GlobalOpts, identity: &Identity) -> PathBuf {
    let root = global
        .root
        .clone()
        .or_else(|| {
            std::env::var_os(ROOT_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| identity.home.clone());
    dunce::canonicalize(&root).unwrap_or(root)
}

/// Print the summary and fail if any step failed.
///
/// # Errors
///
/// Returns an error if one or more steps recorded a failure.
pub fn finish(log: &Logger, result: Result<()>) -> Result<()> {
    log.print_summary();
    result?;
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
