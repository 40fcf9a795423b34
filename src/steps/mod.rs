//! Named pipeline steps that drive resources from operator input.
pub mod bench_cli;
pub mod certificate;
mod context;
pub mod database;
pub mod git_identity;
pub mod init_bench;
mod input;
pub mod install_app;
pub mod new_site;
pub mod node;
pub mod packages;
mod processing;
pub mod production;
pub mod ssh_key;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;

use crate::error::{ConfigError, FailureKind};
use crate::logging::StepStatus;

pub use context::{BenchInstance, Context, ProductionConfig, Session, SiteInstance};

/// Result of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Step completed successfully.
    Ok,
    /// Step made no change (already satisfied, declined overwrite, failed
    /// gate).
    Skipped(String),
    /// Step ran in dry-run mode.
    DryRun,
}

/// Stable identifier of a step, used in menus, the configuration file and
/// on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum StepId {
    /// Install system packages.
    Packages,
    /// Install Node.js and yarn.
    Node,
    /// Secure the database server.
    Database,
    /// Install the bench CLI.
    BenchCli,
    /// Create an SSH key.
    SshKey,
    /// Configure the global git identity.
    GitIdentity,
    /// Initialise a bench.
    InitBench,
    /// Create a site.
    NewSite,
    /// Install an app on a site.
    InstallApp,
    /// Set up production services.
    Production,
    /// Issue a TLS certificate.
    Certificate,
}

impl StepId {
    /// Every step, in pipeline order.
    pub const ALL: [Self; 11] = [
        Self::Packages,
        Self::Node,
        Self::Database,
        Self::BenchCli,
        Self::SshKey,
        Self::GitIdentity,
        Self::InitBench,
        Self::NewSite,
        Self::InstallApp,
        Self::Production,
        Self::Certificate,
    ];

    /// Kebab-case id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Node => "node",
            Self::Database => "database",
            Self::BenchCli => "bench-cli",
            Self::SshKey => "ssh-key",
            Self::GitIdentity => "git-identity",
            Self::InitBench => "init-bench",
            Self::NewSite => "new-site",
            Self::InstallApp => "install-app",
            Self::Production => "production",
            Self::Certificate => "certificate",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Packages => "Install system packages",
            Self::Node => "Install Node.js and yarn",
            Self::Database => "Secure database server",
            Self::BenchCli => "Install bench CLI",
            Self::SshKey => "Create SSH key",
            Self::GitIdentity => "Configure git identity",
            Self::InitBench => "Initialise bench",
            Self::NewSite => "Create site",
            Self::InstallApp => "Install app",
            Self::Production => "Set up production",
            Self::Certificate => "Issue TLS certificate",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStep(s.to_string()))
    }
}

/// A named, executable step.
pub trait Step: Send + Sync {
    /// Identifier of this step.
    fn id(&self) -> StepId;

    /// Human-readable step name.
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Execute the step.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`](crate::error::ValidationError) for
    /// unusable operator input, a [`CommandError`](crate::error::CommandError)
    /// when an external command fails, or any other error that prevents the
    /// step from completing.
    fn run(&self, ctx: &Context) -> Result<StepResult>;
}

/// The step implementing `id`.
#[must_use]
pub fn step_for(id: StepId) -> Box<dyn Step> {
    match id {
        StepId::Packages => Box::new(packages::InstallPackages),
        StepId::Node => Box::new(node::InstallNode),
        StepId::Database => Box::new(database::SecureDatabase),
        StepId::BenchCli => Box::new(bench_cli::InstallBenchCli),
        StepId::SshKey => Box::new(ssh_key::CreateSshKey),
        StepId::GitIdentity => Box::new(git_identity::ConfigureGitIdentity),
        StepId::InitBench => Box::new(init_bench::InitBench),
        StepId::NewSite => Box::new(new_site::CreateSite),
        StepId::InstallApp => Box::new(install_app::InstallApp),
        StepId::Production => Box::new(production::SetupProduction::default()),
        StepId::Certificate => Box::new(certificate::IssueCertificate::default()),
    }
}

/// Execute a step, recording the result in the logger.
///
/// Rejected operator input is logged as a warning and recorded as skipped;
/// the caller may continue. Every other failure is recorded and returned.
///
/// # Errors
///
/// Returns the step's error unless it is a
/// [`ValidationError`](crate::error::ValidationError).
pub fn execute(step: &dyn Step, ctx: &Context) -> Result<()> {
    let name = step.name();
    ctx.log.stage(name);
    match step.run(ctx) {
        Ok(StepResult::Ok) => {
            ctx.log.record_step(name, StepStatus::Ok, None);
            Ok(())
        }
        Ok(StepResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log.record_step(name, StepStatus::Skipped, Some(&reason));
            Ok(())
        }
        Ok(StepResult::DryRun) => {
            ctx.log.record_step(name, StepStatus::DryRun, None);
            Ok(())
        }
        Err(e) => {
            let kind = FailureKind::classify(&e);
            let detail = format!("{e:#}");
            if !kind.is_fatal() {
                ctx.log.warn(&format!("{name}: {detail}"));
                ctx.log.record_step(name, StepStatus::Skipped, Some(&detail));
                return Ok(());
            }
            if kind == FailureKind::Command {
                ctx.log.error(&format!("{name}: command failed: {detail}"));
            } else {
                ctx.log.error(&format!("{name}: {detail}"));
            }
            ctx.log.record_step(name, StepStatus::Failed, Some(&detail));
            Err(e.context(format!("step '{}' failed", step.id())))
        }
    }
}

/// Run `ids` in order, stopping at the first fatal failure.
///
/// # Errors
///
/// Returns the first fatal step error; later steps are not run.
pub fn run_sequence(ids: &[StepId], ctx: &Context) -> Result<()> {
    for id in ids {
        execute(step_for(*id).as_ref(), ctx)?;
    }
    Ok(())
}

/// Shared helpers for step unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::path::Path;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::dns::Resolver;
    use crate::exec::Executor;
    use crate::logging::Logger;
    use crate::platform::Identity;
    use crate::prompt::ScriptedPrompter;

    use super::Context;

    /// Build a [`Context`] rooted at `root` with the default configuration
    /// and the `frappe` profile, also returning the [`Logger`] so tests can
    /// inspect recorded steps.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn make_context(
        root: &Path,
        executor: Arc<dyn Executor>,
        prompter: ScriptedPrompter,
    ) -> (Context, Arc<Logger>) {
        let config = Config::default();
        let profile = config.profile("frappe").expect("builtin profile");
        let log = Arc::new(Logger::new("test"));
        let ctx = Context::new(
            config,
            profile,
            Identity::new(1000, "frappe", root.join("home")),
            root.to_path_buf(),
            Arc::clone(&log) as Arc<dyn crate::logging::Log>,
            executor,
        )
        .with_prompter(Arc::new(prompter));
        (ctx, log)
    }

    /// Like [`make_context`] with a custom resolver.
    #[must_use]
    pub fn make_context_with_resolver(
        root: &Path,
        executor: Arc<dyn Executor>,
        prompter: ScriptedPrompter,
        resolver: Arc<dyn Resolver>,
    ) -> (Context, Arc<Logger>) {
        let (ctx, log) = make_context(root, executor, prompter);
        (ctx.with_resolver(resolver), log)
    }

    /// Create a directory tree that passes [`is_bench`](crate::resources::bench::is_bench).
    #[allow(clippy::expect_used)]
    pub fn make_bench(root: &Path, name: &str) -> std::path::PathBuf {
        let bench = root.join(name);
        std::fs::create_dir_all(bench.join("apps").join("frappe")).expect("create apps");
        std::fs::create_dir_all(bench.join("sites")).expect("create sites");
        std::fs::create_dir_all(bench.join("config")).expect("create config");
        bench
    }

    /// Create a site with a `site_config.json` inside `bench`.
    #[allow(clippy::expect_used)]
    pub fn make_site(bench: &Path, site: &str) {
        let dir = bench.join("sites").join(site);
        std::fs::create_dir_all(&dir).expect("create site");
        std::fs::write(
            dir.join("site_config.json"),
            r#"{"db_name": "_1a2b3c", "db_password": "x"}"#,
        )
        .expect("write site config");
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::test_helpers::make_context;
    use super::*;
    use crate::error::ValidationError;
    use crate::logging::StepStatus;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::test_helpers::MockExecutor;

    struct FixedStep(fn() -> Result<StepResult>);

    impl Step for FixedStep {
        fn id(&self) -> StepId {
            StepId::NewSite
        }

        fn run(&self, _: &Context) -> Result<StepResult> {
            (self.0)()
        }
    }

    fn context() -> (tempfile::TempDir, Context, Arc<crate::logging::Logger>) {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = make_context(
            dir.path(),
            Arc::new(MockExecutor::with_responses(vec![])),
            ScriptedPrompter::new(),
        );
        (dir, ctx, log)
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for id in StepId::ALL {
            assert_eq!(id.as_str().parse::<StepId>().unwrap(), id);
        }
    }

    #[test]
    fn unknown_id_is_config_error() {
        let err = "reboot".parse::<StepId>().unwrap_err();
        assert_eq!(err.to_string(), "unknown step 'reboot'");
    }

    #[test]
    fn clap_value_names_match_ids() {
        use clap::ValueEnum as _;
        for id in StepId::ALL {
            let value = id.to_possible_value().unwrap();
            assert_eq!(value.get_name(), id.as_str());
        }
    }

    #[test]
    fn registry_covers_every_id() {
        for id in StepId::ALL {
            assert_eq!(step_for(id).id(), id);
        }
    }

    #[test]
    fn execute_records_ok() {
        let (_dir, ctx, log) = context();
        execute(&FixedStep(|| Ok(StepResult::Ok)), &ctx).unwrap();
        let entries = log.step_entries();
        assert_eq!(entries[0].name, "Create site");
        assert_eq!(entries[0].status, StepStatus::Ok);
    }

    #[test]
    fn execute_records_skip_reason() {
        let (_dir, ctx, log) = context();
        execute(
            &FixedStep(|| Ok(StepResult::Skipped("site exists".to_string()))),
            &ctx,
        )
        .unwrap();
        let entries = log.step_entries();
        assert_eq!(entries[0].status, StepStatus::Skipped);
        assert_eq!(entries[0].message.as_deref(), Some("site exists"));
    }

    #[test]
    fn validation_error_is_not_fatal() {
        let (_dir, ctx, log) = context();
        execute(
            &FixedStep(|| Err(ValidationError::Empty("site name").into())),
            &ctx,
        )
        .unwrap();
        let entries = log.step_entries();
        assert_eq!(entries[0].status, StepStatus::Skipped);
        assert_eq!(
            entries[0].message.as_deref(),
            Some("site name must not be empty")
        );
        assert_eq!(log.failure_count(), 0);
    }

    #[test]
    fn other_error_is_fatal_and_recorded() {
        let (_dir, ctx, log) = context();
        let err = execute(&FixedStep(|| Err(anyhow::anyhow!("disk full"))), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "step 'new-site' failed");
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn run_sequence_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        // dpkg-query answers, then apt-get update fails.
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, String::new()),
            (false, String::new()),
        ]));
        let (ctx, log) = make_context(dir.path(), executor.clone(), ScriptedPrompter::new());
        let err = run_sequence(&[StepId::Packages, StepId::Node], &ctx).unwrap_err();
        assert!(format!("{err:#}").contains("apt-get update"));
        assert_eq!(log.step_entries().len(), 1);
        assert_eq!(executor.call_count(), 2);
    }
}
