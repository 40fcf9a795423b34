//! System package installation.
use anyhow::Result;

use super::{Context, Step, StepId, StepResult};
use crate::resources::ResourceState;
use crate::resources::package::{
    PackageResource, batch_install_packages, get_installed_packages, refresh_index,
};

/// Install the configured apt packages that are not installed yet.
#[derive(Debug)]
pub struct InstallPackages;

impl Step for InstallPackages {
    fn id(&self) -> StepId {
        StepId::Packages
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let names = &ctx.config.packages;
        if names.is_empty() {
            return Ok(StepResult::Skipped("no packages configured".to_string()));
        }

        let installed = get_installed_packages(names, &*ctx.executor)?;
        let resources: Vec<PackageResource<'_>> = names
            .iter()
            .map(|name| PackageResource::new(name.clone(), &*ctx.executor))
            .collect();
        let missing: Vec<&PackageResource<'_>> = resources
            .iter()
            .filter(|r| r.state_from_installed(&installed) != ResourceState::Correct)
            .collect();
        ctx.log.debug(&format!(
            "{} of {} packages installed",
            resources.len() - missing.len(),
            resources.len()
        ));

        if missing.is_empty() {
            return Ok(StepResult::Skipped(
                "all packages already installed".to_string(),
            ));
        }

        let list = missing
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would install: {list}"));
            return Ok(StepResult::DryRun);
        }

        ctx.log.info(&format!("installing {}: {list}", missing.len()));
        refresh_index(&*ctx.executor)?;
        batch_install_packages(&missing)?;
        ctx.log.info(&format!("installed {} package(s)", missing.len()));
        Ok(StepResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::test_helpers::make_context;

    fn context_with(
        packages: &[&str],
        executor: Arc<MockExecutor>,
        dry_run: bool,
    ) -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, _) = make_context(dir.path(), executor, ScriptedPrompter::new());
        let mut config = (*ctx.config).clone();
        config.packages = packages.iter().map(ToString::to_string).collect();
        ctx.config = Arc::new(config);
        (dir, ctx.with_dry_run(dry_run))
    }

    #[test]
    fn installs_only_missing_packages() {
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (
                true,
                "git install ok installed\ncurl deinstall ok config-files\n".to_string(),
            ),
            (true, String::new()),
            (true, String::new()),
        ]));
        let (_dir, ctx) = context_with(&["git", "curl", "nginx"], Arc::clone(&executor), false);
        assert_eq!(InstallPackages.run(&ctx).unwrap(), StepResult::Ok);
        let calls = executor.calls();
        assert_eq!(calls[1], "sudo apt-get update");
        assert_eq!(calls[2], "sudo apt-get install -y curl nginx");
    }

    #[test]
    fn everything_installed_skips_without_apt() {
        let executor = Arc::new(MockExecutor::ok(
            "git install ok installed\nnginx install ok installed\n",
        ));
        let (_dir, ctx) = context_with(&["git", "nginx"], Arc::clone(&executor), false);
        assert_eq!(
            InstallPackages.run(&ctx).unwrap(),
            StepResult::Skipped("all packages already installed".to_string())
        );
        assert_eq!(executor.call_count(), 1);
    }

    #[test]
    fn dry_run_only_inspects() {
        let executor = Arc::new(MockExecutor::ok(""));
        let (_dir, ctx) = context_with(&["git"], Arc::clone(&executor), true);
        assert_eq!(InstallPackages.run(&ctx).unwrap(), StepResult::DryRun);
        assert_eq!(executor.call_count(), 1);
    }

    #[test]
    fn empty_list_is_skipped() {
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (_dir, ctx) = context_with(&[], Arc::clone(&executor), false);
        assert!(matches!(
            InstallPackages.run(&ctx).unwrap(),
            StepResult::Skipped(_)
        ));
        assert_eq!(executor.call_count(), 0);
    }
}
