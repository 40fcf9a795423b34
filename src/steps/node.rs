//! Node.js runtime and yarn.
use anyhow::Result;

use super::processing::{converge, summarize};
use super::{Context, Step, StepId, StepResult};
use crate::resources::node::{NodeRuntime, YarnResource};

/// Install Node.js at or above the configured major version, then yarn.
#[derive(Debug)]
pub struct InstallNode;

impl Step for InstallNode {
    fn id(&self) -> StepId {
        StepId::Node
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let settings = &ctx.config.node;
        let runtime = NodeRuntime::new(
            settings.min_major,
            &settings.setup_url,
            &*ctx.executor,
            &*ctx.fetcher,
        );
        let yarn = YarnResource::new(&*ctx.executor);
        let outcomes = [
            converge(ctx, &runtime, "install")?,
            converge(ctx, &yarn, "install")?,
        ];
        Ok(summarize(&outcomes, "Node.js and yarn already installed"))
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

    fn run_with_version(version: &str) -> (StepResult, Arc<MockExecutor>) {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(
            MockExecutor::with_responses(vec![(true, format!("{version}\n"))]).with_which(true),
        );
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, ScriptedPrompter::new());
        let result = InstallNode.run(&ctx.with_dry_run(true)).unwrap();
        (result, executor)
    }

    #[test]
    fn old_node_is_upgraded() {
        let (result, executor) = run_with_version("v16.20.2");
        assert_eq!(result, StepResult::DryRun);
        assert_eq!(executor.calls(), vec!["node --version"]);
    }

    #[test]
    fn current_node_is_left_alone() {
        let (result, _) = run_with_version("v18.19.0");
        assert_eq!(
            result,
            StepResult::Skipped("Node.js and yarn already installed".to_string())
        );
    }

    #[test]
    fn newer_node_is_left_alone() {
        let (result, _) = run_with_version("v20.11.1");
        assert!(matches!(result, StepResult::Skipped(_)));
    }

    #[test]
    fn missing_tools_are_planned_without_probing() {
        let dir = tempfile::tempdir().unwrap();
        // Neither node nor yarn is on PATH.
        let executor = Arc::new(MockExecutor::ok(""));
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, ScriptedPrompter::new());
        let result = InstallNode.run(&ctx.with_dry_run(true)).unwrap();
        assert_eq!(result, StepResult::DryRun);
        assert_eq!(executor.call_count(), 0);
    }
}
