//! Database server hardening.
use anyhow::Result;

use super::processing::{converge, summarize};
use super::{Context, Step, StepId, StepResult};
use crate::resources::database::DatabaseRootResource;

/// Run `mysql_secure_installation` unless root already needs a password.
#[derive(Debug)]
pub struct SecureDatabase;

impl Step for SecureDatabase {
    fn id(&self) -> StepId {
        StepId::Database
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let root = DatabaseRootResource::new(ctx.root.clone(), &*ctx.executor);
        let outcome = converge(ctx, &root, "secure")?;
        Ok(summarize(&[outcome], "database server already secured"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::test_helpers::make_context;

    fn run(responses: Vec<(bool, String)>) -> (StepResult, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(responses).with_which(true));
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, ScriptedPrompter::new());
        (SecureDatabase.run(&ctx).unwrap(), executor.calls())
    }

    #[test]
    fn passwordless_root_runs_wizard() {
        let (result, calls) = run(vec![(true, "1\n".to_string()), (true, String::new())]);
        assert_eq!(result, StepResult::Ok);
        assert_eq!(calls[1], "sudo mysql_secure_installation");
    }

    #[test]
    fn secured_root_is_skipped() {
        let (result, calls) = run(vec![(false, String::new())]);
        assert_eq!(
            result,
            StepResult::Skipped("database server already secured".to_string())
        );
        assert_eq!(calls.len(), 1);
    }
}
