//! Global git identity.
use anyhow::Result;

use super::input::required;
use super::processing::{converge, summarize};
use super::{Context, Step, StepId, StepResult};
use crate::resources::git_identity::{GitConfigResource, GitIdentity};

/// Set `user.name` and `user.email` in the global git configuration.
#[derive(Debug)]
pub struct ConfigureGitIdentity;

impl Step for ConfigureGitIdentity {
    fn id(&self) -> StepId {
        StepId::GitIdentity
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        configure(ctx, GitIdentity::read_global()?)
    }
}

/// Prompt for the identity, offering `current` as the default, and write
/// whatever differs.
fn configure(ctx: &Context, current: GitIdentity) -> Result<StepResult> {
    let name = required(
        ctx,
        "git_name",
        "Git user name",
        current.name.as_deref(),
        "git user name",
    )?;
    let email = required(
        ctx,
        "git_email",
        "Git email",
        current.email.as_deref(),
        "git email",
    )?;

    let entries = [
        GitConfigResource::new("user.name", name, current.name, &*ctx.executor),
        GitConfigResource::new("user.email", email, current.email, &*ctx.executor),
    ];
    let outcomes = entries
        .iter()
        .map(|entry| converge(ctx, entry, "set"))
        .collect::<Result<Vec<_>>>()?;
    Ok(summarize(&outcomes, "git identity already configured"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::test_helpers::make_context;

    fn identity(name: &str, email: &str) -> GitIdentity {
        GitIdentity {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
        }
    }

    #[test]
    fn unchanged_identity_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, ScriptedPrompter::new());
        let result = configure(&ctx, identity("Ops", "ops@example.com")).unwrap();
        assert_eq!(
            result,
            StepResult::Skipped("git identity already configured".to_string())
        );
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn only_changed_key_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::ok(""));
        let prompter = ScriptedPrompter::new().answer("git_email", "admin@example.com");
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, prompter);
        let result = configure(&ctx, identity("Ops", "ops@example.com")).unwrap();
        assert_eq!(result, StepResult::Ok);
        assert_eq!(
            executor.calls(),
            vec!["git config --global user.email admin@example.com"]
        );
    }

    #[test]
    fn unset_identity_requires_answers() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let prompter = ScriptedPrompter::new().answer("git_name", "");
        let (ctx, _) = make_context(dir.path(), Arc::clone(&executor) as _, prompter);
        let err = configure(&ctx, GitIdentity::default()).unwrap_err();
        assert_eq!(err.to_string(), "git user name must not be empty");
    }
}
