//! Check-then-apply for single resources, dry-run aware.
use anyhow::Result;

use super::{Context, StepResult};
use crate::resources::{Resource, ResourceChange, ResourceState};

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Outcome {
    /// Already in the desired state.
    AlreadyCorrect,
    /// Changed.
    Applied,
    /// Would have been changed (dry run).
    WouldApply,
    /// Could not be applied.
    Skipped(String),
}

/// Bring `resource` into its desired state, or report what would change.
pub(super) fn converge<R: Resource + ?Sized>(
    ctx: &Context,
    resource: &R,
    verb: &str,
) -> Result<Outcome> {
    let desc = resource.description();
    let state = resource.current_state()?;
    ctx.log.debug(&format!("{desc}: {state:?}"));
    match state {
        ResourceState::Correct => {
            ctx.log.info(&format!("ok: {desc}"));
            Ok(Outcome::AlreadyCorrect)
        }
        ResourceState::Invalid { reason } => {
            ctx.log.warn(&format!("cannot {verb} {desc}: {reason}"));
            Ok(Outcome::Skipped(reason))
        }
        ResourceState::Missing | ResourceState::Incorrect { .. } if ctx.dry_run => {
            let msg = if let ResourceState::Incorrect { current } = &state {
                format!("would {verb} {desc} (currently {current})")
            } else {
                format!("would {verb} {desc}")
            };
            ctx.log.dry_run(&msg);
            Ok(Outcome::WouldApply)
        }
        ResourceState::Missing | ResourceState::Incorrect { .. } => apply(ctx, resource, verb),
    }
}

/// Apply `resource` unconditionally.
pub(super) fn apply<R: Resource + ?Sized>(
    ctx: &Context,
    resource: &R,
    verb: &str,
) -> Result<Outcome> {
    let desc = resource.description();
    match resource.apply()? {
        ResourceChange::Applied => {
            ctx.log.info(&format!("{verb}: {desc}"));
            Ok(Outcome::Applied)
        }
        ResourceChange::AlreadyCorrect => Ok(Outcome::AlreadyCorrect),
        ResourceChange::Skipped { reason } => {
            ctx.log.warn(&format!("did not {verb} {desc}: {reason}"));
            Ok(Outcome::Skipped(reason))
        }
    }
}

/// Fold resource outcomes into a step result.
///
/// Any change makes the step `Ok`; any planned change in a dry run makes it
/// `DryRun`; otherwise the step is skipped with the first skip reason, or
/// `satisfied` when everything was already correct.
pub(super) fn summarize(outcomes: &[Outcome], satisfied: &str) -> StepResult {
    if outcomes.contains(&Outcome::WouldApply) {
        return StepResult::DryRun;
    }
    if outcomes.contains(&Outcome::Applied) {
        return StepResult::Ok;
    }
    let reason = outcomes
        .iter()
        .find_map(|o| match o {
            Outcome::Skipped(reason) => Some(reason.clone()),
            _ => None,
        })
        .unwrap_or_else(|| satisfied.to_string());
    StepResult::Skipped(reason)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::Applicable;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::test_helpers::make_context;

    #[derive(Debug)]
    struct Fake {
        state: ResourceState,
        applied: AtomicBool,
    }

    impl Fake {
        fn new(state: ResourceState) -> Self {
            Self {
                state,
                applied: AtomicBool::new(false),
            }
        }
    }

    impl Applicable for Fake {
        fn description(&self) -> String {
            "fake".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            self.applied.store(true, Ordering::SeqCst);
            Ok(ResourceChange::Applied)
        }
    }

    impl Resource for Fake {
        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.clone())
        }
    }

    fn context(dry_run: bool) -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = make_context(
            dir.path(),
            Arc::new(MockExecutor::with_responses(vec![])),
            ScriptedPrompter::new(),
        );
        (dir, ctx.with_dry_run(dry_run))
    }

    #[test]
    fn missing_resource_is_applied() {
        let (_dir, ctx) = context(false);
        let fake = Fake::new(ResourceState::Missing);
        assert_eq!(converge(&ctx, &fake, "create").unwrap(), Outcome::Applied);
        assert!(fake.applied.load(Ordering::SeqCst));
    }

    #[test]
    fn correct_resource_is_left_alone() {
        let (_dir, ctx) = context(false);
        let fake = Fake::new(ResourceState::Correct);
        assert_eq!(
            converge(&ctx, &fake, "create").unwrap(),
            Outcome::AlreadyCorrect
        );
        assert!(!fake.applied.load(Ordering::SeqCst));
    }

    #[test]
    fn dry_run_does_not_apply() {
        let (_dir, ctx) = context(true);
        let fake = Fake::new(ResourceState::Incorrect {
            current: "v16.20.2".to_string(),
        });
        assert_eq!(converge(&ctx, &fake, "upgrade").unwrap(), Outcome::WouldApply);
        assert!(!fake.applied.load(Ordering::SeqCst));
    }

    #[test]
    fn invalid_resource_is_skipped_with_reason() {
        let (_dir, ctx) = context(false);
        let fake = Fake::new(ResourceState::Invalid {
            reason: "mysql not installed".to_string(),
        });
        assert_eq!(
            converge(&ctx, &fake, "secure").unwrap(),
            Outcome::Skipped("mysql not installed".to_string())
        );
    }

    #[test]
    fn summarize_prefers_change_over_skip() {
        assert_eq!(
            summarize(&[Outcome::AlreadyCorrect, Outcome::Applied], "done"),
            StepResult::Ok
        );
        assert_eq!(
            summarize(&[Outcome::Applied, Outcome::WouldApply], "done"),
            StepResult::DryRun
        );
        assert_eq!(
            summarize(&[Outcome::AlreadyCorrect], "already installed"),
            StepResult::Skipped("already installed".to_string())
        );
        assert_eq!(
            summarize(
                &[Outcome::AlreadyCorrect, Outcome::Skipped("no servers".to_string())],
                "done"
            ),
            StepResult::Skipped("no servers".to_string())
        );
    }
}
