//! Bench initialisation.
use anyhow::Result;

use super::input::{confirm_overwrite, directory_name, required};
use super::processing::{Outcome, apply};
use super::{BenchInstance, Context, Step, StepId, StepResult};
use crate::resources::bench::BenchResource;
use crate::resources::{Applicable as _, Resource as _, ResourceState};

/// Create a bench with `bench init`, asking before replacing an existing one.
#[derive(Debug)]
pub struct InitBench;

impl Step for InitBench {
    fn id(&self) -> StepId {
        StepId::InitBench
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let default_name = ctx.default_bench_name();
        let name = directory_name(
            ctx,
            "bench_name",
            "Bench name",
            Some(default_name.as_str()),
            "bench name",
        )?;
        let branch = required(
            ctx,
            "frappe_branch",
            "Frappe branch",
            Some(ctx.profile.frappe_branch.as_str()),
            "frappe branch",
        )?;

        let bench = BenchResource::new(
            &ctx.root,
            &name,
            &branch,
            ctx.bench_program(),
            &*ctx.executor,
        );
        let remember = || {
            ctx.session().bench = Some(BenchInstance {
                path: bench.path(),
                branch: Some(branch.clone()),
            });
        };

        let state = bench.current_state()?;
        ctx.log.debug(&format!("{}: {state:?}", bench.description()));
        let overwrite = state != ResourceState::Missing;
        if overwrite && !confirm_overwrite(ctx, "overwrite_bench", &format!("Bench '{name}'"))? {
            if state == ResourceState::Correct {
                remember();
            }
            return Ok(StepResult::Skipped(format!("bench '{name}' already exists")));
        }

        if ctx.dry_run {
            if overwrite {
                ctx.log
                    .dry_run(&format!("would remove {}", bench.path().display()));
            }
            ctx.log
                .dry_run(&format!("would initialise {}", bench.description()));
            return Ok(StepResult::DryRun);
        }

        if overwrite {
            ctx.log.info(&format!("removing {}", bench.path().display()));
            bench.remove()?;
        }
        if apply(ctx, &bench, "initialise")? != Outcome::Applied {
            return Ok(StepResult::Skipped(format!("bench '{name}' not initialised")));
        }
        remember();
        Ok(StepResult::Ok)
    }
}
