//! bench CLI installation.
use anyhow::Result;

use super::processing::{converge, summarize};
use super::{Context, Step, StepId, StepResult};
use crate::resources::bench::BenchCli;

/// Install the bench CLI into `<root>/env`, or into the active virtual
/// environment.
#[derive(Debug)]
pub struct InstallBenchCli;

impl Step for InstallBenchCli {
    fn id(&self) -> StepId {
        StepId::BenchCli
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let settings = &ctx.config.bench;
        let cli = BenchCli::new(
            &ctx.root,
            ctx.virtualenv.clone(),
            &settings.python,
            &settings.pip_package,
            &*ctx.executor,
        );
        let outcome = converge(ctx, &cli, "install")?;
        Ok(summarize(&[outcome], "bench CLI already installed"))
    }
}
