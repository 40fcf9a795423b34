//! Commands: run named steps, or the whole profile pipeline.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, RunOpts};
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::Identity;
use crate::steps::{StepId, run_sequence};

/// Run the steps named on the command line, in order.
///
/// # Errors
///
/// Returns an error if setup fails or any step fails.
pub fn run(
    global: &GlobalOpts,
    opts: &RunOpts,
    identity: Identity,
    log: &Arc<Logger>,
) -> Result<()> {
    run_steps(global, identity, log, |_| opts.steps.clone())
}

/// Run every step of the active profile's menu, in menu order.
///
/// # Errors
///
/// Returns an error if setup fails or any step fails.
pub fn pipeline(global: &GlobalOpts, identity: Identity, log: &Arc<Logger>) -> Result<()> {
    run_steps(global, identity, log, |setup| setup.ctx.profile.pipeline())
}

fn run_steps(
    global: &GlobalOpts,
    identity: Identity,
    log: &Arc<Logger>,
    select: impl FnOnce(&super::CommandSetup) -> Vec<StepId>,
) -> Result<()> {
    let setup = super::CommandSetup::init(
        global,
        identity,
        Arc::clone(log),
        Arc::new(SystemExecutor),
    )?;
    let steps = select(&setup);
    log.debug(&format!(
        "steps: {}",
        steps
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    let result = run_sequence(&steps, &setup.ctx);
    super::finish(log, result)
}
