//! Command: the interactive menu loop.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::platform::Identity;
use crate::steps::{Context, run_sequence};

/// Show the profile menu until the operator picks Exit.
///
/// # Errors
///
/// Returns an error if setup fails or a step fails fatally.
pub fn run(global: &GlobalOpts, identity: Identity, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(
        global,
        identity,
        Arc::clone(log),
        Arc::new(SystemExecutor),
    )?;
    let result = menu_loop(&setup.ctx);
    super::finish(log, result)
}

/// Run the menu loop against `ctx`.
///
/// Exit is preselected, so an answers file that runs out of menu choices
/// ends the loop instead of repeating the last item.
///
/// # Errors
///
/// Returns an error if the operator cannot be asked or a step fails with a
/// command or unexpected error. Validation failures return to the menu.
pub fn menu_loop(ctx: &Context) -> Result<()> {
    let labels: Vec<String> = ctx.profile.menu.iter().map(|i| i.label.clone()).collect();
    let exit = ctx.profile.menu.iter().position(|i| i.is_exit());

    loop {
        let choice = ctx
            .prompter
            .select("menu", &ctx.profile.title, &labels, exit)?;
        let Some(item) = ctx.profile.menu.get(choice) else {
            anyhow::bail!("menu choice {choice} out of range");
        };
        if item.is_exit() {
            ctx.log.info("Exiting.");
            return Ok(());
        }
        ctx.log.debug(&format!("menu: {}", item.label));
        run_sequence(&item.steps, ctx)?;
    }
}
