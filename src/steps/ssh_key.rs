//! SSH key generation.
use anyhow::Result;

use super::input::{confirm_overwrite, required};
use super::processing::{Outcome, apply};
use super::{Context, Step, StepId, StepResult};
use crate::resources::ssh_key::{SshKeyResource, default_key_path};
use crate::resources::{Applicable as _, Resource as _, ResourceState};

/// Generate `~/.ssh/id_ed25519`, asking before replacing an existing key.
#[derive(Debug)]
pub struct CreateSshKey;

impl Step for CreateSshKey {
    fn id(&self) -> StepId {
        StepId::SshKey
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let path = default_key_path(ctx.home());
        let existing = SshKeyResource::new(path.clone(), "", &*ctx.executor);
        if existing.current_state()? != ResourceState::Missing
            && !confirm_overwrite(ctx, "overwrite_ssh_key", &format!("SSH key {}", path.display()))?
        {
            return Ok(StepResult::Skipped(format!(
                "SSH key {} already exists",
                path.display()
            )));
        }

        let email = required(ctx, "ssh_email", "Email for the SSH key", None, "email")?;
        let key = SshKeyResource::new(path, email, &*ctx.executor);

        if ctx.dry_run {
            ctx.log.dry_run(&format!("would generate {}", key.description()));
            return Ok(StepResult::DryRun);
        }
        if apply(ctx, &key, "generate")? != Outcome::Applied {
            return Ok(StepResult::Skipped("SSH key not generated".to_string()));
        }
        if let Ok(public) = std::fs::read_to_string(key.public_path()) {
            ctx.log
                .info(&format!("public key (add it to your git host):\n{}", public.trim()));
        }
        Ok(StepResult::Ok)
    }
}
