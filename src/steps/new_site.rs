//! Site creation.
use anyhow::Result;

use super::input::{confirm_overwrite, directory_name, existing_bench, required_secret};
use super::processing::{Outcome, apply};
use super::{Context, SiteInstance, Step, StepId, StepResult};
use crate::resources::site::SiteResource;
use crate::resources::{Applicable as _, Resource as _, ResourceState};

/// Create a site with `bench new-site` and make it the bench default.
#[derive(Debug)]
pub struct CreateSite;

impl Step for CreateSite {
    fn id(&self) -> StepId {
        StepId::NewSite
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let bench = existing_bench(ctx)?;
        let default_site = ctx.default_site_name();
        let site = directory_name(
            ctx,
            "site_name",
            "Site name (e.g. erp.example.com)",
            default_site.as_deref(),
            "site name",
        )?;
        let remember = || {
            ctx.session().site = Some(SiteInstance {
                name: site.clone(),
                bench: bench.clone(),
            });
        };

        let site_resource = SiteResource::new(&bench, &site, ctx.bench_program(), &*ctx.executor);
        let state = site_resource.current_state()?;
        ctx.log.debug(&format!("{}: {state:?}", site_resource.description()));
        let overwrite = state != ResourceState::Missing;
        if overwrite && !confirm_overwrite(ctx, "overwrite_site", &format!("Site '{site}'"))? {
            remember();
            return Ok(StepResult::Skipped(format!("site '{site}' already exists")));
        }

        if ctx.dry_run {
            let verb = if overwrite { "recreate" } else { "create" };
            ctx.log
                .dry_run(&format!("would {verb} {}", site_resource.description()));
            return Ok(StepResult::DryRun);
        }

        let admin = required_secret(
            ctx,
            "admin_password",
            "Administrator password",
            "administrator password",
        )?;
        let db_root = required_secret(
            ctx,
            "db_root_password",
            "Database root password",
            "database root password",
        )?;
        let resource = site_resource
            .with_credentials(&admin, &db_root)
            .force(overwrite);
        if apply(ctx, &resource, "create")? != Outcome::Applied {
            return Ok(StepResult::Skipped(format!("site '{site}' not created")));
        }
        resource.set_default()?;
        remember();
        ctx.log.info(&format!("site '{site}' is the bench default"));
        Ok(StepResult::Ok)
    }
}
