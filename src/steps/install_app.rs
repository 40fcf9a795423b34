//! App installation on a site.
use anyhow::Result;

use super::input::{existing_bench, existing_site, required};
use super::processing::{converge, summarize};
use super::{Context, Step, StepId, StepResult};
use crate::resources::site::AppResource;

/// Fetch an app into the bench when needed and install it on a site.
#[derive(Debug)]
pub struct InstallApp;

impl Step for InstallApp {
    fn id(&self) -> StepId {
        StepId::InstallApp
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let bench = existing_bench(ctx)?;
        let site = existing_site(ctx, &bench)?;
        let app = required(
            ctx,
            "app",
            "App name or git URL",
            ctx.profile.apps.first().map(String::as_str),
            "app name",
        )?;
        let branch = ctx.prompter.input("app_branch", "Branch (blank for default)", Some(""))?;

        let resource = AppResource::new(&bench, &site, &app, ctx.bench_program(), &*ctx.executor)
            .with_branch(Some(branch));
        let outcome = converge(ctx, &resource, "install")?;
        Ok(summarize(
            &[outcome],
            &format!("{} already installed on {site}", resource.name()),
        ))
    }
}
