//! Production services: nginx and supervisor.
use std::path::PathBuf;

use anyhow::Result;

use super::input::existing_bench;
use super::processing::converge;
use super::{Context, ProductionConfig, Step, StepId, StepResult};
use crate::resources::nginx_assets::NginxAssetsResource;
use crate::resources::service_link::ServiceLinkResource;

/// Directory nginx loads extra server configurations from.
pub const NGINX_CONF_DIR: &str = "/etc/nginx/conf.d";

/// Directory supervisor loads program configurations from.
pub const SUPERVISOR_CONF_DIR: &str = "/etc/supervisor/conf.d";

/// Commands that validate and reload the services, in order.
const RELOAD_COMMANDS: &[&[&str]] = &[
    &["nginx", "-t"],
    &["systemctl", "reload", "nginx"],
    &["supervisorctl", "reread"],
    &["supervisorctl", "update"],
];

/// Run `bench setup production`, fix the asset location of the generated
/// nginx configuration, link the generated configurations into the system
/// service directories and reload both services.
#[derive(Debug, Clone)]
pub struct SetupProduction {
    /// Where the nginx configuration is linked.
    pub nginx_dir: PathBuf,
    /// Where the supervisor configuration is linked.
    pub supervisor_dir: PathBuf,
}

impl Default for SetupProduction {
    fn default() -> Self {
        Self {
            nginx_dir: PathBuf::from(NGINX_CONF_DIR),
            supervisor_dir: PathBuf::from(SUPERVISOR_CONF_DIR),
        }
    }
}

impl Step for SetupProduction {
    fn id(&self) -> StepId {
        StepId::Production
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let bench = existing_bench(ctx)?;
        let program = ctx.bench_program();
        let program = program.to_string_lossy();
        let user = ctx.identity.user.as_str();

        if ctx.dry_run {
            ctx.log.dry_run(&format!(
                "would run sudo {program} setup production {user} --yes"
            ));
        } else {
            ctx.executor
                .run_in(&bench, "sudo", &[&program, "setup", "production", user, "--yes"])?;
        }

        let assets = NginxAssetsResource::new(
            bench.join("config").join("nginx.conf"),
            ctx.config.production.assets_for(&bench),
        );
        converge(ctx, &assets, "patch")?;

        let links = [
            ServiceLinkResource::for_bench(&bench, "nginx.conf", &self.nginx_dir, &*ctx.executor),
            ServiceLinkResource::for_bench(
                &bench,
                "supervisor.conf",
                &self.supervisor_dir,
                &*ctx.executor,
            ),
        ];
        for link in &links {
            converge(ctx, link, "link")?;
        }

        for args in RELOAD_COMMANDS {
            if ctx.dry_run {
                ctx.log.dry_run(&format!("would run sudo {}", args.join(" ")));
            } else {
                ctx.executor.run("sudo", args)?;
            }
        }

        let mut session = ctx.session();
        let domain = session
            .production
            .as_ref()
            .filter(|p| p.bench == bench)
            .and_then(|p| p.domain.clone());
        session.production = Some(ProductionConfig {
            bench,
            domain,
            tls: false,
        });
        drop(session);

        if ctx.dry_run {
            return Ok(StepResult::DryRun);
        }
        ctx.log.info("nginx and supervisor reloaded");
        Ok(StepResult::Ok)
    }
}
