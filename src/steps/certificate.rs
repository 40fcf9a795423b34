//! TLS certificate issuance with certbot.
use std::path::PathBuf;

use anyhow::Result;

use super::input::required;
use super::{Context, ProductionConfig, Step, StepId, StepResult};
use crate::dns::{check_domain, is_public};
use crate::platform::host_addresses;

/// Directory certbot keeps issued certificates in, one subdirectory per
/// domain.
pub const LETSENCRYPT_LIVE_DIR: &str = "/etc/letsencrypt/live";

/// Issue a certificate for the production domain once it resolves to this
/// host.
#[derive(Debug, Clone)]
pub struct IssueCertificate {
    /// Where existing certificates are looked up.
    pub live_dir: PathBuf,
}

impl Default for IssueCertificate {
    fn default() -> Self {
        Self {
            live_dir: PathBuf::from(LETSENCRYPT_LIVE_DIR),
        }
    }
}

impl Step for IssueCertificate {
    fn id(&self) -> StepId {
        StepId::Certificate
    }

    fn run(&self, ctx: &Context) -> Result<StepResult> {
        let default_domain = {
            let session = ctx.session();
            session
                .production
                .as_ref()
                .and_then(|p| p.domain.clone())
                .or_else(|| session.site.as_ref().map(|s| s.name.clone()))
        };
        let domain = required(ctx, "domain", "Domain", default_domain.as_deref(), "domain")?;
        let email = required(
            ctx,
            "certificate_email",
            "Email for certificate expiry notices",
            None,
            "email",
        )?;
        remember_domain(ctx, &domain, false);

        if self.live_dir.join(&domain).exists() {
            remember_domain(ctx, &domain, true);
            return Ok(StepResult::Skipped(format!(
                "certificate for {domain} already exists"
            )));
        }

        let host = host_addresses(&*ctx.executor);
        ctx.log.debug(&format!("host addresses: {host:?}"));
        if !host.is_empty() && !host.iter().any(is_public) {
            ctx.log.info(&format!(
                "this host has no public address (NAT?); only checking that {domain} resolves"
            ));
        }
        if let Err(failure) = check_domain(&*ctx.resolver, &domain, &host) {
            ctx.log.warn(&format!("{failure}; point the DNS record at this host first"));
            return Ok(StepResult::Skipped(failure.to_string()));
        }

        let args = [
            "certbot",
            "--nginx",
            "-d",
            domain.as_str(),
            "--non-interactive",
            "--agree-tos",
            "-m",
            email.as_str(),
            "--redirect",
        ];
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would run sudo {}", args.join(" ")));
            return Ok(StepResult::DryRun);
        }
        ctx.executor.run("sudo", &args)?;
        remember_domain(ctx, &domain, true);
        ctx.log.info(&format!("https://{domain} is served with TLS"));
        Ok(StepResult::Ok)
    }
}

/// Record the domain (and whether it has a certificate) on the production
/// state of this run.
fn remember_domain(ctx: &Context, domain: &str, tls: bool) {
    let mut session = ctx.session();
    let bench = session
        .production
        .as_ref()
        .map(|p| p.bench.clone())
        .or_else(|| session.bench.as_ref().map(|b| b.path.clone()));
    if let Some(bench) = bench {
        session.production = Some(ProductionConfig {
            bench,
            domain: Some(domain.to_string()),
            tls,
        });
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;

    use super::*;
    use crate::dns::MockResolver;
    use crate::prompt::ScriptedPrompter;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::SiteInstance;
    use crate::steps::test_helpers::make_context_with_resolver;

    fn resolver_answering(addr: &'static str) -> Arc<MockResolver> {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .returning(move |_| Ok(vec![addr.parse::<IpAddr>().unwrap()]));
        Arc::new(resolver)
    }

    fn answers() -> ScriptedPrompter {
        ScriptedPrompter::new()
            .answer("domain", "erp.example.com")
            .answer("certificate_email", "ops@example.com")
    }

    fn step(dir: &std::path::Path) -> IssueCertificate {
        IssueCertificate {
            live_dir: dir.join("live"),
        }
    }

    #[test]
    fn issues_when_domain_points_here() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, "203.0.113.7 10.0.0.2\n".to_string()),
            (true, String::new()),
        ]));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            answers(),
            resolver_answering("203.0.113.7"),
        );
        assert_eq!(step(dir.path()).run(&ctx).unwrap(), StepResult::Ok);
        assert_eq!(
            executor.calls(),
            vec![
                "hostname -I",
                "sudo certbot --nginx -d erp.example.com --non-interactive --agree-tos \
                 -m ops@example.com --redirect",
            ]
        );
    }

    #[test]
    fn foreign_dns_skips_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::ok("203.0.113.7\n"));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            answers(),
            resolver_answering("198.51.100.1"),
        );
        let result = step(dir.path()).run(&ctx).unwrap();
        assert!(matches!(result, StepResult::Skipped(ref r) if r.contains("not this host")));
        assert_eq!(executor.call_count(), 1);
    }

    #[test]
    fn nat_host_issues_for_public_answer() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, "172.31.5.10\n".to_string()),
            (true, String::new()),
        ]));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            answers(),
            resolver_answering("54.210.1.2"),
        );
        assert_eq!(step(dir.path()).run(&ctx).unwrap(), StepResult::Ok);
        assert!(executor.calls()[1].starts_with("sudo certbot --nginx -d erp.example.com"));
    }

    #[test]
    fn existing_certificate_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("live/erp.example.com")).unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            answers(),
            Arc::new(MockResolver::new()),
        );
        assert_eq!(
            step(dir.path()).run(&ctx).unwrap(),
            StepResult::Skipped("certificate for erp.example.com already exists".to_string())
        );
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn site_of_this_run_is_default_domain() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![(false, String::new())]));
        let prompter = ScriptedPrompter::new().answer("certificate_email", "ops@example.com");
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve()
            .with(mockall::predicate::eq("hr.example.com"))
            .times(1)
            .returning(|_| Ok(vec!["198.51.100.1".parse::<IpAddr>().unwrap()]));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            prompter,
            Arc::new(resolver),
        );
        ctx.session().site = Some(SiteInstance {
            name: "hr.example.com".to_string(),
            bench: dir.path().join("frappe-bench"),
        });
        let ctx = ctx.with_dry_run(true);
        // Host addresses unknown, so any answer passes the gate.
        assert_eq!(step(dir.path()).run(&ctx).unwrap(), StepResult::DryRun);
        assert_eq!(executor.calls(), vec!["hostname -I"]);
    }

    #[test]
    fn empty_domain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![]));
        let (ctx, _) = make_context_with_resolver(
            dir.path(),
            Arc::clone(&executor) as _,
            ScriptedPrompter::new().answer("domain", ""),
            Arc::new(MockResolver::new()),
        );
        let err = step(dir.path()).run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "domain must not be empty");
    }
}
