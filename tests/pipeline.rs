#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for step sequencing.
//!
//! These drive real steps through [`run_sequence`] against a recording
//! executor, checking the fail-fast rule, the package check and the
//! Node.js version gate.

mod common;

use std::sync::Arc;

use bench_setup::cli::GlobalOpts;
use bench_setup::commands::CommandSetup;
use bench_setup::config::{Config, DEFAULT_PACKAGES};
use bench_setup::error::{CommandError, PlatformError};
use bench_setup::logging::{Logger, StepStatus};
use bench_setup::platform::Identity;
use bench_setup::prompt::ScriptedPrompter;
use bench_setup::steps::{StepId, run_sequence};
use common::{FakeExecutor, FakeFetcher, TestRoot};

fn dpkg_status(except: &[&str]) -> String {
    DEFAULT_PACKAGES
        .iter()
        .filter(|p| !except.contains(p))
        .map(|p| format!("{p} install ok installed\n"))
        .collect()
}

// ---------------------------------------------------------------------------
// Superuser refusal
// ---------------------------------------------------------------------------

#[test]
fn superuser_is_refused_before_any_command() {
    let root = TestRoot::new();
    let executor = Arc::new(FakeExecutor::new());
    let global = GlobalOpts {
        root: Some(root.path().to_path_buf()),
        config: Some(root.path().join("config.toml")),
        ..GlobalOpts::default()
    };

    let err = CommandSetup::init(
        &global,
        Identity::new(0, "root", "/root"),
        Arc::new(Logger::new("test")),
        Arc::clone(&executor) as _,
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PlatformError>(),
        Some(PlatformError::Superuser)
    ));
    assert!(executor.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

#[test]
fn installed_packages_are_never_reinstalled() {
    let root = TestRoot::new();
    let executor = Arc::new(
        FakeExecutor::new().respond("dpkg-query", &dpkg_status(&["redis-server", "nginx"])),
    );
    let (ctx, log) = root.context("frappe", Arc::clone(&executor) as _, ScriptedPrompter::new());

    run_sequence(&[StepId::Packages], &ctx).unwrap();

    let installs: Vec<String> = executor
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("sudo apt-get install"))
        .collect();
    assert_eq!(installs, vec!["sudo apt-get install -y redis-server nginx"]);
    assert_eq!(log.step_entries()[0].status, StepStatus::Ok);
}

#[test]
fn fully_installed_host_skips_package_step() {
    let root = TestRoot::new();
    let executor = Arc::new(FakeExecutor::new().respond("dpkg-query", &dpkg_status(&[])));
    let (ctx, log) = root.context("frappe", Arc::clone(&executor) as _, ScriptedPrompter::new());

    run_sequence(&[StepId::Packages], &ctx).unwrap();

    assert!(!executor.ran("apt-get"));
    let entry = &log.step_entries()[0];
    assert_eq!(entry.status, StepStatus::Skipped);
    assert_eq!(
        entry.message.as_deref(),
        Some("all packages already installed")
    );
}

// ---------------------------------------------------------------------------
// Fail-fast
// ---------------------------------------------------------------------------

#[test]
fn failing_command_stops_later_steps() {
    let root = TestRoot::new();
    let executor = Arc::new(
        FakeExecutor::new()
            .respond("dpkg-query", "")
            .fail_on("sudo apt-get update", "Temporary failure resolving 'deb.debian.org'")
            .with_program("node"),
    );
    let (ctx, log) = root.context("frappe", Arc::clone(&executor) as _, ScriptedPrompter::new());

    let err = run_sequence(&[StepId::Packages, StepId::Node, StepId::Database], &ctx).unwrap_err();

    let command = err
        .chain()
        .find_map(|e| e.downcast_ref::<CommandError>())
        .expect("command error in chain");
    assert_eq!(command.program, "sudo");
    assert!(!executor.ran("node --version"));
    assert!(!executor.ran("mysql"));
    let entries = log.step_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, StepStatus::Failed);
    assert_eq!(log.failure_count(), 1);
}

// ---------------------------------------------------------------------------
// Node.js gate
// ---------------------------------------------------------------------------

fn node_step(version: &str) -> (StepStatus, Arc<FakeExecutor>, Arc<FakeFetcher>) {
    let root = TestRoot::new();
    let executor = Arc::new(
        FakeExecutor::new()
            .respond("node --version", &format!("{version}\n"))
            .with_program("node")
            .with_program("yarn"),
    );
    let fetcher = Arc::new(FakeFetcher::default());
    let (ctx, log) = root.context_with_fetcher(
        "frappe",
        Arc::clone(&executor) as _,
        ScriptedPrompter::new(),
        Arc::clone(&fetcher) as _,
    );
    run_sequence(&[StepId::Node], &ctx).unwrap();
    let status = log.step_entries()[0].status;
    (status, executor, fetcher)
}

#[test]
fn node_16_is_upgraded() {
    let (status, executor, fetcher) = node_step("v16.20.2");
    assert_eq!(status, StepStatus::Ok);
    assert_eq!(fetcher.urls(), vec![Config::default().node.setup_url]);

    let calls = executor.calls();
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert_eq!(calls[0], "node --version");
    let script = calls[1]
        .strip_prefix("sudo -E bash ")
        .expect("setup script runs as root");
    assert!(!std::path::Path::new(script).exists());
    assert_eq!(calls[2], "sudo apt-get install -y nodejs");
}

#[test]
fn node_18_and_later_are_kept() {
    for version in ["v18.19.0", "v20.11.1"] {
        let (status, executor, fetcher) = node_step(version);
        assert_eq!(status, StepStatus::Skipped, "{version}");
        assert_eq!(executor.calls(), vec!["node --version".to_string()]);
        assert!(!executor.ran("sudo -E bash"));
        assert!(!executor.ran("apt-get install -y nodejs"));
        assert!(fetcher.urls().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Database hardening
// ---------------------------------------------------------------------------

fn database_step(executor: FakeExecutor) -> (Vec<(StepStatus, Option<String>)>, Arc<FakeExecutor>) {
    let root = TestRoot::new();
    let executor = Arc::new(executor.with_program("mysql"));
    let (ctx, log) = root.context("frappe", Arc::clone(&executor) as _, ScriptedPrompter::new());
    run_sequence(&[StepId::Database, StepId::Database], &ctx).unwrap();
    let entries = log
        .step_entries()
        .into_iter()
        .map(|e| (e.status, e.message))
        .collect();
    (entries, executor)
}

#[test]
fn secured_root_is_left_alone_on_every_run() {
    let (entries, executor) = database_step(FakeExecutor::new().fail_on(
        "mysql --no-defaults",
        "ERROR 1045 (28000): Access denied for user 'root'@'localhost'",
    ));
    for (status, message) in &entries {
        assert_eq!(*status, StepStatus::Skipped);
        assert_eq!(message.as_deref(), Some("database server already secured"));
    }
    assert!(!executor.ran("mysql_secure_installation"));
    assert!(!executor.ran("sudo mysql "));
}

#[test]
fn open_root_runs_the_wizard() {
    let (entries, executor) = database_step(FakeExecutor::new().respond("mysql --no-defaults", "1\n"));
    assert_eq!(entries[0].0, StepStatus::Ok);
    assert!(executor.ran("sudo mysql_secure_installation"));
}

#[test]
fn stopped_server_is_reported_not_secured() {
    let (entries, executor) = database_step(FakeExecutor::new().fail_on(
        "mysql --no-defaults",
        "ERROR 2002 (HY000): Can't connect to local server through socket",
    ));
    assert_eq!(entries[0].0, StepStatus::Skipped);
    assert_eq!(entries[0].1.as_deref(), Some("database server is not running"));
    assert!(!executor.ran("mysql_secure_installation"));
}
