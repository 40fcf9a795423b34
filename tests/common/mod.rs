// Shared helpers for integration tests.
//
// Provides a recording fake executor that answers commands by prefix, a
// fetcher serving a fixed script, a temporary root directory with bench
// trees, and a context builder wired to a scripted prompter.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use bench_setup::config::Config;
use bench_setup::exec::{ExecResult, Executor};
use bench_setup::fetch::Fetcher;
use bench_setup::logging::Logger;
use bench_setup::platform::Identity;
use bench_setup::prompt::ScriptedPrompter;
use bench_setup::steps::Context;

/// Fetcher that serves the same body for every URL and records the URLs.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    /// Body served for every request.
    pub const BODY: &'static str = "#!/bin/sh\necho setup\n";

    /// URLs fetched so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().expect("urls lock").clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.urls.lock().expect("urls lock").push(url.to_string());
        Ok(Self::BODY.to_string())
    }
}

/// Executor that records every command and answers from prefix rules.
///
/// A command line is matched against the rules in insertion order; the
/// first rule whose prefix matches supplies the result. Unmatched commands
/// succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    rules: Vec<(String, ExecResult)>,
    on_path: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    /// Create an executor where every command succeeds silently.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`.
    pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules
            .push((prefix.to_string(), ExecResult::ok(stdout)));
        self
    }

    /// Fail commands starting with `prefix`.
    pub fn fail_on(mut self, prefix: &str, stderr: &str) -> Self {
        self.rules
            .push((prefix.to_string(), ExecResult::failed(1, stderr)));
        self
    }

    /// Report `program` as present on PATH.
    pub fn with_program(mut self, program: &str) -> Self {
        self.on_path.insert(program.to_string());
        self
    }

    /// Every command line run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Whether any recorded command line contains `needle`.
    pub fn ran(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.contains(needle))
    }

    fn answer(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let result = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(|| ExecResult::ok(""), |(_, r)| r.clone());
        self.calls.lock().expect("calls lock").push(line);
        result
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.answer(program, args).check(program, args)?)
    }

    fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.answer(program, args))
    }

    fn run_interactive(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run(program, args)
    }

    fn which(&self, program: &str) -> bool {
        self.on_path.contains(program)
    }
}

/// A temporary root directory standing in for the operator's home.
pub struct TestRoot {
    /// Backing directory, deleted on drop.
    pub dir: tempfile::TempDir,
}

impl TestRoot {
    /// Create an empty root.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path to the root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a bench directory the way `bench init` lays it out.
    pub fn bench(&self, name: &str) -> PathBuf {
        let bench = self.path().join(name);
        std::fs::create_dir_all(bench.join("apps/frappe")).expect("create apps");
        std::fs::create_dir_all(bench.join("sites")).expect("create sites");
        std::fs::create_dir_all(bench.join("config")).expect("create config");
        std::fs::write(bench.join("sites/apps.txt"), "frappe\n").expect("write apps.txt");
        bench
    }

    /// Create a site inside `bench`.
    pub fn site(&self, bench: &Path, site: &str) -> PathBuf {
        let dir = bench.join("sites").join(site);
        std::fs::create_dir_all(&dir).expect("create site");
        std::fs::write(dir.join("site_config.json"), "{\"db_name\": \"_abc\"}\n")
            .expect("write site_config.json");
        dir
    }

    /// Build a step context for an unprivileged operator of this root. It
    /// never touches the network.
    pub fn context(
        &self,
        profile: &str,
        executor: Arc<dyn Executor>,
        prompter: ScriptedPrompter,
    ) -> (Context, Arc<Logger>) {
        self.context_with_fetcher(profile, executor, prompter, Arc::new(FakeFetcher::default()))
    }

    /// Like [`context`](Self::context) with a given fetcher.
    pub fn context_with_fetcher(
        &self,
        profile: &str,
        executor: Arc<dyn Executor>,
        prompter: ScriptedPrompter,
        fetcher: Arc<dyn Fetcher>,
    ) -> (Context, Arc<Logger>) {
        let config = Config::default();
        let profile = config.profile(profile).expect("resolve profile");
        let log = Arc::new(Logger::new("test"));
        let identity = Identity::new(1000, "frappe", self.path().join("home"));
        let ctx = Context::new(
            config,
            profile,
            identity,
            self.path().to_path_buf(),
            Arc::clone(&log) as _,
            executor,
        )
        .with_prompter(Arc::new(prompter))
        .with_fetcher(fetcher);
        (ctx, log)
    }
}
