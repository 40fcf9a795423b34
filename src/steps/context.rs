use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::config::profiles::Profile;
use crate::dns::{Resolver, SystemResolver};
use crate::exec::Executor;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::logging::Log;
use crate::platform::Identity;
use crate::prompt::{Prompter, TerminalPrompter};
use crate::resources::bench::bench_program;

/// A bench directory created or selected during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchInstance {
    /// Bench directory.
    pub path: PathBuf,
    /// Framework branch it was initialised with, when known.
    pub branch: Option<String>,
}

impl BenchInstance {
    /// Directory name of the bench.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// A site created or selected during this run.
///
/// Credentials used to create the site are never kept here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInstance {
    /// Site name.
    pub name: String,
    /// Bench the site belongs to.
    pub bench: PathBuf,
}

/// Production state assembled across the production and certificate steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionConfig {
    /// Bench served in production.
    pub bench: PathBuf,
    /// Public domain, once known.
    pub domain: Option<String>,
    /// Whether a certificate has been issued for `domain`.
    pub tls: bool,
}

/// Values produced by earlier steps of this run. They become the prompt
/// defaults of later steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Most recent bench.
    pub bench: Option<BenchInstance>,
    /// Most recent site.
    pub site: Option<SiteInstance>,
    /// Production state.
    pub production: Option<ProductionConfig>,
}

/// Shared context for step execution.
pub struct Context {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Active profile.
    pub profile: Arc<Profile>,
    /// The operator.
    pub identity: Identity,
    /// Root directory holding `env/` and the benches.
    pub root: PathBuf,
    /// Pre-activated Python virtual environment, if any.
    pub virtualenv: Option<PathBuf>,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Command executor.
    pub executor: Arc<dyn Executor>,
    /// Source of operator answers.
    pub prompter: Arc<dyn Prompter>,
    /// Name resolution for the certificate gate.
    pub resolver: Arc<dyn Resolver>,
    /// Downloads of installer scripts.
    pub fetcher: Arc<dyn Fetcher>,
    /// Inspect and report only.
    pub dry_run: bool,
    session: Mutex<Session>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("profile", &self.profile.name)
            .field("identity", &self.identity)
            .field("root", &self.root)
            .field("virtualenv", &self.virtualenv)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("prompter", &self.prompter)
            .field("resolver", &"<dyn Resolver>")
            .field("fetcher", &"<dyn Fetcher>")
            .field("dry_run", &self.dry_run)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Create a context with a terminal prompter, the system resolver, an
    /// HTTPS fetcher and no virtual environment.
    #[must_use]
    pub fn new(
        config: Config,
        profile: Profile,
        identity: Identity,
        root: PathBuf,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            profile: Arc::new(profile),
            identity,
            root,
            virtualenv: None,
            log,
            executor,
            prompter: Arc::new(TerminalPrompter),
            resolver: Arc::new(SystemResolver),
            fetcher: Arc::new(HttpFetcher),
            dry_run: false,
            session: Mutex::new(Session::default()),
        }
    }

    /// Replace the prompter.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Replace the resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Use an already-activated virtual environment.
    #[must_use]
    pub fn with_virtualenv(mut self, virtualenv: Option<PathBuf>) -> Self {
        self.virtualenv = virtualenv;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Lock the session state.
    ///
    /// Recovers from a poisoned lock, which can only occur if a previous step
    /// panicked.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Operator's home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.identity.home
    }

    /// Path of the `bench` program.
    #[must_use]
    pub fn bench_program(&self) -> PathBuf {
        bench_program(&self.root, self.virtualenv.as_deref())
    }

    /// Directory of the bench called `name`.
    #[must_use]
    pub fn bench_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Bench name offered by default: the bench of this run, else the
    /// profile's.
    #[must_use]
    pub fn default_bench_name(&self) -> String {
        self.session()
            .bench
            .as_ref()
            .map(BenchInstance::name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.profile.bench_name.clone())
    }

    /// Site name offered by default: the site of this run, if any.
    #[must_use]
    pub fn default_site_name(&self) -> Option<String> {
        self.session().site.as_ref().map(|s| s.name.clone())
    }
}
