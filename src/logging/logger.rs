//! The run's [`Log`] implementation: emits `tracing` events and keeps the
//! step outcomes for the closing summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, StepEntry, StepStatus, Tally};
use super::utils::log_file_path;

/// Logger for one subcommand run.
///
/// Events go to whatever subscriber is installed; with the one from
/// [`init_subscriber`](super::init_subscriber) that is the console and
/// `<cache>/bench-setup/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`. Only remembers where the log file lives; the
    /// subscriber creates it.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Log file of this run, if the cache directory is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Recorded steps, in order.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tally().failed
    }

    /// Outcome counts so far.
    #[must_use]
    pub fn tally(&self) -> Tally {
        self.steps
            .lock()
            .map_or_else(|_| Tally::default(), |g| Tally::of(g.iter().map(|e| e.status)))
    }

    /// Fatal or step-failing problem.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Something the operator should look at.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Header of a step.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Progress.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Inspection results and commands; console only with `--verbose`.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// A change a dry run would have made.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Remember a step's outcome for the summary.
    pub fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// One line per recorded step, the counts, then where the log file is.
    /// Prints nothing when no step ran.
    pub fn print_summary(&self) {
        let steps = self.step_entries();
        if steps.is_empty() {
            return;
        }
        self.stage("Summary");
        for step in &steps {
            let (icon, color) = step.status.marker();
            match &step.message {
                Some(detail) => self.info(&format!("{color}{icon} {}\x1b[0m: {detail}", step.name)),
                None => self.info(&format!("{color}{icon} {}\x1b[0m", step.name)),
            }
        }
        self.info(&Tally::of(steps.iter().map(|s| s.status)).to_string());
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        Self::stage(self, msg);
    }

    fn info(&self, msg: &str) {
        Self::info(self, msg);
    }

    fn debug(&self, msg: &str) {
        Self::debug(self, msg);
    }

    fn warn(&self, msg: &str) {
        Self::warn(self, msg);
    }

    fn error(&self, msg: &str) {
        Self::error(self, msg);
    }

    fn dry_run(&self, msg: &str) {
        Self::dry_run(self, msg);
    }

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        Self::record_step(self, name, status, message);
    }
}
