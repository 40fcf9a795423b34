//! Core logging types: step entries, status, and the [`Log`] trait.

/// Step execution result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// Human-readable step name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed successfully.
    Ok,
    /// Step was skipped: already satisfied, declined overwrite, failed gate,
    /// or rejected input.
    Skipped,
    /// Step ran in dry-run mode; no changes were applied.
    DryRun,
    /// Step encountered a fatal error.
    Failed,
}

impl StepStatus {
    /// Summary icon and ANSI colour.
    #[must_use]
    pub const fn marker(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

/// Counts of step outcomes for the run summary.
///
/// ```
/// use bench_setup::logging::{StepStatus, Tally};
///
/// let tally = Tally::of([StepStatus::Ok, StepStatus::Skipped, StepStatus::Ok]);
/// assert_eq!(tally.to_string(), "3 steps: 2 ok, 1 skipped");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Steps that changed the host.
    pub ok: usize,
    /// Steps with nothing to do, or abandoned on bad input.
    pub skipped: usize,
    /// Steps that only reported a plan.
    pub dry_run: usize,
    /// Steps that failed.
    pub failed: usize,
}

impl Tally {
    /// Count `statuses`.
    pub fn of(statuses: impl IntoIterator<Item = StepStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut t, status| {
            match status {
                StepStatus::Ok => t.ok += 1,
                StepStatus::Skipped => t.skipped += 1,
                StepStatus::DryRun => t.dry_run += 1,
                StepStatus::Failed => t.failed += 1,
            }
            t
        })
    }

    /// Number of steps counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.skipped + self.dry_run + self.failed
    }
}

impl std::fmt::Display for Tally {
    /// Only non-zero counts are listed.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} steps:", self.total())?;
        let parts = [
            (self.ok, "ok"),
            (self.skipped, "skipped"),
            (self.dry_run, "dry run"),
            (self.failed, "failed"),
        ];
        let mut first = true;
        for (count, label) in parts.into_iter().filter(|(n, _)| *n > 0) {
            write!(f, "{} {count} {label}", if first { "" } else { "," })?;
            first = false;
        }
        Ok(())
    }
}

/// Abstraction over logging backends.
///
/// Step code logs through this trait so tests can substitute a recorder
/// without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a step result for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
