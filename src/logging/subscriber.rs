//! The wizard's `tracing` subscriber: coloured console output on
//! stdout/stderr plus a plain-text file that records every event under the
//! step it happened in.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

use super::utils::{log_file_path, redact, strip_ansi, timestamp};

/// Event target of step headers.
pub(super) const STAGE_TARGET: &str = "bench_setup::stage";
/// Event target of dry-run plans.
pub(super) const DRY_RUN_TARGET: &str = "bench_setup::dry_run";

/// How an event is rendered, from its level and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    DryRun,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(event: &tracing::Event<'_>) -> Self {
        let metadata = event.metadata();
        match (*metadata.level(), metadata.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Tag written before the message in the log file.
    const fn file_tag(self) -> &'static str {
        match self {
            Self::Stage | Self::Info => "",
            Self::DryRun => "plan: ",
            Self::Error => "error: ",
            Self::Warn => "warn: ",
            Self::Debug => "debug: ",
        }
    }
}

/// The event's `message`, with password arguments masked.
fn message_of(event: &tracing::Event<'_>) -> String {
    #[derive(Default)]
    struct Message(String);

    impl Visit for Message {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message::default();
    event.record(&mut message);
    redact(&message.0)
}

#[derive(Debug)]
struct LogFile {
    file: fs::File,
    /// Step currently running, set by each stage header.
    step: Option<String>,
}

/// Appends every event to `<cache>/bench-setup/<command>.log`, prefixed
/// with the time and the step it belongs to.
#[derive(Debug)]
pub(super) struct FileLayer {
    state: Mutex<LogFile>,
}

impl FileLayer {
    /// Truncate the log file for `command` and write the run header.
    ///
    /// `None` when the cache directory or the file is unusable; the wizard
    /// then logs to the console only.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version = option_env!("BENCH_SETUP_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let mut file = fs::File::create(&path).ok()?;
        writeln!(
            file,
            "# bench-setup {version}: {command} started {} UTC",
            timestamp(true)
        )
        .ok()?;
        Some(Self {
            state: Mutex::new(LogFile { file, step: None }),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _: tracing_subscriber::layer::Context<'_, S>) {
        let kind = Kind::of(event);
        let msg = strip_ansi(&message_of(event));
        let Ok(mut log) = self.state.lock() else {
            return;
        };
        if kind == Kind::Stage {
            log.step = Some(msg.clone());
            writeln!(log.file, "\n[{}] == {msg} ==", timestamp(false)).ok();
            return;
        }
        let step = log
            .step
            .as_deref()
            .map_or_else(String::new, |s| format!("[{s}] "));
        writeln!(
            log.file,
            "[{}] {step}{}{msg}",
            timestamp(false),
            kind.file_tag()
        )
        .ok();
    }
}

/// Console rendering: stage headers in bold blue, plans and warnings in
/// yellow, errors in red, debug dimmed.
struct WizardFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for WizardFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let msg = message_of(event);
        match Kind::of(event) {
            Kind::Stage => writeln!(writer, "\n\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Kind::DryRun => writeln!(writer, "  \x1b[33mwould\x1b[0m {}", plan_text(&msg)),
            Kind::Error => writeln!(writer, "\x1b[31merror:\x1b[0m {msg}"),
            Kind::Warn => writeln!(writer, "\x1b[33mwarning:\x1b[0m {msg}"),
            Kind::Info => writeln!(writer, "  {msg}"),
            Kind::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Dry-run messages read "would install: git"; the console already
/// prints "would", so drop it from the message.
fn plan_text(msg: &str) -> &str {
    msg.strip_prefix("would ").unwrap_or(msg)
}

/// Install the global subscriber. Call once, before anything logs.
///
/// The console shows `info` and above (`debug` with `verbose`), warnings
/// and errors on stderr; `RUST_LOG` overrides the console level. The log
/// file always receives `debug` and above.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console = fmt::layer()
        .event_format(WizardFormatter)
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .and(std::io::stdout.with_min_level(Level::INFO)),
        )
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(console)
        .with(FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG)))
        .init();
}
