//! `bench-setup` binary entry point.
use std::process::ExitCode;
use std::sync::Arc;

use bench_setup::cli::{Cli, Command};
use bench_setup::commands;
use bench_setup::logging::{Logger, init_subscriber};
use bench_setup::platform::Identity;
use clap::Parser;

/// Exit status after an operator interrupt.
const INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let command = args.command();

    match command {
        Command::Version => {
            commands::version::run();
            return ExitCode::SUCCESS;
        }
        Command::Steps => {
            commands::steps::run();
            return ExitCode::SUCCESS;
        }
        Command::Menu | Command::Run(_) | Command::Pipeline => {}
    }

    // Checked before the subscriber exists so a refused run leaves no log file.
    let identity = match Identity::detect().and_then(|id| id.ensure_unprivileged().map(|()| id)) {
        Ok(identity) => identity,
        Err(e) => {
            report(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let name = match &command {
        Command::Run(_) => "run",
        Command::Pipeline => "pipeline",
        _ => "menu",
    };
    init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));

    let interrupt_log = Arc::clone(&log);
    if let Err(e) = ctrlc::set_handler(move || {
        interrupt_log.warn("interrupted");
        std::process::exit(INTERRUPTED);
    }) {
        log.debug(&format!("cannot install interrupt handler: {e}"));
    }

    let result = match &command {
        Command::Run(opts) => commands::run::run(&args.global, opts, identity, &log),
        Command::Pipeline => commands::run::pipeline(&args.global, identity, &log),
        _ => commands::menu::run(&args.global, identity, &log),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stderr)]
fn report(msg: &str) {
    eprintln!("ERROR: {msg}");
}
