//! Command-line argument model.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::steps::StepId;

/// Top-level CLI entry point for the Frappe bench provisioning wizard.
#[derive(Parser, Debug)]
#[command(
    name = "bench-setup",
    about = "Interactive provisioning wizard for self-hosted Frappe benches",
    version
)]
pub struct Cli {
    /// Subcommand; the interactive menu when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared across all subcommands.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The subcommand to run, defaulting to the menu.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Menu)
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Profile to use (frappe, erpnext, or one defined in the config file)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Root directory for the virtual environment and benches [env: BENCH_SETUP_ROOT, default: $HOME]
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file [default: $XDG_CONFIG_HOME/bench-setup/config.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inspect state and print what would change, without changing anything
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// TOML file of prompt answers for unattended runs
    #[arg(short, long, global = true)]
    pub answers: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the interactive menu of the active profile
    Menu,
    /// Run the named steps in order, stopping at the first failure
    Run(RunOpts),
    /// Run every step of the active profile's menu in order
    Pipeline,
    /// List step ids and names
    Steps,
    /// Print version information
    Version,
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct RunOpts {
    /// Steps to run
    #[arg(required = true, value_enum)]
    pub steps: Vec<StepId>,
}
