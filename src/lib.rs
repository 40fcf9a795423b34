//! Frappe bench provisioning engine.
//!
//! Interactive wizard that prepares a Debian/Ubuntu host for self-hosted
//! Frappe benches: system packages, Node.js, the database server, the bench
//! CLI, benches, sites and apps, then nginx/supervisor production setup and
//! a TLS certificate. Every step inspects the host before it acts, so re-running a step
//! only does what is still missing.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: TOML configuration, profiles and their menus
//! - **[`resources`]**: idempotent `check + apply` primitives (packages, benches, sites, symlinks)
//! - **[`steps`]**: named pipeline steps wired to resources and operator prompts
//! - **[`commands`]**: top-level subcommand orchestration (`menu`, `run`, `pipeline`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dns;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod logging;
pub mod nginx;
pub mod platform;
pub mod prompt;
pub mod resources;
pub mod steps;
