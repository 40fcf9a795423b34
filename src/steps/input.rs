//! Prompt helpers shared by the bench- and site-scoped steps.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{BenchInstance, Context, SiteInstance};
use crate::error::ValidationError;
use crate::resources::bench::is_bench;
use crate::resources::is_plain_name;
use crate::resources::site::site_dir;

/// Ask for a value that must not be empty.
pub(super) fn required(
    ctx: &Context,
    key: &str,
    prompt: &str,
    default: Option<&str>,
    what: &'static str,
) -> Result<String> {
    let value = ctx.prompter.input(key, prompt, default)?;
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(what).into());
    }
    Ok(value.trim().to_string())
}

/// Ask for a bench or site name. It becomes a directory under the root or
/// the bench's `sites/`, so anything but a single path component is
/// rejected.
pub(super) fn directory_name(
    ctx: &Context,
    key: &str,
    prompt: &str,
    default: Option<&str>,
    what: &'static str,
) -> Result<String> {
    let name = required(ctx, key, prompt, default, what)?;
    if !is_plain_name(&name) {
        return Err(ValidationError::InvalidName { what, name }.into());
    }
    Ok(name)
}

/// Ask for a secret that must not be empty.
pub(super) fn required_secret(
    ctx: &Context,
    key: &str,
    prompt: &str,
    what: &'static str,
) -> Result<String> {
    let value = ctx.prompter.password(key, prompt)?;
    if value.is_empty() {
        return Err(ValidationError::Empty(what).into());
    }
    Ok(value)
}

/// Ask for an existing bench and remember it for later steps.
pub(super) fn existing_bench(ctx: &Context) -> Result<PathBuf> {
    let default = ctx.default_bench_name();
    let name = directory_name(ctx, "bench_name", "Bench name", Some(default.as_str()), "bench name")?;
    let path = ctx.bench_path(&name);
    if !is_bench(&path) {
        return Err(ValidationError::MissingBench(name).into());
    }
    let mut session = ctx.session();
    if session.bench.as_ref().is_none_or(|b| b.path != path) {
        session.bench = Some(BenchInstance {
            path: path.clone(),
            branch: None,
        });
    }
    drop(session);
    Ok(path)
}

/// Ask for an existing site of `bench` and remember it for later steps.
pub(super) fn existing_site(ctx: &Context, bench: &Path) -> Result<String> {
    let default = ctx.default_site_name();
    let site = directory_name(ctx, "site_name", "Site name", default.as_deref(), "site name")?;
    if !site_dir(bench, &site).is_dir() {
        return Err(ValidationError::MissingSite {
            bench: bench_label(bench),
            site,
        }
        .into());
    }
    ctx.session().site = Some(SiteInstance {
        name: site.clone(),
        bench: bench.to_path_buf(),
    });
    Ok(site)
}

/// Ask whether to redo work that already exists. The default is to skip.
pub(super) fn confirm_overwrite(ctx: &Context, key: &str, what: &str) -> Result<bool> {
    ctx.prompter
        .confirm(key, &format!("{what} already exists. Overwrite?"), false)
}

fn bench_label(bench: &Path) -> String {
    bench
        .file_name()
        .map_or_else(|| bench.display().to_string(), |n| n.to_string_lossy().to_string())
}
