//! Symlinks from system service directories to bench-generated configs.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A symlink under a root-owned directory (such as `/etc/nginx/conf.d`),
/// created with `sudo ln -sfn`.
#[derive(Debug)]
pub struct ServiceLinkResource<'a> {
    /// The bench file the link points to.
    pub source: PathBuf,
    /// Where the link lives.
    pub link: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> ServiceLinkResource<'a> {
    /// Create a new service link resource.
    #[must_use]
    pub const fn new(source: PathBuf, link: PathBuf, executor: &'a dyn Executor) -> Self {
        Self {
            source,
            link,
            executor,
        }
    }

    /// Link `<bench>/config/<file>` as `<dir>/<bench-name>.conf`.
    #[must_use]
    pub fn for_bench(
        bench: &Path,
        file: &str,
        dir: &Path,
        executor: &'a dyn Executor,
    ) -> Self {
        let name = bench
            .file_name()
            .map_or_else(|| "bench".to_string(), |n| n.to_string_lossy().to_string());
        Self::new(
            bench.join("config").join(file),
            dir.join(format!("{name}.conf")),
            executor,
        )
    }
}

impl Applicable for ServiceLinkResource<'_> {
    fn description(&self) -> String {
        format!("{} -> {}", self.link.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let source = self.source.to_string_lossy();
        let link = self.link.to_string_lossy();
        self.executor.run("sudo", &["ln", "-sfn", &source, &link])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ServiceLinkResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        std::fs::read_link(&self.link).map_or_else(
            |_| {
                if self.link.exists() {
                    Ok(ResourceState::Incorrect {
                        current: "link path is a regular file".to_string(),
                    })
                } else {
                    Ok(ResourceState::Missing)
                }
            },
            |existing| {
                if existing == self.source {
                    Ok(ResourceState::Correct)
                } else {
                    Ok(ResourceState::Incorrect {
                        current: format!("points to {}", existing.display()),
                    })
                }
            },
        )
    }
}
