//! SSH key pair resource.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Default key location for `home`.
#[must_use]
pub fn default_key_path(home: &Path) -> PathBuf {
    home.join(".ssh").join("id_ed25519")
}

/// An ed25519 key pair generated with `ssh-keygen`.
#[derive(Debug)]
pub struct SshKeyResource<'a> {
    /// Private key path; the public key is `<path>.pub`.
    pub path: PathBuf,
    /// Comment embedded in the public key (usually an email address).
    pub comment: String,
    executor: &'a dyn Executor,
}

impl<'a> SshKeyResource<'a> {
    /// Create a new SSH key resource.
    #[must_use]
    pub fn new(path: PathBuf, comment: impl Into<String>, executor: &'a dyn Executor) -> Self {
        Self {
            path,
            comment: comment.into(),
            executor,
        }
    }

    /// Path of the public half.
    #[must_use]
    pub fn public_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".pub");
        PathBuf::from(name)
    }

    /// Delete both halves so the key can be regenerated.
    ///
    /// `ssh-keygen` asks before overwriting, which would block a captured
    /// process, so existing files are removed first.
    fn remove_existing(&self) -> Result<()> {
        for path in [self.path.clone(), self.public_path()] {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn ensure_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    if !dir.exists() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("chmod 700 {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

impl Applicable for SshKeyResource<'_> {
    fn description(&self) -> String {
        format!("ssh key {}", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }
        self.remove_existing()?;
        let path = self.path.to_string_lossy();
        self.executor.run(
            "ssh-keygen",
            &["-t", "ed25519", "-C", &self.comment, "-f", &path, "-N", ""],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SshKeyResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        match (self.path.exists(), self.public_path().exists()) {
            (false, false) => Ok(ResourceState::Missing),
            (true, true) => Ok(ResourceState::Correct),
            (true, false) => Ok(ResourceState::Incorrect {
                current: "public key missing".to_string(),
            }),
            (false, true) => Ok(ResourceState::Incorrect {
                current: "private key missing".to_string(),
            }),
        }
    }
}
