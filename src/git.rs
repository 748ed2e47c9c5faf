//! Git operations and utilities.

use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

use anyhow::Context;
use regex::Regex;

use crate::error::HulahoopError;

/// `<user>@<host>:<path>`. Neither user nor host may contain `/` or `:` so
/// that scheme URLs like `https://user@host:8443/path` never match.
static REMOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@/:]+@([^@/:]+):(.+)$").expect("remote URL pattern is valid")
});

/// Gets the absolute path of the working tree containing `path`.
///
/// # Errors
///
/// Returns an error if the git command fails; e.g. if `path` isn't inside a
/// working tree.
pub fn get_toplevel(path: &Path) -> anyhow::Result<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(path)
        .output()
        .with_context(|| format!("Failed to execute git in '{}'", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        anyhow::bail!("Failed to find the repository root: {}", stderr.trim());
    }

    let toplevel = String::from_utf8_lossy(&output.stdout);
    let toplevel = toplevel.trim();

    if toplevel.is_empty() {
        anyhow::bail!("'{}' has no working tree", path.display());
    }

    Ok(PathBuf::from(toplevel))
}

/// Read access to git configuration values.
pub trait ConfigValues {
    /// Returns the value stored under `key` or `None` if it isn't set.
    fn get_value(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Git configuration as seen from inside a repository.
#[derive(Debug, Clone)]
pub struct GitConfig {
    repo_path: PathBuf,
}

impl GitConfig {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        GitConfig {
            repo_path: repo_path.into(),
        }
    }
}

impl ConfigValues for GitConfig {
    fn get_value(&self, key: &str) -> anyhow::Result<Option<String>> {
        let output = Command::new("git")
            .args(["config", "--get", key])
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| format!("Failed to execute git config for key '{key}'"))?;

        // `git config --get` exits with 1 if the key is missing.
        match output.status.code() {
            Some(0) => {}
            Some(1) => return Ok(None),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);

                anyhow::bail!("Failed to read git config key '{key}': {}", stderr.trim());
            }
        }

        let value = String::from_utf8_lossy(&output.stdout);

        Ok(Some(value.trim_end_matches('\n').to_string()))
    }
}

/// Gets the URL for a git remote.
///
/// # Errors
///
/// Returns [`HulahoopError::RemoteNotFound`] if the remote isn't configured.
pub fn get_remote_url(config: &dyn ConfigValues, remote: &str) -> anyhow::Result<String> {
    let url = config
        .get_value(&format!("remote.{remote}.url"))
        .with_context(|| format!("Failed to get URL for remote '{remote}'"))?;

    match url {
        Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        _ => Err(HulahoopError::RemoteNotFound(remote.to_string()).into()),
    }
}

/// Parsed data from a git remote URL.
#[derive(Debug, Clone, PartialEq)]
pub struct GitRemoteData {
    /// The hostname (e.g., "gitlab.com").
    pub host: String,
    /// The project path without a trailing `.git` (e.g., "group/repo").
    pub path: String,
}

/// Parses a git remote URL into its components.
///
/// Only the compact form `<user>@<host>:<path>[.git]` is supported. The host
/// is kept verbatim while a trailing `.git` is removed from the path.
pub fn parse_remote_url(url: &str) -> Result<GitRemoteData, HulahoopError> {
    let captures = REMOTE_URL_RE
        .captures(url)
        .ok_or_else(|| HulahoopError::UnrecognizedRemoteUrl(url.to_string()))?;
    let host = captures[1].to_string();
    let path = captures[2].strip_suffix(".git").unwrap_or(&captures[2]);

    if path.is_empty() {
        return Err(HulahoopError::UnrecognizedRemoteUrl(url.to_string()));
    }

    Ok(GitRemoteData {
        host,
        path: path.to_string(),
    })
}
