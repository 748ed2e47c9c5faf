//! The repository an invocation works on.

use std::path::{Path, PathBuf};

use crate::{
    cli::forge::{self, ApiType, ForgeClient, ForgeConnection, RemoteType, credentials},
    git::{self, GitConfig, GitRemoteData},
};

/// A local repository together with its selected remote.
#[derive(Debug)]
pub struct GitRepo {
    /// The path the user pointed us at.
    pub path: PathBuf,
    /// The top-level directory of the working tree.
    pub toplevel: PathBuf,
    pub config: GitConfig,
    pub remote_name: String,
    pub remote_url: String,
    /// Host and project path, derived once from `remote_url`.
    pub remote: GitRemoteData,
}

impl GitRepo {
    /// Resolves the working tree containing `path` and parses the URL of
    /// `remote_name`.
    ///
    /// # Errors
    ///
    /// Fails if `path` isn't inside a git working tree, if the remote isn't
    /// configured, or if its URL isn't of the form `<user>@<host>:<path>`.
    pub fn open(path: &Path, remote_name: &str) -> anyhow::Result<Self> {
        let toplevel = git::get_toplevel(path)?;
        let config = GitConfig::new(&toplevel);
        let remote_url = git::get_remote_url(&config, remote_name)?;
        let remote = git::parse_remote_url(&remote_url)?;

        Ok(GitRepo {
            path: path.to_path_buf(),
            toplevel,
            config,
            remote_name: remote_name.to_string(),
            remote_url,
            remote,
        })
    }
}

/// Everything a command needs: the repository and a client for its forge.
/// Built once per invocation and never changed afterwards.
pub struct RepoContext {
    pub repo: GitRepo,
    pub api_type: ApiType,
    pub client: Box<dyn ForgeClient>,
}

impl RepoContext {
    /// Looks up the access token and creates the forge client.
    pub fn connect(
        repo: GitRepo,
        remote_type: RemoteType,
        api_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_type = remote_type.resolve(&repo.remote.host);
        let token = credentials::lookup_token(&repo.config, &repo.remote.host)?;
        let api_url =
            api_url.unwrap_or_else(|| forge::default_api_url(api_type, &repo.remote.host));

        tracing::debug!(
            path = %repo.path.display(),
            toplevel = %repo.toplevel.display(),
            remote = %repo.remote_name,
            url = %repo.remote_url,
            ?api_type,
            %api_url,
            "Connecting to forge"
        );

        let client = forge::create_forge_client(
            api_type,
            ForgeConnection {
                api_url,
                project_path: repo.remote.path.clone(),
                token,
            },
        );

        Ok(RepoContext {
            repo,
            api_type,
            client,
        })
    }

    pub fn client(&self) -> &dyn ForgeClient {
        self.client.as_ref()
    }
}

impl std::fmt::Debug for RepoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoContext")
            .field("repo", &self.repo)
            .field("api_type", &self.api_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    use super::*;
    use crate::error::HulahoopError;

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Creates a scratch repository. Returns `None` if git isn't available.
    fn scratch_repo(remote_url: Option<&str>) -> Option<tempfile::TempDir> {
        let dir = tempfile::tempdir().ok()?;

        if !git(dir.path(), &["init", "--quiet"]) {
            return None;
        }

        if let Some(url) = remote_url {
            assert!(git(dir.path(), &["remote", "add", "origin", url]));
        }

        Some(dir)
    }

    #[test]
    fn test_open_repository() {
        let Some(dir) = scratch_repo(Some("git@gitlab.example.com:group/repo.git")) else {
            return;
        };
        let subdir = dir.path().join("nested");
        std::fs::create_dir(&subdir).unwrap();

        let repo = GitRepo::open(&subdir, "origin").unwrap();

        assert_eq!(repo.remote.host, "gitlab.example.com");
        assert_eq!(repo.remote.path, "group/repo");
        assert_eq!(repo.remote_url, "git@gitlab.example.com:group/repo.git");
        assert_eq!(
            repo.toplevel.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_open_repository_missing_remote() {
        let Some(dir) = scratch_repo(None) else {
            return;
        };

        let err = GitRepo::open(dir.path(), "origin").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HulahoopError>(),
            Some(HulahoopError::RemoteNotFound(_))
        ));
    }

    #[test]
    fn test_open_repository_https_remote() {
        let Some(dir) = scratch_repo(Some("https://gitlab.com/group/repo.git")) else {
            return;
        };

        let err = GitRepo::open(dir.path(), "origin").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HulahoopError>(),
            Some(HulahoopError::UnrecognizedRemoteUrl(_))
        ));
    }

    #[test]
    fn test_connect_requires_token() {
        let Some(dir) = scratch_repo(Some("git@gitlab.example.com:group/repo.git")) else {
            return;
        };
        let repo = GitRepo::open(dir.path(), "origin").unwrap();

        let err = RepoContext::connect(repo, RemoteType::Auto, None).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HulahoopError>(),
            Some(HulahoopError::CredentialMissing { host, .. }) if host == "gitlab.example.com"
        ));
    }

    #[test]
    fn test_connect_with_token() {
        let Some(dir) = scratch_repo(Some("git@gitlab.example.com:group/repo.git")) else {
            return;
        };
        assert!(git(
            dir.path(),
            &["config", "git-hulahoop.gitlab.example.com.token", "glpat-test"]
        ));
        let repo = GitRepo::open(dir.path(), "origin").unwrap();

        let context = RepoContext::connect(repo, RemoteType::Auto, None).unwrap();

        assert_eq!(context.api_type, ApiType::GitLab);
        assert_eq!(context.repo.remote.path, "group/repo");
    }
}
