use crate::cli::{forge::gitlab::GitLabClient, issue::Issue};

/// The forge type requested on the command line or in the config.
#[derive(Clone, Copy, Debug, Default, PartialEq, clap::ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum RemoteType {
    /// Infer the forge type from the remote's host.
    #[default]
    Auto,
    GitLab,
}

/// A concrete forge API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ApiType {
    GitLab,
}

impl RemoteType {
    /// Resolves `auto` to a concrete API type.
    ///
    /// GitLab is the only implemented API, so `auto` always lands there.
    pub fn resolve(self, host: &str) -> ApiType {
        match self {
            RemoteType::GitLab => ApiType::GitLab,
            RemoteType::Auto => {
                let api_type = guess_api_type_from_host(host).unwrap_or(ApiType::GitLab);

                tracing::debug!(host, ?api_type, "Resolved remote type 'auto'");

                api_type
            }
        }
    }
}

fn guess_api_type_from_host(host: &str) -> Option<ApiType> {
    let host = host.to_lowercase();

    if host.contains("gitlab") {
        return Some(ApiType::GitLab);
    }

    tracing::debug!("Host '{host}' doesn't look like a known forge. Falling back to GitLab.");

    None
}

/// Everything an API client needs to talk to a project.
pub struct ForgeConnection {
    /// Base URL of the REST API, e.g. `https://gitlab.com/api/v4`.
    pub api_url: String,
    /// The project path, e.g. `group/repo`.
    pub project_path: String,
    pub token: String,
}

/// Creates a forge client for the given API type.
pub fn create_forge_client(api: ApiType, connection: ForgeConnection) -> Box<dyn ForgeClient> {
    match api {
        ApiType::GitLab => Box::new(GitLabClient::new(connection)),
    }
}

/// The default API base URL for a host.
pub fn default_api_url(api: ApiType, host: &str) -> String {
    match api {
        ApiType::GitLab => format!("https://{host}/api/v4"),
    }
}

/// Issue operations a forge supports. Every method performs remote calls and
/// none of them retries.
pub trait ForgeClient {
    /// Fetches issues in the forge's default order. With `open_only`, closed
    /// issues are left out. Comments are not fetched.
    fn list_issues(&self, open_only: bool) -> anyhow::Result<Vec<Issue>>;

    /// Fetches the issue with the project scoped number `id`. Returns
    /// `Ok(None)` if there is no such issue.
    fn get_issue_by_id(&self, id: u64, with_comments: bool) -> anyhow::Result<Option<Issue>>;

    /// Creates a new issue.
    fn create_issue(&self, title: &str, description: &str) -> anyhow::Result<Issue>;

    /// Adds a comment to the issue with the number `issue_id`.
    fn add_comment(&self, issue_id: u64, body: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_type() {
        assert_eq!(RemoteType::GitLab.resolve("github.com"), ApiType::GitLab);
        assert_eq!(RemoteType::Auto.resolve("gitlab.com"), ApiType::GitLab);
        assert_eq!(RemoteType::Auto.resolve("git.example.org"), ApiType::GitLab);
    }

    #[test]
    fn test_guess_api_type_from_host() {
        assert_eq!(guess_api_type_from_host("GitLab.example.com"), Some(ApiType::GitLab));
        assert_eq!(guess_api_type_from_host("localhost"), None);
    }

    #[test]
    fn test_default_api_url() {
        assert_eq!(
            default_api_url(ApiType::GitLab, "gitlab.example.com"),
            "https://gitlab.example.com/api/v4"
        );
    }
}
