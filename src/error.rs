//! Error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HulahoopError {
    #[error("Remote '{0}' is not configured in this repository")]
    RemoteNotFound(String),

    #[error(
        "Did not understand remote URL '{0}'. Only the form <user>@<host>:<path> is supported"
    )]
    UnrecognizedRemoteUrl(String),

    #[error("No access token found for host '{host}'. Store one with: git config {key} <TOKEN>")]
    CredentialMissing { host: String, key: String },

    #[error("{}", format_transport_error(.status, .message))]
    Transport { status: Option<u16>, message: String },

    #[error("Expected exactly one issue #{id}, but the forge returned {found}")]
    IssueNotResolved { id: u64, found: usize },

    #[error("{0}")]
    Validation(String),
}

impl HulahoopError {
    pub fn validation(message: impl Into<String>) -> Self {
        HulahoopError::Validation(message.into())
    }
}

fn format_transport_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Forge API error (HTTP {status}): {message}"),
        None => format!("Failed to reach the forge API: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_message_includes_status() {
        let err = HulahoopError::Transport {
            status: Some(401),
            message: "401 Unauthorized".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Forge API error (HTTP 401): 401 Unauthorized"
        );

        let err = HulahoopError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Failed to reach the forge API: connection refused"
        );
    }

    #[test]
    fn test_credential_missing_mentions_git_config_key() {
        let err = HulahoopError::CredentialMissing {
            host: "gitlab.com".to_string(),
            key: "git-hulahoop.gitlab.com.token".to_string(),
        };

        assert!(err.to_string().contains("git config git-hulahoop.gitlab.com.token"));
    }
}
