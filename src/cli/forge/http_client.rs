use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::HulahoopError;

const USER_AGENT: &str = concat!("git-hulahoop/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    reqwest_client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            reqwest_client: reqwest::blocking::Client::new(),
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        tracing::debug!(%url, "GET");

        self.reqwest_client
            .get(url)
            .header("User-Agent", USER_AGENT)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        tracing::debug!(%url, "POST");

        self.reqwest_client
            .post(url)
            .header("User-Agent", USER_AGENT)
    }
}

pub trait WithAuth {
    fn with_auth(self, auth_scheme: &str, token: &str) -> RequestBuilder;
}

impl WithAuth for RequestBuilder {
    fn with_auth(self, auth_scheme: &str, token: &str) -> RequestBuilder {
        self.header("Authorization", format!("{auth_scheme} {token}"))
    }
}

/// Sends a request exactly once and turns every non-success outcome into a
/// [`HulahoopError::Transport`].
pub trait SendChecked {
    fn send_checked(self) -> Result<Response, HulahoopError>;
}

impl SendChecked for RequestBuilder {
    fn send_checked(self) -> Result<Response, HulahoopError> {
        let response = self.send().map_err(|e| HulahoopError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;
        let status = response.status();

        tracing::debug!(status = status.as_u16(), "response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();

        Err(HulahoopError::Transport {
            status: Some(status.as_u16()),
            message: extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
        })
    }
}

/// Decodes a successful response body.
pub fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HulahoopError> {
    let status = response.status().as_u16();

    response.json::<T>().map_err(|e| HulahoopError::Transport {
        status: Some(status),
        message: format!("Failed to parse API response: {e}"),
    })
}

/// Pulls the human readable part out of a JSON error body, e.g.
/// `{"message": "404 Project Not Found"}` or `{"error": "invalid_token"}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("message").or_else(|| value.get("error"))?;

    match message {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        // GitLab reports field validation errors as an object
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"message": "404 Project Not Found"}"#),
            Some("404 Project Not Found".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"error": "invalid_token", "error_description": "x"}"#),
            Some("invalid_token".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"message": {"title": ["is too long"]}}"#),
            Some(r#"{"title":["is too long"]}"#.to_string())
        );
        assert_eq!(extract_error_message("<html>Bad Gateway</html>"), None);
    }
}
