use anyhow::Context;
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::form_urlencoded::byte_serialize;

use crate::{
    cli::{
        forge::{
            ForgeClient, ForgeConnection,
            http_client::{HttpClient, SendChecked, WithAuth, read_json},
        },
        issue::{Comment, Issue, IssueState},
    },
    error::HulahoopError,
};

// =============================================================================
// Domain Types
// =============================================================================

const AUTH_SCHEME: &str = "Bearer";
const PER_PAGE: u32 = 100;
const NEXT_PAGE_HEADER: &str = "x-next-page";

pub struct GitLabClient {
    api_url: String,
    project_path: String,
    token: String,
    http_client: HttpClient,
}

impl GitLabClient {
    pub fn new(connection: ForgeConnection) -> Self {
        GitLabClient {
            api_url: connection.api_url.trim_end_matches('/').to_string(),
            project_path: connection.project_path,
            token: connection.token,
            http_client: HttpClient::new(),
        }
    }

    fn project_url(&self) -> String {
        let encoded_path: String = byte_serialize(self.project_path.as_bytes()).collect();

        format!("{}/projects/{encoded_path}", self.api_url)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http_client
            .get(url)
            .with_auth(AUTH_SCHEME, &self.token)
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http_client
            .post(url)
            .with_auth(AUTH_SCHEME, &self.token)
    }

    /// Fetches every page of a list endpoint. `build` is called once per page
    /// to create the request.
    fn get_all_pages<T, F>(&self, build: F) -> Result<Vec<T>, HulahoopError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let response = build()
                .query(&[("page", page), ("per_page", PER_PAGE)])
                .send_checked()?;
            let next_page = parse_next_page(&response);

            items.extend(read_json::<Vec<T>>(response)?);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }

    fn find_issues_by_iid(&self, id: u64) -> Result<Vec<GitLabIssue>, HulahoopError> {
        let url = format!("{}/issues", self.project_url());
        let response = self.get(&url).query(&[("iids[]", id)]).send_checked()?;

        read_json(response)
    }

    fn get_comments(&self, id: u64) -> Result<Vec<Comment>, HulahoopError> {
        let url = format!("{}/issues/{id}/notes", self.project_url());
        let notes: Vec<GitLabNote> = self.get_all_pages(|| {
            self.get(&url)
                .query(&[("sort", "desc"), ("order_by", "created_at")])
        })?;
        let mut comments = notes
            .into_iter()
            .filter(|note| !note.system)
            .map(Comment::from)
            .collect::<Vec<_>>();

        comments.sort_by(|a, b| b.id.cmp(&a.id));
        comments.dedup_by_key(|c| c.id);

        Ok(comments)
    }
}

impl ForgeClient for GitLabClient {
    fn list_issues(&self, open_only: bool) -> anyhow::Result<Vec<Issue>> {
        let url = format!("{}/issues", self.project_url());
        let issues: Vec<GitLabIssue> = self
            .get_all_pages(|| {
                let request = self.get(&url);

                if open_only {
                    request.query(&[("state", "opened")])
                } else {
                    request
                }
            })
            .context("Failed to fetch issues from GitLab API")?;

        Ok(issues
            .into_iter()
            .map(Issue::from)
            .filter(|issue| !open_only || issue.state == IssueState::Open)
            .collect())
    }

    fn get_issue_by_id(&self, id: u64, with_comments: bool) -> anyhow::Result<Option<Issue>> {
        let Some(found) = self
            .find_issues_by_iid(id)
            .with_context(|| format!("Failed to fetch issue #{id} from GitLab API"))?
            .into_iter()
            .find(|issue| issue.iid == id)
        else {
            return Ok(None);
        };
        let mut issue = Issue::from(found);

        if with_comments {
            issue.comments = self
                .get_comments(id)
                .with_context(|| format!("Failed to fetch comments of issue #{id}"))?;
        }

        Ok(Some(issue))
    }

    fn create_issue(&self, title: &str, description: &str) -> anyhow::Result<Issue> {
        let url = format!("{}/issues", self.project_url());
        let request_body = serde_json::json!({
            "title": title,
            "description": description,
        });
        let response: Response = self
            .post(&url)
            .json(&request_body)
            .send_checked()
            .context("Failed to create issue on GitLab")?;
        let issue: GitLabIssue = read_json(response).context("Failed to parse GitLab API response")?;

        Ok(issue.into())
    }

    fn add_comment(&self, issue_id: u64, body: &str) -> anyhow::Result<()> {
        let matches = self
            .find_issues_by_iid(issue_id)
            .with_context(|| format!("Failed to look up issue #{issue_id} on GitLab"))?
            .into_iter()
            .filter(|issue| issue.iid == issue_id)
            .count();

        if matches != 1 {
            return Err(HulahoopError::IssueNotResolved {
                id: issue_id,
                found: matches,
            }
            .into());
        }

        let url = format!("{}/issues/{issue_id}/notes", self.project_url());

        self.post(&url)
            .json(&serde_json::json!({ "body": body }))
            .send_checked()
            .with_context(|| format!("Failed to comment on issue #{issue_id}"))?;

        Ok(())
    }
}

fn parse_next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// GitLab API response for issues.
/// https://docs.gitlab.com/api/issues/#list-project-issues
#[derive(Debug, serde::Deserialize)]
struct GitLabIssue {
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    web_url: String,
}

impl From<GitLabIssue> for Issue {
    fn from(issue: GitLabIssue) -> Self {
        let state = if issue.state == "closed" {
            IssueState::Closed
        } else {
            IssueState::Open
        };

        Issue {
            id: issue.iid,
            title: issue.title,
            description: issue.description.unwrap_or_default(),
            state,
            url: issue.web_url,
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct GitLabUser {
    username: String,
    name: String,
}

/// GitLab API response for issue notes.
/// https://docs.gitlab.com/api/notes/#list-project-issue-notes
#[derive(Debug, serde::Deserialize)]
struct GitLabNote {
    id: u64,
    body: String,
    author: GitLabUser,
    #[serde(default)]
    system: bool,
}

impl From<GitLabNote> for Comment {
    fn from(note: GitLabNote) -> Self {
        Comment {
            id: note.id,
            body: note.body,
            author_username: note.author.username,
            author_name: note.author.name,
        }
    }
}
