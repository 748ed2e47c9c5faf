//! The `issue` subcommand.

use std::io::Write;

use clap::{Args, Subcommand};

use crate::{
    cli::forge::ForgeClient,
    error::HulahoopError,
    io::{self, MessageEditor, Renderer},
};

// =============================================================================
// CLI Arguments
// =============================================================================

pub const DEFAULT_MAX_TITLE_LENGTH: u32 = 140;

/// Command-line arguments for the `issue` subcommand.
#[derive(Args)]
pub struct IssueCommandArgs {
    #[command(subcommand)]
    pub subcommand: IssueCommand,
}

/// Available subcommands for issue subcommand.
#[derive(Subcommand)]
pub enum IssueCommand {
    /// List issues.
    #[command(alias = "ls")]
    List(IssueListCommandArgs),

    /// Create a new issue.
    #[command(alias = "create")]
    New(IssueNewCommandArgs),

    /// Show an issue and its comments.
    Show(IssueShowCommandArgs),

    /// Comment on an issue.
    Comment(IssueCommentCommandArgs),
}

/// Command-line arguments for listing issues.
#[derive(Args)]
pub struct IssueListCommandArgs {
    /// Include closed issues
    #[arg(short, long)]
    pub all: bool,
}

/// Command-line arguments for creating an issue.
#[derive(Args)]
pub struct IssueNewCommandArgs {
    /// Issue message. Everything before the first ". " is the title, the rest
    /// is the description. Opens your text editor if omitted.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Allow issues without a description
    #[arg(short, long)]
    pub title_only: bool,

    /// Maximum number of characters in the title [default: 140]
    #[arg(long, value_name = "N")]
    pub max_title_length: Option<u32>,
}

/// Command-line arguments for showing an issue.
#[derive(Args)]
pub struct IssueShowCommandArgs {
    /// The issue number
    #[arg(value_name = "ISSUE_NO")]
    pub issue_no: u64,
}

/// Command-line arguments for commenting on an issue.
#[derive(Args)]
pub struct IssueCommentCommandArgs {
    /// The issue number
    #[arg(value_name = "ISSUE_NO")]
    pub issue_no: u64,

    /// The comment. Opens your text editor if omitted.
    #[arg(short, long)]
    pub message: Option<String>,
}

// =============================================================================
// Domain Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IssueState {
    /// Open issues that haven't been closed yet.
    Open,
    /// Closed issues that have been resolved.
    Closed,
}

/// An issue from a git forge.
#[derive(Clone, Debug, PartialEq)]
pub struct Issue {
    /// The project scoped issue number (e.g., #42).
    pub id: u64,
    pub title: String,
    /// The description; empty if there is none.
    pub description: String,
    pub state: IssueState,
    /// The web URL to view this issue.
    pub url: String,
    /// Comments, newest first. Empty unless they were requested.
    pub comments: Vec<Comment>,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}: {}", self.id, self.title)
    }
}

/// A comment on an issue.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    /// The author's handle, without the `@`.
    pub author_username: String,
    /// The author's display name.
    pub author_name: String,
}

// =============================================================================
// Command Logic
// =============================================================================

/// Prints the one-line form of every issue in the order the forge returns
/// them.
pub fn list_issues(
    client: &dyn ForgeClient,
    args: IssueListCommandArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let issues = client.list_issues(!args.all)?;

    for issue in issues {
        writeln!(out, "{issue}")?;
    }

    Ok(())
}

/// Creates an issue from the given message or from what the user writes in
/// the text editor.
///
/// # Errors
///
/// Returns [`HulahoopError::Validation`] if the title is missing or too long,
/// or the description is missing without `--title-only`.
pub fn new_issue(
    client: &dyn ForgeClient,
    editor: &dyn MessageEditor,
    args: IssueNewCommandArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let max_title_length = args.max_title_length.unwrap_or(DEFAULT_MAX_TITLE_LENGTH);
    let (mut title, mut body) = match args.message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => split_message(message),
        _ => (String::new(), String::new()),
    };

    if title.is_empty() || (body.is_empty() && !args.title_only) {
        if let Some(text) = editor.edit(&io::issue_message_template(&title, &body))? {
            let message = io::parse_issue_message(&text);

            if !message.title.is_empty() || !message.body.is_empty() {
                title = message.title;
                body = message.body;
            }
        }
    }

    validate_issue_message(&title, &body, args.title_only, max_title_length)?;

    let issue = client.create_issue(&title, &body)?;

    writeln!(out, "{issue}")?;
    writeln!(out, "{}", issue.url)?;

    Ok(())
}

/// Shows an issue with its comments. A missing issue is reported, not
/// treated as an error.
pub fn show_issue(
    client: &dyn ForgeClient,
    renderer: &Renderer,
    args: IssueShowCommandArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    renderer.ensure_available()?;

    let Some(issue) = client.get_issue_by_id(args.issue_no, true)? else {
        writeln!(out, "Issue #{} not found", args.issue_no)?;

        return Ok(());
    };
    let document = io::format_issue_document(&issue, renderer.document_kind());

    renderer.display(&document, out)
}

/// Adds a comment to an issue. Without a message the text editor is opened;
/// if nothing is entered there, nothing is sent.
pub fn comment_on_issue(
    client: &dyn ForgeClient,
    editor: &dyn MessageEditor,
    args: IssueCommentCommandArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut message = args.message.as_deref().unwrap_or_default().trim().to_string();

    if message.is_empty() {
        message = editor
            .edit(&io::comment_message_template())?
            .map(|text| io::parse_comment_message(&text))
            .unwrap_or_default();
    }

    if message.is_empty() {
        writeln!(out, "No message entered")?;

        return Ok(());
    }

    client.add_comment(args.issue_no, &message)?;

    tracing::info!(issue = args.issue_no, "Comment added");

    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Splits an inline message on the first `". "` into title and description.
fn split_message(message: &str) -> (String, String) {
    match message.split_once(". ") {
        Some((title, body)) => (title.trim().to_string(), body.trim().to_string()),
        None => (message.to_string(), String::new()),
    }
}

fn validate_issue_message(
    title: &str,
    body: &str,
    title_only: bool,
    max_title_length: u32,
) -> Result<(), HulahoopError> {
    if title.is_empty() {
        return Err(HulahoopError::validation("Aborting: the issue has no title."));
    }

    if body.is_empty() && !title_only {
        return Err(HulahoopError::validation(
            "Aborting: the issue has no description. Use --title-only to create it anyway.",
        ));
    }

    let title_length = title.chars().count();

    if title_length > max_title_length as usize {
        return Err(HulahoopError::validation(format!(
            "Aborting: the title is {title_length} characters long, the maximum is {max_title_length}. \
             Shorten it or raise --max-title-length."
        )));
    }

    Ok(())
}
