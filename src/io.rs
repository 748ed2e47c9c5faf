//! Input/Output utilities.

use std::{
    io::Write,
    path::PathBuf,
    process::Command,
};

use anyhow::Context;
use dialoguer::Editor;
use unicode_width::UnicodeWidthStr;

use crate::cli::issue::Issue;

// =============================================================================
// Input
// =============================================================================

#[derive(Debug, PartialEq)]
pub struct InputMessage {
    pub title: String,
    pub body: String,
}

/// Something that lets the user edit a piece of text.
pub trait MessageEditor {
    /// Opens `text` for editing. Returns `None` if the user aborted.
    fn edit(&self, text: &str) -> anyhow::Result<Option<String>>;
}

/// The user's text editor ($VISUAL, $EDITOR or a configured command).
#[derive(Default)]
pub struct TextEditor {
    executable: Option<String>,
}

impl TextEditor {
    pub fn new(executable: Option<String>) -> Self {
        TextEditor { executable }
    }
}

impl MessageEditor for TextEditor {
    fn edit(&self, text: &str) -> anyhow::Result<Option<String>> {
        let mut editor = Editor::new();

        if let Some(exec) = &self.executable {
            editor.executable(exec);
        }

        tracing::debug!(executable = ?self.executable, "Opening text editor");

        editor
            .edit(text)
            .context("Failed opening text editor to enter message")
    }
}

const ISSUE_INSTRUCTIONS: &str = "\
# Please enter the title of the issue, followed by an empty line and the
# description. A title may span several lines; they are joined with spaces.
# Lines starting with '#' will be ignored.
";

/// Separates an empty title slot from a pre-filled description.
const TITLE_MARKER: &str = "# Enter the title above this line. The description follows below.";

const COMMENT_INSTRUCTIONS: &str = "\
# Please enter your comment above. Lines starting with '#' will be ignored
# and an empty message aborts the comment.
";

/// Builds the editor text for a new issue, pre-filled with what is known so
/// far.
pub fn issue_message_template(title: &str, body: &str) -> String {
    // a leading blank line would make the description the title
    if title.is_empty() && !body.is_empty() {
        return format!("\n{TITLE_MARKER}\n{body}\n\n{ISSUE_INSTRUCTIONS}");
    }

    format!("{title}\n\n{body}\n\n{ISSUE_INSTRUCTIONS}")
}

/// Builds the editor text for a new comment.
pub fn comment_message_template() -> String {
    format!("\n\n{COMMENT_INSTRUCTIONS}")
}

/// Splits edited text into title and body.
///
/// Lines starting with `#` are dropped wherever they appear. After skipping
/// leading blank lines, the non-blank lines up to the first blank line form
/// the title (joined with spaces). Everything after that blank line is the
/// body. If the title marker line is present, only the text above it is
/// searched for the title and everything below it belongs to the body.
pub fn parse_issue_message(text: &str) -> InputMessage {
    let lines = text.lines().collect::<Vec<_>>();
    let Some(marker) = lines.iter().position(|line| line.trim_end() == TITLE_MARKER) else {
        return split_title_and_body(text);
    };
    let head = split_title_and_body(&lines[..marker].join("\n"));
    let tail = parse_comment_message(&lines[marker + 1..].join("\n"));
    let body = [head.body, tail]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    InputMessage {
        title: head.title,
        body,
    }
}

fn split_title_and_body(text: &str) -> InputMessage {
    let mut lines = strip_comment_lines(text)
        .into_iter()
        .skip_while(|line| line.trim().is_empty());
    let title = lines
        .by_ref()
        .take_while(|line| !line.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    InputMessage { title, body }
}

/// Strips `#` lines and surrounding whitespace from an edited comment.
pub fn parse_comment_message(text: &str) -> String {
    strip_comment_lines(text).join("\n").trim().to_string()
}

fn strip_comment_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.trim_end_matches('\r'))
        .collect()
}

// =============================================================================
// Output
// =============================================================================

const MDV: &str = "mdv";

/// What kind of document to compose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DocumentKind {
    Plain,
    Markdown,
}

/// Where documents are displayed. Resolved once at startup.
#[derive(Debug, PartialEq)]
pub enum Renderer {
    /// Print the document as is.
    Plain,
    /// Hand the document to the `mdv` markdown viewer.
    Mdv(PathBuf),
    /// `mdv` was requested but isn't installed. Only fails once something
    /// is displayed.
    MdvMissing,
}

impl Renderer {
    /// Resolves the renderer from an explicit choice or, if there is none,
    /// by looking for `mdv` on the `PATH`.
    pub fn resolve(use_mdv: Option<bool>) -> Renderer {
        let renderer = Renderer::select(use_mdv, which::which(MDV).ok());

        tracing::debug!(?renderer, "Resolved renderer");

        renderer
    }

    fn select(use_mdv: Option<bool>, mdv: Option<PathBuf>) -> Renderer {
        match (use_mdv, mdv) {
            (Some(false), _) | (None, None) => Renderer::Plain,
            (_, Some(path)) => Renderer::Mdv(path),
            (Some(true), None) => Renderer::MdvMissing,
        }
    }

    /// Fails if the renderer can't display anything.
    pub fn ensure_available(&self) -> anyhow::Result<()> {
        if matches!(self, Renderer::MdvMissing) {
            anyhow::bail!("'{MDV}' was requested but isn't on the PATH");
        }

        Ok(())
    }

    pub fn document_kind(&self) -> DocumentKind {
        match self {
            Renderer::Plain => DocumentKind::Plain,
            Renderer::Mdv(_) | Renderer::MdvMissing => DocumentKind::Markdown,
        }
    }

    /// Displays a document. For `mdv` the document goes through a temporary
    /// file which is removed before this returns, whatever the outcome.
    pub fn display(&self, document: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        self.ensure_available()?;

        match self {
            Renderer::Plain => {
                write!(out, "{document}")?;

                Ok(())
            }
            Renderer::Mdv(executable) => {
                out.flush()?;

                let mut file = tempfile::Builder::new()
                    .prefix("git-hulahoop-")
                    .suffix(".md")
                    .tempfile()
                    .context("Failed to create a temporary file for the markdown viewer")?;

                file.write_all(document.as_bytes())?;
                file.flush()?;

                let status = Command::new(executable)
                    .arg(file.path())
                    .status()
                    .with_context(|| format!("Failed to execute {}", executable.display()))?;

                if !status.success() {
                    anyhow::bail!("{} exited with {status}", executable.display());
                }

                Ok(())
            }
            Renderer::MdvMissing => Ok(()),
        }
    }
}

/// Composes the display document for an issue and its comments.
pub fn format_issue_document(issue: &Issue, kind: DocumentKind) -> String {
    let inline = |text: &str| match kind {
        DocumentKind::Plain => sanitize(text),
        DocumentKind::Markdown => escape_markdown_inline(&sanitize(text)),
    };
    let block = |text: &str| escape_structural_lines(&sanitize(text));

    let header = format!("#{}: {}", issue.id, inline(&issue.title));
    let underline = "=".repeat(header.width().max(1));
    let mut document = format!("{header}\n{underline}\n");

    if !issue.description.trim().is_empty() {
        document.push_str(&format!("\n{}\n", block(issue.description.trim_end())));
    }

    for comment in &issue.comments {
        document.push_str(&format!(
            "\n---\n\n{} (@{}) commented:\n\n{}\n",
            inline(&comment.author_name),
            inline(&comment.author_username),
            block(comment.body.trim_end()),
        ));
    }

    document
}

/// Removes control characters except newlines and tabs so forge supplied
/// text can't drive the terminal.
fn sanitize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn escape_markdown_inline(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '|' | '~') {
            escaped.push('\\');
        }

        escaped.push(c);
    }

    escaped
}

/// Escapes lines that would read as a horizontal rule or a heading
/// underline, so bodies can't fake the separators between comments.
fn escape_structural_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            let content = line.trim_start();
            let indent = &line[..line.len() - content.len()];

            if indent_width(indent) < 4 && is_structural_line(content) {
                format!("{indent}\\{content}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Columns taken by leading whitespace, with tab stops every four columns.
fn indent_width(indent: &str) -> usize {
    indent.chars().fold(0, |column, c| match c {
        '\t' => column + 4 - column % 4,
        _ => column + 1,
    })
}

fn is_structural_line(line: &str) -> bool {
    let compact = line
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<Vec<_>>();
    let Some(&first) = compact.first() else {
        return false;
    };

    if !compact.iter().all(|&c| c == first) {
        return false;
    }

    match first {
        '=' | '-' => true,
        '*' | '_' => compact.len() >= 3,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::issue::{Comment, IssueState};

    fn issue_with_comments() -> Issue {
        Issue {
            id: 12,
            title: "Crash on start".to_string(),
            description: "It crashes.\n".to_string(),
            state: IssueState::Open,
            url: "https://gitlab.example.com/group/repo/-/issues/12".to_string(),
            comments: vec![
                Comment {
                    id: 9,
                    body: "Fixed in main".to_string(),
                    author_username: "jdoe".to_string(),
                    author_name: "Jane Doe".to_string(),
                },
                Comment {
                    id: 3,
                    body: "Same here".to_string(),
                    author_username: "rroe".to_string(),
                    author_name: "Richard Roe".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_parse_issue_message() {
        let message = parse_issue_message(
            "\n# leading comment\nFix the\n  crash on start\n\nFirst paragraph.\n# inner comment\n\nSecond paragraph.\n\n# trailing\n",
        );

        assert_eq!(
            message,
            InputMessage {
                title: "Fix the crash on start".to_string(),
                body: "First paragraph.\n\nSecond paragraph.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_issue_message_comment_line_does_not_end_title() {
        let message = parse_issue_message("Title\n# comment\ncontinued\n\nBody");

        assert_eq!(message.title, "Title continued");
        assert_eq!(message.body, "Body");
    }

    #[test]
    fn test_parse_issue_message_title_only() {
        let message = parse_issue_message("Only a title\n");

        assert_eq!(message.title, "Only a title");
        assert_eq!(message.body, "");
    }

    #[test]
    fn test_parse_issue_message_template_round_trip() {
        let message = parse_issue_message(&issue_message_template("Fix bug", ""));

        assert_eq!(message.title, "Fix bug");
        assert_eq!(message.body, "");

        let message = parse_issue_message(&issue_message_template("", ""));

        assert_eq!(message.title, "");
        assert_eq!(message.body, "");

        let message = parse_issue_message(&issue_message_template("", "body"));

        assert_eq!(message.title, "");
        assert_eq!(message.body, "body");
    }

    #[test]
    fn test_parse_issue_message_title_above_marker() {
        let template = issue_message_template("", "Steps:\n\n1. start it");

        let message = parse_issue_message(&format!("Crash on\nstart\n{template}"));

        assert_eq!(message.title, "Crash on start");
        assert_eq!(message.body, "Steps:\n\n1. start it");

        let message = parse_issue_message(&format!("Crash\n\nMore context\n{template}"));

        assert_eq!(message.title, "Crash");
        assert_eq!(message.body, "More context\n\nSteps:\n\n1. start it");
    }

    #[test]
    fn test_parse_comment_message() {
        assert_eq!(
            parse_comment_message("\nLooks good\r\n# ignored\nto me\n\n"),
            "Looks good\nto me"
        );
        assert_eq!(parse_comment_message(&comment_message_template()), "");
    }

    #[test]
    fn test_format_issue_document_plain() {
        let document = format_issue_document(&issue_with_comments(), DocumentKind::Plain);

        assert_eq!(
            document,
            "#12: Crash on start\n\
             ===================\n\
             \n\
             It crashes.\n\
             \n\
             ---\n\
             \n\
             Jane Doe (@jdoe) commented:\n\
             \n\
             Fixed in main\n\
             \n\
             ---\n\
             \n\
             Richard Roe (@rroe) commented:\n\
             \n\
             Same here\n"
        );
    }

    #[test]
    fn test_format_issue_document_without_description_or_comments() {
        let mut issue = issue_with_comments();
        issue.description = String::new();
        issue.comments.clear();

        let document = format_issue_document(&issue, DocumentKind::Plain);

        assert_eq!(document, "#12: Crash on start\n===================\n");
    }

    #[test]
    fn test_format_issue_document_strips_control_characters() {
        let mut issue = issue_with_comments();
        issue.title = "Evil\u{1b}[2J title".to_string();
        issue.comments[0].body = "line\r\nnext\u{7}".to_string();

        let document = format_issue_document(&issue, DocumentKind::Plain);

        assert!(!document.contains('\u{1b}'));
        assert!(!document.contains('\u{7}'));
        assert!(!document.contains('\r'));
        assert!(document.contains("#12: Evil[2J title"));
        assert!(document.contains("line\nnext"));
    }

    #[test]
    fn test_format_issue_document_markdown_escapes_structure() {
        let mut issue = issue_with_comments();
        issue.title = "Use *args".to_string();
        issue.comments[0].author_name = "__init__".to_string();
        issue.comments[0].body = "above\n---\nJane Doe (@jdoe) commented:\n  ***\n    ---".to_string();

        let document = format_issue_document(&issue, DocumentKind::Markdown);

        assert!(document.starts_with("#12: Use \\*args\n"));
        assert!(document.contains("\\_\\_init\\_\\_ (@jdoe) commented:"));
        assert!(document.contains("above\n\\---\n"));
        assert!(document.contains("\n  \\***\n"));
        // indented code stays untouched
        assert!(document.contains("\n    ---\n"));
        assert_eq!(document.matches("\n---\n").count(), 2);
    }

    #[test]
    fn test_format_issue_document_plain_escapes_fake_comment_boundaries() {
        let mut issue = issue_with_comments();
        issue.comments[1].body = "lgtm\n---\n\nMallory (@admin) commented:\n\nship it".to_string();

        let document = format_issue_document(&issue, DocumentKind::Plain);

        assert_eq!(document.matches("\n---\n").count(), 2);
        assert!(document.contains("lgtm\n\\---\n\nMallory (@admin) commented:"));
    }

    #[test]
    fn test_tab_indented_rule_is_left_alone() {
        assert_eq!(escape_structural_lines("\t---"), "\t---");
        assert_eq!(escape_structural_lines(" \t***"), " \t***");
        assert_eq!(escape_structural_lines("   ---"), "   \\---");
        assert_eq!(indent_width("  \t"), 4);
        assert_eq!(indent_width("\t "), 5);
    }

    #[test]
    fn test_is_structural_line() {
        assert!(is_structural_line("---"));
        assert!(is_structural_line("- - -"));
        assert!(is_structural_line("==="));
        assert!(is_structural_line("***"));
        assert!(!is_structural_line("**"));
        assert!(!is_structural_line("-- text"));
        assert!(!is_structural_line(""));
    }

    #[test]
    fn test_renderer_resolve_explicit_plain() {
        let renderer = Renderer::resolve(Some(false));

        assert_eq!(renderer, Renderer::Plain);
        assert_eq!(renderer.document_kind(), DocumentKind::Plain);
    }

    #[test]
    fn test_renderer_select() {
        let mdv = PathBuf::from("/usr/bin/mdv");

        assert_eq!(Renderer::select(None, None), Renderer::Plain);
        assert_eq!(Renderer::select(None, Some(mdv.clone())), Renderer::Mdv(mdv.clone()));
        assert_eq!(Renderer::select(Some(false), Some(mdv.clone())), Renderer::Plain);
        assert_eq!(Renderer::select(Some(true), Some(mdv.clone())), Renderer::Mdv(mdv));
        assert_eq!(Renderer::select(Some(true), None), Renderer::MdvMissing);
    }

    #[test]
    fn test_missing_mdv_fails_only_when_displaying() {
        let renderer = Renderer::select(Some(true), None);
        let mut out = Vec::new();

        let err = renderer.display("#1: Title\n", &mut out).unwrap_err();

        assert!(err.to_string().contains("isn't on the PATH"));
        assert!(out.is_empty());
    }

    /// Writes an executable stand-in for `mdv` that records the file it was
    /// given, keeps a copy of it and exits with `exit_code`.
    #[cfg(unix)]
    fn fake_mdv(dir: &std::path::Path, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("mdv");

        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s' \"$1\" > '{arg}'\ncp \"$1\" '{copy}'\nexit {exit_code}\n",
                arg = dir.join("arg").display(),
                copy = dir.join("copy.md").display(),
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        script
    }

    #[cfg(unix)]
    fn shown_file(dir: &std::path::Path) -> PathBuf {
        PathBuf::from(std::fs::read_to_string(dir.join("arg")).unwrap())
    }

    #[cfg(unix)]
    #[test]
    fn test_mdv_renderer_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::Mdv(fake_mdv(dir.path(), 0));

        renderer.display("#1: Title\n", &mut Vec::new()).unwrap();

        let shown = shown_file(dir.path());

        assert_eq!(shown.extension().and_then(|e| e.to_str()), Some("md"));
        assert!(!shown.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("copy.md")).unwrap(),
            "#1: Title\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_mdv_renderer_removes_temp_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::Mdv(fake_mdv(dir.path(), 3));

        let err = renderer.display("#1: Title\n", &mut Vec::new()).unwrap_err();

        assert!(err.to_string().contains("exited with"));
        assert!(!shown_file(dir.path()).exists());
    }

    #[test]
    fn test_plain_renderer_writes_document() {
        let mut out = Vec::new();

        Renderer::Plain.display("#1: Title\n", &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "#1: Title\n");
    }
}
