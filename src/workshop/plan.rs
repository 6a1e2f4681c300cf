//! AI action plans embedded in pair-programmer replies.
//!
//! A reply may carry one fenced block tagged [`PLAN_FENCE_TAG`] whose body is
//! an [`ActionPlan`]. Extraction is lexical and best-effort; parsing is
//! validated. Whatever fails, the raw reply text survives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkshopError;

/// Info-string tag that marks the action-plan fence.
pub const PLAN_FENCE_TAG: &str = "json_actions";

const FENCE: &str = "```";

/// File-system operation kinds a plan may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Create a new file (`content` required).
    CreateFile,
    /// Replace an existing file's content (`content` required).
    UpdateFile,
    /// Remove a file.
    DeleteFile,
    /// Move a file (`newPath` required).
    RenameFile,
}

/// One requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOperation {
    /// Operation kind.
    pub action: ActionKind,
    /// Target path.
    pub path: String,
    /// New content for create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Destination for rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl fmt::Display for ActionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action, &self.new_path) {
            (ActionKind::CreateFile, _) => write!(f, "create {}", self.path),
            (ActionKind::UpdateFile, _) => write!(f, "update {}", self.path),
            (ActionKind::DeleteFile, _) => write!(f, "delete {}", self.path),
            (ActionKind::RenameFile, Some(to)) => write!(f, "rename {} -> {to}", self.path),
            (ActionKind::RenameFile, None) => write!(f, "rename {} -> ?", self.path),
        }
    }
}

/// A proposed set of file-system changes awaiting user approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// The model's reasoning.
    #[serde(default)]
    pub thought: String,
    /// Operations, applied in order.
    pub operations: Vec<ActionOperation>,
}

impl ActionPlan {
    /// Parses a plan body.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::PlanParse`] if the body is not a valid plan.
    pub fn parse(body: &str) -> Result<Self, WorkshopError> {
        serde_json::from_str(body).map_err(|e| WorkshopError::PlanParse(e.to_string()))
    }
}

/// Lexical result of scanning a reply for the plan fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
    /// No tagged fence.
    Absent,
    /// Exactly one complete tagged fence.
    Found {
        /// Text between the fence lines.
        body: &'a str,
        /// Byte offset where the opening fence starts.
        start: usize,
        /// Byte offset just past the closing fence.
        end: usize,
    },
    /// A tagged fence without its closing fence.
    Unterminated,
    /// More than one tagged fence.
    Ambiguous,
}

/// Locates the opening fence at or after `from`; returns (fence start, body start).
fn find_opening(text: &str, from: usize) -> Option<(usize, usize)> {
    let marker = format!("{FENCE}{PLAN_FENCE_TAG}");
    let mut cursor = from;
    while let Some(rel) = text[cursor..].find(&marker) {
        let start = cursor + rel;
        let after_tag = start + marker.len();
        let rest = &text[after_tag..];
        let line_end = rest.find('\n').map_or(text.len(), |i| after_tag + i + 1);
        // The tag must end the info string ("```json_actionsX" is a different tag).
        if text[after_tag..line_end].trim().is_empty() {
            return Some((start, line_end));
        }
        cursor = after_tag;
    }
    None
}

/// Locates the closing fence of a body starting at `body_start`.
///
/// The fence must open a line: JSON strings cannot hold a raw newline, so a
/// fence inside file content (an escaped `\n` before it) never closes the block.
fn find_closing(text: &str, body_start: usize) -> Option<usize> {
    let body = &text[body_start..];
    if body.starts_with(FENCE) {
        return Some(body_start);
    }
    body.find(&format!("\n{FENCE}")).map(|i| body_start + i + 1)
}

/// Finds the single tagged plan fence in `text`.
#[must_use]
pub fn extract_plan_block(text: &str) -> Extraction<'_> {
    let Some((start, body_start)) = find_opening(text, 0) else {
        return Extraction::Absent;
    };
    let Some(body_end) = find_closing(text, body_start) else {
        return Extraction::Unterminated;
    };
    let end = body_end + FENCE.len();
    if find_opening(text, end).is_some() {
        return Extraction::Ambiguous;
    }
    Extraction::Found { body: text[body_start..body_end].trim(), start, end }
}

/// A completed reply, with or without an attached plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// Plain prose (also the fallback when a plan could not be read).
    Prose {
        /// Displayed text.
        text: String,
    },
    /// Prose with the plan block removed, plus the parsed plan.
    WithPlan {
        /// Displayed text.
        prose: String,
        /// The proposed plan.
        plan: ActionPlan,
    },
}

impl ChatReply {
    /// Text to display.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Prose { text } => text,
            Self::WithPlan { prose, .. } => prose,
        }
    }

    /// Attached plan, if any.
    #[must_use]
    pub fn plan(&self) -> Option<&ActionPlan> {
        match self {
            Self::Prose { .. } => None,
            Self::WithPlan { plan, .. } => Some(plan),
        }
    }
}

/// A parsed reply and an optional diagnostic explaining why a plan was not attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// The reply to display.
    pub reply: ChatReply,
    /// Set when a plan fence was present but could not be used.
    pub diagnostic: Option<String>,
}

/// Splits a completed reply into prose and an optional action plan.
#[must_use]
pub fn parse_reply(text: &str) -> ParsedReply {
    let prose_only = |diagnostic: Option<String>| ParsedReply {
        reply: ChatReply::Prose { text: text.to_string() },
        diagnostic,
    };

    match extract_plan_block(text) {
        Extraction::Absent => prose_only(None),
        Extraction::Unterminated => {
            prose_only(Some("action plan block is missing its closing fence".into()))
        }
        Extraction::Ambiguous => {
            prose_only(Some("reply contains more than one action plan block; none applied".into()))
        }
        Extraction::Found { body, start, end } => match ActionPlan::parse(body) {
            Ok(plan) => {
                let prose = [text[..start].trim(), text[end..].trim()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                ParsedReply { reply: ChatReply::WithPlan { prose, plan }, diagnostic: None }
            }
            Err(e) => prose_only(Some(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PLAN_REPLY: &str = "Here's my plan.\n```json_actions\n{\"thought\":\"t\",\"operations\":[{\"action\":\"CREATE_FILE\",\"path\":\"a.js\",\"content\":\"x\"}]}\n```";

    #[test]
    fn parses_plan_and_strips_block() {
        let parsed = parse_reply(PLAN_REPLY);
        assert_eq!(parsed.diagnostic, None);
        assert_eq!(parsed.reply.text(), "Here's my plan.");

        let plan = parsed.reply.plan().unwrap();
        assert_eq!(plan.thought, "t");
        assert_eq!(
            plan.operations,
            vec![ActionOperation {
                action: ActionKind::CreateFile,
                path: "a.js".into(),
                content: Some("x".into()),
                new_path: None,
            }]
        );
    }

    #[test]
    fn operations_display_as_short_summaries() {
        let rename = ActionOperation {
            action: ActionKind::RenameFile,
            path: "a.js".into(),
            content: None,
            new_path: Some("b.js".into()),
        };
        assert_eq!(rename.to_string(), "rename a.js -> b.js");
        let delete = ActionOperation { action: ActionKind::DeleteFile, new_path: None, ..rename };
        assert_eq!(delete.to_string(), "delete a.js");
    }

    #[test]
    fn prose_after_the_block_is_kept() {
        let text = "Before.\n```json_actions\n{\"thought\":\"\",\"operations\":[]}\n```\nAfter.";
        let parsed = parse_reply(text);
        assert_eq!(parsed.reply.text(), "Before.\n\nAfter.");
    }

    #[test]
    fn plain_reply_has_no_plan() {
        let parsed = parse_reply("Just use a for loop.\n```js\nfor (;;) {}\n```");
        assert_eq!(
            parsed.reply,
            ChatReply::Prose { text: "Just use a for loop.\n```js\nfor (;;) {}\n```".into() }
        );
        assert!(parsed.diagnostic.is_none());
    }

    #[test]
    fn malformed_plan_keeps_raw_text() {
        let text = "Plan:\n```json_actions\n{\"thought\": oops}\n```";
        let parsed = parse_reply(text);
        assert_eq!(parsed.reply.text(), text);
        assert!(parsed.reply.plan().is_none());
        assert!(parsed.diagnostic.unwrap().contains("Could not parse action plan"));
    }

    #[test]
    fn unknown_action_is_a_parse_failure() {
        let text = "```json_actions\n{\"operations\":[{\"action\":\"CHMOD\",\"path\":\"a\"}]}\n```";
        assert!(parse_reply(text).diagnostic.is_some());
    }

    #[test]
    fn unterminated_and_ambiguous_blocks_are_not_parsed() {
        let open = "```json_actions\n{\"operations\":[]}";
        assert_eq!(extract_plan_block(open), Extraction::Unterminated);

        let twice = "```json_actions\n{\"operations\":[]}\n```\n```json_actions\n{\"operations\":[]}\n```";
        assert_eq!(extract_plan_block(twice), Extraction::Ambiguous);
        assert!(parse_reply(twice).reply.plan().is_none());
    }

    #[test]
    fn fences_inside_file_content_do_not_close_the_block() {
        let text = "Adding docs.\n```json_actions\n{\"thought\":\"docs\",\"operations\":[{\"action\":\"CREATE_FILE\",\"path\":\"README.md\",\"content\":\"Run:\\n```\\npython app.py\\n```\\n\"}]}\n```\nDone.";

        let parsed = parse_reply(text);

        assert_eq!(parsed.diagnostic, None);
        assert_eq!(parsed.reply.text(), "Adding docs.\n\nDone.");
        let plan = parsed.reply.plan().unwrap();
        assert_eq!(plan.operations[0].path, "README.md");
        assert_eq!(
            plan.operations[0].content.as_deref(),
            Some("Run:\n```\npython app.py\n```\n")
        );
    }

    #[test]
    fn similar_tags_are_not_plan_fences() {
        let text = "```json_actionsv2\n{\"operations\":[]}\n```";
        assert_eq!(extract_plan_block(text), Extraction::Absent);
    }

    #[test]
    fn rename_operation_uses_camel_case() {
        let plan = ActionPlan::parse(
            r#"{"operations":[{"action":"RENAME_FILE","path":"a","newPath":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(plan.operations[0].new_path.as_deref(), Some("b"));
        assert!(plan.thought.is_empty());
    }
}
