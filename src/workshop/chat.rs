//! AI pair-programmer session: chat log, prompts and reply reconciliation.
//!
//! The conversation lives in a [`ChatLog`]; every turn resends the log as
//! history so the session can be rebuilt from persisted state at any time.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::blueprint::Blueprint;
use super::files::FileStore;
use super::plan::{parse_reply, ActionPlan, ParsedReply, PLAN_FENCE_TAG};
use crate::error::WorkshopError;
use crate::ports::{ChatRole, ChatTurn};

/// Text that replaces a model reply whose stream failed.
pub const STREAM_FAILURE_TEXT: &str = "Sorry, an error occurred.";

/// Fenced code block with an optional info string.
static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w*)\n([\s\S]+?)```").expect("Invalid code block regex"));

/// What became of a proposed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// The plan was applied to the file store.
    Applied,
    /// The user rejected the plan.
    Discarded,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Speaker.
    pub role: ChatRole,
    /// Displayed text.
    pub text: String,
    /// Plan attached to a model reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_plan: Option<ActionPlan>,
    /// Set once the plan has been consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_status: Option<PlanStatus>,
}

impl ChatMessage {
    /// Whether this message carries a plan awaiting approval.
    #[must_use]
    pub fn has_pending_plan(&self) -> bool {
        self.proposed_plan.is_some() && self.plan_status.is_none()
    }
}

/// A fenced code block found in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info-string language, `text` when absent.
    pub language: String,
    /// Trimmed block body.
    pub code: String,
}

/// Ordered conversation of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    /// Appends a user message.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: text.into(),
            proposed_plan: None,
            plan_status: None,
        });
    }

    /// Opens an empty model message that stream chunks are appended to.
    ///
    /// Returns its index.
    pub fn begin_model_reply(&mut self) -> usize {
        self.messages.push(ChatMessage {
            role: ChatRole::Model,
            text: String::new(),
            proposed_plan: None,
            plan_status: None,
        });
        self.messages.len() - 1
    }

    /// Appends a chunk to the in-progress reply at `index`.
    pub fn append_chunk(&mut self, index: usize, chunk: &str) {
        if let Some(message) = self.model_message_mut(index) {
            message.text.push_str(chunk);
        }
    }

    /// Closes the reply at `index`, attaching any action plan it carries.
    ///
    /// Returns `None` when `index` is not a model message.
    pub fn finish_reply(&mut self, index: usize) -> Option<ParsedReply> {
        let message = self.model_message_mut(index)?;
        let parsed = parse_reply(&message.text);
        message.text = parsed.reply.text().to_string();
        message.proposed_plan = parsed.reply.plan().cloned();
        Some(parsed)
    }

    /// Replaces the reply at `index` with [`STREAM_FAILURE_TEXT`].
    pub fn fail_reply(&mut self, index: usize) {
        if let Some(message) = self.model_message_mut(index) {
            message.text = STREAM_FAILURE_TEXT.to_string();
            message.proposed_plan = None;
        }
    }

    fn model_message_mut(&mut self, index: usize) -> Option<&mut ChatMessage> {
        self.messages.get_mut(index).filter(|m| m.role == ChatRole::Model)
    }

    /// Index of the latest message with a plan awaiting approval.
    #[must_use]
    pub fn pending_plan_index(&self) -> Option<usize> {
        self.messages.iter().rposition(ChatMessage::has_pending_plan)
    }

    /// Consumes the pending plan of message `index`, marking it with `status`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::NotFound`] when the message does not exist or
    /// has no plan awaiting approval.
    pub fn take_plan(
        &mut self,
        index: usize,
        status: PlanStatus,
    ) -> Result<ActionPlan, WorkshopError> {
        let message = self
            .messages
            .get_mut(index)
            .filter(|m| m.has_pending_plan())
            .ok_or_else(|| WorkshopError::NotFound(format!("pending plan on message {index}")))?;
        message.plan_status = Some(status);
        message
            .proposed_plan
            .clone()
            .ok_or_else(|| WorkshopError::NotFound(format!("plan on message {index}")))
    }

    /// Prior turns to send as context. Empty model messages are skipped.
    #[must_use]
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .filter(|m| !(m.role == ChatRole::Model && m.text.is_empty()))
            .map(|m| ChatTurn { role: m.role, text: m.text.clone() })
            .collect()
    }

    /// Messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Message at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forgets the whole conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Session-wide system instruction for the pair programmer.
#[must_use]
pub fn system_instruction(blueprint: Option<&Blueprint>, files: &FileStore) -> String {
    let (name, description) =
        blueprint.map_or(("", ""), |b| (b.project_name.as_str(), b.description.as_str()));
    format!(
        "You are an AI pair programmer assisting a developer.\n\
         The project is \"{name}\". Description: \"{description}\".\n\
         The project files are: {files}.\n\
         The user will provide context on which file they are viewing. Be helpful and concise.\n\
         When asked to provide code, use markdown code blocks. The user can apply your code \
         suggestions to the current file with a single click.\n\
         When the user asks you to create, change, delete or rename files, propose the changes \
         as exactly one fenced block tagged {PLAN_FENCE_TAG} containing JSON of the form \
         {{\"thought\": string, \"operations\": [{{\"action\": \"CREATE_FILE\" | \"UPDATE_FILE\" | \
         \"DELETE_FILE\" | \"RENAME_FILE\", \"path\": string, \"content\"?: string, \"newPath\"?: string}}]}}. \
         CREATE_FILE and UPDATE_FILE need the complete file content; RENAME_FILE needs newPath. \
         The user reviews the plan before anything is applied.",
        files = files.paths().join(", "),
    )
}

/// Frames a user question with the file currently in view.
#[must_use]
pub fn turn_prompt(selected: Option<&str>, question: &str) -> String {
    format!(
        "The user is currently viewing the file: {}.\n\nUser question: {question}",
        selected.unwrap_or("none")
    )
}

/// Lists the fenced code blocks of a reply, in order.
#[must_use]
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    CODE_BLOCK
        .captures_iter(text)
        .map(|caps| {
            let language = caps.get(1).map_or("", |m| m.as_str());
            CodeBlock {
                language: if language.is_empty() { "text".to_string() } else { language.to_string() },
                code: caps[2].trim().to_string(),
            }
        })
        .collect()
}
