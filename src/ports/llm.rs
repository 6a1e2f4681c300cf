//! LLM client port for the generative-AI collaborator.
//!
//! The workshop consumes four capabilities: schema-constrained generation
//! (blueprints), raw text generation (file contents), streamed chat (the pair
//! programmer) and simulated script execution (the "run" action).

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

/// Error type returned across the LLM boundary.
pub type LlmError = Box<dyn Error + Send + Sync>;

/// Boxed future type alias used by [`LlmClient`] to keep the trait dyn-compatible.
pub type LlmFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LlmError>> + Send + 'a>>;

/// Ordered stream of text chunks produced by a chat turn.
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'a>>;

/// Request for output that must conform to a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRequest {
    /// The prompt text.
    pub prompt: String,
    /// JSON schema the response must satisfy.
    pub schema: serde_json::Value,
}

/// Sampling parameters for raw text generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
}

/// Request for free-form text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    /// The prompt text.
    pub prompt: String,
    /// System instruction framing the model's role.
    pub system_instruction: String,
    /// Sampling parameters.
    pub sampling: Sampling,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The human developer.
    User,
    /// The model.
    Model,
}

/// One prior turn sent as conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who said it.
    pub role: ChatRole,
    /// What was said.
    pub text: String,
}

/// A streamed chat request: system instruction, history and the new message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Session-wide system instruction.
    pub system_instruction: String,
    /// Earlier turns, oldest first.
    pub history: Vec<ChatTurn>,
    /// The new user message.
    pub message: String,
}

/// Request to simulate running a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to "run".
    pub code: String,
    /// Language name (e.g. `"python"`).
    pub language: String,
}

/// Sends generation requests to a language model.
pub trait LlmClient: Send + Sync {
    /// Generates JSON text conforming to the request schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, auth, rate-limit, etc.).
    fn generate_structured(&self, request: &StructuredRequest) -> LlmFuture<'_, String>;

    /// Generates raw text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn generate_text(&self, request: &TextRequest) -> LlmFuture<'_, String>;

    /// Streams the model's reply to a chat message, chunk by chunk.
    ///
    /// Errors surface as `Err` items of the stream.
    fn stream_chat(&self, request: &ChatRequest) -> ChunkStream<'_>;

    /// Returns a best-effort textual simulation of running `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn simulate_execution(&self, request: &ExecutionRequest) -> LlmFuture<'_, String>;
}
