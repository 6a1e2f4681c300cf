//! Replaying adapter for the `LlmClient` port.

use std::sync::Mutex;

use futures::stream;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{
    ChatRequest, ChunkStream, ExecutionRequest, LlmClient, LlmError, LlmFuture,
    StructuredRequest, TextRequest,
};

/// Serves recorded model responses from a cassette.
///
/// Text calls replay `{"Ok": "text"}`; `stream_chat` replays
/// `{"Ok": ["chunk", ...]}` and yields the chunks in order.
pub struct ReplayingLlmClient {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingLlmClient {
    /// Create a replaying LLM client backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn text(&self, method: &'static str) -> LlmFuture<'_, String> {
        let output = next_output(&self.replayer, "llm", method);
        Box::pin(async move { replay_result(&output, method) })
    }
}

impl LlmClient for ReplayingLlmClient {
    fn generate_structured(&self, _request: &StructuredRequest) -> LlmFuture<'_, String> {
        self.text("generate_structured")
    }

    fn generate_text(&self, _request: &TextRequest) -> LlmFuture<'_, String> {
        self.text("generate_text")
    }

    fn stream_chat(&self, _request: &ChatRequest) -> ChunkStream<'_> {
        let output = next_output(&self.replayer, "llm", "stream_chat");
        match replay_result::<Vec<String>>(&output, "stream_chat") {
            Ok(chunks) => Box::pin(stream::iter(chunks.into_iter().map(Ok::<String, LlmError>))),
            Err(e) => Box::pin(stream::iter([Err::<String, LlmError>(e)])),
        }
    }

    fn simulate_execution(&self, _request: &ExecutionRequest) -> LlmFuture<'_, String> {
        self.text("simulate_execution")
    }
}
