//! Recording adapter for the `LlmClient` port.

use std::sync::{Arc, Mutex};

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{
    ChatRequest, ChunkStream, ExecutionRequest, LlmClient, LlmError, LlmFuture,
    StructuredRequest, TextRequest,
};

/// Records LLM interactions while delegating to an inner implementation.
///
/// A chat stream is collected in full before it is recorded and re-emitted,
/// so the cassette holds the whole reply as one `{"Ok": [chunks]}` entry.
pub struct RecordingLlmClient {
    inner: Box<dyn LlmClient>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingLlmClient {
    /// Creates a new recording LLM client wrapping the given implementation.
    pub fn new(inner: Box<dyn LlmClient>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }

    fn recorded<'a, R>(
        &'a self,
        method: &'static str,
        request: R,
        call: LlmFuture<'a, String>,
    ) -> LlmFuture<'a, String>
    where
        R: Serialize + Send + 'a,
    {
        Box::pin(async move {
            let result = call.await;
            record_result(&self.recorder, "llm", method, &request, &result);
            result
        })
    }
}

impl LlmClient for RecordingLlmClient {
    fn generate_structured(&self, request: &StructuredRequest) -> LlmFuture<'_, String> {
        let call = self.inner.generate_structured(request);
        self.recorded("generate_structured", request.clone(), call)
    }

    fn generate_text(&self, request: &TextRequest) -> LlmFuture<'_, String> {
        let call = self.inner.generate_text(request);
        self.recorded("generate_text", request.clone(), call)
    }

    fn stream_chat(&self, request: &ChatRequest) -> ChunkStream<'_> {
        let inner = self.inner.stream_chat(request);
        let request = request.clone();
        let recorder = Arc::clone(&self.recorder);

        let collected = stream::once(async move {
            let result: Result<Vec<String>, LlmError> = inner.try_collect().await;
            record_result(&recorder, "llm", "stream_chat", &request, &result);
            result
        });

        Box::pin(collected.flat_map(|result| match result {
            Ok(chunks) => stream::iter(chunks.into_iter().map(Ok::<String, LlmError>)).left_stream(),
            Err(e) => stream::iter([Err::<String, LlmError>(e)]).right_stream(),
        }))
    }

    fn simulate_execution(&self, request: &ExecutionRequest) -> LlmFuture<'_, String> {
        let call = self.inner.simulate_execution(request);
        self.recorded("simulate_execution", request.clone(), call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::ReplayingLlmClient;
    use crate::cassette::config::CassetteConfig;
    use crate::testing::{llm_call, replayer_for};
    use serde_json::json;
    use std::path::Path;

    fn finish(recorder: Arc<Mutex<CassetteRecorder>>) {
        Arc::try_unwrap(recorder).unwrap().into_inner().unwrap().finish().unwrap();
    }

    fn chat(message: &str) -> ChatRequest {
        ChatRequest { system_instruction: "sys".into(), history: vec![], message: message.into() }
    }

    fn recorder_at(path: &Path) -> Arc<Mutex<CassetteRecorder>> {
        Arc::new(Mutex::new(CassetteRecorder::new(path, "test", "abc")))
    }

    #[tokio::test]
    async fn recorded_chat_replays_as_the_same_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.cassette.yaml");
        let recorder = recorder_at(&path);
        let inner = ReplayingLlmClient::new(replayer_for(vec![llm_call(
            0,
            "stream_chat",
            json!({"Ok": ["Hel", "lo"]}),
        )]));

        let live: Vec<String> = {
            let client = RecordingLlmClient::new(Box::new(inner), Arc::clone(&recorder));
            client.stream_chat(&chat("hi")).map(|c| c.unwrap()).collect().await
        };
        finish(recorder);

        let replay = ReplayingLlmClient::new(CassetteConfig::load_port_cassette(&path).unwrap());
        let replayed: Vec<String> =
            replay.stream_chat(&chat("hi")).map(|c| c.unwrap()).collect().await;
        assert_eq!(live, vec!["Hel", "lo"]);
        assert_eq!(replayed, live);

        let yaml = std::fs::read_to_string(&path).unwrap();
        assert!(yaml.contains("message: hi"));
    }

    #[tokio::test]
    async fn records_failures_with_their_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.cassette.yaml");
        let recorder = recorder_at(&path);
        let inner = ReplayingLlmClient::new(replayer_for(vec![llm_call(
            0,
            "simulate_execution",
            json!({"Err": "quota exceeded"}),
        )]));

        {
            let client = RecordingLlmClient::new(Box::new(inner), Arc::clone(&recorder));
            let request = ExecutionRequest { code: "print(1)".into(), language: "python".into() };
            let err = client.simulate_execution(&request).await.unwrap_err();
            assert_eq!(err.to_string(), "quota exceeded");
        }
        finish(recorder);

        let replay = ReplayingLlmClient::new(CassetteConfig::load_port_cassette(&path).unwrap());
        let request = ExecutionRequest { code: String::new(), language: String::new() };
        let err = replay.simulate_execution(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }
}
