//! Live adapter for the `LlmClient` port using the Gemini REST API.
//!
//! Unary calls go to `models/{model}:generateContent`; chat replies are
//! streamed from `models/{model}:streamGenerateContent?alt=sse`.

use futures::{stream, Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WorkshopConfig;
use crate::ports::llm::{
    ChatRequest, ChatRole, ChunkStream, ExecutionRequest, LlmClient, LlmError, LlmFuture,
    StructuredRequest, TextRequest,
};

/// Live LLM client that calls the Gemini API.
pub struct LiveLlmClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl LiveLlmClient {
    /// Creates a live client for the model and credentials in `config`.
    #[must_use]
    pub fn new(config: &WorkshopConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        }
    }

    fn api_url(&self, method: &str, key: &str, query: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{base}/models/{}:{method}?{query}key={key}", self.model)
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| "GEMINI_API_KEY is not set (export it or add it to .env)".into())
    }

    async fn generate(&self, request: GeminiRequest) -> Result<String, LlmError> {
        let url = self.api_url("generateContent", self.api_key()?, "");
        tracing::debug!(model = %self.model, "gemini generateContent");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| -> LlmError { format!("Gemini API request failed: {e}").into() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| -> LlmError { format!("Failed to read Gemini API response: {e}").into() })?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| -> LlmError { format!("Failed to parse Gemini API response: {e}").into() })?;
        parsed.into_text()
    }

    async fn open_stream(
        &self,
        request: GeminiRequest,
    ) -> Result<impl Stream<Item = Result<String, LlmError>> + Send, LlmError> {
        let url = self.api_url("streamGenerateContent", self.api_key()?, "alt=sse&");
        tracing::debug!(model = %self.model, turns = request.contents.len(), "gemini streamGenerateContent");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| -> LlmError { format!("Gemini API request failed: {e}").into() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(sse_chunks(Box::pin(response.bytes_stream())))
    }
}

impl LlmClient for LiveLlmClient {
    fn generate_structured(&self, request: &StructuredRequest) -> LlmFuture<'_, String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent::user(&request.prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(request.schema.clone()),
                ..GenerationConfig::default()
            }),
        };
        Box::pin(self.generate(body))
    }

    fn generate_text(&self, request: &TextRequest) -> LlmFuture<'_, String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent::user(&request.prompt)],
            system_instruction: Some(GeminiContent::system(&request.system_instruction)),
            generation_config: Some(GenerationConfig {
                temperature: Some(request.sampling.temperature),
                top_k: Some(request.sampling.top_k),
                top_p: Some(request.sampling.top_p),
                ..GenerationConfig::default()
            }),
        };
        Box::pin(self.generate(body))
    }

    fn stream_chat(&self, request: &ChatRequest) -> ChunkStream<'_> {
        let body = chat_body(request);
        Box::pin(stream::once(self.open_stream(body)).try_flatten())
    }

    fn simulate_execution(&self, request: &ExecutionRequest) -> LlmFuture<'_, String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent::user(&simulation_prompt(request))],
            system_instruction: None,
            generation_config: None,
        };
        Box::pin(self.generate(body))
    }
}

/// Prompt asking the model to act as an interpreter for `request.code`.
fn simulation_prompt(request: &ExecutionRequest) -> String {
    let language = &request.language;
    format!(
        "Act as a {language} interpreter. Execute the following code and respond with only \
         the exact terminal output (stdout and stderr) it would produce. Do not explain or \
         reformat anything.\n\n```{language}\n{}\n```",
        request.code
    )
}

fn chat_body(request: &ChatRequest) -> GeminiRequest {
    let mut contents: Vec<GeminiContent> = request
        .history
        .iter()
        .map(|turn| GeminiContent {
            role: Some(match turn.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Model => "model".to_string(),
            }),
            parts: vec![GeminiPart { text: Some(turn.text.clone()) }],
        })
        .collect();
    contents.push(GeminiContent::user(&request.message));
    GeminiRequest {
        contents,
        system_instruction: Some(GeminiContent::system(&request.system_instruction)),
        generation_config: None,
    }
}

/// Turns an unsuccessful response into an error, preferring the API's own message.
fn api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| body.trim().to_string(), |e| e.message);
    format!("Gemini API error ({status}): {message}").into()
}

/// Splits a server-sent-event byte stream into the text of each event.
fn sse_chunks<S, B>(bytes: S) -> impl Stream<Item = Result<String, LlmError>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin,
    B: AsRef<[u8]> + Send,
{
    stream::unfold((bytes, Vec::new(), false), |(mut bytes, mut buffer, mut ended)| async move {
        loop {
            if let Some(event) = take_event(&mut buffer) {
                return Some((parse_event(&event), (bytes, buffer, ended)));
            }
            if ended {
                if buffer.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let rest = String::from_utf8_lossy(&std::mem::take(&mut buffer)).into_owned();
                return Some((parse_event(&rest), (bytes, buffer, ended)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    buffer.clear();
                    let err: LlmError = format!("Gemini stream interrupted: {e}").into();
                    return Some((Err(err), (bytes, buffer, true)));
                }
                None => ended = true,
            }
        }
    })
    .try_filter_map(|text| async move { Ok(text) })
}

/// Removes the first complete event (terminated by a blank line) from `buffer`.
fn take_event(buffer: &mut Vec<u8>) -> Option<String> {
    let (end, separator) = buffer.windows(2).enumerate().find_map(|(i, pair)| match pair {
        b"\n\n" => Some((i, 2)),
        b"\r\n" if buffer[i + 2..].starts_with(b"\r\n") => Some((i, 4)),
        _ => None,
    })?;
    let event: Vec<u8> = buffer.drain(..end + separator).take(end).collect();
    Some(String::from_utf8_lossy(&event).into_owned())
}

/// Text carried by one event; `None` for events without data.
fn parse_event(event: &str) -> Result<Option<String>, LlmError> {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return Ok(None);
    }
    let response: GeminiResponse = serde_json::from_str(&data.join("\n"))
        .map_err(|e| -> LlmError { format!("Failed to parse Gemini stream event: {e}").into() })?;
    response.into_text().map(Some)
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn user(text: &str) -> Self {
        Self { role: Some("user".to_string()), parts: vec![GeminiPart { text: Some(text.to_string()) }] }
    }

    fn system(text: &str) -> Self {
        Self { role: None, parts: vec![GeminiPart { text: Some(text.to_string()) }] }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(format!("Gemini API error: {}", error.message).into());
        }
        let text = self
            .candidates
            .and_then(|c| c.into_iter().next())
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChatTurn;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(api_key: Option<&str>) -> LiveLlmClient {
        LiveLlmClient::new(&WorkshopConfig {
            api_key: api_key.map(str::to_string),
            ..WorkshopConfig::default()
        })
    }

    #[test]
    fn api_url_names_model_method_and_key() {
        let url = client(Some("k")).api_url("streamGenerateContent", "k", "alt=sse&");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse&key=k"
        );
    }

    #[test]
    fn chat_body_sends_history_then_message() {
        let request = ChatRequest {
            system_instruction: "be helpful".into(),
            history: vec![
                ChatTurn { role: ChatRole::User, text: "hi".into() },
                ChatTurn { role: ChatRole::Model, text: "hello".into() },
            ],
            message: "next".into(),
        };
        let body = serde_json::to_value(chat_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "next"}]}
                ],
                "systemInstruction": {"parts": [{"text": "be helpful"}]}
            })
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello");
    }

    #[test]
    fn api_error_prefers_the_structured_message() {
        let err = api_error(429, r#"{"error":{"code":429,"message":"quota exceeded"}}"#);
        assert_eq!(err.to_string(), "Gemini API error (429): quota exceeded");
        let err = api_error(502, "bad gateway\n");
        assert_eq!(err.to_string(), "Gemini API error (502): bad gateway");
    }

    #[test]
    fn take_event_handles_both_line_endings() {
        let mut buffer = b"data: a\n\ndata: b\r\n\r\npartial".to_vec();
        assert_eq!(take_event(&mut buffer).as_deref(), Some("data: a"));
        assert_eq!(take_event(&mut buffer).as_deref(), Some("data: b"));
        assert_eq!(take_event(&mut buffer), None);
        assert_eq!(buffer, b"partial");
    }

    #[tokio::test]
    async fn sse_chunks_reassembles_split_events() {
        let event = |text: &str| {
            format!("data: {}\n\n", json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}))
        };
        let payload = format!("{}: keep-alive\n\n{}", event("Hel"), event("lo"));
        let (head, tail) = payload.split_at(17);
        let bytes = stream::iter(vec![
            Ok::<Vec<u8>, reqwest::Error>(head.as_bytes().to_vec()),
            Ok(tail.as_bytes().to_vec()),
        ]);

        let chunks: Vec<String> = sse_chunks(bytes).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn sse_error_event_becomes_error_item() {
        let bytes = stream::iter(vec![Ok::<Vec<u8>, reqwest::Error>(
            b"data: {\"error\":{\"message\":\"overloaded\"}}".to_vec(),
        )]);
        let items: Vec<_> = sse_chunks(bytes).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().to_string(), "Gemini API error: overloaded");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let client = client(None);
        let request = ExecutionRequest { code: "print(1)".into(), language: "python".into() };
        let err = client.simulate_execution(&request).await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let chat = ChatRequest { system_instruction: String::new(), history: vec![], message: "hi".into() };
        let items: Vec<_> = client.stream_chat(&chat).collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
