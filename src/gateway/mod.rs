//! LLM gateway: the process-wide seam to the language-model provider.
//!
//! The gateway never retries silently and never raises mid-stream: provider
//! or decoding failures surface as a single terminal fragment beginning
//! `"⚠️ "` (streaming) or as an `{"error": ...}` JSON value (structured).
//! Retry policy belongs to the caller.

pub mod mock;

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::pin::Pin;
use tracing::warn;

/// A finite, non-restartable sequence of UTF-8 text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// One message in the provider conversation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Streaming + structured completion against the provider.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Stream a completion as text fragments. Always yields a finite stream;
    /// errors arrive as a terminal `"⚠️ "` fragment rather than an Err.
    async fn stream(&self, messages: Vec<ChatMessage>, temperature: f32) -> FragmentStream;

    /// Request a single JSON object conforming to `schema`. Returns
    /// `{"error": ...}` on provider or parse failure.
    async fn structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &Value,
        temperature: f32,
    ) -> Value;
}

/// Wrap one error message as a single-fragment stream.
fn error_stream(message: String) -> FragmentStream {
    Box::pin(stream::iter(vec![format!("⚠️ {message}")]))
}

// ─── OpenAI-compatible implementation ────────────────────────────────────────

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

impl OpenAiGateway {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_tokens: u32) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    fn request(&self, body: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        builder
    }
}

/// Drain complete `data:` events from an SSE byte buffer. Incomplete
/// trailing bytes stay in the buffer, so multi-byte UTF-8 sequences split
/// across network chunks are never decoded mid-character.
fn drain_sse_events(buf: &mut Vec<u8>) -> Vec<String> {
    let mut events = Vec::new();
    loop {
        let Some(pos) = buf.windows(2).position(|w| w == b"\n\n") else {
            break;
        };
        let event: Vec<u8> = buf.drain(..pos + 2).collect();
        // Lossy decode is safe here: the event boundary is ASCII, and any
        // invalid sequence inside is replaced rather than raised.
        let text = String::from_utf8_lossy(&event);
        for line in text.lines() {
            if let Some(data) = line.strip_prefix("data: ") {
                events.push(data.trim().to_string());
            }
        }
    }
    events
}

/// Pull the content delta out of one chat-completions stream event.
fn delta_content(event: &str) -> Option<String> {
    let value: Value = serde_json::from_str(event).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

struct SseStreamState {
    inner: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>,
    buf: Vec<u8>,
    pending: std::collections::VecDeque<String>,
    finished: bool,
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn stream(&self, messages: Vec<ChatMessage>, temperature: f32) -> FragmentStream {
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature,
            max_tokens: self.max_tokens,
            stream: true,
            response_format: None,
        };
        let response = match self.request(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(err = %e, "llm stream request failed");
                return error_stream(format!("The assistant is temporarily unavailable: {e}"));
            }
        };
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "llm stream rejected");
            return error_stream(format!("Provider error {status}: {detail}"));
        }

        let state = SseStreamState {
            inner: Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec()))),
            buf: Vec::new(),
            pending: std::collections::VecDeque::new(),
            finished: false,
        };

        Box::pin(stream::unfold(state, |mut st| async move {
            loop {
                if let Some(fragment) = st.pending.pop_front() {
                    return Some((fragment, st));
                }
                if st.finished {
                    return None;
                }
                match st.inner.next().await {
                    Some(Ok(bytes)) => {
                        st.buf.extend_from_slice(&bytes);
                        for event in drain_sse_events(&mut st.buf) {
                            if event == "[DONE]" {
                                st.finished = true;
                                break;
                            }
                            if let Some(content) = delta_content(&event) {
                                if !content.is_empty() {
                                    st.pending.push_back(content);
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        st.finished = true;
                        return Some((
                            format!("⚠️ The response was interrupted: {e}"),
                            st,
                        ));
                    }
                    None => {
                        st.finished = true;
                    }
                }
            }
        }))
    }

    async fn structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &Value,
        temperature: f32,
    ) -> Value {
        // The schema rides along in the system prompt; the provider is only
        // asked to guarantee well-formed JSON.
        let mut messages = messages;
        messages.push(ChatMessage::system(format!(
            "Respond with a single JSON object matching this schema:\n{schema}"
        )));
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature,
            max_tokens: self.max_tokens,
            stream: false,
            response_format: Some(json!({"type": "json_object"})),
        };
        let response = match self.request(&body).send().await {
            Ok(r) => r,
            Err(e) => return json!({"error": format!("request failed: {e}")}),
        };
        if !response.status().is_success() {
            let status = response.status();
            return json!({"error": format!("provider error {status}")});
        }
        let value: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return json!({"error": format!("bad provider payload: {e}")}),
        };
        let content = value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        match serde_json::from_str(content) {
            Ok(parsed) => parsed,
            Err(e) => json!({"error": format!("JSON parse error: {e}")}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_complete_events_and_keeps_partial_bytes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"data: {\"a\":1}\n\ndata: par");
        let events = drain_sse_events(&mut buf);
        assert_eq!(events, vec!["{\"a\":1}"]);
        assert_eq!(buf, b"data: par");

        buf.extend_from_slice(b"tial\n\n");
        let events = drain_sse_events(&mut buf);
        assert_eq!(events, vec!["partial"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn multibyte_utf8_survives_chunk_split() {
        // "é" (0xC3 0xA9) split across two chunks inside one event.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xc3");
        assert!(drain_sse_events(&mut buf).is_empty());
        buf.extend_from_slice(b"\xa9\"}}]}\n\n");
        let events = drain_sse_events(&mut buf);
        assert_eq!(delta_content(&events[0]).unwrap(), "café");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_raised() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"data: \xff\xfe\n\n");
        let events = drain_sse_events(&mut buf);
        assert_eq!(events.len(), 1);
        assert!(events[0].contains('\u{FFFD}'));
    }

    #[test]
    fn delta_extraction() {
        let event = r#"{"choices":[{"delta":{"content":"hello"}}]}"#;
        assert_eq!(delta_content(event).unwrap(), "hello");
        assert!(delta_content(r#"{"choices":[{"delta":{}}]}"#).is_none());
        assert!(delta_content("not json").is_none());
    }
}
