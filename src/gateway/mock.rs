//! Scripted gateway for tests — returns configurable fragment scripts and
//! structured replies instead of calling a provider.

use async_trait::async_trait;
use futures_util::stream;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatMessage, FragmentStream, LlmGateway};

/// Mock LLM gateway. Each `stream` call pops the next fragment script; each
/// `structured` call pops the next JSON reply. When a queue is empty a
/// deterministic default is returned so tests only script what they assert.
#[derive(Default)]
pub struct MockGateway {
    scripts: Mutex<VecDeque<Vec<String>>>,
    structured_replies: Mutex<VecDeque<Value>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the fragments for one upcoming `stream` call.
    pub fn push_script<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts
            .lock()
            .expect("mock script lock")
            .push_back(fragments.into_iter().map(Into::into).collect());
    }

    /// Queue the reply for one upcoming `structured` call.
    pub fn push_structured(&self, value: Value) {
        self.structured_replies
            .lock()
            .expect("mock structured lock")
            .push_back(value);
    }
}

#[async_trait]
impl LlmGateway for MockGateway {
    async fn stream(&self, _messages: Vec<ChatMessage>, _temperature: f32) -> FragmentStream {
        let fragments = self
            .scripts
            .lock()
            .expect("mock script lock")
            .pop_front()
            .unwrap_or_else(|| {
                vec!["Thank you for sharing. ".to_string(), "Tell me more.".to_string()]
            });
        Box::pin(stream::iter(fragments))
    }

    async fn structured(
        &self,
        _messages: Vec<ChatMessage>,
        _schema: &Value,
        _temperature: f32,
    ) -> Value {
        self.structured_replies
            .lock()
            .expect("mock structured lock")
            .pop_front()
            .unwrap_or_else(|| json!({ "fields": {}, "symptoms": {} }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn scripts_are_consumed_in_order() {
        let gateway = MockGateway::new();
        gateway.push_script(["a", "b"]);
        gateway.push_script(["c"]);

        let first: Vec<String> = gateway.stream(vec![], 0.7).await.collect().await;
        assert_eq!(first, vec!["a", "b"]);
        let second: Vec<String> = gateway.stream(vec![], 0.7).await.collect().await;
        assert_eq!(second, vec!["c"]);
    }

    #[tokio::test]
    async fn structured_defaults_to_empty_extraction() {
        let gateway = MockGateway::new();
        let value = gateway.structured(vec![], &json!({}), 0.3).await;
        assert!(value.get("fields").is_some());
    }
}
