//! Wire frames streamed to the chat client.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One enumerated click-target accompanying a screener question.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOption {
    pub value: i64,
    pub label: String,
}

/// One element of a chat response stream. Serialized as the SSE `data:`
/// payload; `done: true` terminates the stream.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub role: &'static str,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FrameOption>>,
    /// Legacy alias for the patient PDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_pdf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinician_pdf: Option<String>,
    /// Error taxonomy tag when this is a terminal error frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Frame {
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
            timestamp: Utc::now(),
            done: false,
            options: None,
            pdf_report: None,
            patient_pdf: None,
            clinician_pdf: None,
            error: None,
        }
    }

    /// Terminal frame with no extra payload.
    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::fragment("")
        }
    }

    /// A whole assistant message delivered as one frame, with optional
    /// enumerated answer options.
    pub fn message(content: impl Into<String>, options: Option<Vec<FrameOption>>) -> Self {
        Self {
            options,
            ..Self::fragment(content)
        }
    }

    /// Terminal error frame. `tag` names the taxonomy class.
    pub fn error(tag: &str, content: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(tag.to_string()),
            ..Self::fragment(content)
        }
    }
}

/// Map a screener question's options into frame options.
pub fn options_for(question: &crate::screeners::Question) -> Vec<FrameOption> {
    question
        .options
        .iter()
        .map(|o| FrameOption {
            value: o.value,
            label: o.label.to_string(),
        })
        .collect()
}
