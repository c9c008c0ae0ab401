//! Intake report synthesis and the out-of-core renderer seam.
//!
//! The report is produced by a single structured completion over the full
//! conversation plus every screener result. Rendering to patient/clinician
//! documents happens outside the core; this module only defines the seam
//! and a plain-text stand-in.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::gateway::ChatMessage;
use crate::session::{Role, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Patient,
    Clinician,
}

/// Renders a report JSON for one audience. The production implementation is
/// a PDF service outside this crate.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, report: &Value, audience: Audience) -> Vec<u8>;
}

/// Plain-text renderer used as the default and in tests.
pub struct TextRenderer;

#[async_trait]
impl ReportRenderer for TextRenderer {
    async fn render(&self, report: &Value, audience: Audience) -> Vec<u8> {
        let heading = match audience {
            Audience::Patient => "INTAKE SUMMARY (patient copy)",
            Audience::Clinician => "PSYCHIATRIC INTAKE REPORT (clinician copy)",
        };
        let body = serde_json::to_string_pretty(report).unwrap_or_default();
        format!("{heading}\n\n{body}\n").into_bytes()
    }
}

/// JSON schema the synthesis call must satisfy.
pub fn report_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "identification": { "type": "object" },
            "chief_complaint": { "type": "string" },
            "history_of_present_illness": { "type": "string" },
            "symptom_review": { "type": "object" },
            "screener_results": { "type": "array" },
            "risk_assessment": { "type": "string" },
            "mental_status_exam": { "type": "string" },
            "provisional_impressions": {
                "type": "array",
                "description": "For clinician review only; not a diagnosis."
            },
            "recommendations": { "type": "array" }
        },
        "required": [
            "chief_complaint",
            "history_of_present_illness",
            "symptom_review",
            "screener_results",
            "risk_assessment",
            "recommendations"
        ]
    })
}

/// Build the single structured-completion request that synthesizes the
/// report from the full history plus screener scores.
pub fn synthesis_messages(session: &Session) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(
        "You are a clinical documentation assistant. Synthesize the completed \
         psychiatric intake conversation below into a structured report for \
         clinician review. Be factual and conservative; quote screener scores \
         exactly; never assert a diagnosis. List provisional impressions only \
         as possibilities for the clinician to evaluate.",
    )];

    let mut transcript = String::new();
    for turn in &session.history {
        let who = match turn.role {
            Role::User => "Patient",
            Role::Assistant => "Interviewer",
        };
        transcript.push_str(&format!("{who}: {}\n", turn.content));
    }
    messages.push(ChatMessage::user(format!(
        "Conversation transcript:\n{transcript}"
    )));

    let scores = serde_json::to_string_pretty(&session.screener_scores).unwrap_or_default();
    let flags: Vec<&str> = session.risk_flags.iter().map(|f| f.kind.as_str()).collect();
    let extracted = serde_json::to_string_pretty(&session.extracted_data).unwrap_or_default();
    messages.push(ChatMessage::user(format!(
        "Screener results:\n{scores}\n\nRisk flags: {flags:?}\n\nExtracted data:\n{extracted}"
    )));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn text_renderer_distinguishes_audiences() {
        let report = json!({"chief_complaint": "low mood"});
        let patient = TextRenderer.render(&report, Audience::Patient).await;
        let clinician = TextRenderer.render(&report, Audience::Clinician).await;
        assert!(String::from_utf8(patient).unwrap().contains("patient copy"));
        assert!(String::from_utf8(clinician).unwrap().contains("clinician copy"));
    }

    #[test]
    fn synthesis_includes_transcript_and_scores() {
        let mut session = Session::new(None, Utc::now());
        session.append_turn(Role::User, "I feel hopeless", Utc::now());
        crate::enforcement::score_and_store(&mut session, "PHQ-2", &[3, 3]).unwrap();
        let messages = synthesis_messages(&session);
        let joined: String = messages.iter().map(|m| m.content.clone()).collect();
        assert!(joined.contains("I feel hopeless"));
        assert!(joined.contains("PHQ-2"));
    }
}
