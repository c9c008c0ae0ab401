//! Structured extraction: periodically distill the dialogue into assessment
//! fields and symptom-domain flags, and advance phases whose required
//! fields are populated.

use serde_json::{json, Value};

use crate::gateway::ChatMessage;
use crate::screeners::SYMPTOM_SCREENERS;
use crate::session::{Phase, Role, Session};

/// Run the extractor after every N user turns.
pub const EXTRACTION_INTERVAL: usize = 3;

/// Schema for the extraction call: free-form string fields plus boolean
/// symptom-domain flags.
pub fn extraction_schema() -> Value {
    let domains: Vec<&str> = SYMPTOM_SCREENERS.iter().map(|(d, _)| *d).collect();
    json!({
        "type": "object",
        "properties": {
            "fields": {
                "type": "object",
                "description": "assessment fields populated from the dialogue; omit unknown fields",
                "additionalProperties": { "type": "string" }
            },
            "symptoms": {
                "type": "object",
                "description": "symptom domains clearly present in the dialogue",
                "properties": domains.iter().map(|d| (d.to_string(), json!({"type": "boolean"}))).collect::<serde_json::Map<_, _>>()
            }
        },
        "required": ["fields", "symptoms"]
    })
}

/// Build the extraction request over the recent dialogue.
pub fn extraction_messages(session: &Session) -> Vec<ChatMessage> {
    let wanted: Vec<&str> = Phase::ASSESSMENT_SEQUENCE
        .iter()
        .flat_map(|p| p.required_fields().iter().copied())
        .collect();

    let mut transcript = String::new();
    for turn in session.history.iter().rev().take(12).collect::<Vec<_>>().into_iter().rev() {
        let who = match turn.role {
            Role::User => "Patient",
            Role::Assistant => "Interviewer",
        };
        transcript.push_str(&format!("{who}: {}\n", turn.content));
    }

    vec![
        ChatMessage::system(format!(
            "Extract intake assessment data from the conversation. Populate any \
             of these fields you can support with the patient's own words: \
             {wanted:?}. Flag a symptom domain only when clearly present. \
             Do not infer beyond the text."
        )),
        ChatMessage::user(transcript),
    ]
}

/// Merge an extraction result into the session. Fields are only added or
/// overwritten with non-empty values; symptom flags are only ever raised,
/// never cleared (a later vague turn must not unflag a domain).
pub fn merge(session: &mut Session, extraction: &Value) {
    if let Some(fields) = extraction.get("fields").and_then(|f| f.as_object()) {
        for (key, value) in fields {
            let non_empty = value.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false);
            if non_empty {
                session.extracted_data.insert(key.clone(), value.clone());
            }
        }
    }
    if let Some(symptoms) = extraction.get("symptoms").and_then(|s| s.as_object()) {
        for (domain, flagged) in symptoms {
            if flagged.as_bool() == Some(true) {
                session.symptoms_detected.insert(domain.clone(), true);
            }
        }
    }
}

/// Advance through the assessment sequence while the current phase's
/// required fields are all populated. Returns the number of phases exited.
///
/// The final assessment phase has no successor: once its fields are complete
/// it is recorded in `completed_phases` while remaining current, which is
/// what opens the screener-enforcement gate.
pub fn advance_phases(session: &mut Session) -> usize {
    let mut advanced = 0;
    loop {
        let complete = session
            .phase
            .required_fields()
            .iter()
            .all(|f| session.extracted_data.contains_key(*f));
        if !complete {
            break;
        }
        match session.phase.next_assessment() {
            Some(next) => {
                session.advance_phase(next);
                advanced += 1;
            }
            None => {
                if session.phase == Phase::MentalStatusExam {
                    let name = session.phase.as_str().to_string();
                    if !session.completed_phases.contains(&name) {
                        session.completed_phases.push(name);
                        advanced += 1;
                    }
                }
                break;
            }
        }
    }
    advanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn merge_raises_but_never_clears_symptoms() {
        let mut session = Session::new(None, Utc::now());
        merge(
            &mut session,
            &json!({"fields": {}, "symptoms": {"depression": true}}),
        );
        assert_eq!(session.symptoms_detected.get("depression"), Some(&true));
        merge(
            &mut session,
            &json!({"fields": {}, "symptoms": {"depression": false}}),
        );
        assert_eq!(session.symptoms_detected.get("depression"), Some(&true));
    }

    #[test]
    fn merge_ignores_empty_fields() {
        let mut session = Session::new(None, Utc::now());
        merge(
            &mut session,
            &json!({"fields": {"chief_complaint": "  ", "mood": "low"}, "symptoms": {}}),
        );
        assert!(!session.extracted_data.contains_key("chief_complaint"));
        assert_eq!(session.extracted_data["mood"], json!("low"));
    }

    #[test]
    fn phases_advance_only_when_fields_complete() {
        let mut session = Session::new(None, Utc::now());
        session.phase = Phase::ChiefComplaint;
        assert_eq!(advance_phases(&mut session), 0);

        session
            .extracted_data
            .insert("chief_complaint".into(), json!("insomnia"));
        assert_eq!(advance_phases(&mut session), 1);
        assert_eq!(session.phase, Phase::MoodAssessment);
        assert!(session
            .completed_phases
            .contains(&"chief_complaint".to_string()));

        // Mood needs two fields; one is not enough.
        session.extracted_data.insert("mood".into(), json!("low"));
        assert_eq!(advance_phases(&mut session), 0);
        session
            .extracted_data
            .insert("anhedonia".into(), json!("lost interest in music"));
        assert_eq!(advance_phases(&mut session), 1);
        assert_eq!(session.phase, Phase::CognitiveAssessment);
    }

    #[test]
    fn final_assessment_phase_is_recorded_without_leaving() {
        let mut session = Session::new(None, Utc::now());
        session.phase = Phase::MentalStatusExam;
        session
            .extracted_data
            .insert("mental_status".into(), json!("alert, oriented"));
        assert_eq!(advance_phases(&mut session), 1);
        assert_eq!(session.phase, Phase::MentalStatusExam);
        assert!(session
            .completed_phases
            .contains(&"mental_status_exam".to_string()));
        // Idempotent on a second pass.
        assert_eq!(advance_phases(&mut session), 0);
    }
}
