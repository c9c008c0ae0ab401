//! System prompts for the interview phases.

use crate::session::{Phase, Session};

const BASE: &str = "You are a warm, professional psychiatric intake interviewer. \
You gather information for a clinician; you never diagnose, never recommend \
treatment changes, and never promise outcomes. Ask one focused question at a \
time, in plain language. If the patient expresses distress, acknowledge it \
briefly and stay with them. Keep responses to a few sentences.";

fn phase_instructions(phase: Phase) -> &'static str {
    match phase {
        Phase::Greeting => {
            "Greet the patient, explain that this conversation helps their \
             provider prepare, that they can pause anytime, and ask what brings \
             them in today. If you already know their name, use it."
        }
        Phase::ChiefComplaint => {
            "Explore the chief complaint: what is troubling them, since when, \
             and how it affects daily life."
        }
        Phase::MoodAssessment => {
            "Assess mood: depressed mood, anhedonia, irritability, anxiety, \
             mood swings, and duration of each."
        }
        Phase::CognitiveAssessment => {
            "Assess cognition: concentration, memory, decision-making, racing \
             or slowed thoughts."
        }
        Phase::PhysicalAssessment => {
            "Assess physical symptoms: sleep, appetite, energy, pain, and any \
             somatic complaints."
        }
        Phase::BehavioralAssessment => {
            "Assess behavior: substance use overview, daily functioning, work \
             or school, relationships, and recent behavioral changes."
        }
        Phase::MentalStatusExam => {
            "Complete the interview-based mental status exam: orientation, \
             thought process, perception, insight, and judgment, woven into \
             natural conversation."
        }
        Phase::Screening => {
            "Standardized screening is in progress. Present exactly the \
             question you are given and nothing else."
        }
        Phase::ReportGeneration | Phase::Completed => {
            "The interview is wrapping up. Invite any final additions, then \
             let the patient know their report is being prepared for their \
             provider."
        }
    }
}

/// Compose the system prompt for the current turn.
pub fn system_prompt(session: &Session, user_name: Option<&str>) -> String {
    let mut prompt = String::from(BASE);
    prompt.push_str("\n\nCurrent interview stage: ");
    prompt.push_str(session.phase.as_str());
    prompt.push_str(". ");
    prompt.push_str(phase_instructions(session.phase));

    if let Some(name) = user_name {
        prompt.push_str(&format!("\n\nThe patient's name is {name}."));
    }

    if !session.screener_scores.is_empty() {
        prompt.push_str("\n\nCompleted screeners so far:");
        for (id, result) in &session.screener_scores {
            prompt.push_str(&format!(
                "\n- {id}: {}/{} ({})",
                result.score, result.max_score, result.severity
            ));
        }
    }

    if !session.extracted_data.is_empty() {
        if let Ok(data) = serde_json::to_string(&session.extracted_data) {
            prompt.push_str("\n\nInformation gathered so far: ");
            prompt.push_str(&data);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn prompt_tracks_phase_and_scores() {
        let mut session = Session::new(None, Utc::now());
        let greeting = system_prompt(&session, Some("Ada"));
        assert!(greeting.contains("greeting"));
        assert!(greeting.contains("Ada"));

        crate::enforcement::score_and_store(&mut session, "GAD-2", &[2, 2]).unwrap();
        session.phase = Phase::MoodAssessment;
        let mood = system_prompt(&session, None);
        assert!(mood.contains("mood_assessment"));
        assert!(mood.contains("GAD-2"));
    }
}
