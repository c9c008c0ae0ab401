//! Screener enforcement and scoring.
//!
//! Standardized instruments must follow the comprehensive symptom interview,
//! never precede it. [`should_enforce`] encodes that gate; [`score_and_store`]
//! turns a completed response vector into a stored result plus any risk
//! flags whose configured thresholds were crossed. Thresholds are data.

use chrono::Utc;

use crate::config::EnforcementThresholds;
use crate::error::EngineResult;
use crate::screeners::{self, ScoredResult};
use crate::session::{Phase, RiskFlag, RiskKind, Session};

// ─── Risk thresholds (data, not behavior) ────────────────────────────────────

enum Trigger {
    MinScore(i64),
    Severity(&'static str),
}

const RISK_THRESHOLDS: &[(&str, Trigger, RiskKind)] = &[
    ("C-SSRS", Trigger::Severity("high"), RiskKind::HighSuicideRisk),
    ("PHQ-9", Trigger::MinScore(20), RiskKind::SevereDepression),
    ("SCOFF", Trigger::MinScore(2), RiskKind::EatingDisorderPositive),
    ("AUDIT-C", Trigger::MinScore(8), RiskKind::HarmfulDrinking),
    ("DAST-10", Trigger::MinScore(6), RiskKind::SubstantialSubstanceUse),
    ("PC-PTSD-5", Trigger::MinScore(3), RiskKind::PtsdPositive),
];

fn crossed(trigger: &Trigger, result: &ScoredResult) -> bool {
    match trigger {
        Trigger::MinScore(min) => result.score >= *min,
        Trigger::Severity(severity) => result.severity == *severity,
    }
}

// ─── Pending / gate ──────────────────────────────────────────────────────────

/// Instruments still owed to the session, in canonical priority order.
pub fn pending(session: &Session) -> Vec<&'static str> {
    screeners::required_for(session.flagged_domains())
        .into_iter()
        .filter(|id| !session.screeners_completed.iter().any(|c| c == id))
        .collect()
}

/// True iff screener administration must begin now. All conditions hold:
/// instruments are pending, the interview is long enough, enough symptom
/// domains are flagged, every assessment phase has been visited, and the
/// session is not already screening.
pub fn should_enforce(session: &Session, thresholds: &EnforcementThresholds) -> bool {
    if session.phase == Phase::Screening {
        return false;
    }
    if pending(session).is_empty() {
        return false;
    }
    if session.history.len() < thresholds.min_history {
        return false;
    }
    if session.flagged_domains().len() < thresholds.min_symptom_domains {
        return false;
    }
    Phase::ASSESSMENT_SEQUENCE
        .iter()
        .all(|p| session.completed_phases.contains(&p.as_str().to_string()))
}

/// Patient-facing transition into screener administration.
pub fn transition_message(pending_ids: &[&str]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for id in pending_ids {
        if let Ok(screener) = screeners::get(id) {
            lines.push(format!(
                "- {}: {} ({} questions)",
                screener.id,
                screener.description,
                screener.len()
            ));
        }
    }
    format!(
        "Based on what you've shared, I'd like to go through some standardized \
         screening questionnaires. These are brief validated tools that help your \
         provider assess your symptoms accurately.\n\nWe'll complete:\n{}\n\n\
         This should take about {}-{} minutes. Let's start with the {}.",
        lines.join("\n"),
        pending_ids.len() * 2,
        pending_ids.len() * 3,
        pending_ids.first().copied().unwrap_or_default(),
    )
}

// ─── Scoring ─────────────────────────────────────────────────────────────────

/// Validate and score a completed response vector, record the result on the
/// session, and return any newly-crossed risk flags. The caller commits the
/// session (with escalation records for the new flags) afterwards.
pub fn score_and_store(
    session: &mut Session,
    screener_id: &str,
    responses: &[i64],
) -> EngineResult<(ScoredResult, Vec<RiskFlag>)> {
    let screener = screeners::get(screener_id)?;
    let result = screener.score(responses)?;

    if !session
        .screeners_completed
        .iter()
        .any(|c| c == screener_id)
    {
        session.screeners_completed.push(screener_id.to_string());
    }
    session
        .screener_scores
        .insert(screener_id.to_string(), result.clone());

    let mut new_flags = Vec::new();
    for (id, trigger, kind) in RISK_THRESHOLDS {
        if *id == screener_id && crossed(trigger, &result) {
            let flag = RiskFlag {
                kind: *kind,
                source: screener_id.to_string(),
                detail: format!(
                    "{} score {} ({}): {}",
                    screener_id, result.score, result.severity, result.interpretation
                ),
                at: Utc::now(),
            };
            if session.add_flag(flag.clone()) {
                new_flags.push(flag);
            }
        }
    }

    Ok((result, new_flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use chrono::Utc;

    fn session_with_symptoms(domains: &[&str]) -> Session {
        let mut session = Session::new(None, Utc::now());
        for d in domains {
            session.symptoms_detected.insert((*d).to_string(), true);
        }
        session
    }

    fn complete_assessment_phases(session: &mut Session) {
        for p in Phase::ASSESSMENT_SEQUENCE {
            session.completed_phases.push(p.as_str().to_string());
        }
        session.phase = Phase::MentalStatusExam;
    }

    fn fill_history(session: &mut Session, n: usize) {
        let now = Utc::now();
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            session.append_turn(role, format!("turn {i}"), now);
        }
    }

    #[test]
    fn pending_preserves_priority_and_excludes_completed() {
        let mut session =
            session_with_symptoms(&["stress", "depression", "anxiety", "suicide_ideation"]);
        assert_eq!(pending(&session), vec!["C-SSRS", "PHQ-9", "GAD-7", "PSS-10"]);

        session.screeners_completed.push("PHQ-9".into());
        assert_eq!(pending(&session), vec!["C-SSRS", "GAD-7", "PSS-10"]);
    }

    #[test]
    fn gate_requires_all_five_conditions() {
        let thresholds = EnforcementThresholds::default();
        let domains = ["depression", "anxiety", "stress", "trauma", "substance_use"];

        // 20 turns: too short.
        let mut session = session_with_symptoms(&domains);
        complete_assessment_phases(&mut session);
        fill_history(&mut session, 20);
        assert!(!should_enforce(&session, &thresholds));

        // 25 turns: enforced.
        fill_history(&mut session, 5);
        assert!(should_enforce(&session, &thresholds));

        // Only 4 domains: not enforced.
        let mut few = session_with_symptoms(&domains[..4]);
        complete_assessment_phases(&mut few);
        fill_history(&mut few, 25);
        assert!(!should_enforce(&few, &thresholds));

        // Missing a phase: not enforced.
        let mut unvisited = session_with_symptoms(&domains);
        fill_history(&mut unvisited, 25);
        assert!(!should_enforce(&unvisited, &thresholds));

        // Already screening: not enforced.
        let mut screening = session_with_symptoms(&domains);
        complete_assessment_phases(&mut screening);
        fill_history(&mut screening, 25);
        screening.phase = Phase::Screening;
        assert!(!should_enforce(&screening, &thresholds));

        // Nothing pending: not enforced.
        let mut done = session_with_symptoms(&domains);
        complete_assessment_phases(&mut done);
        fill_history(&mut done, 25);
        for id in pending(&done) {
            done.screeners_completed.push(id.to_string());
        }
        assert!(!should_enforce(&done, &thresholds));
    }

    #[test]
    fn thresholds_are_configurable() {
        let relaxed = EnforcementThresholds {
            min_history: 4,
            min_symptom_domains: 1,
        };
        let mut session = session_with_symptoms(&["depression"]);
        complete_assessment_phases(&mut session);
        fill_history(&mut session, 4);
        assert!(should_enforce(&session, &relaxed));
    }

    #[test]
    fn phq9_severe_raises_flag() {
        let mut session = Session::new(None, Utc::now());
        let (result, flags) =
            score_and_store(&mut session, "PHQ-9", &[3, 3, 3, 3, 3, 3, 3, 3, 3]).unwrap();
        assert_eq!(result.score, 27);
        assert_eq!(result.severity, "severe");
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].kind, RiskKind::SevereDepression);
        assert_eq!(session.screeners_completed, vec!["PHQ-9"]);
        assert!(session.screener_scores.contains_key("PHQ-9"));
    }

    #[test]
    fn moderately_severe_phq9_raises_no_flag() {
        let mut session = Session::new(None, Utc::now());
        let (result, flags) =
            score_and_store(&mut session, "PHQ-9", &[2, 2, 2, 2, 2, 2, 2, 2, 2]).unwrap();
        assert_eq!(result.score, 18);
        assert_eq!(result.severity, "moderately_severe");
        assert!(flags.is_empty());
    }

    #[test]
    fn cssrs_high_raises_suicide_flag() {
        let mut session = Session::new(None, Utc::now());
        let (_, flags) = score_and_store(&mut session, "C-SSRS", &[1, 1, 1, 1, 0, 0]).unwrap();
        assert_eq!(flags[0].kind, RiskKind::HighSuicideRisk);
    }

    #[test]
    fn scoring_same_vector_twice_is_idempotent() {
        let mut session = Session::new(None, Utc::now());
        let (first, _) = score_and_store(&mut session, "SCOFF", &[1, 1, 0, 0, 0]).unwrap();
        let (second, flags) = score_and_store(&mut session, "SCOFF", &[1, 1, 0, 0, 0]).unwrap();
        assert_eq!(first, second);
        // The flag was already present, so no new one is raised.
        assert!(flags.is_empty());
        assert_eq!(session.screeners_completed, vec!["SCOFF"]);
    }

    #[test]
    fn completed_list_matches_score_keys() {
        let mut session = Session::new(None, Utc::now());
        score_and_store(&mut session, "GAD-7", &[1, 1, 1, 1, 1, 1, 1]).unwrap();
        score_and_store(&mut session, "PC-PTSD-5", &[1, 1, 1, 0, 0]).unwrap();
        let mut completed = session.screeners_completed.clone();
        completed.sort();
        let mut keys: Vec<String> = session.screener_scores.keys().cloned().collect();
        keys.sort();
        assert_eq!(completed, keys);
    }

    #[test]
    fn invalid_vector_leaves_session_untouched() {
        let mut session = Session::new(None, Utc::now());
        assert!(score_and_store(&mut session, "PHQ-9", &[9, 9, 9]).is_err());
        assert!(session.screeners_completed.is_empty());
        assert!(session.screener_scores.is_empty());
    }
}
