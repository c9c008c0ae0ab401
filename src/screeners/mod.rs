//! Screening instrument library.
//!
//! Every instrument is a plain value: an id, a fixed question list with
//! enumerated answer options, and a pure scoring function. Scoring has no
//! I/O and no hidden state — the same response vector always produces the
//! same [`ScoredResult`]. Severity bands are fixed integer cutoffs taken
//! from the published instruments, not tunable behavior.

mod anxiety;
mod cognition;
mod depression;
mod eating;
mod functioning;
mod impulsivity;
mod quality_of_life;
mod safety;
mod somatic;
mod stress;
mod substance;
mod trauma;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ─── Value types ─────────────────────────────────────────────────────────────

/// One enumerated answer choice.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseOption {
    pub value: i64,
    pub label: &'static str,
}

/// A single question within an instrument.
#[derive(Debug, Clone)]
pub struct Question {
    /// 1-indexed question number as printed on the published form.
    pub number: u32,
    pub text: String,
    pub options: Vec<ResponseOption>,
}

/// A screening instrument. Construction happens once, in the registry;
/// callers only ever borrow these.
pub struct Screener {
    pub id: &'static str,
    pub description: &'static str,
    pub questions: Vec<Question>,
    score_fn: fn(&[i64]) -> ScoredResult,
}

/// Deterministic scoring output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub score: i64,
    pub max_score: i64,
    pub severity: String,
    pub interpretation: String,
    pub clinical_significance: String,
    pub item_scores: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscales: Option<serde_json::Value>,
}

impl Screener {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Reject a response vector of the wrong length or containing values
    /// outside a question's enumerated option set.
    pub fn validate(&self, responses: &[i64]) -> EngineResult<()> {
        if responses.len() != self.questions.len() {
            return Err(EngineError::Validation(format!(
                "{} requires {} responses, got {}",
                self.id,
                self.questions.len(),
                responses.len()
            )));
        }
        for (i, (response, question)) in responses.iter().zip(&self.questions).enumerate() {
            if !question.options.iter().any(|o| o.value == *response) {
                let valid: Vec<i64> = question.options.iter().map(|o| o.value).collect();
                return Err(EngineError::Validation(format!(
                    "invalid response {} for {} question {}; valid values: {:?}",
                    response,
                    self.id,
                    i + 1,
                    valid
                )));
            }
        }
        Ok(())
    }

    /// Validate then score. Pure: same inputs, same outputs.
    pub fn score(&self, responses: &[i64]) -> EngineResult<ScoredResult> {
        self.validate(responses)?;
        Ok((self.score_fn)(responses))
    }

    /// Validate a single answer against one question's option set.
    pub fn validate_answer(&self, question_idx: usize, value: i64) -> EngineResult<()> {
        let question = self.questions.get(question_idx).ok_or_else(|| {
            EngineError::Validation(format!(
                "{} has no question {}",
                self.id,
                question_idx + 1
            ))
        })?;
        if question.options.iter().any(|o| o.value == value) {
            Ok(())
        } else {
            let valid: Vec<i64> = question.options.iter().map(|o| o.value).collect();
            Err(EngineError::Validation(format!(
                "invalid response {} for {} question {}; valid values: {:?}",
                value,
                self.id,
                question_idx + 1,
                valid
            )))
        }
    }

    /// Patient-facing text for one question, with its numbered options.
    pub fn prompt_for(&self, question_idx: usize) -> String {
        let Some(question) = self.questions.get(question_idx) else {
            return String::new();
        };
        let mut text = format!(
            "{} question {} of {}:\n\n{}\n\n",
            self.id,
            question_idx + 1,
            self.questions.len(),
            question.text
        );
        for option in &question.options {
            text.push_str(&format!("{}: {}\n", option.value, option.label));
        }
        text.push_str("\nPlease answer with one of the numbers above.");
        text
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

static CATALOG: Lazy<Vec<Screener>> = Lazy::new(|| {
    vec![
        safety::cssrs(),
        depression::phq9(),
        depression::phq2(),
        anxiety::gad7(),
        anxiety::gad2(),
        anxiety::pdss(),
        anxiety::pswq8(),
        anxiety::spin(),
        trauma::pc_ptsd5(),
        substance::audit_c(),
        substance::cage_aid(),
        substance::dast10(),
        eating::scoff(),
        stress::pss4(),
        stress::pss10(),
        somatic::phq15(),
        impulsivity::bis15(),
        cognition::rrs10(),
        functioning::wsas(),
        quality_of_life::swls(),
        quality_of_life::ucla3(),
    ]
});

static BY_ID: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    CATALOG
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id, i))
        .collect()
});

/// All instrument ids in catalog order.
pub fn list() -> Vec<&'static str> {
    CATALOG.iter().map(|s| s.id).collect()
}

pub fn get(id: &str) -> EngineResult<&'static Screener> {
    BY_ID
        .get(id)
        .map(|&i| &CATALOG[i])
        .ok_or_else(|| EngineError::Validation(format!("unknown screener: {id}")))
}

// ─── Symptom domain → mandatory instruments ──────────────────────────────────

/// Fixed mapping from symptom domains to the instruments that must be
/// administered when the domain is flagged. Order within the table is the
/// canonical symptom order used for tie-breaking in [`required_for`].
pub const SYMPTOM_SCREENERS: &[(&str, &[&str])] = &[
    ("suicide_ideation", &["C-SSRS"]),
    ("depression", &["PHQ-9"]),
    ("anxiety", &["GAD-7"]),
    ("panic", &["PDSS"]),
    ("social_anxiety", &["SPIN"]),
    ("worry", &["PSWQ-8"]),
    ("trauma", &["PC-PTSD-5"]),
    ("substance_use", &["AUDIT-C", "DAST-10"]),
    ("alcohol_use", &["AUDIT-C", "CAGE-AID"]),
    ("eating_concerns", &["SCOFF"]),
    ("stress", &["PSS-10"]),
    ("impulsivity", &["BIS-15"]),
    ("rumination", &["RRS-10"]),
    ("somatic", &["PHQ-15"]),
    ("functioning", &["WSAS"]),
    ("loneliness", &["UCLA-3"]),
    ("life_satisfaction", &["SWLS"]),
];

/// Safety instruments that always jump the queue, in order.
const PRIORITY: &[&str] = &["C-SSRS", "PHQ-9", "GAD-7"];

/// Instruments mandated by the flagged symptom domains, in canonical
/// priority order: safety screeners first, then symptom-table order.
pub fn required_for<'a, I>(flagged_domains: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let flagged: Vec<&str> = flagged_domains.into_iter().collect();
    let mut required: Vec<&'static str> = Vec::new();
    for (domain, screeners) in SYMPTOM_SCREENERS {
        if flagged.contains(domain) {
            for id in *screeners {
                if !required.contains(id) {
                    required.push(*id);
                }
            }
        }
    }
    // Stable reorder: pull the safety instruments to the front.
    let mut ordered: Vec<&'static str> = Vec::with_capacity(required.len());
    for p in PRIORITY {
        if required.contains(p) {
            ordered.push(*p);
        }
    }
    for id in required {
        if !ordered.contains(&id) {
            ordered.push(id);
        }
    }
    ordered
}

// ─── Shared option sets ──────────────────────────────────────────────────────

/// 0–3 frequency scale used by the PHQ/GAD family.
pub(crate) fn frequency_options() -> Vec<ResponseOption> {
    vec![
        ResponseOption { value: 0, label: "Not at all" },
        ResponseOption { value: 1, label: "Several days" },
        ResponseOption { value: 2, label: "More than half the days" },
        ResponseOption { value: 3, label: "Nearly every day" },
    ]
}

/// Binary yes/no.
pub(crate) fn yes_no_options() -> Vec<ResponseOption> {
    vec![
        ResponseOption { value: 0, label: "No" },
        ResponseOption { value: 1, label: "Yes" },
    ]
}

/// 0–4 frequency scale used by the PSS family.
pub(crate) fn pss_options() -> Vec<ResponseOption> {
    vec![
        ResponseOption { value: 0, label: "Never" },
        ResponseOption { value: 1, label: "Almost never" },
        ResponseOption { value: 2, label: "Sometimes" },
        ResponseOption { value: 3, label: "Fairly often" },
        ResponseOption { value: 4, label: "Very often" },
    ]
}

pub(crate) fn numbered_questions(
    texts: &[&str],
    options: fn() -> Vec<ResponseOption>,
) -> Vec<Question> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| Question {
            number: (i + 1) as u32,
            text: (*text).to_string(),
            options: options(),
        })
        .collect()
}

/// Reverse-score `responses[idx]` against `max + min` for the listed items.
/// Applying the same transform twice is the identity.
pub(crate) fn reverse_items(responses: &[i64], indices: &[usize], sum: i64) -> Vec<i64> {
    let mut adjusted = responses.to_vec();
    for &idx in indices {
        adjusted[idx] = sum - adjusted[idx];
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let ids = list();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
        assert_eq!(ids.len(), 21);
    }

    #[test]
    fn unknown_screener_is_a_validation_error() {
        assert!(matches!(
            get("PHQ-99"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn wrong_length_vector_rejected() {
        let phq9 = get("PHQ-9").unwrap();
        assert!(phq9.score(&[1, 2, 3]).is_err());
    }

    #[test]
    fn out_of_range_value_rejected() {
        let phq9 = get("PHQ-9").unwrap();
        assert!(phq9.score(&[0, 0, 0, 0, 0, 0, 0, 0, 7]).is_err());
    }

    #[test]
    fn required_for_puts_safety_first() {
        let required = required_for(["stress", "depression", "suicide_ideation"]);
        assert_eq!(required, vec!["C-SSRS", "PHQ-9", "PSS-10"]);
    }

    #[test]
    fn required_for_dedupes_shared_instruments() {
        // AUDIT-C is mandated by both substance_use and alcohol_use.
        let required = required_for(["substance_use", "alcohol_use"]);
        assert_eq!(required, vec!["AUDIT-C", "DAST-10", "CAGE-AID"]);
    }

    #[test]
    fn scoring_is_deterministic() {
        let gad7 = get("GAD-7").unwrap();
        let responses = vec![1, 2, 0, 3, 1, 2, 1];
        assert_eq!(
            gad7.score(&responses).unwrap(),
            gad7.score(&responses).unwrap()
        );
    }

    #[test]
    fn every_instrument_scores_its_zero_vector() {
        for id in list() {
            let screener = get(id).unwrap();
            let zeros: Vec<i64> = screener
                .questions
                .iter()
                .map(|q| q.options.iter().map(|o| o.value).min().unwrap())
                .collect();
            let result = screener.score(&zeros).unwrap();
            assert!(
                result.score >= 0 && result.score <= result.max_score,
                "{id}: score {} outside [0, {}]",
                result.score,
                result.max_score
            );
        }
    }
}
