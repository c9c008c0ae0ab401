//! BIS-15 — Barratt Impulsiveness Scale, short form.

use serde_json::json;

use super::{numbered_questions, reverse_items, ResponseOption, ScoredResult, Screener};

/// Fifteen items on a 1-4 scale across attention, motor, and non-planning
/// subscales. Items 2, 3, 11, 12, 13, 14 are reverse-scored.
pub(super) fn bis15() -> Screener {
    fn bis_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 1, label: "Rarely/Never" },
            ResponseOption { value: 2, label: "Occasionally" },
            ResponseOption { value: 3, label: "Often" },
            ResponseOption { value: 4, label: "Almost Always/Always" },
        ]
    }
    let texts = [
        // Attention
        "I don't pay attention",
        "I concentrate easily",
        "I am self-controlled",
        "I have 'racing' thoughts",
        "I squirm at lectures or talks",
        // Motor
        "I act on impulse",
        "I do things without thinking",
        "I act on the spur of the moment",
        "I buy things on impulse",
        "I say things without thinking",
        // Non-planning
        "I plan tasks carefully",
        "I am a careful thinker",
        "I plan trips well ahead of time",
        "I am future oriented",
        "I change jobs",
    ];
    Screener {
        id: "BIS-15",
        description: "Barratt Impulsiveness Scale (short) - assesses impulsivity",
        questions: numbered_questions(&texts, bis_options),
        score_fn: score_bis15,
    }
}

const BIS15_REVERSED: &[usize] = &[1, 2, 10, 11, 12, 13];

fn score_bis15(responses: &[i64]) -> ScoredResult {
    let adjusted = reverse_items(responses, BIS15_REVERSED, 5);
    let attention: i64 = adjusted[0..5].iter().sum();
    let motor: i64 = adjusted[5..10].iter().sum();
    let non_planning: i64 = adjusted[10..15].iter().sum();
    let total = attention + motor + non_planning;

    let (severity, interpretation, clinical_sig) = if total >= 40 {
        (
            "high",
            "High impulsivity",
            "High impulsivity (>=40). Significant impulsive behavior across domains. Associated with ADHD, bipolar disorder, substance use, borderline personality disorder. Assess for these conditions. DBT skills training (distress tolerance, emotion regulation) may be helpful.",
        )
    } else if total >= 30 {
        (
            "moderate",
            "Moderate impulsivity",
            "Moderate impulsivity (30-39). Notable impulsive tendencies. May benefit from impulse control strategies and self-monitoring.",
        )
    } else {
        (
            "low",
            "Low to normal impulsivity",
            "Low impulsivity (<30). Within normal range.",
        )
    };

    ScoredResult {
        id: "BIS-15".into(),
        score: total,
        max_score: 60,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: Some(json!({
            "attention": attention,
            "motor": motor,
            "non_planning": non_planning,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::super::get;

    #[test]
    fn subscales_sum_to_total() {
        let bis = get("BIS-15").unwrap();
        let result = bis.score(&[2; 15]).unwrap();
        let subscales = result.subscales.unwrap();
        let sum = subscales["attention"].as_i64().unwrap()
            + subscales["motor"].as_i64().unwrap()
            + subscales["non_planning"].as_i64().unwrap();
        assert_eq!(sum, result.score);
    }

    #[test]
    fn reverse_scored_items() {
        let bis = get("BIS-15").unwrap();
        // All 1s: nine direct items contribute 1 each, six reversed items
        // contribute 5 - 1 = 4 each.
        assert_eq!(bis.score(&[1; 15]).unwrap().score, 9 + 6 * 4);
        // All 4s: direct contribute 4, reversed contribute 1.
        let all_fours = bis.score(&[4; 15]).unwrap();
        assert_eq!(all_fours.score, 9 * 4 + 6);
        assert_eq!(all_fours.severity, "high");
    }
}
