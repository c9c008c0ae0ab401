//! SCOFF — brief eating disorder screen.

use serde_json::json;

use super::{numbered_questions, yes_no_options, ScoredResult, Screener};

/// Five yes/no items; two or more affirmatives is a positive screen.
pub(super) fn scoff() -> Screener {
    let texts = [
        "Do you make yourself Sick (vomit) because you feel uncomfortably full?",
        "Do you worry you have lost Control over how much you eat?",
        "Have you recently lost more than 14 pounds (One stone) in a 3-month period?",
        "Do you believe yourself to be Fat when others say you are too thin?",
        "Would you say that Food dominates your life?",
    ];
    Screener {
        id: "SCOFF",
        description: "Brief screening tool for eating disorders (anorexia and bulimia)",
        questions: numbered_questions(&texts, yes_no_options),
        score_fn: score_scoff,
    }
}

fn score_scoff(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 2 {
        (
            "positive_screen",
            "Positive screen for eating disorder",
            "SCOFF positive (>=2 points). Significant concern for eating disorder (anorexia nervosa, bulimia nervosa, or EDNOS). Comprehensive eating disorder assessment recommended: weight history, eating patterns, compensatory behaviors (purging, laxatives, excessive exercise), body image distortion, and medical complications (electrolyte imbalance, cardiac issues). Consider referral to eating disorder specialist.",
        )
    } else if total == 1 {
        (
            "mild",
            "Some eating concerns present",
            "Subthreshold eating concerns. Further assessment warranted to clarify severity and type. Explore eating patterns, body image, weight fluctuations, and any compensatory behaviors. Monitor for progression of symptoms.",
        )
    } else {
        (
            "negative",
            "Negative screen for eating disorder",
            "No significant eating disorder symptoms identified on screening. Continue to monitor if risk factors present (perfectionism, body dissatisfaction, history of dieting).",
        )
    };

    let concern_labels = [
        "self-induced vomiting",
        "loss of control over eating",
        "significant recent weight loss",
        "body image distortion",
        "preoccupation with food",
    ];
    let concern_areas: Vec<&str> = responses
        .iter()
        .zip(concern_labels)
        .filter(|(r, _)| **r == 1)
        .map(|(_, label)| label)
        .collect();

    ScoredResult {
        id: "SCOFF".into(),
        score: total,
        max_score: 5,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: Some(json!({
            "concern_areas": concern_areas,
            "positive_screen": total >= 2,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::super::get;

    #[test]
    fn two_affirmatives_is_positive() {
        let scoff = get("SCOFF").unwrap();
        let result = scoff.score(&[1, 1, 0, 0, 0]).unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.severity, "positive_screen");
        let subscales = result.subscales.unwrap();
        assert_eq!(
            subscales["concern_areas"],
            serde_json::json!(["self-induced vomiting", "loss of control over eating"])
        );
    }

    #[test]
    fn one_affirmative_is_mild() {
        let scoff = get("SCOFF").unwrap();
        assert_eq!(scoff.score(&[0, 0, 0, 1, 0]).unwrap().severity, "mild");
        assert_eq!(scoff.score(&[0; 5]).unwrap().severity, "negative");
    }
}
