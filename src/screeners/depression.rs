//! PHQ-9 and PHQ-2 depression instruments.

use serde_json::json;

use super::{frequency_options, numbered_questions, ScoredResult, Screener};

/// PHQ-9 — Patient Health Questionnaire, 9 items.
///
/// 0–4 minimal, 5–9 mild, 10–14 moderate, 15–19 moderately severe, 20–27 severe.
pub(super) fn phq9() -> Screener {
    let texts = [
        "Little interest or pleasure in doing things",
        "Feeling down, depressed, or hopeless",
        "Trouble falling or staying asleep, or sleeping too much",
        "Feeling tired or having little energy",
        "Poor appetite or overeating",
        "Feeling bad about yourself — or that you are a failure or have let yourself or your family down",
        "Trouble concentrating on things, such as reading the newspaper or watching television",
        "Moving or speaking so slowly that other people could have noticed? Or the opposite — being so fidgety or restless that you have been moving around a lot more than usual",
        "Thoughts that you would be better off dead or of hurting yourself in some way",
    ];
    Screener {
        id: "PHQ-9",
        description: "Patient Health Questionnaire - 9 item depression screening tool",
        questions: numbered_questions(&texts, frequency_options),
        score_fn: score_phq9,
    }
}

fn score_phq9(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 20 {
        (
            "severe",
            "Severe depression",
            "Severe depressive symptoms (20-27). Active treatment with pharmacotherapy and psychotherapy strongly indicated. Assess suicide risk. Consider psychiatric referral and close follow-up.",
        )
    } else if total >= 15 {
        (
            "moderately_severe",
            "Moderately severe depression",
            "Moderately severe depressive symptoms (15-19). Active treatment with medication and/or psychotherapy indicated. Monitor closely.",
        )
    } else if total >= 10 {
        (
            "moderate",
            "Moderate depression",
            "Moderate depressive symptoms (10-14). Treatment plan indicated: counseling, follow-up, and/or pharmacotherapy.",
        )
    } else if total >= 5 {
        (
            "mild",
            "Mild depression",
            "Mild depressive symptoms (5-9). Watchful waiting; repeat PHQ-9 at follow-up. Consider therapy if symptoms persist.",
        )
    } else {
        (
            "minimal",
            "Minimal depression",
            "Minimal depressive symptoms (0-4). No treatment indicated; monitor if risk factors present.",
        )
    };

    ScoredResult {
        id: "PHQ-9".into(),
        score: total,
        max_score: 27,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        // Item 9 (self-harm) is surfaced as a subscale for clinician review;
        // it is not independently escalated.
        subscales: Some(json!({ "self_harm_item": responses[8] })),
    }
}

/// PHQ-2 — two-item ultra-brief depression screen. Positive at >= 3.
pub(super) fn phq2() -> Screener {
    let texts = [
        "Over the past 2 weeks, how often have you been bothered by little interest or pleasure in doing things?",
        "Over the past 2 weeks, how often have you been bothered by feeling down, depressed, or hopeless?",
    ];
    Screener {
        id: "PHQ-2",
        description: "Brief depression screener (2 items)",
        questions: numbered_questions(&texts, frequency_options),
        score_fn: score_phq2,
    }
}

fn score_phq2(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 3 {
        (
            "positive",
            "Positive depression screen",
            "PHQ-2 positive (>=3). Administer the full PHQ-9 to characterize severity.",
        )
    } else {
        (
            "negative",
            "Negative depression screen",
            "PHQ-2 negative (<3). Depression unlikely at this time.",
        )
    };

    ScoredResult {
        id: "PHQ-2".into(),
        score: total,
        max_score: 6,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::get;

    #[test]
    fn phq9_banding_matches_published_cutoffs() {
        let phq9 = get("PHQ-9").unwrap();
        let cases: &[(&[i64], i64, &str)] = &[
            (&[0; 9], 0, "minimal"),
            (&[1, 1, 1, 1, 1, 0, 0, 0, 0], 5, "mild"),
            (&[2, 2, 2, 2, 2, 0, 0, 0, 0], 10, "moderate"),
            (&[2, 2, 2, 2, 2, 2, 2, 2, 2], 18, "moderately_severe"),
            (&[3, 3, 3, 3, 3, 3, 3, 3, 3], 27, "severe"),
        ];
        for (responses, expected_score, expected_severity) in cases {
            let result = phq9.score(responses).unwrap();
            assert_eq!(result.score, *expected_score);
            assert_eq!(result.severity, *expected_severity);
        }
    }

    #[test]
    fn phq9_band_edges() {
        let phq9 = get("PHQ-9").unwrap();
        // 4 → minimal, 9 → mild, 14 → moderate, 19 → moderately_severe, 20 → severe.
        for (vec, severity) in [
            (vec![3, 1, 0, 0, 0, 0, 0, 0, 0], "minimal"),
            (vec![3, 3, 3, 0, 0, 0, 0, 0, 0], "mild"),
            (vec![3, 3, 3, 3, 2, 0, 0, 0, 0], "moderate"),
            (vec![3, 3, 3, 3, 3, 3, 1, 0, 0], "moderately_severe"),
            (vec![3, 3, 3, 3, 3, 3, 2, 0, 0], "severe"),
        ] {
            assert_eq!(phq9.score(&vec).unwrap().severity, severity);
        }
    }

    #[test]
    fn phq2_positive_at_three() {
        let phq2 = get("PHQ-2").unwrap();
        assert_eq!(phq2.score(&[1, 1]).unwrap().severity, "negative");
        assert_eq!(phq2.score(&[2, 1]).unwrap().severity, "positive");
    }
}
