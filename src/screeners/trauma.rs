//! PC-PTSD-5 — primary care PTSD screen.

use super::{numbered_questions, yes_no_options, ScoredResult, Screener};

/// Five yes/no items; three or more affirmatives is a positive screen.
pub(super) fn pc_ptsd5() -> Screener {
    let texts = [
        "In the past month, have you had nightmares about a stressful experience or thought about it when you did not want to?",
        "In the past month, have you tried hard not to think about a stressful experience or went out of your way to avoid situations that reminded you of it?",
        "In the past month, have you been constantly on guard, watchful, or easily startled?",
        "In the past month, have you felt numb or detached from people, activities, or your surroundings?",
        "In the past month, have you felt guilty or unable to stop blaming yourself or others for the stressful experience or what happened after it?",
    ];
    Screener {
        id: "PC-PTSD-5",
        description: "Primary Care PTSD Screen - brief PTSD screener",
        questions: numbered_questions(&texts, yes_no_options),
        score_fn: score_pc_ptsd5,
    }
}

fn score_pc_ptsd5(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 3 {
        (
            "positive",
            "Positive PTSD screen",
            "PC-PTSD-5 positive (>=3). High likelihood of PTSD. Comprehensive trauma assessment strongly recommended with PCL-5 or clinical interview. Evidence-based trauma treatments include Prolonged Exposure (PE), Cognitive Processing Therapy (CPT), EMDR, or trauma-focused CBT. Consider pharmacotherapy (SSRI/SNRI). Screen for suicide risk.",
        )
    } else if total >= 1 {
        (
            "subthreshold",
            "Some PTSD symptoms",
            "Subthreshold PTSD symptoms (1-2 positive). Some trauma-related distress present. Further evaluation may be warranted. Monitor for symptom progression. Psychoeducation about trauma responses recommended.",
        )
    } else {
        (
            "negative",
            "Negative PTSD screen",
            "No current PTSD symptoms indicated. If patient has trauma history, symptoms may emerge later - follow up as needed.",
        )
    };

    ScoredResult {
        id: "PC-PTSD-5".into(),
        score: total,
        max_score: 5,
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
    fn positive_at_three() {
        let screener = get("PC-PTSD-5").unwrap();
        assert_eq!(screener.score(&[1, 1, 0, 0, 0]).unwrap().severity, "subthreshold");
        assert_eq!(screener.score(&[1, 1, 1, 0, 0]).unwrap().severity, "positive");
        assert_eq!(screener.score(&[0; 5]).unwrap().severity, "negative");
    }
}
