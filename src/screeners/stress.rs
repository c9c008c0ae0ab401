//! Perceived stress instruments: PSS-10 and PSS-4.

use super::{numbered_questions, pss_options, reverse_items, ScoredResult, Screener};

/// PSS-10. Items 4, 5, 7, 8 (0-indexed 3, 4, 6, 7) are reverse-scored
/// against a 0-4 scale.
pub(super) fn pss10() -> Screener {
    let texts = [
        "In the last month, how often have you been upset because of something that happened unexpectedly?",
        "In the last month, how often have you felt that you were unable to control the important things in your life?",
        "In the last month, how often have you felt nervous and stressed?",
        "In the last month, how often have you felt confident about your ability to handle your personal problems?",
        "In the last month, how often have you felt that things were going your way?",
        "In the last month, how often have you found that you could not cope with all the things that you had to do?",
        "In the last month, how often have you been able to control irritations in your life?",
        "In the last month, how often have you felt that you were on top of things?",
        "In the last month, how often have you been angered because of things that happened that were outside of your control?",
        "In the last month, how often have you felt difficulties were piling up so high that you could not overcome them?",
    ];
    Screener {
        id: "PSS-10",
        description: "Perceived Stress Scale - measures perceived stress levels",
        questions: numbered_questions(&texts, pss_options),
        score_fn: score_pss10,
    }
}

pub(crate) const PSS10_REVERSED: &[usize] = &[3, 4, 6, 7];

fn score_pss10(responses: &[i64]) -> ScoredResult {
    let adjusted = reverse_items(responses, PSS10_REVERSED, 4);
    let total: i64 = adjusted.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 27 {
        (
            "high",
            "High perceived stress",
            "High stress levels (>=27). Patient reports feeling overwhelmed and unable to cope with demands. Assess for burnout, anxiety, depression. Stress management interventions strongly recommended: CBT, mindfulness, relaxation techniques, problem-solving therapy. Address contributing stressors (work, relationships, financial, health). Consider need for medication if co-occurring anxiety/depression.",
        )
    } else if total >= 14 {
        (
            "moderate",
            "Moderate perceived stress",
            "Moderate stress levels (14-26). Patient experiencing significant stress but with some coping capacity. Recommend stress management strategies: identify stressors, develop coping skills, improve self-care. Monitor for development of stress-related disorders.",
        )
    } else {
        (
            "low",
            "Low perceived stress",
            "Low stress levels (<14). Patient reports generally managing life demands well. Continue current coping strategies.",
        )
    };

    ScoredResult {
        id: "PSS-10".into(),
        score: total,
        max_score: 40,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// PSS-4 — brief form. Items 2 and 3 (0-indexed 1, 2) reverse-scored.
pub(super) fn pss4() -> Screener {
    let texts = [
        "In the last month, how often have you felt that you were unable to control the important things in your life?",
        "In the last month, how often have you felt confident about your ability to handle your personal problems?",
        "In the last month, how often have you felt that things were going your way?",
        "In the last month, how often have you felt difficulties were piling up so high that you could not overcome them?",
    ];
    Screener {
        id: "PSS-4",
        description: "Perceived Stress Scale (brief) - 4 items",
        questions: numbered_questions(&texts, pss_options),
        score_fn: score_pss4,
    }
}

fn score_pss4(responses: &[i64]) -> ScoredResult {
    let adjusted = reverse_items(responses, &[1, 2], 4);
    let total: i64 = adjusted.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 8 {
        (
            "high",
            "High perceived stress",
            "High stress on the brief scale (>=8). Administer the full PSS-10 for a complete picture. Stress management interventions recommended.",
        )
    } else if total >= 6 {
        (
            "moderate",
            "Moderate perceived stress",
            "Moderate stress levels (6-7). Recommend basic stress management strategies and monitoring.",
        )
    } else {
        (
            "low",
            "Low perceived stress",
            "Low stress levels (<6). Patient managing current demands.",
        )
    };

    ScoredResult {
        id: "PSS-4".into(),
        score: total,
        max_score: 16,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{get, reverse_items};
    use super::PSS10_REVERSED;
    use proptest::prelude::*;

    #[test]
    fn pss10_reverse_scoring() {
        let pss10 = get("PSS-10").unwrap();
        // All zeros: the four reversed items each contribute 4.
        assert_eq!(pss10.score(&[0; 10]).unwrap().score, 16);
        // All fours: reversed items contribute 0, the rest 4 each.
        assert_eq!(pss10.score(&[4; 10]).unwrap().score, 24);
    }

    #[test]
    fn pss10_bands() {
        let pss10 = get("PSS-10").unwrap();
        assert_eq!(pss10.score(&[4; 10]).unwrap().severity, "moderate");
        assert_eq!(
            pss10.score(&[4, 4, 4, 0, 0, 4, 0, 0, 4, 4]).unwrap().severity,
            "high"
        );
        assert_eq!(
            pss10.score(&[0, 0, 0, 4, 4, 0, 4, 4, 0, 0]).unwrap().severity,
            "low"
        );
    }

    proptest! {
        /// Re-reversing the reversed items is the identity, so the score is
        /// unchanged under the involution.
        #[test]
        fn pss10_reverse_involution(responses in proptest::collection::vec(0i64..=4, 10)) {
            let pss10 = get("PSS-10").unwrap();
            let reversed = reverse_items(&responses, PSS10_REVERSED, 4);
            let double_reversed = reverse_items(&reversed, PSS10_REVERSED, 4);
            prop_assert_eq!(&double_reversed, &responses);
            prop_assert_eq!(
                pss10.score(&responses).unwrap().score,
                pss10.score(&double_reversed).unwrap().score
            );
        }

        #[test]
        fn pss10_score_in_range(responses in proptest::collection::vec(0i64..=4, 10)) {
            let result = get("PSS-10").unwrap().score(&responses).unwrap();
            prop_assert!(result.score >= 0 && result.score <= result.max_score);
        }
    }
}
