//! C-SSRS — Columbia Suicide Severity Rating Scale (screen version).

use serde_json::json;

use super::{numbered_questions, yes_no_options, ScoredResult, Screener};

/// Six yes/no items. Severity is not a simple sum: any affirmative on the
/// intent or behavior items (4-6) is high risk, method (3) is moderate,
/// ideation alone (1-2) is low.
pub(super) fn cssrs() -> Screener {
    let texts = [
        "In the past month, have you wished you were dead or wished you could go to sleep and not wake up?",
        "In the past month, have you actually had any thoughts of killing yourself?",
        "In the past month, have you been thinking about how you might do this?",
        "In the past month, have you had these thoughts and had some intention of acting on them?",
        "In the past month, have you started to work out or worked out the details of how to kill yourself? Did you intend to carry out this plan?",
        "In the past 3 months, have you done anything, started to do anything, or prepared to do anything to end your life?",
    ];
    Screener {
        id: "C-SSRS",
        description: "Columbia Suicide Severity Rating Scale - suicide risk screening",
        questions: numbered_questions(&texts, yes_no_options),
        score_fn: score_cssrs,
    }
}

fn score_cssrs(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();
    let ideation = responses[0] == 1 || responses[1] == 1;
    let method = responses[2] == 1;
    let intent_or_behavior = responses[3] == 1 || responses[4] == 1 || responses[5] == 1;

    let (severity, interpretation, clinical_sig) = if intent_or_behavior {
        (
            "high",
            "High suicide risk",
            "C-SSRS HIGH RISK: suicidal intent, plan, or recent behavior endorsed. Immediate safety assessment required. Do not leave patient unattended; activate safety protocol, lethal-means counseling, and emergency evaluation (988 / local crisis services). Behavioral health must review before disposition.",
        )
    } else if method {
        (
            "moderate",
            "Moderate suicide risk",
            "C-SSRS moderate risk: suicidal ideation with method but without stated intent. Same-day clinical review recommended. Develop safety plan, restrict lethal means, and schedule urgent follow-up.",
        )
    } else if ideation {
        (
            "low",
            "Low suicide risk",
            "C-SSRS low risk: passive death wish or ideation without method or intent. Safety planning and routine follow-up recommended. Reassess at every visit.",
        )
    } else {
        (
            "minimal",
            "No current suicidal ideation reported",
            "No suicidal ideation or behavior endorsed on screening. Continue to monitor; reassess if clinical picture changes.",
        )
    };

    ScoredResult {
        id: "C-SSRS".into(),
        score: total,
        max_score: 6,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: Some(json!({
            "ideation": ideation,
            "method": method,
            "intent_or_behavior": intent_or_behavior,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::super::get;

    #[test]
    fn intent_items_dominate_severity() {
        let cssrs = get("C-SSRS").unwrap();
        assert_eq!(cssrs.score(&[0, 0, 0, 0, 0, 0]).unwrap().severity, "minimal");
        assert_eq!(cssrs.score(&[1, 0, 0, 0, 0, 0]).unwrap().severity, "low");
        assert_eq!(cssrs.score(&[1, 1, 1, 0, 0, 0]).unwrap().severity, "moderate");
        assert_eq!(cssrs.score(&[1, 1, 1, 1, 0, 0]).unwrap().severity, "high");
        // Behavior alone is high risk even without current ideation.
        assert_eq!(cssrs.score(&[0, 0, 0, 0, 0, 1]).unwrap().severity, "high");
    }
}
