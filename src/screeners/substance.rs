//! Substance-use instruments: AUDIT-C, CAGE-AID, DAST-10.

use serde_json::json;

use super::{numbered_questions, yes_no_options, Question, ResponseOption, ScoredResult, Screener};

/// AUDIT-C — alcohol consumption screen (first three items of the full AUDIT).
pub(super) fn audit_c() -> Screener {
    let questions = vec![
        Question {
            number: 1,
            text: "How often do you have a drink containing alcohol?".to_string(),
            options: vec![
                ResponseOption { value: 0, label: "Never" },
                ResponseOption { value: 1, label: "Monthly or less" },
                ResponseOption { value: 2, label: "2-4 times a month" },
                ResponseOption { value: 3, label: "2-3 times a week" },
                ResponseOption { value: 4, label: "4 or more times a week" },
            ],
        },
        Question {
            number: 2,
            text: "How many standard drinks containing alcohol do you have on a typical day when drinking?"
                .to_string(),
            options: vec![
                ResponseOption { value: 0, label: "1 or 2" },
                ResponseOption { value: 1, label: "3 or 4" },
                ResponseOption { value: 2, label: "5 or 6" },
                ResponseOption { value: 3, label: "7 to 9" },
                ResponseOption { value: 4, label: "10 or more" },
            ],
        },
        Question {
            number: 3,
            text: "How often do you have 6 or more drinks on one occasion?".to_string(),
            options: vec![
                ResponseOption { value: 0, label: "Never" },
                ResponseOption { value: 1, label: "Less than monthly" },
                ResponseOption { value: 2, label: "Monthly" },
                ResponseOption { value: 3, label: "Weekly" },
                ResponseOption { value: 4, label: "Daily or almost daily" },
            ],
        },
    ];
    Screener {
        id: "AUDIT-C",
        description: "Alcohol Use Disorders Identification Test - Consumption (brief alcohol screening)",
        questions,
        score_fn: score_audit_c,
    }
}

fn score_audit_c(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total == 0 {
        (
            "abstinent",
            "No alcohol use reported",
            "Patient reports abstinence from alcohol.",
        )
    } else if total <= 3 {
        (
            "low_risk",
            "Low-risk alcohol use",
            "Alcohol use within low-risk guidelines. Brief advice on safe drinking limits may be appropriate.",
        )
    } else if total <= 7 {
        (
            "hazardous",
            "Hazardous drinking",
            "Hazardous drinking pattern detected. Full AUDIT-10 recommended. Brief intervention or counseling indicated. Consider referral to substance use treatment.",
        )
    } else {
        (
            "harmful",
            "Harmful drinking / possible alcohol use disorder",
            "High-risk drinking pattern (>=8). Full AUDIT-10 strongly recommended. Specialist evaluation for alcohol use disorder indicated. Consider detoxification assessment if daily drinking.",
        )
    };

    ScoredResult {
        id: "AUDIT-C".into(),
        score: total,
        max_score: 12,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: Some(json!({
            "frequency": responses[0],
            "quantity": responses[1],
            "binge_frequency": responses[2],
            "meets_threshold": total >= 4,
        })),
    }
}

/// CAGE-AID — four-item combined alcohol/drug screen. Positive at >= 2.
pub(super) fn cage_aid() -> Screener {
    let texts = [
        "Have you ever felt you ought to Cut down on your drinking or drug use?",
        "Have people Annoyed you by criticizing your drinking or drug use?",
        "Have you felt bad or Guilty about your drinking or drug use?",
        "Have you ever had a drink or used drugs first thing in the morning to steady your nerves or get rid of a hangover (Eye-opener)?",
    ];
    Screener {
        id: "CAGE-AID",
        description: "CAGE-AID - Brief substance abuse screen (alcohol and drugs)",
        questions: numbered_questions(&texts, yes_no_options),
        score_fn: score_cage_aid,
    }
}

fn score_cage_aid(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 2 {
        (
            "positive",
            "Positive substance use screen",
            "CAGE-AID positive (>=2). Clinically significant likelihood of a substance use disorder. Comprehensive substance use assessment recommended; follow with AUDIT-C and DAST-10 for substance-specific severity.",
        )
    } else if total == 1 {
        (
            "possible",
            "Possible substance use concern",
            "One positive CAGE-AID item. Further exploration of substance use patterns warranted. Monitor and re-screen.",
        )
    } else {
        (
            "negative",
            "Negative substance use screen",
            "No CAGE-AID items endorsed. No current indication of problematic substance use.",
        )
    };

    ScoredResult {
        id: "CAGE-AID".into(),
        score: total,
        max_score: 4,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// DAST-10 — drug abuse screen. Item 3 is reverse-scored ("always able to
/// stop" answered No earns the point).
pub(super) fn dast10() -> Screener {
    let texts = [
        "Have you used drugs other than those required for medical reasons?",
        "Do you abuse more than one drug at a time?",
        "Are you always able to stop using drugs when you want to? (If never use drugs, answer 'Yes')",
        "Have you had 'blackouts' or 'flashbacks' as a result of drug use?",
        "Do you ever feel bad or guilty about your drug use?",
        "Does your spouse (or parents) ever complain about your involvement with drugs?",
        "Have you neglected your family because of your use of drugs?",
        "Have you engaged in illegal activities in order to obtain drugs?",
        "Have you ever experienced withdrawal symptoms (felt sick) when you stopped taking drugs?",
        "Have you had medical problems as a result of your drug use (e.g. memory loss, hepatitis, convulsions, bleeding)?",
    ];
    Screener {
        id: "DAST-10",
        description: "Drug Abuse Screening Test - screens for drug use problems",
        questions: numbered_questions(&texts, yes_no_options),
        score_fn: score_dast10,
    }
}

fn score_dast10(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses[0] + responses[1] + (1 - responses[2])
        + responses[3..].iter().sum::<i64>();

    let (severity, interpretation, clinical_sig) = if total >= 9 {
        (
            "severe",
            "Severe level of drug-related problems",
            "Severe substance use disorder (9-10). Immediate comprehensive assessment required. High priority for intensive treatment (may need inpatient/residential level of care). Assess for medical complications, withdrawal risk, and safety concerns.",
        )
    } else if total >= 6 {
        (
            "substantial",
            "Substantial level of drug-related problems",
            "Substantial substance use disorder indicated (6-8). Intensive assessment and treatment recommended. Refer to addiction specialist. Address medical complications, withdrawal risk, and social support needs.",
        )
    } else if total >= 3 {
        (
            "moderate",
            "Moderate level of drug-related problems",
            "Moderate substance use problems (3-5). Further investigation warranted. Consider referral to substance use disorder specialist. Assess for co-occurring mental health conditions.",
        )
    } else if total >= 1 {
        (
            "low",
            "Low level of drug-related problems",
            "Low-level drug use concerns (1-2). Consider brief intervention, motivational interviewing, and monitoring. Assess readiness for change.",
        )
    } else {
        (
            "none",
            "No drug abuse problems reported",
            "No current drug use problems identified. Continue monitoring if risk factors present.",
        )
    };

    ScoredResult {
        id: "DAST-10".into(),
        score: total,
        max_score: 10,
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
    fn audit_c_bands() {
        let audit = get("AUDIT-C").unwrap();
        assert_eq!(audit.score(&[0, 0, 0]).unwrap().severity, "abstinent");
        assert_eq!(audit.score(&[1, 1, 1]).unwrap().severity, "low_risk");
        assert_eq!(audit.score(&[2, 2, 2]).unwrap().severity, "hazardous");
        assert_eq!(audit.score(&[4, 4, 0]).unwrap().severity, "harmful");
    }

    #[test]
    fn dast10_reverse_scores_item_three() {
        let dast = get("DAST-10").unwrap();
        // "Always able to stop" = Yes (1) earns no point; an otherwise-zero
        // vector with item 3 = No (0) earns exactly one.
        assert_eq!(
            dast.score(&[0, 0, 1, 0, 0, 0, 0, 0, 0, 0]).unwrap().score,
            0
        );
        assert_eq!(
            dast.score(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap().score,
            1
        );
    }

    #[test]
    fn dast10_substantial_at_six() {
        let dast = get("DAST-10").unwrap();
        let result = dast.score(&[1, 1, 0, 1, 1, 1, 0, 0, 0, 0]).unwrap();
        assert_eq!(result.score, 6);
        assert_eq!(result.severity, "substantial");
    }

    #[test]
    fn cage_aid_positive_at_two() {
        let cage = get("CAGE-AID").unwrap();
        assert_eq!(cage.score(&[1, 0, 0, 0]).unwrap().severity, "possible");
        assert_eq!(cage.score(&[1, 1, 0, 0]).unwrap().severity, "positive");
    }
}
