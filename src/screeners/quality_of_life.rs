//! Quality-of-life instruments: SWLS and UCLA-3.

use super::{numbered_questions, ResponseOption, ScoredResult, Screener};

/// SWLS — Satisfaction With Life Scale, five statements on a 1-7 agreement
/// scale.
pub(super) fn swls() -> Screener {
    fn agreement_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 1, label: "Strongly disagree" },
            ResponseOption { value: 2, label: "Disagree" },
            ResponseOption { value: 3, label: "Slightly disagree" },
            ResponseOption { value: 4, label: "Neither agree nor disagree" },
            ResponseOption { value: 5, label: "Slightly agree" },
            ResponseOption { value: 6, label: "Agree" },
            ResponseOption { value: 7, label: "Strongly agree" },
        ]
    }
    let texts = [
        "In most ways my life is close to my ideal.",
        "The conditions of my life are excellent.",
        "I am satisfied with my life.",
        "So far I have gotten the important things I want in life.",
        "If I could live my life over, I would change almost nothing.",
    ];
    Screener {
        id: "SWLS",
        description: "Satisfaction With Life Scale - assesses global life satisfaction",
        questions: numbered_questions(&texts, agreement_options),
        score_fn: score_swls,
    }
}

fn score_swls(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation) = if total >= 31 {
        ("extremely_satisfied", "Extremely satisfied with life")
    } else if total >= 26 {
        ("satisfied", "Satisfied with life")
    } else if total >= 21 {
        ("slightly_satisfied", "Slightly satisfied with life")
    } else if total == 20 {
        ("neutral", "Neutral life satisfaction")
    } else if total >= 15 {
        ("slightly_dissatisfied", "Slightly dissatisfied with life")
    } else if total >= 10 {
        ("dissatisfied", "Dissatisfied with life")
    } else {
        ("extremely_dissatisfied", "Extremely dissatisfied with life")
    };

    let clinical_sig = if total <= 14 {
        "Marked life dissatisfaction. Often accompanies depression, loss, or major life disruption. Explore contributing domains (relationships, work, health, finances) and integrate into treatment goals."
    } else if total <= 25 {
        "Life satisfaction below the satisfied range. Worth exploring which domains feel unsatisfying and whether symptoms are driving the appraisal."
    } else {
        "Life satisfaction in the satisfied range. A protective factor; note strengths in the treatment plan."
    };

    ScoredResult {
        id: "SWLS".into(),
        score: total,
        max_score: 35,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// UCLA-3 — three-item loneliness scale.
pub(super) fn ucla3() -> Screener {
    fn loneliness_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 1, label: "Hardly ever" },
            ResponseOption { value: 2, label: "Some of the time" },
            ResponseOption { value: 3, label: "Often" },
        ]
    }
    let texts = [
        "How often do you feel that you lack companionship?",
        "How often do you feel left out?",
        "How often do you feel isolated from others?",
    ];
    Screener {
        id: "UCLA-3",
        description: "UCLA Loneliness Scale (3-item) - assesses loneliness",
        questions: numbered_questions(&texts, loneliness_options),
        score_fn: score_ucla3,
    }
}

fn score_ucla3(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 7 {
        (
            "high",
            "High loneliness",
            "High loneliness (>=7). Social isolation is a risk factor for depression and poor health outcomes. Assess social network, barriers to connection, and consider behavioral activation toward social contact.",
        )
    } else if total >= 5 {
        (
            "moderate",
            "Moderate loneliness",
            "Moderate loneliness (5-6). Some social disconnection reported. Explore desired versus actual social contact.",
        )
    } else {
        (
            "low",
            "Low loneliness",
            "Low loneliness (3-4). Social connection largely intact.",
        )
    };

    ScoredResult {
        id: "UCLA-3".into(),
        score: total,
        max_score: 9,
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
    fn swls_neutral_point() {
        let swls = get("SWLS").unwrap();
        assert_eq!(swls.score(&[4, 4, 4, 4, 4]).unwrap().severity, "neutral");
        assert_eq!(swls.score(&[7, 7, 7, 7, 7]).unwrap().severity, "extremely_satisfied");
        assert_eq!(swls.score(&[1, 1, 1, 1, 1]).unwrap().severity, "extremely_dissatisfied");
    }

    #[test]
    fn ucla3_bands() {
        let ucla = get("UCLA-3").unwrap();
        assert_eq!(ucla.score(&[1, 1, 1]).unwrap().severity, "low");
        assert_eq!(ucla.score(&[2, 2, 1]).unwrap().severity, "moderate");
        assert_eq!(ucla.score(&[3, 3, 1]).unwrap().severity, "high");
    }
}
