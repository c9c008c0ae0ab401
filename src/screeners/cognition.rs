//! RRS-10 — Ruminative Response Scale, brief form.

use super::{ResponseOption, Question, ScoredResult, Screener};

pub(super) fn rrs10() -> Screener {
    fn rrs_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 1, label: "Almost never" },
            ResponseOption { value: 2, label: "Sometimes" },
            ResponseOption { value: 3, label: "Often" },
            ResponseOption { value: 4, label: "Almost always" },
        ]
    }
    let texts = [
        "think \"What am I doing to deserve this?\"",
        "analyze recent events to try to understand why you are depressed",
        "think \"Why do I always react this way?\"",
        "go away by yourself and think about why you feel this way",
        "write down what you are thinking and analyze it",
        "think about a recent situation, wishing it had gone better",
        "think \"Why do I have problems other people don't have?\"",
        "think \"Why can't I handle things better?\"",
        "analyze your personality to try to understand why you are depressed",
        "go someplace alone to think about your feelings",
    ];
    let questions = texts
        .iter()
        .enumerate()
        .map(|(i, text)| Question {
            number: (i + 1) as u32,
            text: format!("When you feel down, sad, or depressed, how often do you {text}?"),
            options: rrs_options(),
        })
        .collect();

    Screener {
        id: "RRS-10",
        description: "Ruminative Response Scale (brief) - assesses rumination",
        questions,
        score_fn: score_rrs10,
    }
}

fn score_rrs10(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 30 {
        (
            "high",
            "High rumination",
            "High ruminative response style (>=30). Rumination is a maintenance factor for depression and anxiety. Rumination-focused CBT or mindfulness-based cognitive therapy recommended.",
        )
    } else if total >= 20 {
        (
            "moderate",
            "Moderate rumination",
            "Moderate rumination (20-29). Notable repetitive negative thinking. Behavioral activation and attention-shifting strategies may help.",
        )
    } else {
        (
            "low",
            "Low rumination",
            "Low ruminative tendency (<20). Within normal range.",
        )
    };

    ScoredResult {
        id: "RRS-10".into(),
        score: total,
        max_score: 40,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}
