//! Anxiety-spectrum instruments: GAD-7, GAD-2, PDSS, PSWQ-8, SPIN.

use serde_json::json;

use super::{
    frequency_options, numbered_questions, reverse_items, Question, ResponseOption, ScoredResult,
    Screener,
};

/// GAD-7. 0–4 minimal, 5–9 mild, 10–14 moderate, 15–21 severe.
pub(super) fn gad7() -> Screener {
    let texts = [
        "Feeling nervous, anxious, or on edge",
        "Not being able to stop or control worrying",
        "Worrying too much about different things",
        "Trouble relaxing",
        "Being so restless that it's hard to sit still",
        "Becoming easily annoyed or irritable",
        "Feeling afraid as if something awful might happen",
    ];
    Screener {
        id: "GAD-7",
        description: "Generalized Anxiety Disorder - 7 item anxiety screening tool",
        questions: numbered_questions(&texts, frequency_options),
        score_fn: score_gad7,
    }
}

fn score_gad7(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 15 {
        (
            "severe",
            "Severe anxiety",
            "Severe anxiety (15-21). Active treatment with therapy and medication strongly recommended.",
        )
    } else if total >= 10 {
        (
            "moderate",
            "Moderate anxiety",
            "Moderate anxiety (10-14). Treatment plan indicated. Therapy recommended, consider medication.",
        )
    } else if total >= 5 {
        (
            "mild",
            "Mild anxiety",
            "Mild anxiety (5-9). Watchful waiting, consider therapy if symptoms persist.",
        )
    } else {
        (
            "minimal",
            "Minimal anxiety",
            "Minimal anxiety (0-4). Symptoms may not require treatment. Monitor.",
        )
    };

    ScoredResult {
        id: "GAD-7".into(),
        score: total,
        max_score: 21,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// GAD-2 — two-item ultra-brief anxiety screen. Positive at >= 3.
pub(super) fn gad2() -> Screener {
    let texts = [
        "Over the past 2 weeks, how often have you been bothered by feeling nervous, anxious, or on edge?",
        "Over the past 2 weeks, how often have you been bothered by not being able to stop or control worrying?",
    ];
    Screener {
        id: "GAD-2",
        description: "Brief anxiety screener (2 items)",
        questions: numbered_questions(&texts, frequency_options),
        score_fn: score_gad2,
    }
}

fn score_gad2(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 3 {
        (
            "positive",
            "Positive anxiety screen",
            "GAD-2 positive (>=3). Administer the full GAD-7 to characterize severity.",
        )
    } else {
        (
            "negative",
            "Negative anxiety screen",
            "GAD-2 negative (<3). Anxiety disorder unlikely at this time.",
        )
    };

    ScoredResult {
        id: "GAD-2".into(),
        score: total,
        max_score: 6,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// PDSS — Panic Disorder Severity Scale, 7 items, 0–4 each.
pub(super) fn pdss() -> Screener {
    fn severity_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 0, label: "None" },
            ResponseOption { value: 1, label: "Mild" },
            ResponseOption { value: 2, label: "Moderate" },
            ResponseOption { value: 3, label: "Severe" },
            ResponseOption { value: 4, label: "Extreme" },
        ]
    }

    let mut questions = vec![Question {
        number: 1,
        text: "During the past month, how many panic and limited symptom attacks did you have?"
            .to_string(),
        options: vec![
            ResponseOption { value: 0, label: "None" },
            ResponseOption { value: 1, label: "1-2" },
            ResponseOption { value: 2, label: "3-5" },
            ResponseOption { value: 3, label: "6-10" },
            ResponseOption { value: 4, label: "11 or more" },
        ],
    }];
    let rest = [
        "If you had any panic attacks, how distressing were they?",
        "How much do you worry or feel anxious about when your next panic attack will occur or about fears related to the attacks?",
        "Were there places or situations you avoided, or felt afraid of, because of panic attacks?",
        "Were there any physical symptoms that frightened you during your panic attacks?",
        "During the past month, how much did the panic disorder interfere with your ability to work or carry out responsibilities at home?",
        "During the past month, how much did panic disorder interfere with your social life?",
    ];
    for (i, text) in rest.iter().enumerate() {
        questions.push(Question {
            number: (i + 2) as u32,
            text: (*text).to_string(),
            options: severity_options(),
        });
    }

    Screener {
        id: "PDSS",
        description: "Panic Disorder Severity Scale - assesses panic disorder severity",
        questions,
        score_fn: score_pdss,
    }
}

fn score_pdss(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 14 {
        (
            "severe",
            "Severe panic disorder symptoms",
            "Severe panic symptoms (>=14). Comprehensive panic disorder treatment indicated: CBT with interoceptive exposure plus SSRI/SNRI. Assess agoraphobic avoidance and functional impairment.",
        )
    } else if total >= 10 {
        (
            "moderate",
            "Moderate panic disorder symptoms",
            "Moderate panic symptoms (10-13). Panic-focused CBT recommended; consider medication if impairment persists.",
        )
    } else if total >= 6 {
        (
            "mild",
            "Mild panic disorder symptoms",
            "Mild panic symptoms (6-9). Psychoeducation about panic physiology and monitoring recommended.",
        )
    } else {
        (
            "subclinical",
            "Subclinical panic symptoms",
            "Subclinical panic symptoms (<6). No treatment indicated at this time.",
        )
    };

    ScoredResult {
        id: "PDSS".into(),
        score: total,
        max_score: 28,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// PSWQ-8 — brief pathological worry measure. Item 8 reverse-scored.
pub(super) fn pswq8() -> Screener {
    fn typicality_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 1, label: "Not at all typical of me" },
            ResponseOption { value: 2, label: "2" },
            ResponseOption { value: 3, label: "3" },
            ResponseOption { value: 4, label: "4" },
            ResponseOption { value: 5, label: "Very typical of me" },
        ]
    }
    let texts = [
        "My worries overwhelm me",
        "I have been a worrier all my life",
        "I notice that I have been worrying about things",
        "Once I start worrying, I cannot stop",
        "I worry all the time",
        "I worry about projects until they are all done",
        "I am always worrying about something",
        "I find it easy to dismiss worrisome thoughts",
    ];
    Screener {
        id: "PSWQ-8",
        description: "Penn State Worry Questionnaire - Brief (assesses pathological worry)",
        questions: numbered_questions(&texts, typicality_options),
        score_fn: score_pswq8,
    }
}

fn score_pswq8(responses: &[i64]) -> ScoredResult {
    // Item 8 reversed on a 1-5 scale.
    let adjusted = reverse_items(responses, &[7], 6);
    let total: i64 = adjusted.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 28 {
        (
            "high",
            "High pathological worry",
            "High pathological worry (>=28). Chronic excessive worry characteristic of Generalized Anxiety Disorder. CBT with worry exposure and cognitive restructuring recommended. Consider GAD-7 if not already administered.",
        )
    } else if total >= 21 {
        (
            "moderate",
            "Moderate worry",
            "Moderate worry levels (21-27). Significant worry affecting daily functioning. Assess for GAD. Worry management techniques recommended.",
        )
    } else {
        (
            "low",
            "Low to normal worry",
            "Low worry levels (<21). Within normal range.",
        )
    };

    ScoredResult {
        id: "PSWQ-8".into(),
        score: total,
        max_score: 40,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: None,
    }
}

/// SPIN — Social Phobia Inventory, 17 items with fear/avoidance/physiological
/// subscales.
pub(super) fn spin() -> Screener {
    fn bother_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 0, label: "Not at all" },
            ResponseOption { value: 1, label: "A little bit" },
            ResponseOption { value: 2, label: "Somewhat" },
            ResponseOption { value: 3, label: "Very much" },
            ResponseOption { value: 4, label: "Extremely" },
        ]
    }
    let texts = [
        "I am afraid of people in authority.",
        "I am bothered by blushing in front of people.",
        "Parties and social events scare me.",
        "I avoid talking to people I don't know.",
        "Being criticized scares me a lot.",
        "I avoid doing things or speaking to people for fear of embarrassment.",
        "Trembling or shaking in front of others is distressing to me.",
        "I avoid going to parties.",
        "I avoid activities in which I am the center of attention.",
        "Talking to strangers scares me.",
        "I avoid having to give speeches.",
        "I would do anything to avoid being criticized.",
        "Heart palpitations bother me when I am around people.",
        "I am afraid of doing things when people might be watching.",
        "Being embarrassed or looking stupid are among my worst fears.",
        "I avoid speaking to anyone in authority.",
        "Sweating in front of people causes me distress.",
    ];
    Screener {
        id: "SPIN",
        description: "Social Phobia Inventory - screens for social anxiety disorder",
        questions: numbered_questions(&texts, bother_options),
        score_fn: score_spin,
    }
}

fn score_spin(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();
    let fear: i64 = [0, 2, 4, 9, 13, 14].iter().map(|&i| responses[i]).sum();
    let avoidance: i64 = [3, 5, 7, 8, 10, 11, 15].iter().map(|&i| responses[i]).sum();
    let physiological: i64 = [1, 6, 12, 16].iter().map(|&i| responses[i]).sum();

    let (severity, interpretation, clinical_sig) = if total >= 41 {
        (
            "severe",
            "Severe social anxiety",
            "Severe social anxiety disorder (total >=41). Comprehensive evaluation for Social Anxiety Disorder recommended. Evidence-based treatments include CBT with exposure therapy, social skills training, and/or SSRI/SNRI medication. Consider referral to anxiety specialist.",
        )
    } else if total >= 31 {
        (
            "moderate",
            "Moderate social anxiety",
            "Moderate social anxiety (31-40). Clinical interview recommended to assess for Social Anxiety Disorder. CBT focused on social anxiety and gradual exposure to feared situations; consider medication if functioning is impaired.",
        )
    } else if total >= 21 {
        (
            "mild",
            "Mild social anxiety",
            "Mild social anxiety symptoms (21-30). Further assessment recommended. CBT techniques and gradual exposure may be helpful. Monitor for symptom progression.",
        )
    } else {
        (
            "minimal",
            "Minimal or no social anxiety",
            "No significant social anxiety symptoms identified.",
        )
    };

    ScoredResult {
        id: "SPIN".into(),
        score: total,
        max_score: 68,
        severity: severity.into(),
        interpretation: interpretation.into(),
        clinical_significance: clinical_sig.into(),
        item_scores: responses.to_vec(),
        subscales: Some(json!({
            "fear": fear,
            "avoidance": avoidance,
            "physiological": physiological,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::super::get;

    #[test]
    fn gad7_band_edges() {
        let gad7 = get("GAD-7").unwrap();
        assert_eq!(gad7.score(&[1, 1, 1, 1, 0, 0, 0]).unwrap().severity, "minimal");
        assert_eq!(gad7.score(&[1, 1, 1, 1, 1, 0, 0]).unwrap().severity, "mild");
        assert_eq!(gad7.score(&[2, 2, 2, 2, 2, 0, 0]).unwrap().severity, "moderate");
        assert_eq!(gad7.score(&[3, 3, 3, 3, 3, 0, 0]).unwrap().severity, "severe");
    }

    #[test]
    fn pswq8_reverses_final_item() {
        let pswq8 = get("PSWQ-8").unwrap();
        // All 1s with a reversed item 8 of 1 → 7*1 + (6-1) = 12.
        assert_eq!(pswq8.score(&[1, 1, 1, 1, 1, 1, 1, 1]).unwrap().score, 12);
        // All 5s → 7*5 + (6-5) = 36.
        assert_eq!(pswq8.score(&[5, 5, 5, 5, 5, 5, 5, 5]).unwrap().score, 36);
    }

    #[test]
    fn spin_subscales_partition_the_items() {
        let spin = get("SPIN").unwrap();
        let responses = vec![1; 17];
        let result = spin.score(&responses).unwrap();
        let subscales = result.subscales.unwrap();
        let sum = subscales["fear"].as_i64().unwrap()
            + subscales["avoidance"].as_i64().unwrap()
            + subscales["physiological"].as_i64().unwrap();
        assert_eq!(sum, result.score);
    }

    #[test]
    fn pdss_bands() {
        let pdss = get("PDSS").unwrap();
        assert_eq!(pdss.score(&[0, 0, 0, 0, 0, 0, 0]).unwrap().severity, "subclinical");
        assert_eq!(pdss.score(&[2, 2, 2, 0, 0, 0, 0]).unwrap().severity, "mild");
        assert_eq!(pdss.score(&[2, 2, 2, 2, 2, 0, 0]).unwrap().severity, "moderate");
        assert_eq!(pdss.score(&[2, 2, 2, 2, 2, 2, 2]).unwrap().severity, "severe");
    }
}
