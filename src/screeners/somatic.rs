//! PHQ-15 — somatic symptom burden.

use super::{numbered_questions, ResponseOption, ScoredResult, Screener};

pub(super) fn phq15() -> Screener {
    fn bother_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 0, label: "Not bothered at all" },
            ResponseOption { value: 1, label: "Bothered a little" },
            ResponseOption { value: 2, label: "Bothered a lot" },
        ]
    }
    let texts = [
        "Stomach pain",
        "Back pain",
        "Pain in your arms, legs, or joints (knees, hips, etc.)",
        "Menstrual cramps or other problems with your periods (if applicable; otherwise answer 'Not bothered at all')",
        "Headaches",
        "Chest pain",
        "Dizziness",
        "Fainting spells",
        "Feeling your heart pound or race",
        "Shortness of breath",
        "Pain or problems during sexual intercourse",
        "Constipation, loose bowels, or diarrhea",
        "Nausea, gas, or indigestion",
        "Feeling tired or having low energy",
        "Trouble sleeping",
    ];
    Screener {
        id: "PHQ-15",
        description: "Patient Health Questionnaire - Somatic Symptoms (screens for physical symptom burden)",
        questions: numbered_questions(&texts, bother_options),
        score_fn: score_phq15,
    }
}

fn score_phq15(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 15 {
        (
            "high",
            "High somatic symptom burden",
            "High somatic symptom severity (>=15). Strong association with somatic symptom disorder, depression, and anxiety. Medical workup for unexplained symptoms plus integrated behavioral health care recommended.",
        )
    } else if total >= 10 {
        (
            "medium",
            "Medium somatic symptom burden",
            "Medium somatic symptom severity (10-14). Assess overlap with mood and anxiety symptoms; avoid unnecessary repeat investigations.",
        )
    } else if total >= 5 {
        (
            "low",
            "Low somatic symptom burden",
            "Low somatic symptom severity (5-9). Monitor; reassure and address specific symptoms as indicated.",
        )
    } else {
        (
            "minimal",
            "Minimal somatic symptoms",
            "Minimal somatic symptom burden (<5).",
        )
    };

    ScoredResult {
        id: "PHQ-15".into(),
        score: total,
        max_score: 30,
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
    fn bands() {
        let phq15 = get("PHQ-15").unwrap();
        assert_eq!(phq15.score(&[0; 15]).unwrap().severity, "minimal");
        assert_eq!(phq15.score(&[1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap().severity, "low");
        assert_eq!(phq15.score(&[2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap().severity, "medium");
        assert_eq!(phq15.score(&[2; 15]).unwrap().severity, "high");
    }
}
