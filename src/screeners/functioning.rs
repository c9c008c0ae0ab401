//! WSAS — Work and Social Adjustment Scale.

use super::{numbered_questions, ResponseOption, ScoredResult, Screener};

pub(super) fn wsas() -> Screener {
    fn impairment_options() -> Vec<ResponseOption> {
        vec![
            ResponseOption { value: 0, label: "Not at all" },
            ResponseOption { value: 1, label: "1" },
            ResponseOption { value: 2, label: "2" },
            ResponseOption { value: 3, label: "3" },
            ResponseOption { value: 4, label: "4" },
            ResponseOption { value: 5, label: "5" },
            ResponseOption { value: 6, label: "6" },
            ResponseOption { value: 7, label: "7" },
            ResponseOption { value: 8, label: "Very severely" },
        ]
    }
    let texts = [
        "Because of my problem, my ability to work is impaired.",
        "Because of my problem, my home management (cleaning, tidying, shopping, cooking, looking after home or children, paying bills) is impaired.",
        "Because of my problem, my social leisure activities (with other people, e.g. parties, bars, clubs, outings, visits, dating, home entertainment) are impaired.",
        "Because of my problem, my private leisure activities (done alone, such as reading, gardening, collecting, sewing, walking alone) are impaired.",
        "Because of my problem, my ability to form and maintain close relationships with others, including those I live with, is impaired.",
    ];
    Screener {
        id: "WSAS",
        description: "Work and Social Adjustment Scale - brief functional impairment measure",
        questions: numbered_questions(&texts, impairment_options),
        score_fn: score_wsas,
    }
}

fn score_wsas(responses: &[i64]) -> ScoredResult {
    let total: i64 = responses.iter().sum();

    let (severity, interpretation, clinical_sig) = if total >= 20 {
        (
            "severe",
            "Severe functional impairment",
            "Severe functional impairment (>=20). Psychopathology is markedly limiting work, home, social, and relational functioning. Comprehensive treatment plan with functional goals indicated.",
        )
    } else if total >= 10 {
        (
            "significant",
            "Significant functional impairment",
            "Significant functional impairment (10-19). Clinically meaningful interference with daily life. Track WSAS across treatment to measure functional recovery.",
        )
    } else {
        (
            "subclinical",
            "Subclinical functional impairment",
            "Subclinical impairment (<10). Functioning largely preserved.",
        )
    };

    ScoredResult {
        id: "WSAS".into(),
        score: total,
        max_score: 40,
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
        let wsas = get("WSAS").unwrap();
        assert_eq!(wsas.score(&[1, 1, 1, 1, 1]).unwrap().severity, "subclinical");
        assert_eq!(wsas.score(&[2, 2, 2, 2, 2]).unwrap().severity, "significant");
        assert_eq!(wsas.score(&[4, 4, 4, 4, 4]).unwrap().severity, "severe");
    }
}
