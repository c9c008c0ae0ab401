//! Imminent-risk signal detection over raw user turns.
//!
//! Compiled keyword patterns catch crisis language the structured extractor
//! would be too slow (or too unreliable) to flag: the scan runs on every
//! user turn before any model call, so escalation never depends on the
//! provider being reachable.

pub mod escalation;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::session::{RiskFlag, RiskKind};

struct RiskPattern {
    regex: Regex,
    kind: RiskKind,
    description: &'static str,
}

fn pattern(re: &str, kind: RiskKind, description: &'static str) -> RiskPattern {
    RiskPattern {
        // Patterns are static strings; a failure to compile is a programmer
        // error caught by the unit tests below.
        regex: Regex::new(re).expect("static risk pattern must compile"),
        kind,
        description,
    }
}

static RISK_PATTERNS: Lazy<Vec<RiskPattern>> = Lazy::new(|| {
    vec![
        // Suicidality
        pattern(
            r"(?i)\b(?:kill(?:ing)?\s+myself|suicid\w*|end(?:ing)?\s+my\s+life|(?:want|wish)(?:\s+\w+)?\s+to\s+die|better\s+off\s+dead|not\s+want(?:ing)?\s+to\s+be\s+alive)\b",
            RiskKind::HighSuicideRisk,
            "suicidal ideation language",
        ),
        pattern(
            r"(?i)\b(?:hurt(?:ing)?\s+myself|harm(?:ing)?\s+myself|self[- ]harm|cut(?:ting)?\s+myself)\b",
            RiskKind::HighSuicideRisk,
            "self-harm language",
        ),
        // Harm to others
        pattern(
            r"(?i)\b(?:kill(?:ing)?|hurt(?:ing)?|harm(?:ing)?)\s+(?:him|her|them|someone|somebody|people|others|my\s+\w+)\b",
            RiskKind::HomicidalIdeation,
            "harm-to-others language",
        ),
        // Psychosis
        pattern(
            r"(?i)\b(?:hear(?:ing)?\s+voices|voices\s+(?:are\s+)?telling\s+me|see(?:ing)?\s+things\s+(?:that\s+)?(?:aren't|are\s+not)\s+there|hallucinat\w*|they(?:'re|\s+are)\s+watching\s+me|reading\s+my\s+thoughts)\b",
            RiskKind::Psychosis,
            "psychotic symptom language",
        ),
        // Mania
        pattern(
            r"(?i)\b(?:feel\s+invincible|don't\s+need\s+(?:to\s+)?sleep|haven't\s+slept\s+in\s+days|racing\s+so\s+fast|unstoppable\s+energy)\b",
            RiskKind::Mania,
            "manic symptom language",
        ),
        // Substance crisis
        pattern(
            r"(?i)\b(?:overdos\w*|withdrawal\s+(?:symptoms|shakes)|(?:using|on)\s+(?:opioids?|heroin|fentanyl|meth(?:amphetamine)?)\b.{0,40}\bcan't\s+stop|can't\s+stop\s+(?:using|drinking))",
            RiskKind::SubstanceCrisis,
            "substance crisis language",
        ),
        // Trauma crisis
        pattern(
            r"(?i)\b(?:having\s+a\s+flashback|flashback\s+right\s+now|reliving\s+(?:it|the\s+trauma)|dissociat\w*\s+right\s+now)\b",
            RiskKind::TraumaCrisis,
            "acute trauma crisis language",
        ),
    ]
});

/// Scan one user turn for crisis language. At most one flag per risk kind
/// is returned per call.
pub fn scan(text: &str, at: DateTime<Utc>) -> Vec<RiskFlag> {
    let mut flags: Vec<RiskFlag> = Vec::new();
    for p in RISK_PATTERNS.iter() {
        if flags.iter().any(|f| f.kind == p.kind) {
            continue;
        }
        if let Some(found) = p.regex.find(text) {
            flags.push(RiskFlag {
                kind: p.kind,
                source: "keyword".to_string(),
                detail: format!("{}: {:?}", p.description, found.as_str()),
                at,
            });
        }
    }
    flags
}

/// Symptom domains implied by a keyword-detected risk, used to seed the
/// mandatory-screener requirements before the extractor has run.
pub fn implied_domains(kind: RiskKind) -> &'static [&'static str] {
    match kind {
        RiskKind::HighSuicideRisk => &["suicide_ideation", "depression"],
        RiskKind::HomicidalIdeation => &["suicide_ideation"],
        RiskKind::Psychosis => &[],
        RiskKind::Mania => &[],
        RiskKind::SubstanceCrisis => &["substance_use"],
        RiskKind::TraumaCrisis => &["trauma"],
        RiskKind::SevereDepression => &["depression"],
        RiskKind::EatingDisorderPositive => &["eating_concerns"],
        RiskKind::HarmfulDrinking => &["alcohol_use"],
        RiskKind::SubstantialSubstanceUse => &["substance_use"],
        RiskKind::PtsdPositive => &["trauma"],
    }
}
