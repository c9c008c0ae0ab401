//! Session domain model: the per-patient intake state machine's state.
//!
//! The [`Session`] struct is the single unit of persistence and the single
//! unit of mutation — the conversation engine is its only writer, under a
//! per-token lease. The storage layer serializes the JSON-valued fields into
//! the `sessions` row.

use std::collections::BTreeMap;

use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::screeners::ScoredResult;

/// How long a paused session stays resumable.
pub const PAUSE_TTL_HOURS: i64 = 24;

// ─── Phases ──────────────────────────────────────────────────────────────────

/// Stages of the intake interview, traversed in a partial order. Each phase
/// is recorded in `completed_phases` when it is exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Greeting,
    ChiefComplaint,
    MoodAssessment,
    CognitiveAssessment,
    PhysicalAssessment,
    BehavioralAssessment,
    MentalStatusExam,
    Screening,
    ReportGeneration,
    Completed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Greeting => "greeting",
            Phase::ChiefComplaint => "chief_complaint",
            Phase::MoodAssessment => "mood_assessment",
            Phase::CognitiveAssessment => "cognitive_assessment",
            Phase::PhysicalAssessment => "physical_assessment",
            Phase::BehavioralAssessment => "behavioral_assessment",
            Phase::MentalStatusExam => "mental_status_exam",
            Phase::Screening => "screening",
            Phase::ReportGeneration => "report_generation",
            Phase::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "greeting" => Phase::Greeting,
            "chief_complaint" => Phase::ChiefComplaint,
            "mood_assessment" => Phase::MoodAssessment,
            "cognitive_assessment" => Phase::CognitiveAssessment,
            "physical_assessment" => Phase::PhysicalAssessment,
            "behavioral_assessment" => Phase::BehavioralAssessment,
            "mental_status_exam" => Phase::MentalStatusExam,
            "screening" => Phase::Screening,
            "report_generation" => Phase::ReportGeneration,
            "completed" => Phase::Completed,
            _ => return None,
        })
    }

    /// The interview phases that must all be visited before screener
    /// enforcement may begin.
    pub const ASSESSMENT_SEQUENCE: &'static [Phase] = &[
        Phase::Greeting,
        Phase::ChiefComplaint,
        Phase::MoodAssessment,
        Phase::CognitiveAssessment,
        Phase::PhysicalAssessment,
        Phase::BehavioralAssessment,
        Phase::MentalStatusExam,
    ];

    /// Next phase in the assessment sequence, if this phase is part of it.
    pub fn next_assessment(self) -> Option<Phase> {
        let idx = Self::ASSESSMENT_SEQUENCE.iter().position(|p| *p == self)?;
        Self::ASSESSMENT_SEQUENCE.get(idx + 1).copied()
    }

    /// Extracted-data keys that must be populated before this assessment
    /// phase is considered complete.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Phase::Greeting => &[],
            Phase::ChiefComplaint => &["chief_complaint"],
            Phase::MoodAssessment => &["mood", "anhedonia"],
            Phase::CognitiveAssessment => &["concentration", "memory"],
            Phase::PhysicalAssessment => &["sleep", "appetite", "energy"],
            Phase::BehavioralAssessment => &["substance_overview", "daily_functioning"],
            Phase::MentalStatusExam => &["mental_status"],
            _ => &[],
        }
    }
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "active" => SessionStatus::Active,
            "paused" => SessionStatus::Paused,
            "completed" => SessionStatus::Completed,
            "abandoned" => SessionStatus::Abandoned,
            _ => return None,
        })
    }
}

// ─── Conversation turns ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// ─── Risk flags ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    HighSuicideRisk,
    SevereDepression,
    Psychosis,
    Mania,
    SubstanceCrisis,
    TraumaCrisis,
    HomicidalIdeation,
    EatingDisorderPositive,
    HarmfulDrinking,
    SubstantialSubstanceUse,
    PtsdPositive,
}

impl RiskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskKind::HighSuicideRisk => "high_suicide_risk",
            RiskKind::SevereDepression => "severe_depression",
            RiskKind::Psychosis => "psychosis",
            RiskKind::Mania => "mania",
            RiskKind::SubstanceCrisis => "substance_crisis",
            RiskKind::TraumaCrisis => "trauma_crisis",
            RiskKind::HomicidalIdeation => "homicidal_ideation",
            RiskKind::EatingDisorderPositive => "eating_disorder_positive",
            RiskKind::HarmfulDrinking => "harmful_drinking",
            RiskKind::SubstantialSubstanceUse => "substantial_substance_use",
            RiskKind::PtsdPositive => "ptsd_positive",
        }
    }
}

/// A configured risk threshold that has been crossed within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub kind: RiskKind,
    /// Screener id or keyword class that produced the flag.
    pub source: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub patient_id: Option<String>,
    pub phase: Phase,
    pub history: Vec<Turn>,
    /// Free-form key→value captured from the dialogue (demographics, chief
    /// complaint, functioning, per-phase assessment fields).
    pub extracted_data: BTreeMap<String, serde_json::Value>,
    /// Symptom domain → flagged.
    pub symptoms_detected: BTreeMap<String, bool>,
    /// Completed instruments, in administration order.
    pub screeners_completed: Vec<String>,
    pub screener_scores: BTreeMap<String, ScoredResult>,
    /// Instrument currently being administered, if any.
    pub current_screener: Option<String>,
    /// Answers collected so far for `current_screener`.
    pub screener_progress: Vec<i64>,
    /// Phase names recorded on exit.
    pub completed_phases: Vec<String>,
    pub status: SessionStatus,
    pub paused_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub resume_token: Option<String>,
    pub risk_flags: Vec<RiskFlag>,
    /// Monotonic row version for compare-and-set commits.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A URL-safe unguessable token: 32 random bytes, base64url.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

impl Session {
    pub fn new(patient_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: generate_token(),
            patient_id,
            phase: Phase::Greeting,
            history: Vec::new(),
            extracted_data: BTreeMap::new(),
            symptoms_detected: BTreeMap::new(),
            screeners_completed: Vec::new(),
            screener_scores: BTreeMap::new(),
            current_screener: None,
            screener_progress: Vec::new(),
            completed_phases: Vec::new(),
            status: SessionStatus::Active,
            paused_at: None,
            expires_at: None,
            resume_token: None,
            risk_flags: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// History is append-only; this is the only mutation path.
    pub fn append_turn(&mut self, role: Role, content: impl Into<String>, at: DateTime<Utc>) {
        self.history.push(Turn {
            role,
            content: content.into(),
            timestamp: at,
        });
    }

    pub fn user_turn_count(&self) -> usize {
        self.history.iter().filter(|t| t.role == Role::User).count()
    }

    /// Symptom domains currently flagged true.
    pub fn flagged_domains(&self) -> Vec<&str> {
        self.symptoms_detected
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn has_flag(&self, kind: RiskKind) -> bool {
        self.risk_flags.iter().any(|f| f.kind == kind)
    }

    /// Add a flag unless one of the same kind is already present. Returns
    /// whether the flag was new.
    pub fn add_flag(&mut self, flag: RiskFlag) -> bool {
        if self.has_flag(flag.kind) {
            return false;
        }
        self.risk_flags.push(flag);
        true
    }

    /// Record the current phase as completed and move to `next`.
    pub fn advance_phase(&mut self, next: Phase) {
        let name = self.phase.as_str().to_string();
        if !self.completed_phases.contains(&name) {
            self.completed_phases.push(name);
        }
        self.phase = next;
    }

    /// Transition to paused: mint a resume token and a 24-hour expiry.
    pub fn pause(&mut self, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let resume_token = generate_token();
        let expires_at = now + Duration::hours(PAUSE_TTL_HOURS);
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        self.expires_at = Some(expires_at);
        self.resume_token = Some(resume_token.clone());
        (resume_token, expires_at)
    }

    /// Transition back to active, clearing pause metadata. The invariant
    /// that an active session has no pause fields holds by construction.
    pub fn unpause(&mut self) {
        self.status = SessionStatus::Active;
        self.paused_at = None;
        self.expires_at = None;
        self.resume_token = None;
    }

    pub fn is_pause_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Paused
            && self.expires_at.is_some_and(|exp| exp < now)
    }
}
