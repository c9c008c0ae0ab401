//! End-to-end conversation engine tests against a scripted gateway.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::RwLock;
use tokio_stream::wrappers::ReceiverStream;

use intaked::config::{EnforcementThresholds, HotConfig};
use intaked::engine::frames::Frame;
use intaked::engine::ConversationEngine;
use intaked::error::EngineError;
use intaked::gateway::mock::MockGateway;
use intaked::report::TextRenderer;
use intaked::risk::escalation::LoggingSink;
use intaked::session::{Role, SessionStatus};
use intaked::storage::Storage;

async fn test_engine(
    thresholds: EnforcementThresholds,
) -> (Arc<ConversationEngine>, Arc<Storage>, Arc<MockGateway>) {
    let storage = Arc::new(Storage::in_memory().await.unwrap());
    let gateway = Arc::new(MockGateway::new());
    let hot = Arc::new(RwLock::new(HotConfig {
        log_level: "warn".into(),
        thresholds,
    }));
    let engine = ConversationEngine::new(
        storage.clone(),
        gateway.clone(),
        Arc::new(LoggingSink),
        Arc::new(TextRenderer),
        hot,
    );
    (engine, storage, gateway)
}

async fn drain(stream: ReceiverStream<Frame>) -> Vec<Frame> {
    stream.collect().await
}

/// One full scripted extraction that completes every assessment phase and
/// flags depression + suicidal ideation.
fn full_extraction() -> serde_json::Value {
    json!({
        "fields": {
            "chief_complaint": "persistent low mood",
            "mood": "depressed",
            "anhedonia": "no interest in anything",
            "concentration": "poor",
            "memory": "intact",
            "sleep": "early-morning waking",
            "appetite": "reduced",
            "energy": "exhausted",
            "substance_overview": "none reported",
            "daily_functioning": "missing work",
            "mental_status": "alert, cooperative, constricted affect"
        },
        "symptoms": { "depression": true, "suicide_ideation": true }
    })
}

#[tokio::test]
async fn enforcement_screeners_and_escalation_end_to_end() {
    let thresholds = EnforcementThresholds {
        min_history: 2,
        min_symptom_domains: 1,
    };
    let (engine, storage, gateway) = test_engine(thresholds).await;
    storage.insert_admin("oncall@clinic.test", "On Call").await.unwrap();
    storage.insert_admin("lead@clinic.test", "Lead").await.unwrap();

    let (meta, opening) = engine.start(None, Some("Ada".into())).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();
    assert_eq!(meta.current_phase, "greeting");

    drain(engine.chat(&token, "I've been feeling very low for months").await.unwrap()).await;
    drain(engine.chat(&token, "I can't sleep and nothing feels worth doing").await.unwrap()).await;

    // The third user turn runs the extractor; the scripted result completes
    // every assessment phase, which opens the enforcement gate.
    gateway.push_structured(full_extraction());
    let frames = drain(
        engine
            .chat(&token, "Most days I just go through the motions")
            .await
            .unwrap(),
    )
    .await;
    let question = frames
        .iter()
        .find(|f| f.options.is_some())
        .expect("enforcement should present the first screener question");
    assert!(question.content.contains("C-SSRS"));

    let snapshot = engine.snapshot(&token).await.unwrap();
    assert_eq!(snapshot.current_phase, "screening");
    assert_eq!(snapshot.current_screener.as_deref(), Some("C-SSRS"));

    // A non-numeric answer is rejected with a reprompt and no progress.
    let frames = drain(engine.chat(&token, "maybe").await.unwrap()).await;
    assert!(frames[0].content.contains("one of the listed numbers"));
    assert_eq!(
        engine.snapshot(&token).await.unwrap().screener_questions_answered,
        0
    );

    // C-SSRS answers endorsing ideation with intent: severity high.
    for answer in ["1", "1", "1", "1", "0"] {
        drain(engine.chat(&token, answer).await.unwrap()).await;
    }
    let frames = drain(engine.chat(&token, "0").await.unwrap()).await;
    let summary = &frames[0].content;
    assert!(summary.contains("C-SSRS"));
    assert!(summary.contains("PHQ-9"), "next mandated screener follows");

    // The high-risk escalation fanned out to every active admin atomically.
    let audits = storage.list_audit_events("high_risk_detected").await.unwrap();
    assert_eq!(audits.len(), 1);
    for admin in storage.list_active_admins().await.unwrap() {
        let notifications = storage.list_notifications_for(&admin.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].priority, "urgent");
    }

    // PHQ-9 all threes: 27/27, severe, second escalation.
    for _ in 0..8 {
        drain(engine.chat(&token, "3").await.unwrap()).await;
    }
    let frames = drain(engine.chat(&token, "3").await.unwrap()).await;
    assert!(frames[0].content.contains("27"));

    let session = storage.load_session(&token).await.unwrap();
    assert_eq!(session.screeners_completed, vec!["C-SSRS", "PHQ-9"]);
    let mut keys: Vec<&String> = session.screener_scores.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["C-SSRS", "PHQ-9"]);
    assert!(session
        .risk_flags
        .iter()
        .any(|f| f.kind == intaked::session::RiskKind::SevereDepression));
    assert_eq!(session.phase.as_str(), "report_generation");

    let audits = storage.list_audit_events("high_risk_detected").await.unwrap();
    assert_eq!(audits.len(), 2);

    // Wrapping up generates the report and completes the session.
    gateway.push_structured(json!({
        "chief_complaint": "persistent low mood",
        "history_of_present_illness": "months of low mood and insomnia",
        "symptom_review": {"depression": "severe"},
        "screener_results": [],
        "risk_assessment": "high suicide risk, escalated",
        "recommendations": ["urgent clinician review"]
    }));
    let frames = drain(engine.chat(&token, "No, that's everything").await.unwrap()).await;
    let last = frames.last().unwrap();
    assert!(last.done);
    assert!(last.patient_pdf.is_some());
    assert!(last.clinician_pdf.is_some());

    let session = storage.load_session(&token).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.completed_at.is_some());
    assert!(storage.get_report(&session.id).await.unwrap().is_some());

    // A completed session accepts no further turns.
    assert!(matches!(
        engine.chat(&token, "hello?").await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn pause_resume_roundtrip_and_expiry() {
    let (engine, storage, _gateway) = test_engine(EnforcementThresholds::default()).await;
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();

    for prompt in ["hello", "I've been anxious", "mostly at night"] {
        drain(engine.chat(&token, prompt).await.unwrap()).await;
    }

    let before = storage.load_session(&token).await.unwrap();
    let receipt = engine.pause(&token).await.unwrap();

    let paused = storage.load_session(&token).await.unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(
        receipt.expires_at,
        paused.paused_at.unwrap() + Duration::hours(24)
    );
    assert_eq!(paused.resume_token.as_deref(), Some(receipt.resume_token.as_str()));

    // No user turn can land while paused.
    assert!(matches!(
        engine.chat(&token, "still there?").await,
        Err(EngineError::Validation(_))
    ));

    let (resumed_meta, frames) = engine.resume(&receipt.resume_token).await.unwrap();
    assert_eq!(resumed_meta.session_token, token);
    let frames = drain(frames).await;
    assert!(frames.iter().any(|f| f.done));

    let after = storage.load_session(&token).await.unwrap();
    assert_eq!(after.status, SessionStatus::Active);
    assert!(after.paused_at.is_none());
    assert!(after.resume_token.is_none());
    // The round-trip left the transcript and extracted data untouched.
    assert_eq!(before.history, after.history);
    assert_eq!(before.extracted_data, after.extracted_data);

    // Pause again, then force the expiry into the past.
    let receipt = engine.pause(&token).await.unwrap();
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE session_token = ?")
        .bind((Utc::now() - Duration::hours(1)).to_rfc3339())
        .bind(&token)
        .execute(storage.pool())
        .await
        .unwrap();

    assert!(matches!(
        engine.resume(&receipt.resume_token).await,
        Err(EngineError::Expired)
    ));
    let abandoned = storage.load_session(&token).await.unwrap();
    assert_eq!(abandoned.status, SessionStatus::Abandoned);
}

#[tokio::test]
async fn sweeper_abandons_expired_paused_sessions() {
    let (engine, storage, _gateway) = test_engine(EnforcementThresholds::default()).await;
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();

    engine.pause(&token).await.unwrap();
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE session_token = ?")
        .bind((Utc::now() - Duration::minutes(5)).to_rfc3339())
        .bind(&token)
        .execute(storage.pool())
        .await
        .unwrap();

    assert_eq!(engine.sweep(Utc::now()).await.unwrap(), 1);
    assert_eq!(
        storage.load_session(&token).await.unwrap().status,
        SessionStatus::Abandoned
    );
    // No resurrection on a second sweep.
    assert_eq!(engine.sweep(Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn client_disconnect_discards_partial_assistant_turn() {
    let (engine, storage, gateway) = test_engine(EnforcementThresholds::default()).await;
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();

    // Forty fragments against a small frame buffer: dropping the consumer
    // midway guarantees a blocked send that observes the disconnect.
    gateway.push_script((0..40).map(|i| format!("fragment {i} ")));
    let mut stream = engine.chat(&token, "tell me about the process").await.unwrap();
    stream.next().await.expect("first fragment");
    stream.next().await.expect("second fragment");
    drop(stream);

    // Let the producer task observe the closed channel.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let session = storage.load_session(&token).await.unwrap();
    let last = session.history.last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, "tell me about the process");

    // The next turn proceeds as if the cancelled one never streamed.
    let frames = drain(engine.chat(&token, "are you still there?").await.unwrap()).await;
    assert!(frames.iter().any(|f| f.done));
}

#[tokio::test]
async fn gateway_failure_keeps_user_turn_and_session_state() {
    let (engine, storage, gateway) = test_engine(EnforcementThresholds::default()).await;
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();

    let turns_before = storage.load_session(&token).await.unwrap().history.len();

    gateway.push_script(["⚠️ Provider error: upstream 500"]);
    let frames = drain(engine.chat(&token, "hello").await.unwrap()).await;
    assert!(frames[0].content.starts_with("⚠️"));
    assert_eq!(frames.last().unwrap().error.as_deref(), Some("gateway"));

    let session = storage.load_session(&token).await.unwrap();
    // Exactly one new turn: the user's. No assistant turn was committed.
    assert_eq!(session.history.len(), turns_before + 1);
    assert_eq!(session.history.last().unwrap().role, Role::User);
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn finish_directive_inserts_cssrs_when_risk_is_unaddressed() {
    let (engine, storage, gateway) = test_engine(EnforcementThresholds::default()).await;
    storage.insert_admin("oncall@clinic.test", "On Call").await.unwrap();
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();

    // Crisis language raises a keyword flag and its escalation immediately.
    let frames = drain(engine.chat(&token, "I want to kill myself").await.unwrap()).await;
    assert!(frames.iter().any(|f| f.done));
    let session = storage.load_session(&token).await.unwrap();
    assert!(session
        .risk_flags
        .iter()
        .any(|f| f.kind == intaked::session::RiskKind::HighSuicideRisk));
    let admin = &storage.list_active_admins().await.unwrap()[0];
    assert_eq!(storage.list_notifications_for(&admin.id).await.unwrap().len(), 1);

    // :finish must detour through the C-SSRS before any report.
    let frames = drain(engine.chat(&token, ":finish").await.unwrap()).await;
    let question = frames.iter().find(|f| f.options.is_some()).unwrap();
    assert!(question.content.contains("C-SSRS"));

    // Screener questions cannot be skipped; the directive is rejected
    // before any stream opens.
    assert!(matches!(
        engine.chat(&token, ":skip").await,
        Err(EngineError::Validation(_))
    ));

    // Denying everything scores minimal; PHQ-9 is still owed for the
    // depression domain implied by the keyword flag.
    for answer in ["0", "0", "0", "0", "0"] {
        drain(engine.chat(&token, answer).await.unwrap()).await;
    }
    let frames = drain(engine.chat(&token, "0").await.unwrap()).await;
    assert!(frames[0].content.contains("PHQ-9"));
    for _ in 0..8 {
        drain(engine.chat(&token, "0").await.unwrap()).await;
    }
    drain(engine.chat(&token, "0").await.unwrap()).await;

    // With screening complete, :finish produces the report.
    gateway.push_structured(json!({
        "chief_complaint": "crisis presentation",
        "history_of_present_illness": "suicidal ideation reported in session",
        "symptom_review": {},
        "screener_results": [],
        "risk_assessment": "keyword-flagged, C-SSRS minimal on denial",
        "recommendations": ["clinician safety review"]
    }));
    let frames = drain(engine.chat(&token, ":finish").await.unwrap()).await;
    let last = frames.last().unwrap();
    assert!(last.done && last.patient_pdf.is_some());
    assert_eq!(
        storage.load_session(&token).await.unwrap().status,
        SessionStatus::Completed
    );
}

#[tokio::test]
async fn pause_directive_and_skip_rules() {
    let (engine, storage, _gateway) = test_engine(EnforcementThresholds::default()).await;
    let (meta, opening) = engine.start(None, None).await.unwrap();
    drain(opening).await;
    let token = meta.session_token.clone();
    drain(engine.chat(&token, "hello there").await.unwrap()).await;

    // :skip moves past the current assessment topic.
    let before = storage.load_session(&token).await.unwrap().phase;
    drain(engine.chat(&token, ":skip").await.unwrap()).await;
    let after = storage.load_session(&token).await.unwrap().phase;
    assert_ne!(before, after);

    // :pause inside chat pauses durably.
    let frames = drain(engine.chat(&token, ":pause").await.unwrap()).await;
    assert!(frames[0].content.contains("resume token"));
    let session = storage.load_session(&token).await.unwrap();
    assert_eq!(session.status, SessionStatus::Paused);
    assert!(session.resume_token.is_some());
}
