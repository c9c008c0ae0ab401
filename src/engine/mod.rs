//! The intake conversation engine.
//!
//! One long-lived state machine per session, mutated only here and only
//! under the per-token lease: `chat`, `pause`, `resume`, and `finish` are
//! serialized per session while distinct sessions run in parallel. Frames
//! flow to the client over a bounded channel, so client backpressure
//! propagates to the gateway by simply not reading the next fragment.
//!
//! Ordering rules this module enforces:
//! - the user turn commits (with any risk escalation) before streaming
//!   begins, so a cancelled or failed assistant turn never loses it;
//! - the assistant turn commits only after every fragment was accepted;
//! - a risk flag commits atomically with its audit entry and notifications.

pub mod extraction;
pub mod frames;
pub mod prompts;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::config::HotConfig;
use crate::enforcement;
use crate::error::{EngineError, EngineResult};
use crate::gateway::{ChatMessage, LlmGateway};
use crate::report::{self, Audience, ReportRenderer};
use crate::risk::{self, escalation::NotificationSink};
use crate::screeners;
use crate::session::{Phase, Role, Session, SessionStatus};
use crate::storage::{EscalationBatch, Storage};

use frames::{options_for, Frame};

/// Wall-clock budget for a single chat call.
pub const CHAT_DEADLINE: Duration = Duration::from_secs(60);
/// Outbound frame buffer; small so backpressure reaches the gateway.
const FRAME_BUFFER: usize = 8;
/// CAS commit attempts before surfacing a conflict.
const COMMIT_ATTEMPTS: u32 = 3;

// ─── View types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    pub session_token: String,
    pub current_phase: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PauseReceipt {
    pub resume_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_token: String,
    pub current_phase: String,
    pub status: String,
    pub turns: usize,
    pub screeners_completed: Vec<String>,
    pub current_screener: Option<String>,
    pub screener_questions_answered: usize,
    pub risk_flag_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn meta(session: &Session) -> SessionMeta {
    SessionMeta {
        session_token: session.token.clone(),
        current_phase: session.phase.as_str().to_string(),
        status: session.status.as_str().to_string(),
        created_at: session.created_at,
    }
}

/// Outcome of relaying one gateway stream to the client.
enum StreamOutcome {
    /// All fragments delivered; the full assistant text.
    Completed(String),
    /// The client stopped reading; the partial turn is discarded.
    ClientGone,
    /// The gateway emitted a terminal error fragment.
    GatewayFailed,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct ConversationEngine {
    storage: Arc<Storage>,
    gateway: Arc<dyn LlmGateway>,
    sink: Arc<dyn NotificationSink>,
    renderer: Arc<dyn ReportRenderer>,
    hot: Arc<RwLock<HotConfig>>,
    /// Per-session write leases. An entry exists while a session is live in
    /// this process; the sweeper evicts entries with the cache.
    leases: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Active-session cache; durable truth lives in storage.
    cache: RwLock<HashMap<String, Session>>,
}

impl ConversationEngine {
    pub fn new(
        storage: Arc<Storage>,
        gateway: Arc<dyn LlmGateway>,
        sink: Arc<dyn NotificationSink>,
        renderer: Arc<dyn ReportRenderer>,
        hot: Arc<RwLock<HotConfig>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            gateway,
            sink,
            renderer,
            hot,
            leases: Mutex::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        })
    }

    // ─── Lease / cache / commit plumbing ────────────────────────────────────

    async fn lease(&self, token: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut leases = self.leases.lock().await;
            leases
                .entry(token.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn load(&self, token: &str) -> EngineResult<Session> {
        if let Some(session) = self.cache.read().await.get(token) {
            return Ok(session.clone());
        }
        self.storage.load_session(token).await
    }

    async fn cache_put(&self, session: &Session) {
        self.cache
            .write()
            .await
            .insert(session.token.clone(), session.clone());
    }

    /// Drop a session from the in-memory cache and lease map.
    pub async fn evict(&self, token: &str) {
        self.cache.write().await.remove(token);
        self.leases.lock().await.remove(token);
    }

    fn jitter() -> Duration {
        let mut byte = [0u8; 1];
        OsRng.fill_bytes(&mut byte);
        Duration::from_millis(u64::from(byte[0]) % 50)
    }

    /// CAS commit with jittered backoff. The only legitimate concurrent
    /// writer is the sweeper, so on a version conflict we rebase onto the
    /// stored row unless it was abandoned underneath us.
    async fn commit(
        &self,
        session: &mut Session,
        batches: &[EscalationBatch],
    ) -> EngineResult<()> {
        let mut delay = Duration::from_millis(25);
        for attempt in 1..=COMMIT_ATTEMPTS {
            let result = if batches.is_empty() {
                self.storage.commit(session).await
            } else {
                self.storage.commit_with_escalation(session, batches).await
            };
            match result {
                Ok(()) => {
                    self.cache_put(session).await;
                    return Ok(());
                }
                Err(EngineError::Conflict) if attempt < COMMIT_ATTEMPTS => {
                    let stored = self.storage.load_session(&session.token).await?;
                    if stored.status == SessionStatus::Abandoned
                        && session.status != SessionStatus::Abandoned
                    {
                        return Err(EngineError::Expired);
                    }
                    warn!(
                        session = %session.token,
                        attempt,
                        "commit conflict — rebasing onto stored version"
                    );
                    session.version = stored.version;
                    tokio::time::sleep(delay + Self::jitter()).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
        Err(EngineError::Conflict)
    }

    /// Best-effort fan-out to the external delivery sink, after commit.
    fn deliver(&self, batches: Vec<EscalationBatch>) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            for batch in batches {
                for notification in &batch.notifications {
                    sink.deliver(notification).await;
                }
            }
        });
    }

    /// Build escalation batches for flags that were just added.
    async fn batches_for(
        &self,
        session: &Session,
        new_flags: &[crate::session::RiskFlag],
    ) -> EngineResult<Vec<EscalationBatch>> {
        if new_flags.is_empty() {
            return Ok(Vec::new());
        }
        let admins = self.storage.list_active_admins().await?;
        Ok(new_flags
            .iter()
            .map(|flag| risk::escalation::batch_for(flag, session, &admins))
            .collect())
    }

    // ─── Public operations ──────────────────────────────────────────────────

    /// Create a session and stream the opening turn.
    pub async fn start(
        self: &Arc<Self>,
        patient_id: Option<String>,
        user_name: Option<String>,
    ) -> EngineResult<(SessionMeta, ReceiverStream<Frame>)> {
        let now = Utc::now();
        let mut session = Session::new(patient_id, now);
        if let Some(name) = user_name {
            session
                .extracted_data
                .insert("name".to_string(), serde_json::json!(name));
        }
        self.storage.create_session(&session).await?;
        self.cache_put(&session).await;
        info!(session = %session.token, "intake session created");

        let session_meta = meta(&session);
        let guard = self.lease(&session.token).await;
        let engine = Arc::clone(self);
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        tokio::spawn(async move {
            let _guard = guard;
            match engine.stream_llm_turn(&mut session, &tx).await {
                Ok(StreamOutcome::Completed(content)) => {
                    session.append_turn(Role::Assistant, content, Utc::now());
                    if let Err(e) = engine.commit(&mut session, &[]).await {
                        warn!(err = %e, "failed to commit opening turn");
                    }
                    let _ = tx.send(Frame::done()).await;
                }
                Ok(StreamOutcome::GatewayFailed) | Ok(StreamOutcome::ClientGone) => {}
                Err(e) => {
                    let _ = tx.send(Frame::error(tag_of(&e), e.to_string())).await;
                }
            }
        });
        Ok((session_meta, ReceiverStream::new(rx)))
    }

    /// Consume one user turn and stream the response.
    pub async fn chat(
        self: &Arc<Self>,
        token: &str,
        prompt: &str,
    ) -> EngineResult<ReceiverStream<Frame>> {
        let guard = self.lease(token).await;
        let mut session = self.load(token).await?;
        match session.status {
            SessionStatus::Active => {}
            SessionStatus::Paused => {
                if session.is_pause_expired(Utc::now()) {
                    session.status = SessionStatus::Abandoned;
                    self.commit(&mut session, &[]).await?;
                    self.evict(token).await;
                    return Err(EngineError::Expired);
                }
                return Err(EngineError::Validation(
                    "session is paused; resume it first".into(),
                ));
            }
            SessionStatus::Completed => {
                return Err(EngineError::Validation("session is already completed".into()))
            }
            SessionStatus::Abandoned => return Err(EngineError::Expired),
        }

        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(EngineError::Validation("empty prompt".into()));
        }
        // Directive validity is checked before the stream opens so a bad
        // directive is reported to the caller, not spliced into a stream.
        if prompt == ":skip" {
            if session.current_screener.is_some() {
                return Err(EngineError::Validation(
                    "screener questions cannot be skipped".into(),
                ));
            }
            if session.phase.next_assessment().is_none() {
                return Err(EngineError::Validation(
                    "nothing to skip in this part of the interview".into(),
                ));
            }
        }

        let engine = Arc::clone(self);
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        tokio::spawn(async move {
            let _guard = guard;
            let turn = engine.run_chat_turn(&mut session, &prompt, &tx);
            match tokio::time::timeout(CHAT_DEADLINE, turn).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = tx
                        .send(Frame::error(tag_of(&e), format!("⚠️ {e}")))
                        .await;
                }
                Err(_) => {
                    warn!(session = %session.token, "chat deadline exceeded — cancelling turn");
                    let _ = tx
                        .send(Frame::error(
                            "gateway",
                            "⚠️ The response took too long and was cancelled. Your message \
                             was saved; please try again.",
                        ))
                        .await;
                }
            }
        });
        Ok(ReceiverStream::new(rx))
    }

    /// Pause an active session. Durable before this returns.
    pub async fn pause(&self, token: &str) -> EngineResult<PauseReceipt> {
        let _guard = self.lease(token).await;
        let mut session = self.load(token).await?;
        if session.status != SessionStatus::Active {
            return Err(EngineError::Validation(
                "only an active session can be paused".into(),
            ));
        }
        let now = Utc::now();
        let (resume_token, expires_at) = session.pause(now);
        self.commit(&mut session, &[]).await?;
        info!(session = %session.token, "session paused");
        Ok(PauseReceipt {
            resume_token,
            expires_at,
        })
    }

    /// Resume a paused session within its expiry window.
    pub async fn resume(
        self: &Arc<Self>,
        resume_token: &str,
    ) -> EngineResult<(SessionMeta, ReceiverStream<Frame>)> {
        let found = self.storage.load_by_resume_token(resume_token).await?;
        let _guard = self.lease(&found.token).await;
        // Reload under the lease; the row may have moved.
        let mut session = self.storage.load_session(&found.token).await?;
        if session.status != SessionStatus::Paused {
            return Err(EngineError::Validation("session is not paused".into()));
        }
        let now = Utc::now();
        if session.is_pause_expired(now) {
            session.status = SessionStatus::Abandoned;
            self.commit(&mut session, &[]).await?;
            self.evict(&session.token).await;
            return Err(EngineError::Expired);
        }
        session.unpause();
        self.commit(&mut session, &[]).await?;
        info!(session = %session.token, "session resumed");

        let session_meta = meta(&session);
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        // A canned welcome-back frame: not appended to history, so a
        // pause/resume round-trip leaves the transcript byte-identical.
        let phase = session.phase.as_str().to_string();
        tokio::spawn(async move {
            let _ = tx
                .send(Frame::message(
                    format!(
                        "Welcome back. We were in the {} part of your intake; \
                         let's pick up where we left off.",
                        phase.replace('_', " ")
                    ),
                    None,
                ))
                .await;
            let _ = tx.send(Frame::done()).await;
        });
        Ok((session_meta, ReceiverStream::new(rx)))
    }

    /// Explicitly terminate the conversation and produce the report.
    pub async fn finish(self: &Arc<Self>, token: &str) -> EngineResult<ReceiverStream<Frame>> {
        let guard = self.lease(token).await;
        let mut session = self.load(token).await?;
        if session.status != SessionStatus::Active {
            return Err(EngineError::Validation(
                "only an active session can be finished".into(),
            ));
        }
        let engine = Arc::clone(self);
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = engine.run_finish(&mut session, &tx).await {
                let _ = tx.send(Frame::error(tag_of(&e), format!("⚠️ {e}"))).await;
            }
        });
        Ok(ReceiverStream::new(rx))
    }

    /// Read-only session view.
    pub async fn snapshot(&self, token: &str) -> EngineResult<SessionSnapshot> {
        let session = self.load(token).await?;
        Ok(SessionSnapshot {
            session_token: session.token.clone(),
            current_phase: session.phase.as_str().to_string(),
            status: session.status.as_str().to_string(),
            turns: session.history.len(),
            screeners_completed: session.screeners_completed.clone(),
            current_screener: session.current_screener.clone(),
            screener_questions_answered: session.screener_progress.len(),
            risk_flag_count: session.risk_flags.len(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        })
    }

    /// Hourly maintenance: expired paused sessions become abandoned and are
    /// evicted; stale abandoned sessions are evicted from cache only.
    pub async fn sweep(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let swept = self.storage.sweep_expired(now).await?;
        for token in &swept {
            self.evict(token).await;
        }
        let stale = self
            .storage
            .stale_abandoned_tokens(now - chrono::Duration::hours(48))
            .await?;
        for token in &stale {
            self.evict(token).await;
        }
        Ok(swept.len())
    }

    // ─── Turn pipeline ──────────────────────────────────────────────────────

    async fn run_chat_turn(
        &self,
        session: &mut Session,
        prompt: &str,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<()> {
        let now = Utc::now();

        // Control directives are recognized before any model call.
        match prompt {
            ":pause" => return self.directive_pause(session, tx, now).await,
            ":finish" => return self.run_finish(session, tx).await,
            ":skip" => return self.directive_skip(session, tx).await,
            _ => {}
        }

        // Commit the user turn first — with its risk escalation, atomically —
        // so a failed or cancelled stream never loses it.
        session.append_turn(Role::User, prompt, now);
        let mut new_flags = Vec::new();
        for flag in risk::scan(prompt, now) {
            for domain in risk::implied_domains(flag.kind) {
                session
                    .symptoms_detected
                    .insert((*domain).to_string(), true);
            }
            if session.add_flag(flag.clone()) {
                new_flags.push(flag);
            }
        }
        let batches = self.batches_for(session, &new_flags).await?;
        self.commit(session, &batches).await?;
        self.deliver(batches);

        if session.current_screener.is_some() {
            return self.screener_turn(session, prompt, tx).await;
        }
        if session.phase == Phase::ReportGeneration {
            return self.run_finish(session, tx).await;
        }
        self.conversational_turn(session, tx).await
    }

    async fn directive_pause(
        &self,
        session: &mut Session,
        tx: &mpsc::Sender<Frame>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let (resume_token, expires_at) = session.pause(now);
        self.commit(session, &[]).await?;
        let _ = tx
            .send(Frame::message(
                format!(
                    "Your session is paused. Use resume token {resume_token} to \
                     continue any time before {}.",
                    expires_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None,
            ))
            .await;
        let _ = tx.send(Frame::done()).await;
        Ok(())
    }

    async fn directive_skip(
        &self,
        session: &mut Session,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<()> {
        // Validity was established in `chat` before the stream opened.
        if let Some(next) = session.phase.next_assessment() {
            session.advance_phase(next);
        }
        self.conversational_turn(session, tx).await
    }

    /// Administer the active screener: validate the answer, advance or
    /// reprompt, score on completion.
    async fn screener_turn(
        &self,
        session: &mut Session,
        prompt: &str,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<()> {
        let screener_id = session
            .current_screener
            .clone()
            .ok_or_else(|| EngineError::internal("screener_turn without current screener"))?;
        let screener = screeners::get(&screener_id)?;
        let question_idx = session.screener_progress.len();

        let answer: Option<i64> = prompt.trim().parse().ok();
        let valid = match answer {
            Some(value) => screener.validate_answer(question_idx, value).is_ok(),
            None => false,
        };

        if !valid {
            // Reprompt without advancing.
            let question = &screener.questions[question_idx];
            let content = format!(
                "Please answer with one of the listed numbers.\n\n{}",
                screener.prompt_for(question_idx)
            );
            session.append_turn(Role::Assistant, &content, Utc::now());
            self.commit(session, &[]).await?;
            let _ = tx
                .send(Frame::message(content, Some(options_for(question))))
                .await;
            let _ = tx.send(Frame::done()).await;
            return Ok(());
        }

        // `valid` implies the parse succeeded.
        session.screener_progress.push(answer.unwrap_or_default());

        if session.screener_progress.len() < screener.len() {
            let next_idx = session.screener_progress.len();
            let content = screener.prompt_for(next_idx);
            session.append_turn(Role::Assistant, &content, Utc::now());
            self.commit(session, &[]).await?;
            let _ = tx
                .send(Frame::message(
                    content,
                    Some(options_for(&screener.questions[next_idx])),
                ))
                .await;
            let _ = tx.send(Frame::done()).await;
            return Ok(());
        }

        // Vector complete: score, record, escalate, continue.
        let responses = std::mem::take(&mut session.screener_progress);
        session.current_screener = None;
        let (result, new_flags) = enforcement::score_and_store(session, &screener_id, &responses)?;
        info!(
            session = %session.token,
            screener = %screener_id,
            score = result.score,
            severity = %result.severity,
            "screener completed"
        );

        let mut content = format!(
            "Thank you. {}: {} of {}. {}.",
            result.id, result.score, result.max_score, result.interpretation
        );
        let mut options = None;

        let still_pending = enforcement::pending(session);
        if let Some(next_id) = still_pending.first() {
            let next = screeners::get(next_id)?;
            session.current_screener = Some(next.id.to_string());
            content.push_str(&format!(
                "\n\nNext is the {} ({} questions).\n\n{}",
                next.id,
                next.len(),
                next.prompt_for(0)
            ));
            options = Some(options_for(&next.questions[0]));
        } else if session.phase == Phase::Screening {
            session.advance_phase(Phase::ReportGeneration);
            content.push_str(
                "\n\nThat completes the standardized screening. Is there anything \
                 else you'd like your provider to know? Your next message will \
                 wrap up the interview and prepare your report.",
            );
        }

        session.append_turn(Role::Assistant, &content, Utc::now());
        let batches = self.batches_for(session, &new_flags).await?;
        self.commit(session, &batches).await?;
        self.deliver(batches);

        let _ = tx.send(Frame::message(content, options)).await;
        let _ = tx.send(Frame::done()).await;
        Ok(())
    }

    /// A free-dialogue turn: maybe extract, maybe enforce screeners, else
    /// stream the model's reply.
    async fn conversational_turn(
        &self,
        session: &mut Session,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<()> {
        // First substantive user turn ends the greeting.
        if session.phase == Phase::Greeting {
            session.advance_phase(Phase::ChiefComplaint);
        }

        // Periodic structured extraction keeps phase progression and the
        // symptom map current.
        if session.user_turn_count() % extraction::EXTRACTION_INTERVAL == 0 {
            let extracted = self
                .gateway
                .structured(
                    extraction::extraction_messages(session),
                    &extraction::extraction_schema(),
                    0.2,
                )
                .await;
            if extracted.get("error").is_none() {
                extraction::merge(session, &extracted);
                extraction::advance_phases(session);
            } else {
                warn!(session = %session.token, "extraction failed — continuing without it");
            }
        }

        // Mandatory screeners interrupt the dialogue once the gate opens.
        let thresholds = self.hot.read().await.thresholds;
        if enforcement::should_enforce(session, &thresholds) {
            let pending = enforcement::pending(session);
            let first = screeners::get(pending[0])?;
            session.advance_phase(Phase::Screening);
            session.current_screener = Some(first.id.to_string());
            session.screener_progress.clear();
            let content = format!(
                "{}\n\n{}",
                enforcement::transition_message(&pending),
                first.prompt_for(0)
            );
            session.append_turn(Role::Assistant, &content, Utc::now());
            self.commit(session, &[]).await?;
            let _ = tx
                .send(Frame::message(
                    content,
                    Some(options_for(&first.questions[0])),
                ))
                .await;
            let _ = tx.send(Frame::done()).await;
            return Ok(());
        }

        match self.stream_llm_turn(session, tx).await? {
            StreamOutcome::Completed(content) => {
                session.append_turn(Role::Assistant, content, Utc::now());
                self.commit(session, &[]).await?;
                let _ = tx.send(Frame::done()).await;
                Ok(())
            }
            StreamOutcome::ClientGone => {
                // Partial turn discarded; the committed user turn survives.
                info!(session = %session.token, "client disconnected mid-stream — turn discarded");
                Ok(())
            }
            StreamOutcome::GatewayFailed => {
                // The ⚠️ fragment already went out; state is untouched.
                Ok(())
            }
        }
    }

    /// Relay one gateway stream to the client, fragment by fragment.
    async fn stream_llm_turn(
        &self,
        session: &Session,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<StreamOutcome> {
        let user_name = session
            .extracted_data
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let mut messages = vec![ChatMessage::system(prompts::system_prompt(
            session,
            user_name.as_deref(),
        ))];
        for turn in &session.history {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }

        let mut stream = self.gateway.stream(messages, 0.7).await;
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            if fragment.starts_with("⚠️") {
                let _ = tx.send(Frame::fragment(&fragment)).await;
                let _ = tx.send(Frame::error("gateway", "")).await;
                return Ok(StreamOutcome::GatewayFailed);
            }
            if tx.send(Frame::fragment(&fragment)).await.is_err() {
                return Ok(StreamOutcome::ClientGone);
            }
            full.push_str(&fragment);
        }
        Ok(StreamOutcome::Completed(full))
    }

    /// Terminate the interview: safety-gate, synthesize, render, complete.
    async fn run_finish(
        &self,
        session: &mut Session,
        tx: &mpsc::Sender<Frame>,
    ) -> EngineResult<()> {
        // Safety gate: risk signals without a completed C-SSRS force the
        // instrument in before any report is generated.
        let cssrs_done = session.screeners_completed.iter().any(|s| s == "C-SSRS");
        let risk_signals = session.has_flag(crate::session::RiskKind::HighSuicideRisk)
            || session.has_flag(crate::session::RiskKind::HomicidalIdeation)
            || session.symptoms_detected.get("suicide_ideation") == Some(&true);
        if risk_signals && !cssrs_done {
            let cssrs = screeners::get("C-SSRS")?;
            if session.phase != Phase::Screening {
                session.advance_phase(Phase::Screening);
            }
            session.current_screener = Some(cssrs.id.to_string());
            session.screener_progress.clear();
            let content = format!(
                "Before we finish, I need to ask a few brief safety questions.\n\n{}",
                cssrs.prompt_for(0)
            );
            session.append_turn(Role::Assistant, &content, Utc::now());
            self.commit(session, &[]).await?;
            let _ = tx
                .send(Frame::message(content, Some(options_for(&cssrs.questions[0]))))
                .await;
            let _ = tx.send(Frame::done()).await;
            return Ok(());
        }

        let report = self
            .gateway
            .structured(report::synthesis_messages(session), &report::report_schema(), 0.2)
            .await;
        if let Some(error) = report.get("error") {
            return Err(EngineError::Gateway(format!(
                "report synthesis failed: {error}"
            )));
        }

        let patient_pdf = self.renderer.render(&report, Audience::Patient).await;
        let clinician_pdf = self.renderer.render(&report, Audience::Clinician).await;
        let b64 = base64::engine::general_purpose::STANDARD;
        let patient_b64 = b64.encode(patient_pdf);
        let clinician_b64 = b64.encode(clinician_pdf);

        session.current_screener = None;
        session.screener_progress.clear();
        if session.phase != Phase::ReportGeneration {
            session.advance_phase(Phase::ReportGeneration);
        }
        session.advance_phase(Phase::Completed);
        session.status = SessionStatus::Completed;
        session.completed_at = Some(Utc::now());
        // Report insert and session completion land in one transaction, so a
        // completed session always has exactly one report.
        self.storage
            .complete_with_report(session, &report)
            .await?;
        self.cache_put(session).await;
        info!(session = %session.token, "intake completed, report generated");

        let _ = tx
            .send(Frame {
                role: "assistant",
                content: "Thank you for completing your intake. Your report has been \
                          prepared and will be reviewed by your provider."
                    .to_string(),
                timestamp: Utc::now(),
                done: true,
                options: None,
                pdf_report: Some(patient_b64.clone()),
                patient_pdf: Some(patient_b64),
                clinician_pdf: Some(clinician_b64),
                error: None,
            })
            .await;
        Ok(())
    }
}

/// Error taxonomy tag for terminal frames.
fn tag_of(e: &EngineError) -> &'static str {
    match e {
        EngineError::Validation(_) => "validation",
        EngineError::NotFound(_) => "not_found",
        EngineError::Expired => "expired",
        EngineError::Conflict => "conflict",
        EngineError::Gateway(_) => "gateway",
        EngineError::Internal { .. } => "internal",
    }
}
