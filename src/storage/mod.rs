//! Durable session store on SQLite.
//!
//! WAL journal mode with `synchronous=NORMAL` keeps paused sessions durable
//! across restarts while letting active-turn writes batch cheaply. Session
//! commits are compare-and-set against the monotonic `version` column; risk
//! escalations ride in the same transaction as the session write so a reader
//! can never observe a flag without its audit entry.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::session::{Phase, RiskFlag, Session, SessionStatus, Turn};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the daemon indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(
    fut: impl std::future::Future<Output = EngineResult<T>>,
) -> EngineResult<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::internal(format!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        ))),
    }
}

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    id: String,
    session_token: String,
    patient_id: Option<String>,
    current_phase: String,
    conversation_history: String,
    extracted_data: String,
    symptoms_detected: String,
    screener_scores: String,
    risk_flags: String,
    completed_screeners: String,
    completed_phases: String,
    current_screener: Option<String>,
    screener_progress: String,
    status: String,
    paused_at: Option<String>,
    expires_at: Option<String>,
    resume_token: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRow {
    pub id: String,
    pub event_type: String,
    pub action: String,
    pub user_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub event_metadata: Option<String>,
    pub timestamp: String,
}

/// A notification prepared by the escalation layer, not yet persisted.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub user_id: String,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub resource_type: String,
    pub resource_id: String,
}

/// An audit entry prepared by the escalation layer, not yet persisted.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event_type: String,
    pub action: String,
    pub user_id: Option<String>,
    pub resource_type: String,
    pub resource_id: String,
    pub event_metadata: serde_json::Value,
}

/// One escalation: an audit entry plus its notification fan-out. Persisted
/// atomically with the session write that produced it.
#[derive(Debug, Clone)]
pub struct EscalationBatch {
    pub audit: AuditRecord,
    pub notifications: Vec<NotificationRecord>,
}

// ─── Row ⇄ domain mapping ────────────────────────────────────────────────────

fn parse_ts(s: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::internal(format!("bad timestamp in sessions row: {e}")))
}

fn parse_opt_ts(s: &Option<String>) -> EngineResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

impl SessionRow {
    fn into_session(self) -> EngineResult<Session> {
        let history: Vec<Turn> = serde_json::from_str(&self.conversation_history)?;
        let extracted_data: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&self.extracted_data)?;
        let symptoms_detected: BTreeMap<String, bool> =
            serde_json::from_str(&self.symptoms_detected)?;
        let screener_scores = serde_json::from_str(&self.screener_scores)?;
        let risk_flags: Vec<RiskFlag> = serde_json::from_str(&self.risk_flags)?;
        let screeners_completed: Vec<String> = serde_json::from_str(&self.completed_screeners)?;
        let completed_phases: Vec<String> = serde_json::from_str(&self.completed_phases)?;
        let screener_progress: Vec<i64> = serde_json::from_str(&self.screener_progress)?;

        Ok(Session {
            phase: Phase::parse(&self.current_phase)
                .ok_or_else(|| EngineError::internal(format!("bad phase: {}", self.current_phase)))?,
            status: SessionStatus::parse(&self.status)
                .ok_or_else(|| EngineError::internal(format!("bad status: {}", self.status)))?,
            paused_at: parse_opt_ts(&self.paused_at)?,
            expires_at: parse_opt_ts(&self.expires_at)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            completed_at: parse_opt_ts(&self.completed_at)?,
            id: self.id,
            token: self.session_token,
            patient_id: self.patient_id,
            history,
            extracted_data,
            symptoms_detected,
            screeners_completed,
            screener_scores,
            current_screener: self.current_screener,
            screener_progress,
            completed_phases,
            resume_token: self.resume_token,
            risk_flags,
            version: self.version,
        })
    }
}

// ─── Storage ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> EngineResult<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| EngineError::internal(format!("cannot create data dir: {e}")))?;
        let db_path = data_dir.join("intaked.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))
                .map_err(|e| EngineError::internal(format!("bad sqlite options: {e}")))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> EngineResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| EngineError::internal(format!("bad sqlite options: {e}")))?;
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(pool: &SqlitePool) -> EngineResult<()> {
        for sql in [include_str!("migrations/001_init.sql")] {
            for stmt in sql.split(';') {
                let stmt = stmt.trim();
                if !stmt.is_empty() {
                    sqlx::query(stmt).execute(pool).await?;
                }
            }
        }
        Ok(())
    }

    // ─── Sessions ───────────────────────────────────────────────────────────

    pub async fn create_session(&self, session: &Session) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, session_token, patient_id, current_phase,
                 conversation_history, extracted_data, symptoms_detected, screener_scores,
                 risk_flags, completed_screeners, completed_phases, current_screener,
                 screener_progress, status, paused_at, expires_at, resume_token, version,
                 created_at, updated_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.token)
        .bind(&session.patient_id)
        .bind(session.phase.as_str())
        .bind(serde_json::to_string(&session.history)?)
        .bind(serde_json::to_string(&session.extracted_data)?)
        .bind(serde_json::to_string(&session.symptoms_detected)?)
        .bind(serde_json::to_string(&session.screener_scores)?)
        .bind(serde_json::to_string(&session.risk_flags)?)
        .bind(serde_json::to_string(&session.screeners_completed)?)
        .bind(serde_json::to_string(&session.completed_phases)?)
        .bind(&session.current_screener)
        .bind(serde_json::to_string(&session.screener_progress)?)
        .bind(session.status.as_str())
        .bind(session.paused_at.map(|t| t.to_rfc3339()))
        .bind(session.expires_at.map(|t| t.to_rfc3339()))
        .bind(&session.resume_token)
        .bind(session.version)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .bind(session.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_session(&self, token: &str) -> EngineResult<Session> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM sessions WHERE session_token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| EngineError::NotFound(format!("session {token}")))?
            .into_session()
    }

    pub async fn load_by_resume_token(&self, resume_token: &str) -> EngineResult<Session> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM sessions WHERE resume_token = ?")
                .bind(resume_token)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| EngineError::NotFound("resume token".into()))?
            .into_session()
    }

    /// Compare-and-set commit: the UPDATE applies only when the stored
    /// `version` still matches the one the session was loaded at. On success
    /// the in-memory version is bumped to match the row. On mismatch the
    /// caller gets [`EngineError::Conflict`] and must reload.
    pub async fn commit(&self, session: &mut Session) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::commit_in_tx(&mut tx, session).await?;
        tx.commit().await?;
        session.version += 1;
        Ok(())
    }

    /// Commit the session together with escalation records in a single
    /// transaction. Readers never observe a risk flag without its audit
    /// entry and notifications.
    pub async fn commit_with_escalation(
        &self,
        session: &mut Session,
        batches: &[EscalationBatch],
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::commit_in_tx(&mut tx, session).await?;
        let now = Utc::now().to_rfc3339();
        for batch in batches {
            let audit_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO audit_log (id, event_type, action, user_id, resource_type,
                     resource_id, event_metadata, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&audit_id)
            .bind(&batch.audit.event_type)
            .bind(&batch.audit.action)
            .bind(&batch.audit.user_id)
            .bind(&batch.audit.resource_type)
            .bind(&batch.audit.resource_id)
            .bind(serde_json::to_string(&batch.audit.event_metadata)?)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            for notification in &batch.notifications {
                sqlx::query(
                    "INSERT INTO notifications (id, user_id, kind, priority, title, message,
                         resource_type, resource_id, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&notification.user_id)
                .bind(&notification.kind)
                .bind(&notification.priority)
                .bind(&notification.title)
                .bind(&notification.message)
                .bind(&notification.resource_type)
                .bind(&notification.resource_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        session.version += 1;
        Ok(())
    }

    async fn commit_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        session: &Session,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE sessions SET current_phase = ?, conversation_history = ?,
                 extracted_data = ?, symptoms_detected = ?, screener_scores = ?,
                 risk_flags = ?, completed_screeners = ?, completed_phases = ?,
                 current_screener = ?, screener_progress = ?, status = ?, paused_at = ?,
                 expires_at = ?, resume_token = ?, version = version + 1, updated_at = ?,
                 completed_at = ?
             WHERE session_token = ? AND version = ?",
        )
        .bind(session.phase.as_str())
        .bind(serde_json::to_string(&session.history)?)
        .bind(serde_json::to_string(&session.extracted_data)?)
        .bind(serde_json::to_string(&session.symptoms_detected)?)
        .bind(serde_json::to_string(&session.screener_scores)?)
        .bind(serde_json::to_string(&session.risk_flags)?)
        .bind(serde_json::to_string(&session.screeners_completed)?)
        .bind(serde_json::to_string(&session.completed_phases)?)
        .bind(&session.current_screener)
        .bind(serde_json::to_string(&session.screener_progress)?)
        .bind(session.status.as_str())
        .bind(session.paused_at.map(|t| t.to_rfc3339()))
        .bind(session.expires_at.map(|t| t.to_rfc3339()))
        .bind(&session.resume_token)
        .bind(now.to_rfc3339())
        .bind(session.completed_at.map(|t| t.to_rfc3339()))
        .bind(&session.token)
        .bind(session.version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::Conflict);
        }
        Ok(())
    }

    /// Commit a completed session and insert its report in one transaction:
    /// a completed session always has exactly one report.
    pub async fn complete_with_report(
        &self,
        session: &mut Session,
        report: &serde_json::Value,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::commit_in_tx(&mut tx, session).await?;
        sqlx::query("INSERT INTO reports (id, session_id, report, created_at) VALUES (?, ?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(&session.id)
            .bind(serde_json::to_string(report)?)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE") {
                    EngineError::internal(format!("duplicate report for session {}", session.id))
                } else {
                    EngineError::from(e)
                }
            })?;
        tx.commit().await?;
        session.version += 1;
        Ok(())
    }

    // ─── Reports ────────────────────────────────────────────────────────────

    /// Persist the intake report. The UNIQUE(session_id) constraint makes a
    /// second insert for the same session an invariant violation.
    pub async fn insert_report(
        &self,
        session_id: &str,
        report: &serde_json::Value,
    ) -> EngineResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO reports (id, session_id, report, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(session_id)
            .bind(serde_json::to_string(report)?)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE") {
                    EngineError::internal(format!("duplicate report for session {session_id}"))
                } else {
                    e.into()
                }
            })?;
        Ok(id)
    }

    pub async fn get_report(&self, session_id: &str) -> EngineResult<Option<serde_json::Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT report FROM reports WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(json,)| serde_json::from_str(&json).map_err(EngineError::from))
            .transpose()
    }

    // ─── Admins & notifications ─────────────────────────────────────────────

    pub async fn list_active_admins(&self) -> EngineResult<Vec<AdminRow>> {
        Ok(
            sqlx::query_as("SELECT * FROM admin_users WHERE is_active = 1 ORDER BY email")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn insert_admin(&self, email: &str, name: &str) -> EngineResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO admin_users (id, email, name, is_active) VALUES (?, ?, ?, 1)
             ON CONFLICT(email) DO UPDATE SET name = excluded.name, is_active = 1",
        )
        .bind(&id)
        .bind(email)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_notifications_for(&self, user_id: &str) -> EngineResult<Vec<NotificationRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_audit_events(&self, event_type: &str) -> EngineResult<Vec<AuditRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM audit_log WHERE event_type = ? ORDER BY timestamp ASC",
        )
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?)
    }

    // ─── Maintenance ────────────────────────────────────────────────────────

    /// Transition expired paused sessions to abandoned. Returns the session
    /// tokens that changed so in-memory caches can evict them.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> EngineResult<Vec<String>> {
        with_timeout(async {
            let cutoff = now.to_rfc3339();
            let expired: Vec<(String,)> = sqlx::query_as(
                "SELECT session_token FROM sessions WHERE status = 'paused' AND expires_at < ?",
            )
            .bind(&cutoff)
            .fetch_all(&self.pool)
            .await?;

            if expired.is_empty() {
                return Ok(Vec::new());
            }

            let updated = sqlx::query(
                "UPDATE sessions SET status = 'abandoned', version = version + 1, updated_at = ?
                 WHERE status = 'paused' AND expires_at < ?",
            )
            .bind(now.to_rfc3339())
            .bind(&cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

            info!(count = updated, "swept expired paused sessions to abandoned");
            Ok(expired.into_iter().map(|(t,)| t).collect())
        })
        .await
    }

    /// On daemon startup, settle sessions a previous process left behind:
    /// paused sessions whose expiry passed while the daemon was down become
    /// abandoned before the first request is served. Returns the number of
    /// sessions recovered.
    pub async fn recover_stale_sessions(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let swept = self.sweep_expired(now).await?;
        Ok(swept.len() as u64)
    }

    /// Abandoned sessions older than the threshold are only evicted from
    /// cache, never deleted: the rows are an audit artifact. Returns their
    /// tokens.
    pub async fn stale_abandoned_tokens(
        &self,
        older_than: DateTime<Utc>,
    ) -> EngineResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT session_token FROM sessions WHERE status = 'abandoned' AND updated_at < ?",
        )
        .bind(older_than.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Per-status session counts for the hourly sweeper log line.
    pub async fn session_stats(&self) -> EngineResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM sessions GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Run SQLite VACUUM to reclaim disk space.
    pub async fn vacuum(&self) -> EngineResult<()> {
        if let Err(e) = sqlx::query("VACUUM").execute(&self.pool).await {
            warn!(err = %e, "vacuum failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Role, Session};

    async fn store() -> Storage {
        Storage::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn create_load_roundtrip() {
        let storage = store().await;
        let now = Utc::now();
        let mut session = Session::new(Some("patient-1".into()), now);
        session.append_turn(Role::User, "hello", now);
        session.symptoms_detected.insert("depression".into(), true);
        storage.create_session(&session).await.unwrap();

        let loaded = storage.load_session(&session.token).await.unwrap();
        assert_eq!(loaded.history, session.history);
        assert_eq!(loaded.symptoms_detected, session.symptoms_detected);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let storage = store().await;
        assert!(matches!(
            storage.load_session("nope").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cas_commit_detects_conflict() {
        let storage = store().await;
        let now = Utc::now();
        let session = Session::new(None, now);
        storage.create_session(&session).await.unwrap();

        let mut copy_a = storage.load_session(&session.token).await.unwrap();
        let mut copy_b = storage.load_session(&session.token).await.unwrap();

        copy_a.append_turn(Role::User, "first writer", now);
        storage.commit(&mut copy_a).await.unwrap();
        assert_eq!(copy_a.version, 1);

        copy_b.append_turn(Role::User, "second writer", now);
        assert!(matches!(
            storage.commit(&mut copy_b).await,
            Err(EngineError::Conflict)
        ));
    }

    #[tokio::test]
    async fn escalation_commits_atomically_with_session() {
        let storage = store().await;
        let now = Utc::now();
        let mut session = Session::new(None, now);
        storage.create_session(&session).await.unwrap();
        storage.insert_admin("admin@clinic.test", "Admin").await.unwrap();
        let admins = storage.list_active_admins().await.unwrap();

        let batch = EscalationBatch {
            audit: AuditRecord {
                event_type: "high_risk_detected".into(),
                action: "create".into(),
                user_id: None,
                resource_type: "intake_session".into(),
                resource_id: session.token.clone(),
                event_metadata: serde_json::json!({"screener": "C-SSRS"}),
            },
            notifications: admins
                .iter()
                .map(|a| NotificationRecord {
                    user_id: a.id.clone(),
                    kind: "high_risk_alert".into(),
                    priority: "urgent".into(),
                    title: "HIGH RISK PATIENT DETECTED".into(),
                    message: "review immediately".into(),
                    resource_type: "intake_session".into(),
                    resource_id: session.token.clone(),
                })
                .collect(),
        };
        storage
            .commit_with_escalation(&mut session, &[batch])
            .await
            .unwrap();

        let audits = storage.list_audit_events("high_risk_detected").await.unwrap();
        assert_eq!(audits.len(), 1);
        let notifications = storage
            .list_notifications_for(&admins[0].id)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].priority, "urgent");
    }

    #[tokio::test]
    async fn sweep_transitions_expired_paused_sessions() {
        let storage = store().await;
        let now = Utc::now();
        let mut session = Session::new(None, now);
        session.pause(now - chrono::Duration::hours(25));
        storage.create_session(&session).await.unwrap();

        let swept = storage.sweep_expired(now).await.unwrap();
        assert_eq!(swept, vec![session.token.clone()]);
        let reloaded = storage.load_session(&session.token).await.unwrap();
        assert_eq!(reloaded.status, SessionStatus::Abandoned);

        // Second sweep is a no-op.
        assert!(storage.sweep_expired(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recover_stale_sessions_settles_expired_pauses() {
        let storage = store().await;
        let now = Utc::now();
        let mut session = Session::new(None, now);
        // Paused 30 hours ago, so the 24-hour window lapsed while "down".
        session.pause(now - chrono::Duration::hours(30));
        storage.create_session(&session).await.unwrap();

        assert_eq!(storage.recover_stale_sessions(now).await.unwrap(), 1);
        assert_eq!(
            storage.load_session(&session.token).await.unwrap().status,
            SessionStatus::Abandoned
        );
        // Idempotent on a clean store.
        assert_eq!(storage.recover_stale_sessions(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_report_rejected() {
        let storage = store().await;
        let now = Utc::now();
        let session = Session::new(None, now);
        storage.create_session(&session).await.unwrap();

        let report = serde_json::json!({"summary": "ok"});
        storage.insert_report(&session.id, &report).await.unwrap();
        assert!(storage.insert_report(&session.id, &report).await.is_err());
        assert_eq!(
            storage.get_report(&session.id).await.unwrap().unwrap(),
            report
        );
    }
}
