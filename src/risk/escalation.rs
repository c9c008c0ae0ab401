//! Risk escalation: audit entry + per-admin urgent notifications.
//!
//! Escalation is not a broadcast. For each new urgent flag the engine builds
//! one [`EscalationBatch`] — a single audit record plus one notification per
//! active admin — and the storage layer persists the batch in the same
//! transaction as the session write that produced the flag. Delivery to
//! external channels is best-effort and happens after commit.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::session::{RiskFlag, Session};
use crate::storage::{AdminRow, AuditRecord, EscalationBatch, NotificationRecord};

/// External delivery sink (email/SMS bridge, ops webhook). Non-delivery
/// never fails a turn.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &NotificationRecord);
}

/// Default sink: structured log line only.
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, notification: &NotificationRecord) {
        info!(
            user = %notification.user_id,
            kind = %notification.kind,
            priority = %notification.priority,
            resource = %notification.resource_id,
            "notification delivery (logging sink)"
        );
    }
}

/// Build the transactional records for one risk flag.
pub fn batch_for(flag: &RiskFlag, session: &Session, admins: &[AdminRow]) -> EscalationBatch {
    let flagged_at = Utc::now();
    let audit = AuditRecord {
        event_type: "high_risk_detected".to_string(),
        action: "create".to_string(),
        user_id: session.patient_id.clone(),
        resource_type: "intake_session".to_string(),
        resource_id: session.token.clone(),
        event_metadata: json!({
            "risk_kind": flag.kind.as_str(),
            "source": flag.source,
            "detail": flag.detail,
            "flagged_at": flagged_at.to_rfc3339(),
        }),
    };

    let message = format!(
        "A patient intake has been flagged as high risk.\n\n\
         Risk: {}\n\
         Source: {}\n\
         Details: {}\n\n\
         Session: {}\n\
         Flagged at: {}\n\n\
         ACTION REQUIRED: review immediately and follow the safety protocol.",
        flag.kind.as_str(),
        flag.source,
        flag.detail,
        session.token,
        flagged_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    let notifications = admins
        .iter()
        .map(|admin| NotificationRecord {
            user_id: admin.id.clone(),
            kind: "high_risk_alert".to_string(),
            priority: "urgent".to_string(),
            title: "⚠️ HIGH RISK PATIENT DETECTED".to_string(),
            message: message.clone(),
            resource_type: "intake_session".to_string(),
            resource_id: session.token.clone(),
        })
        .collect();

    EscalationBatch {
        audit,
        notifications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{RiskKind, Session};

    #[test]
    fn one_notification_per_admin() {
        let session = Session::new(None, Utc::now());
        let flag = RiskFlag {
            kind: RiskKind::HighSuicideRisk,
            source: "C-SSRS".into(),
            detail: "severity high".into(),
            at: Utc::now(),
        };
        let admins = vec![
            AdminRow { id: "a".into(), email: "a@x".into(), name: "A".into(), is_active: 1 },
            AdminRow { id: "b".into(), email: "b@x".into(), name: "B".into(), is_active: 1 },
        ];
        let batch = batch_for(&flag, &session, &admins);
        assert_eq!(batch.notifications.len(), 2);
        assert!(batch.notifications.iter().all(|n| n.priority == "urgent"));
        assert_eq!(batch.audit.event_type, "high_risk_detected");
        assert_eq!(
            batch.audit.event_metadata["risk_kind"],
            "high_suicide_risk"
        );
    }
}
