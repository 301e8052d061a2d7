use async_trait::async_trait;
use chrono::Utc;

use crate::types::{sanitize_context, CrisisNotice, ProtocolContext, SafetyStatus};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("notifier timed out after {0} ms")]
    Timeout(u64),
    #[error("notifier aborted: {0}")]
    Aborted(String),
}

/// Hands a level-3 event to a human crisis team. Fallible; the protocol
/// records the outcome and carries on either way.
#[async_trait]
pub trait CrisisNotifier: Send + Sync {
    async fn notify(&self, notice: &CrisisNotice) -> Result<(), NotifyError>;
}

/// Accepts every notice and does nothing with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl CrisisNotifier for NoopNotifier {
    async fn notify(&self, _notice: &CrisisNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes the notice to the log. For local runs without a paging backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl CrisisNotifier for LoggingNotifier {
    async fn notify(&self, notice: &CrisisNotice) -> Result<(), NotifyError> {
        tracing::warn!(
            user_id = %notice.user_id,
            risk_level = notice.risk_level,
            risk_score = notice.risk_score,
            triggers = ?notice.triggers,
            context_keys = notice.context.len(),
            "crisis notice raised"
        );
        Ok(())
    }
}

/// Build the sanitized notifier payload: fixed fields plus allow-listed
/// scalar context. Raw text never reaches this struct.
pub fn build_notice(user_id: &str, status: &SafetyStatus, context: Option<&ProtocolContext>) -> CrisisNotice {
    CrisisNotice {
        user_id: user_id.to_owned(),
        timestamp: Utc::now(),
        risk_level: status.level.as_u8(),
        risk_score: status.risk_score,
        triggers: status.triggers.clone(),
        context: context.map(sanitize_context).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    fn status() -> SafetyStatus {
        SafetyStatus {
            level: RiskLevel::Critical,
            risk_score: 1.2,
            metaphor_risk: 0.5,
            lexical_risk: 0.5,
            biomarker_risk: 0.2,
            triggers: vec!["high_risk_term".into(), "affect_distress".into()],
            recommended_actions: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn notice_carries_only_allow_listed_context() {
        let ctx: ProtocolContext = serde_json::from_value(serde_json::json!({
            "session_id": "abc",
            "location_type": "home",
            "text": "I want to end it all",
            "full_name": "Jane Doe",
        }))
        .unwrap();
        let notice = build_notice("user-1", &status(), Some(&ctx));
        assert_eq!(notice.risk_level, 3);
        assert_eq!(notice.triggers.len(), 2);
        assert_eq!(notice.context.len(), 2);
        let json = serde_json::to_string(&notice).unwrap();
        assert!(!json.contains("end it all"));
        assert!(!json.contains("Jane"));
    }

    #[test]
    fn notice_without_context_is_minimal() {
        let notice = build_notice("user-2", &status(), None);
        assert!(notice.context.is_empty());
    }

    #[tokio::test]
    async fn logging_notifier_succeeds() {
        let notice = build_notice("user-3", &status(), None);
        assert!(LoggingNotifier.notify(&notice).await.is_ok());
        assert!(NoopNotifier.notify(&notice).await.is_ok());
    }
}
