//! Durable notification ledger.
//!
//! One record per recipient per event, written before (and independent of)
//! push delivery. Records are deduplicated on `(user_id, kind, subject_id)`
//! so invoking the same logical event twice creates exactly one record and
//! one push attempt.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::types::{NotificationKind, NotificationRecord, Recipient};

pub struct NotificationLedger;

impl NotificationLedger {
    /// Record one notification. Returns `None` when an existing record with
    /// the same `(user_id, kind, subject_id)` suppresses the write — the
    /// caller must then also skip push delivery for this recipient.
    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        kind: NotificationKind,
        payload: &serde_json::Value,
    ) -> Result<Option<NotificationRecord>, AppError> {
        let subject_id = Self::subject_id(kind, payload);

        if let Some(subject) = &subject_id {
            let existing: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM notifications WHERE user_id = $1 AND kind = $2 AND subject_id = $3",
            )
            .bind(user_id)
            .bind(kind)
            .bind(subject)
            .fetch_optional(pool)
            .await?;

            if existing.is_some() {
                tracing::debug!(
                    user_id = %user_id,
                    kind = %kind,
                    subject = %subject,
                    "Notification suppressed by ledger dedup"
                );
                return Ok(None);
            }
        }

        match Self::insert(pool, user_id, kind, subject_id.as_deref(), payload).await {
            Ok(record) => Ok(Some(record)),
            // Lost a race with a concurrent sweep; same outcome as the
            // pre-check.
            Err(AppError::Duplicate(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert(
        pool: &PgPool,
        user_id: Uuid,
        kind: NotificationKind,
        subject_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<NotificationRecord, AppError> {
        sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, kind, subject_id, payload, seen, pushed)
            VALUES ($1, $2, $3, $4, $5, false, false)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind)
        .bind(subject_id)
        .bind(payload)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.is_unique_violation()
            {
                return AppError::Duplicate(format!(
                    "Notification already recorded for user {}",
                    user_id
                ));
            }
            AppError::Database(e)
        })
    }

    /// Record one notification per recipient. Returns user → fresh record id
    /// for recipients that were not suppressed. Each write is an independent
    /// unit of work: one failure is logged and does not abort the rest.
    pub async fn record_all(
        pool: &PgPool,
        kind: NotificationKind,
        recipients: &[Recipient],
    ) -> Result<HashMap<Uuid, Uuid>, AppError> {
        let mut recorded = HashMap::new();

        for recipient in recipients {
            match Self::record(pool, recipient.user_id, kind, &recipient.context).await {
                Ok(Some(record)) => {
                    recorded.insert(recipient.user_id, record.id);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        user_id = %recipient.user_id,
                        kind = %kind,
                        error = %e,
                        "Failed to record notification; skipping recipient"
                    );
                }
            }
        }

        Ok(recorded)
    }

    /// Flip `pushed` after a successful send.
    pub async fn mark_pushed(pool: &PgPool, ids: &[Uuid]) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("UPDATE notifications SET pushed = true WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Dedup subject for a payload: the identifier of the logical event.
    ///
    /// Reminders append the window kind so the day-before and hour-before
    /// sweeps stay independently idempotent for the same run.
    fn subject_id(kind: NotificationKind, payload: &serde_json::Value) -> Option<String> {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        match kind {
            NotificationKind::NewFollower => text("follower_id"),
            NotificationKind::ClubRunAnnouncement | NotificationKind::RunCompleted => {
                text("run_id")
            }
            NotificationKind::RunReminder => {
                let run_id = text("run_id")?;
                let reminder = text("reminder_type").unwrap_or_default();
                Some(format!("{}:{}", run_id, reminder))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_for_announcement_is_run_id() {
        let subject = NotificationLedger::subject_id(
            NotificationKind::ClubRunAnnouncement,
            &json!({"run_id": "run-1", "club_id": "club-1"}),
        );
        assert_eq!(subject.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_reminder_subjects_differ_per_window() {
        let day = NotificationLedger::subject_id(
            NotificationKind::RunReminder,
            &json!({"run_id": "run-1", "reminder_type": "day_before"}),
        );
        let hour = NotificationLedger::subject_id(
            NotificationKind::RunReminder,
            &json!({"run_id": "run-1", "reminder_type": "hour_before"}),
        );
        assert_ne!(day, hour);
    }

    #[test]
    fn test_missing_subject_yields_none() {
        let subject =
            NotificationLedger::subject_id(NotificationKind::ClubRunAnnouncement, &json!({}));
        assert_eq!(subject, None);
    }
}
