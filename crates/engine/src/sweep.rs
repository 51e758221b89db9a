//! Reminder sweeps — time-windowed scans that feed the pipeline.

use chrono::Utc;
use serde::Serialize;

use stride_common::error::AppError;
use stride_common::types::{ReminderKind, Run};

use crate::audience::NotificationEvent;
use crate::dispatcher::EventDispatcher;
use crate::window::ReminderWindow;

/// Aggregate outcome of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub runs_matched: usize,
    pub notifications_created: usize,
    pub pushes_sent: usize,
}

/// Scanner for upcoming runs needing a reminder.
pub struct ReminderScheduler {
    dispatcher: EventDispatcher,
}

/// Run row joined with its club's name for the reminder template.
#[derive(Debug, sqlx::FromRow)]
struct UpcomingRun {
    #[sqlx(flatten)]
    run: Run,
    club_name: Option<String>,
}

impl ReminderScheduler {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    /// One sweep over the window for `kind`.
    ///
    /// Idempotent at the window level: the ledger dedup suppresses repeat
    /// reminders for a `(user, run, window)` already notified, so overlapping
    /// sweeps are safe. A failure on one run is logged and does not abort
    /// the sweep for the others; a run with no attendees is a no-op.
    pub async fn sweep(&self, kind: ReminderKind) -> Result<SweepReport, AppError> {
        let window = ReminderWindow::for_kind(kind, Utc::now());

        tracing::info!(
            kind = %kind,
            from = %window.from,
            to = %window.to,
            "Starting reminder sweep"
        );

        let upcoming: Vec<UpcomingRun> = sqlx::query_as(
            r#"
            SELECT r.*, c.name AS club_name
            FROM runs r
            LEFT JOIN clubs c ON c.id = r.club_id
            WHERE r.start_time >= $1 AND r.start_time < $2
            ORDER BY r.start_time
            "#,
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_all(self.dispatcher.pool())
        .await?;

        let mut report = SweepReport {
            runs_matched: upcoming.len(),
            ..Default::default()
        };

        for UpcomingRun { run, club_name } in upcoming {
            let run_id = run.id;
            let event = NotificationEvent::RunReminder {
                run,
                club_name,
                kind,
            };

            match self.dispatcher.dispatch(&event).await {
                Ok(outcome) => {
                    report.notifications_created += outcome.notifications_created;
                    report.pushes_sent += outcome.pushes_sent;
                }
                Err(e) => {
                    tracing::error!(
                        run_id = %run_id,
                        error = %e,
                        "Reminder sweep failed for run; continuing"
                    );
                }
            }
        }

        tracing::info!(
            kind = %kind,
            runs = report.runs_matched,
            notifications = report.notifications_created,
            pushes = report.pushes_sent,
            "Reminder sweep completed"
        );

        Ok(report)
    }
}
