//! Audience resolution — maps a domain event to its recipients.
//!
//! For each event variant:
//! 1. Load the candidate users from the store
//! 2. Apply opt-out preferences and visibility rules
//! 3. Return recipients with the template variables for each

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::types::{Club, NotificationKind, Profile, Recipient, ReminderKind, Run};

/// Preference key gating club run announcements. Unset means opted in.
const PREF_CLUB_RUN_ANNOUNCEMENTS: &str = "club_run_announcements";

/// A domain event entering the notification pipeline.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    NewFollower {
        follower_id: Uuid,
        following_id: Uuid,
    },
    ClubRunAnnouncement {
        run: Run,
        club: Club,
    },
    RunReminder {
        run: Run,
        club_name: Option<String>,
        kind: ReminderKind,
    },
    RunCompleted {
        run: Run,
        host_id: Uuid,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::NewFollower { .. } => NotificationKind::NewFollower,
            NotificationEvent::ClubRunAnnouncement { .. } => NotificationKind::ClubRunAnnouncement,
            NotificationEvent::RunReminder { .. } => NotificationKind::RunReminder,
            NotificationEvent::RunCompleted { .. } => NotificationKind::RunCompleted,
        }
    }
}

/// Resolves the recipient set for each event variant.
pub struct AudienceResolver;

impl AudienceResolver {
    /// Resolve an event to its recipients, in underlying-query order.
    ///
    /// An empty audience is a legitimate outcome (private run, no followers,
    /// no attendees), not an error.
    pub async fn resolve(
        pool: &PgPool,
        event: &NotificationEvent,
    ) -> Result<Vec<Recipient>, AppError> {
        match event {
            NotificationEvent::NewFollower {
                follower_id,
                following_id,
            } => Self::new_follower(pool, *follower_id, *following_id).await,
            NotificationEvent::ClubRunAnnouncement { run, club } => {
                Self::club_run_announcement(pool, run, club).await
            }
            NotificationEvent::RunReminder {
                run,
                club_name,
                kind,
            } => Self::run_reminder(pool, run, club_name.as_deref(), *kind).await,
            NotificationEvent::RunCompleted { run, host_id } => {
                Self::run_completed(pool, run, *host_id).await
            }
        }
    }

    /// The followed user only, with the follower's display name for the
    /// template.
    async fn new_follower(
        pool: &PgPool,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Vec<Recipient>, AppError> {
        let follower: Option<Profile> = sqlx::query_as(
            "SELECT id, username, first_name, last_name FROM profiles WHERE id = $1",
        )
        .bind(follower_id)
        .fetch_optional(pool)
        .await?;

        let follower_name = follower.map(|p| p.display_name());

        Ok(vec![Recipient {
            user_id: following_id,
            context: json!({
                "follower_id": follower_id,
                "follower_name": follower_name,
            }),
        }])
    }

    /// Club followers who have not opted out. Private runs resolve to an
    /// empty audience.
    async fn club_run_announcement(
        pool: &PgPool,
        run: &Run,
        club: &Club,
    ) -> Result<Vec<Recipient>, AppError> {
        if !run.is_public {
            tracing::debug!(run_id = %run.id, "Run is private; skipping announcement audience");
            return Ok(Vec::new());
        }

        let follower_ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT cf.user_id
            FROM club_follows cf
            LEFT JOIN notification_preferences np
              ON np.user_id = cf.user_id AND np.key = $2
            WHERE cf.club_id = $1
              AND COALESCE(np.enabled, true)
            ORDER BY cf.created_at
            "#,
        )
        .bind(club.id)
        .bind(PREF_CLUB_RUN_ANNOUNCEMENTS)
        .fetch_all(pool)
        .await?;

        let context = json!({
            "run_id": run.id,
            "run_title": run.title,
            "club_id": club.id,
            "club_name": club.name,
            "start_time": run.start_time,
        });

        Ok(follower_ids
            .into_iter()
            .map(|(user_id,)| Recipient {
                user_id,
                context: context.clone(),
            })
            .collect())
    }

    /// All attendees of a run matched by the active reminder window.
    async fn run_reminder(
        pool: &PgPool,
        run: &Run,
        club_name: Option<&str>,
        kind: ReminderKind,
    ) -> Result<Vec<Recipient>, AppError> {
        let attendee_ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM run_attendees WHERE run_id = $1 ORDER BY joined_at",
        )
        .bind(run.id)
        .fetch_all(pool)
        .await?;

        // Day-of-week + short date and clock time for the template.
        let run_day = run.start_time.format("%A, %b %-d").to_string();
        let start_clock = run.start_time.format("%-I:%M %p").to_string();

        let context = json!({
            "run_id": run.id,
            "run_title": run.title,
            "club_name": club_name,
            "reminder_type": kind,
            "run_day": run_day,
            "start_clock": start_clock,
            "start_time": run.start_time,
        });

        Ok(attendee_ids
            .into_iter()
            .map(|(user_id,)| Recipient {
                user_id,
                context: context.clone(),
            })
            .collect())
    }

    /// Checked-in, not-yet-completed attendees. Only the run's creator may
    /// trigger completion; the check runs before any write.
    async fn run_completed(
        pool: &PgPool,
        run: &Run,
        host_id: Uuid,
    ) -> Result<Vec<Recipient>, AppError> {
        if run.created_by != host_id {
            return Err(AppError::Authorization(
                "Only the run host can complete a run".to_string(),
            ));
        }

        let attendee_ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM run_attendees
            WHERE run_id = $1 AND checked_in AND NOT completed
            ORDER BY joined_at
            "#,
        )
        .bind(run.id)
        .fetch_all(pool)
        .await?;

        let context = json!({
            "run_id": run.id,
            "run_title": run.title,
        });

        Ok(attendee_ids
            .into_iter()
            .map(|(user_id,)| Recipient {
                user_id,
                context: context.clone(),
            })
            .collect())
    }
}
