use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Kinds of notifications the fan-out pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewFollower,
    ClubRunAnnouncement,
    RunReminder,
    RunCompleted,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::NewFollower => write!(f, "new_follower"),
            NotificationKind::ClubRunAnnouncement => write!(f, "club_run_announcement"),
            NotificationKind::RunReminder => write!(f, "run_reminder"),
            NotificationKind::RunCompleted => write!(f, "run_completed"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_follower" => Ok(NotificationKind::NewFollower),
            "club_run_announcement" => Ok(NotificationKind::ClubRunAnnouncement),
            "run_reminder" => Ok(NotificationKind::RunReminder),
            "run_completed" => Ok(NotificationKind::RunCompleted),
            other => Err(AppError::Config(format!(
                "Unknown notification kind '{}'",
                other
            ))),
        }
    }
}

/// Reminder sweep kinds supported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderKind::DayBefore => write!(f, "day_before"),
            ReminderKind::HourBefore => write!(f, "hour_before"),
        }
    }
}

impl FromStr for ReminderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day_before" | "day-before" => Ok(ReminderKind::DayBefore),
            "hour_before" | "hour-before" => Ok(ReminderKind::HourBefore),
            other => Err(AppError::Config(format!("Unknown reminder kind '{}'", other))),
        }
    }
}

/// A device push token row as registered for a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceToken {
    pub user_id: Uuid,
    pub token: String,
}

/// A resolved notification recipient plus the template variables for them.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub user_id: Uuid,
    pub context: serde_json::Value,
}

/// Durable in-app notification record, one per recipient per event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    /// Identifier of the logical event, used for deduplication.
    pub subject_id: Option<String>,
    pub payload: serde_json::Value,
    pub seen: bool,
    pub pushed: bool,
    pub created_at: DateTime<Utc>,
}

/// A single push message bound for one device token. Ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Outcome of one delivery ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

/// Per-message delivery outcome returned by the push gateway. Ephemeral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTicket {
    pub status: TicketStatus,
    pub receipt_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryTicket {
    /// Successful ticket carrying the gateway's receipt id.
    pub fn ok(receipt_id: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Ok,
            receipt_id: Some(receipt_id.into()),
            error: None,
        }
    }

    /// Error ticket carrying the failure detail.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Error,
            receipt_id: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TicketStatus::Ok
    }
}

/// A scheduled club run.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Run {
    pub id: Uuid,
    pub club_id: Option<Uuid>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A running club.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user profile, read only for template variables.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Profile {
    /// Display name used in message templates: "First Last" when set,
    /// username otherwise.
    pub fn display_name(&self) -> String {
        match &self.first_name {
            Some(first) => {
                let last = self.last_name.as_deref().unwrap_or("");
                format!("{} {}", first, last).trim().to_string()
            }
            None => self.username.clone(),
        }
    }
}
