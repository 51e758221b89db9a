//! Message templates — one per notification kind.
//!
//! Rendering is pure: missing optional context fields fall back to generic
//! labels instead of failing. Unknown kind strings are rejected earlier, at
//! the `NotificationKind::from_str` parse seam.

use serde_json::{Value, json};

use stride_common::types::NotificationKind;

/// A rendered push payload before it is bound to device tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// Renders notification templates from a recipient's context.
pub struct MessageBuilder;

impl MessageBuilder {
    pub fn render(kind: NotificationKind, context: &Value) -> RenderedMessage {
        match kind {
            NotificationKind::NewFollower => Self::new_follower(context),
            NotificationKind::ClubRunAnnouncement => Self::club_run_announcement(context),
            NotificationKind::RunReminder => Self::run_reminder(context),
            NotificationKind::RunCompleted => Self::run_completed(context),
        }
    }

    fn text<'a>(context: &'a Value, key: &str, fallback: &'a str) -> &'a str {
        context.get(key).and_then(Value::as_str).unwrap_or(fallback)
    }

    fn new_follower(context: &Value) -> RenderedMessage {
        let name = Self::text(context, "follower_name", "Someone");

        RenderedMessage {
            title: "New Follower! 👟".to_string(),
            body: format!("{} started following you", name),
            data: json!({
                "type": NotificationKind::NewFollower,
                "follower_id": context.get("follower_id"),
                "screen": "Profile",
            }),
        }
    }

    fn club_run_announcement(context: &Value) -> RenderedMessage {
        let club = Self::text(context, "club_name", "Your club");
        let title = Self::text(context, "run_title", "TBD");

        RenderedMessage {
            title: "🏃‍♂️ New Club Run!".to_string(),
            body: format!("{} posted a new run: {}", club, title),
            data: json!({
                "type": NotificationKind::ClubRunAnnouncement,
                "run_id": context.get("run_id"),
                "club_id": context.get("club_id"),
                "screen": "Run",
            }),
        }
    }

    fn run_reminder(context: &Value) -> RenderedMessage {
        let run_title = Self::text(context, "run_title", "TBD");
        let start_clock = Self::text(context, "start_clock", "TBD");
        let reminder_type = Self::text(context, "reminder_type", "day_before");

        let (title, body) = if reminder_type == "hour_before" {
            (
                "⏰ Run in 1 Hour!".to_string(),
                format!("Your run \"{}\" starts in 1 hour", run_title),
            )
        } else {
            (
                "🏃‍♂️ Run in 24 Hours!".to_string(),
                format!("Don't forget: {} in 24 hours at {}", run_title, start_clock),
            )
        };

        RenderedMessage {
            title,
            body,
            data: json!({
                "type": NotificationKind::RunReminder,
                "run_id": context.get("run_id"),
                "run_title": context.get("run_title"),
                "reminder_type": reminder_type,
                "screen": "Run",
            }),
        }
    }

    fn run_completed(context: &Value) -> RenderedMessage {
        let run_title = Self::text(context, "run_title", "your run");

        RenderedMessage {
            title: "Run Complete! 🎉".to_string(),
            body: format!("Great job finishing {}!", run_title),
            data: json!({
                "type": NotificationKind::RunCompleted,
                "run_id": context.get("run_id"),
                "screen": "Run",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_follower_with_name() {
        let rendered = MessageBuilder::render(
            NotificationKind::NewFollower,
            &json!({"follower_name": "Ada Lovelace", "follower_id": "abc"}),
        );
        assert_eq!(rendered.body, "Ada Lovelace started following you");
        assert_eq!(rendered.data["screen"], "Profile");
    }

    #[test]
    fn test_new_follower_falls_back_to_someone() {
        let rendered = MessageBuilder::render(NotificationKind::NewFollower, &json!({}));
        assert_eq!(rendered.body, "Someone started following you");
    }

    #[test]
    fn test_club_run_announcement() {
        let rendered = MessageBuilder::render(
            NotificationKind::ClubRunAnnouncement,
            &json!({"club_name": "Sunrise Runners", "run_title": "Tempo Tuesday"}),
        );
        assert!(rendered.body.contains("Sunrise Runners"));
        assert!(rendered.body.contains("Tempo Tuesday"));
        assert_eq!(rendered.data["type"], "club_run_announcement");
    }

    #[test]
    fn test_club_run_announcement_fallbacks() {
        let rendered = MessageBuilder::render(NotificationKind::ClubRunAnnouncement, &json!({}));
        assert_eq!(rendered.body, "Your club posted a new run: TBD");
    }

    #[test]
    fn test_day_before_reminder() {
        let rendered = MessageBuilder::render(
            NotificationKind::RunReminder,
            &json!({
                "run_title": "Long Run",
                "start_clock": "7:00 AM",
                "reminder_type": "day_before",
            }),
        );
        assert_eq!(rendered.title, "🏃‍♂️ Run in 24 Hours!");
        assert_eq!(rendered.body, "Don't forget: Long Run in 24 hours at 7:00 AM");
    }

    #[test]
    fn test_hour_before_reminder() {
        let rendered = MessageBuilder::render(
            NotificationKind::RunReminder,
            &json!({"run_title": "Long Run", "reminder_type": "hour_before"}),
        );
        assert_eq!(rendered.title, "⏰ Run in 1 Hour!");
        assert_eq!(rendered.body, "Your run \"Long Run\" starts in 1 hour");
    }

    #[test]
    fn test_run_completed() {
        let rendered = MessageBuilder::render(
            NotificationKind::RunCompleted,
            &json!({"run_title": "Trail Half"}),
        );
        assert_eq!(rendered.body, "Great job finishing Trail Half!");
    }
}
