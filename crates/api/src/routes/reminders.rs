//! Reminder sweep trigger routes, for external time-based schedulers.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use stride_common::error::AppError;
use stride_common::types::ReminderKind;
use stride_engine::sweep::ReminderScheduler;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reminders/day-before", post(day_before))
        .route("/api/reminders/hour-before", post(hour_before))
}

/// POST /api/reminders/day-before
async fn day_before(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    sweep(state, ReminderKind::DayBefore).await
}

/// POST /api/reminders/hour-before
async fn hour_before(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    sweep(state, ReminderKind::HourBefore).await
}

async fn sweep(state: AppState, kind: ReminderKind) -> Result<Json<serde_json::Value>, AppError> {
    let scheduler = ReminderScheduler::new(state.dispatcher.clone());
    let report = scheduler.sweep(kind).await?;

    Ok(Json(json!({
        "success": true,
        "runs_matched": report.runs_matched,
        "notifications_created": report.notifications_created,
        "push_notifications_sent": report.pushes_sent,
    })))
}
