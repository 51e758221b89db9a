//! Club run event routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use stride_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/club-run-announcement", post(club_run_announcement))
        .route("/api/complete-run", post(complete_run))
}

#[derive(Debug, Deserialize)]
struct AnnouncementRequest {
    run_id: Option<Uuid>,
    club_id: Option<Uuid>,
    created_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct CompleteRunRequest {
    run_id: Option<Uuid>,
    host_id: Option<Uuid>,
}

/// POST /api/club-run-announcement — fan a new run out to club followers.
async fn club_run_announcement(
    State(state): State<AppState>,
    Json(req): Json<AnnouncementRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(run_id), Some(club_id)) = (req.run_id, req.club_id) else {
        return Err(AppError::Validation(
            "Missing required fields: run_id, club_id".to_string(),
        ));
    };

    tracing::info!(
        run_id = %run_id,
        club_id = %club_id,
        created_by = ?req.created_by,
        "Club run announcement requested"
    );

    let report = state.dispatcher.announce_club_run(run_id, club_id).await?;

    Ok(Json(json!({
        "followers_count": report.recipients,
        "notifications_created": report.notifications_created,
        "push_notifications_sent": report.pushes_sent,
    })))
}

/// POST /api/complete-run — host marks attendees completed and notifies them.
async fn complete_run(
    State(state): State<AppState>,
    Json(req): Json<CompleteRunRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(run_id), Some(host_id)) = (req.run_id, req.host_id) else {
        return Err(AppError::Validation(
            "Missing required fields: run_id, host_id".to_string(),
        ));
    };

    let report = state.dispatcher.complete_run(run_id, host_id).await?;

    Ok(Json(json!({
        "attendees_completed": report.recipients,
        "notifications_sent": report.pushes_sent,
    })))
}
