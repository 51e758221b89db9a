//! Follow edge routes.
//!
//! The follow write is acknowledged before the notification pipeline runs;
//! unfollow bypasses the pipeline entirely.

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
        .route("/api/follow", post(follow))
        .route("/api/unfollow", post(unfollow))
}

#[derive(Debug, Deserialize)]
struct FollowRequest {
    follower_id: Option<Uuid>,
    following_id: Option<Uuid>,
}

/// POST /api/follow — create a follow edge and notify the followed user.
async fn follow(
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(follower_id), Some(following_id)) = (req.follower_id, req.following_id) else {
        return Err(AppError::Validation(
            "Missing required fields: follower_id, following_id".to_string(),
        ));
    };

    state.dispatcher.follow(follower_id, following_id).await?;
    Ok(Json(json!({"success": true})))
}

/// POST /api/unfollow — remove a follow edge.
async fn unfollow(
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(follower_id), Some(following_id)) = (req.follower_id, req.following_id) else {
        return Err(AppError::Validation(
            "Missing required fields: follower_id, following_id".to_string(),
        ));
    };

    state.dispatcher.unfollow(follower_id, following_id).await?;
    Ok(Json(json!({"success": true})))
}
