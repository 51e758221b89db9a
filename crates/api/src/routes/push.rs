//! Direct push route — the caller supplies the device tokens.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::types::NotificationKind;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/send-push", post(send_push))
}

#[derive(Debug, Deserialize)]
struct SendPushRequest {
    #[serde(rename = "userId")]
    user_id: Option<Uuid>,
    title: Option<String>,
    body: Option<String>,
    data: Option<serde_json::Value>,
    tokens: Option<Vec<String>>,
    /// Optional type tag set by clients for typed pushes.
    #[serde(rename = "notificationType")]
    notification_type: Option<String>,
}

/// POST /api/send-push — deliver a push to the given user's tokens.
async fn send_push(
    State(state): State<AppState>,
    Json(req): Json<SendPushRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(user_id), Some(title), Some(body), Some(tokens)) =
        (req.user_id, req.title, req.body, req.tokens)
    else {
        return Err(AppError::Validation(
            "Missing required fields: userId, title, body, tokens (array)".to_string(),
        ));
    };

    // An unknown type tag is a configuration error, not a silent fallthrough.
    if let Some(tag) = req.notification_type.as_deref() {
        let kind: NotificationKind = tag.parse()?;
        tracing::info!(user_id = %user_id, kind = %kind, "Typed direct push requested");
    }

    let data = req.data.unwrap_or_else(|| json!({}));
    let report = state
        .dispatcher
        .send_direct(user_id, &title, &body, data, &tokens)
        .await?;

    Ok(Json(json!({
        "success": true,
        "userId": user_id,
        "totalTokens": tokens.len(),
        "validTokens": report.valid_tokens,
        "invalidTokens": report.invalid_tokens,
        "tickets": report.tickets,
        "errors": report.errors,
        "errorDetails": report.error_details,
    })))
}
