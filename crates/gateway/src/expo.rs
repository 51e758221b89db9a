//! Expo push service client.
//!
//! Speaks the Expo batch-send HTTP shape: POST a JSON array of messages,
//! receive `{"data": [ticket, ...]}` with one ticket per message.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stride_common::error::AppError;
use stride_common::types::{DeliveryMessage, DeliveryTicket, TicketStatus};

use crate::{MAX_CHUNK, PushGateway};

/// HTTP client for the Expo push gateway.
#[derive(Debug, Clone)]
pub struct ExpoPushClient {
    http: reqwest::Client,
    endpoint: String,
}

/// Wire form of one outbound message.
#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
}

/// Wire form of the batch response.
#[derive(Debug, Deserialize)]
struct ExpoResponse {
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    id: Option<String>,
    message: Option<String>,
}

impl ExpoPushClient {
    /// Build a client against `endpoint` with a per-call `timeout`.
    ///
    /// The timeout bounds every gateway call so a hung provider surfaces as
    /// a [`AppError::Provider`] instead of stalling the pipeline.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PushGateway for ExpoPushClient {
    fn is_valid_token(&self, token: &str) -> bool {
        is_expo_push_token(token)
    }

    async fn send_batch(
        &self,
        messages: &[DeliveryMessage],
    ) -> Result<Vec<DeliveryTicket>, AppError> {
        if messages.len() > MAX_CHUNK {
            return Err(AppError::Internal(format!(
                "Batch of {} messages exceeds gateway limit of {}",
                messages.len(),
                MAX_CHUNK
            )));
        }

        let wire: Vec<ExpoMessage<'_>> = messages
            .iter()
            .map(|m| ExpoMessage {
                to: &m.to,
                sound: "default",
                title: &m.title,
                body: &m.body,
                data: &m.data,
            })
            .collect();

        let response = self
            .http
            .post(&self.endpoint)
            .json(&wire)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Push gateway request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Push gateway returned {}: {}",
                status, body
            )));
        }

        let parsed: ExpoResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid push gateway response: {}", e)))?;

        Ok(parsed.data.into_iter().map(DeliveryTicket::from).collect())
    }
}

impl From<ExpoTicket> for DeliveryTicket {
    fn from(ticket: ExpoTicket) -> Self {
        match ticket.status.as_str() {
            "ok" => DeliveryTicket {
                status: TicketStatus::Ok,
                receipt_id: ticket.id,
                error: None,
            },
            _ => DeliveryTicket::error(
                ticket
                    .message
                    .unwrap_or_else(|| "unknown gateway error".to_string()),
            ),
        }
    }
}

/// Expo token scheme: `ExponentPushToken[...]` or `ExpoPushToken[...]` with a
/// non-empty bracket body.
pub fn is_expo_push_token(token: &str) -> bool {
    let inner = token
        .strip_prefix("ExponentPushToken[")
        .or_else(|| token.strip_prefix("ExpoPushToken["));

    match inner {
        Some(rest) => rest
            .strip_suffix(']')
            .is_some_and(|body| !body.is_empty() && !body.contains(']')),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_exponent_token() {
        assert!(is_expo_push_token("ExponentPushToken[aaa]"));
        assert!(is_expo_push_token("ExpoPushToken[xxxxxxxxxxxxxxxxxxxxxx]"));
    }

    #[test]
    fn test_invalid_tokens_rejected() {
        assert!(!is_expo_push_token("not-a-token"));
        assert!(!is_expo_push_token("ExponentPushToken[]"));
        assert!(!is_expo_push_token("ExponentPushToken[aaa"));
        assert!(!is_expo_push_token("ExponentPushToken[a]b]"));
        assert!(!is_expo_push_token(""));
    }

    #[test]
    fn test_ticket_conversion_ok() {
        let ticket = ExpoTicket {
            status: "ok".to_string(),
            id: Some("receipt-1".to_string()),
            message: None,
        };
        let converted = DeliveryTicket::from(ticket);
        assert!(converted.is_ok());
        assert_eq!(converted.receipt_id.as_deref(), Some("receipt-1"));
    }

    #[test]
    fn test_ticket_conversion_error() {
        let ticket = ExpoTicket {
            status: "error".to_string(),
            id: None,
            message: Some("DeviceNotRegistered".to_string()),
        };
        let converted = DeliveryTicket::from(ticket);
        assert!(!converted.is_ok());
        assert_eq!(converted.error.as_deref(), Some("DeviceNotRegistered"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = json!({
            "data": [
                {"status": "ok", "id": "r1"},
                {"status": "error", "message": "InvalidCredentials", "details": {"error": "InvalidCredentials"}}
            ]
        });

        let parsed: ExpoResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);

        let tickets: Vec<DeliveryTicket> =
            parsed.data.into_iter().map(DeliveryTicket::from).collect();
        assert!(tickets[0].is_ok());
        assert!(!tickets[1].is_ok());
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let client =
            ExpoPushClient::new("http://localhost:0", Duration::from_secs(1)).unwrap();
        let messages: Vec<DeliveryMessage> = (0..MAX_CHUNK + 1)
            .map(|i| DeliveryMessage {
                to: format!("ExponentPushToken[{}]", i),
                title: "t".to_string(),
                body: "b".to_string(),
                data: json!({}),
            })
            .collect();

        let result = client.send_batch(&messages).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
