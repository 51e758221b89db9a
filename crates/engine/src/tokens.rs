//! Token registry — fetch, validate, and deduplicate device push tokens.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::types::DeviceToken;
use stride_gateway::PushGateway;

/// Resolves users' device tokens against the gateway's token scheme.
///
/// Purely functional over the store read: no writes, no caching.
#[derive(Clone)]
pub struct TokenRegistry {
    gateway: Arc<dyn PushGateway>,
}

impl TokenRegistry {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch tokens for `user_ids` in one batched query, drop tokens that
    /// fail the gateway's format predicate, and deduplicate per user.
    ///
    /// An invalid token is logged and skipped; it never fails the batch.
    pub async fn resolve(
        &self,
        pool: &PgPool,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<DeviceToken> = sqlx::query_as(
            "SELECT user_id, token FROM device_push_tokens WHERE user_id = ANY($1) ORDER BY created_at",
        )
        .bind(user_ids)
        .fetch_all(pool)
        .await?;

        let mut by_user: HashMap<Uuid, Vec<String>> = HashMap::new();
        let mut seen: HashSet<(Uuid, String)> = HashSet::new();

        for row in rows {
            if !self.gateway.is_valid_token(&row.token) {
                tracing::warn!(user_id = %row.user_id, "Dropping push token with invalid format");
                continue;
            }
            if !seen.insert((row.user_id, row.token.clone())) {
                continue;
            }
            by_user.entry(row.user_id).or_default().push(row.token);
        }

        Ok(by_user)
    }

    /// Partition `tokens` into (valid, invalid) by the gateway predicate.
    /// Every input token lands in exactly one side.
    pub fn partition(&self, tokens: &[String]) -> (Vec<String>, Vec<String>) {
        tokens
            .iter()
            .cloned()
            .partition(|token| self.gateway.is_valid_token(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stride_common::types::{DeliveryMessage, DeliveryTicket};

    struct FormatOnlyGateway;

    #[async_trait]
    impl PushGateway for FormatOnlyGateway {
        fn is_valid_token(&self, token: &str) -> bool {
            token.starts_with("ExponentPushToken[") && token.ends_with(']')
        }

        async fn send_batch(
            &self,
            _messages: &[DeliveryMessage],
        ) -> Result<Vec<DeliveryTicket>, AppError> {
            unreachable!("partition tests never send")
        }
    }

    #[test]
    fn test_partition_is_exact() {
        let registry = TokenRegistry::new(Arc::new(FormatOnlyGateway));
        let tokens = vec![
            "ExponentPushToken[aaa]".to_string(),
            "not-a-token".to_string(),
            "ExponentPushToken[bbb]".to_string(),
        ];

        let (valid, invalid) = registry.partition(&tokens);

        assert_eq!(valid.len() + invalid.len(), tokens.len());
        assert_eq!(valid, vec!["ExponentPushToken[aaa]", "ExponentPushToken[bbb]"]);
        assert_eq!(invalid, vec!["not-a-token"]);
    }

    #[test]
    fn test_partition_empty_input() {
        let registry = TokenRegistry::new(Arc::new(FormatOnlyGateway));
        let (valid, invalid) = registry.partition(&[]);
        assert!(valid.is_empty());
        assert!(invalid.is_empty());
    }
}
