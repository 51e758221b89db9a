//! Delivery batching — gateway-size-bounded chunks with failure isolation.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use stride_common::types::{DeliveryMessage, DeliveryTicket};
use stride_gateway::{MAX_CHUNK, PushGateway};

/// A push message paired with the recipient it belongs to.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub user_id: Uuid,
    pub message: DeliveryMessage,
}

/// Splits an outbound message list into gateway-bounded chunks and drives
/// delivery through the gateway client.
#[derive(Clone)]
pub struct DeliveryBatcher {
    gateway: Arc<dyn PushGateway>,
    concurrency: usize,
}

impl DeliveryBatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
        }
    }

    /// Deliver all messages, returning one ticket per message in input order.
    ///
    /// Chunks are attempted independently, concurrently up to the configured
    /// bound; a transport failure on one chunk assigns error tickets to that
    /// chunk's messages without affecting the others. A gateway reply whose
    /// ticket count differs from the chunk length is a protocol error and
    /// fails the whole chunk. No retries happen here.
    pub async fn deliver(&self, outbound: &[Outbound]) -> Vec<DeliveryTicket> {
        if outbound.is_empty() {
            return Vec::new();
        }

        let chunks: Vec<Vec<DeliveryMessage>> = outbound
            .chunks(MAX_CHUNK)
            .map(|chunk| chunk.iter().map(|o| o.message.clone()).collect())
            .collect();
        let chunk_lens: Vec<usize> = chunks.iter().map(Vec::len).collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                // The semaphore is never closed; a failed acquire just means
                // the chunk proceeds unthrottled.
                let _permit = semaphore.acquire_owned().await.ok();
                let tickets = Self::send_chunk(gateway.as_ref(), index, &chunk).await;
                (index, tickets)
            });
        }

        // Reassemble by chunk index, not completion order.
        let mut per_chunk: Vec<Option<Vec<DeliveryTicket>>> = vec![None; chunk_lens.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, tickets)) => per_chunk[index] = Some(tickets),
                Err(e) => tracing::error!(error = %e, "Chunk delivery task failed"),
            }
        }

        per_chunk
            .into_iter()
            .enumerate()
            .flat_map(|(index, tickets)| {
                tickets.unwrap_or_else(|| {
                    vec![DeliveryTicket::error("delivery task aborted"); chunk_lens[index]]
                })
            })
            .collect()
    }

    async fn send_chunk(
        gateway: &dyn PushGateway,
        index: usize,
        chunk: &[DeliveryMessage],
    ) -> Vec<DeliveryTicket> {
        match gateway.send_batch(chunk).await {
            Ok(tickets) if tickets.len() == chunk.len() => tickets,
            Ok(tickets) => {
                tracing::error!(
                    chunk = index,
                    expected = chunk.len(),
                    received = tickets.len(),
                    "Gateway ticket count mismatch; failing whole chunk"
                );
                vec![DeliveryTicket::error("gateway ticket count mismatch"); chunk.len()]
            }
            Err(e) => {
                tracing::warn!(chunk = index, error = %e, "Chunk delivery failed");
                vec![DeliveryTicket::error(e.to_string()); chunk.len()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use stride_common::error::AppError;

    /// Gateway double scripted by token prefix of the chunk's first message:
    /// `fail-*` fails the chunk transport, `short-*` returns too few tickets,
    /// anything else echoes one ok ticket per message.
    #[derive(Default)]
    struct ScriptedGateway {
        chunk_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl PushGateway for ScriptedGateway {
        fn is_valid_token(&self, _token: &str) -> bool {
            true
        }

        async fn send_batch(
            &self,
            messages: &[DeliveryMessage],
        ) -> Result<Vec<DeliveryTicket>, AppError> {
            self.chunk_sizes.lock().unwrap().push(messages.len());

            if messages[0].to.starts_with("fail") {
                return Err(AppError::Provider("connection reset".to_string()));
            }
            if messages[0].to.starts_with("short") {
                return Ok(vec![DeliveryTicket::ok("only-one")]);
            }

            Ok(messages
                .iter()
                .map(|m| DeliveryTicket::ok(m.to.clone()))
                .collect())
        }
    }

    fn outbound(tokens: &[String]) -> Vec<Outbound> {
        tokens
            .iter()
            .map(|token| Outbound {
                user_id: Uuid::new_v4(),
                message: DeliveryMessage {
                    to: token.clone(),
                    title: "t".to_string(),
                    body: "b".to_string(),
                    data: json!({}),
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn test_chunk_bound_and_order() {
        let gateway = Arc::new(ScriptedGateway::default());
        let batcher = DeliveryBatcher::new(gateway.clone(), 4);

        let tokens: Vec<String> = (0..250).map(|i| format!("tok-{}", i)).collect();
        let tickets = batcher.deliver(&outbound(&tokens)).await;

        assert_eq!(tickets.len(), 250);

        let mut sizes = gateway.chunk_sizes.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![50, 100, 100]);

        // Tickets come back aligned to input order regardless of which chunk
        // finished first.
        for (i, ticket) in tickets.iter().enumerate() {
            assert_eq!(ticket.receipt_id.as_deref(), Some(format!("tok-{}", i).as_str()));
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_isolated() {
        let gateway = Arc::new(ScriptedGateway::default());
        let batcher = DeliveryBatcher::new(gateway, 4);

        // Chunk 2 (indices 100..200) starts with a failing token.
        let tokens: Vec<String> = (0..250)
            .map(|i| {
                if i == 100 {
                    "fail-tok".to_string()
                } else {
                    format!("tok-{}", i)
                }
            })
            .collect();

        let tickets = batcher.deliver(&outbound(&tokens)).await;
        assert_eq!(tickets.len(), 250);

        assert!(tickets[..100].iter().all(DeliveryTicket::is_ok));
        assert!(tickets[100..200].iter().all(|t| !t.is_ok()));
        assert!(tickets[200..].iter().all(DeliveryTicket::is_ok));
    }

    #[tokio::test]
    async fn test_ticket_count_mismatch_fails_chunk() {
        let gateway = Arc::new(ScriptedGateway::default());
        let batcher = DeliveryBatcher::new(gateway, 1);

        let tokens = vec![
            "short-a".to_string(),
            "tok-b".to_string(),
            "tok-c".to_string(),
        ];
        let tickets = batcher.deliver(&outbound(&tokens)).await;

        assert_eq!(tickets.len(), 3);
        assert!(tickets.iter().all(|t| !t.is_ok()));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let batcher = DeliveryBatcher::new(Arc::new(ScriptedGateway::default()), 4);
        assert!(batcher.deliver(&[]).await.is_empty());
    }
}
