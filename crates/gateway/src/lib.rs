//! Push gateway capability interface and the Expo-protocol client.
//!
//! The fan-out engine depends on the external push provider only through the
//! [`PushGateway`] trait: a token-format predicate and a size-bounded batch
//! send. Provider wire details stay in this crate, and the engine can be
//! exercised with recording doubles.

use async_trait::async_trait;

use stride_common::error::AppError;
use stride_common::types::{DeliveryMessage, DeliveryTicket};

pub mod expo;

pub use expo::ExpoPushClient;

/// Maximum number of messages the gateway accepts in one batch call.
pub const MAX_CHUNK: usize = 100;

/// Narrow interface to the external push provider.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Whether `token` matches the provider's token scheme.
    ///
    /// Format-only; no network call.
    fn is_valid_token(&self, token: &str) -> bool;

    /// Deliver one batch of at most [`MAX_CHUNK`] messages.
    ///
    /// On success the returned tickets are 1:1 with the input, in order.
    /// Transport failures surface as [`AppError::Provider`].
    async fn send_batch(
        &self,
        messages: &[DeliveryMessage],
    ) -> Result<Vec<DeliveryTicket>, AppError>;
}
