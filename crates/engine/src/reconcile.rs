//! Ticket reconciliation — align gateway tickets back to outbound messages.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::types::DeliveryTicket;

use crate::delivery::Outbound;

/// One failed delivery, attributed to its recipient and token.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub user_id: Uuid,
    pub token: String,
    pub error: String,
}

/// Aggregate outcome of one delivery pass.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub success_count: usize,
    /// Users with at least one successfully delivered message.
    pub pushed_users: HashSet<Uuid>,
    pub errors: Vec<DeliveryFailure>,
}

/// Aligns per-chunk delivery results back to originating messages.
pub struct TicketReconciler;

impl TicketReconciler {
    /// Requires `outbound` and `tickets` to have equal length; a mismatch is
    /// an invariant violation, never silently truncated.
    pub fn reconcile(
        outbound: &[Outbound],
        tickets: &[DeliveryTicket],
    ) -> Result<DeliveryReport, AppError> {
        if outbound.len() != tickets.len() {
            return Err(AppError::Internal(format!(
                "Ticket count {} does not match message count {}",
                tickets.len(),
                outbound.len()
            )));
        }

        let mut report = DeliveryReport::default();
        for (out, ticket) in outbound.iter().zip(tickets) {
            if ticket.is_ok() {
                report.success_count += 1;
                report.pushed_users.insert(out.user_id);
            } else {
                report.errors.push(DeliveryFailure {
                    user_id: out.user_id,
                    token: out.message.to.clone(),
                    error: ticket
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stride_common::types::DeliveryMessage;

    fn outbound(n: usize) -> Vec<Outbound> {
        (0..n)
            .map(|i| Outbound {
                user_id: Uuid::new_v4(),
                message: DeliveryMessage {
                    to: format!("tok-{}", i),
                    title: "t".to_string(),
                    body: "b".to_string(),
                    data: json!({}),
                },
            })
            .collect()
    }

    #[test]
    fn test_successes_and_errors_partition_input() {
        let out = outbound(4);
        let tickets = vec![
            DeliveryTicket::ok("r0"),
            DeliveryTicket::error("DeviceNotRegistered"),
            DeliveryTicket::ok("r2"),
            DeliveryTicket::error("MessageTooBig"),
        ];

        let report = TicketReconciler::reconcile(&out, &tickets).unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.success_count + report.errors.len(), out.len());
        assert_eq!(report.errors[0].token, "tok-1");
        assert_eq!(report.errors[0].error, "DeviceNotRegistered");
    }

    #[test]
    fn test_pushed_users_tracks_any_success() {
        let mut out = outbound(2);
        // Same user on both tokens; one delivery fails.
        out[1].user_id = out[0].user_id;
        let tickets = vec![DeliveryTicket::error("boom"), DeliveryTicket::ok("r1")];

        let report = TicketReconciler::reconcile(&out, &tickets).unwrap();
        assert!(report.pushed_users.contains(&out[0].user_id));
    }

    #[test]
    fn test_length_mismatch_is_internal_error() {
        let out = outbound(2);
        let tickets = vec![DeliveryTicket::ok("r0")];

        let result = TicketReconciler::reconcile(&out, &tickets);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_empty_inputs() {
        let report = TicketReconciler::reconcile(&[], &[]).unwrap();
        assert_eq!(report.success_count, 0);
        assert!(report.errors.is_empty());
    }
}
