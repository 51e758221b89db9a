//! Event dispatcher — one entry point per event type, all driving the same
//! fan-out pipeline.
//!
//! Pipeline per event:
//! 1. Resolve the audience (via `AudienceResolver`)
//! 2. Record ledger rows and resolve device tokens (independent reads, run
//!    concurrently)
//! 3. Render one message per recipient device token
//! 4. Chunked delivery (via `DeliveryBatcher`) and ticket reconciliation
//! 5. Mark delivered records pushed

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use stride_common::error::AppError;
use stride_common::tasks::BackgroundTasks;
use stride_common::types::{Club, DeliveryMessage, NotificationKind, Recipient, Run};
use stride_gateway::PushGateway;

use crate::audience::{AudienceResolver, NotificationEvent};
use crate::delivery::{DeliveryBatcher, Outbound};
use crate::ledger::NotificationLedger;
use crate::message::MessageBuilder;
use crate::reconcile::{DeliveryFailure, TicketReconciler};
use crate::tokens::TokenRegistry;

/// Aggregate outcome of one event's pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub recipients: usize,
    pub notifications_created: usize,
    pub pushes_sent: usize,
    pub push_errors: usize,
}

/// Outcome of a direct push request (caller-supplied tokens).
#[derive(Debug, Clone, Serialize)]
pub struct DirectPushReport {
    pub valid_tokens: usize,
    pub invalid_tokens: usize,
    pub tickets: usize,
    pub errors: usize,
    pub error_details: Vec<DeliveryFailure>,
}

/// Orchestrates the full notification flow for each event type.
///
/// All collaborators are injected at construction; the dispatcher holds no
/// hidden global state and is cheap to clone.
#[derive(Clone)]
pub struct EventDispatcher {
    pool: PgPool,
    tokens: TokenRegistry,
    batcher: DeliveryBatcher,
    tasks: BackgroundTasks,
}

impl EventDispatcher {
    pub fn new(pool: PgPool, gateway: Arc<dyn PushGateway>, chunk_concurrency: usize) -> Self {
        Self {
            pool,
            tokens: TokenRegistry::new(Arc::clone(&gateway)),
            batcher: DeliveryBatcher::new(gateway, chunk_concurrency),
            tasks: BackgroundTasks::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Background task registry; the server drains it at shutdown.
    pub fn background_tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Create a follow edge, then notify the followed user.
    ///
    /// The edge write is confirmed before this returns. The notification
    /// pipeline runs afterwards as a supervised background task whose
    /// failure is logged, never surfaced to the already-acknowledged caller.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<(), AppError> {
        if follower_id == following_id {
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(follower = %follower_id, following = %following_id, "Follow edge created");

        let dispatcher = self.clone();
        self.tasks.spawn(async move {
            let event = NotificationEvent::NewFollower {
                follower_id,
                following_id,
            };
            if let Err(e) = dispatcher.dispatch(&event).await {
                tracing::error!(
                    follower = %follower_id,
                    following = %following_id,
                    error = %e,
                    "Background follow notification failed"
                );
            }
        });

        Ok(())
    }

    /// Remove a follow edge. Synchronous; bypasses the pipeline entirely.
    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Announce a club run to the club's followers.
    pub async fn announce_club_run(
        &self,
        run_id: Uuid,
        club_id: Uuid,
    ) -> Result<PipelineReport, AppError> {
        let run = self
            .fetch_run(run_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Run {} not found", run_id)))?;

        let club: Option<Club> = sqlx::query_as("SELECT * FROM clubs WHERE id = $1")
            .bind(club_id)
            .fetch_optional(&self.pool)
            .await?;
        let club =
            club.ok_or_else(|| AppError::Validation(format!("Club {} not found", club_id)))?;

        let event = NotificationEvent::ClubRunAnnouncement { run, club };
        self.dispatch(&event).await
    }

    /// Mark checked-in attendees completed and notify them.
    ///
    /// Authorization (host only) happens during audience resolution, before
    /// any write. The audience is captured before the attendee patch so the
    /// patched rows and the notified users are the same set.
    pub async fn complete_run(
        &self,
        run_id: Uuid,
        host_id: Uuid,
    ) -> Result<PipelineReport, AppError> {
        let run = self
            .fetch_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Run {} not found", run_id)))?;

        let event = NotificationEvent::RunCompleted { run, host_id };
        let recipients = AudienceResolver::resolve(&self.pool, &event).await?;

        let attendee_ids: Vec<Uuid> = recipients.iter().map(|r| r.user_id).collect();
        if !attendee_ids.is_empty() {
            sqlx::query(
                "UPDATE run_attendees SET completed = true WHERE run_id = $1 AND user_id = ANY($2)",
            )
            .bind(run_id)
            .bind(&attendee_ids)
            .execute(&self.pool)
            .await?;

            tracing::info!(run_id = %run_id, attendees = attendee_ids.len(), "Attendees marked completed");
        }

        self.deliver_to(event.kind(), &recipients).await
    }

    /// Push a message to caller-supplied tokens for one user.
    ///
    /// Tokens are partitioned by the gateway predicate; invalid ones are
    /// reported, not fatal, unless none remain.
    pub async fn send_direct(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        data: serde_json::Value,
        tokens: &[String],
    ) -> Result<DirectPushReport, AppError> {
        let (valid, invalid) = self.tokens.partition(tokens);

        if !invalid.is_empty() {
            tracing::warn!(
                user_id = %user_id,
                invalid = invalid.len(),
                "Ignoring push tokens with invalid format"
            );
        }
        if valid.is_empty() {
            return Err(AppError::Validation(
                "No valid push tokens provided".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let outbound: Vec<Outbound> = valid
            .iter()
            .filter(|token| seen.insert((*token).clone()))
            .map(|token| Outbound {
                user_id,
                message: DeliveryMessage {
                    to: token.clone(),
                    title: title.to_string(),
                    body: body.to_string(),
                    data: data.clone(),
                },
            })
            .collect();

        let tickets = self.batcher.deliver(&outbound).await;
        let report = TicketReconciler::reconcile(&outbound, &tickets)?;

        tracing::info!(
            user_id = %user_id,
            tickets = tickets.len(),
            errors = report.errors.len(),
            "Direct push delivered"
        );

        Ok(DirectPushReport {
            valid_tokens: valid.len(),
            invalid_tokens: invalid.len(),
            tickets: tickets.len(),
            errors: report.errors.len(),
            error_details: report.errors,
        })
    }

    // ------------------------------------------------------------------
    // Shared pipeline
    // ------------------------------------------------------------------

    /// Resolve the audience for `event` and run the delivery pipeline.
    pub async fn dispatch(&self, event: &NotificationEvent) -> Result<PipelineReport, AppError> {
        let recipients = AudienceResolver::resolve(&self.pool, event).await?;
        self.deliver_to(event.kind(), &recipients).await
    }

    /// Ledger + tokens + render + deliver + reconcile for a resolved
    /// audience.
    async fn deliver_to(
        &self,
        kind: NotificationKind,
        recipients: &[Recipient],
    ) -> Result<PipelineReport, AppError> {
        if recipients.is_empty() {
            return Ok(PipelineReport::default());
        }

        let user_ids: Vec<Uuid> = recipients.iter().map(|r| r.user_id).collect();

        // Ledger writes and token lookup are independent; run them together.
        let (recorded, tokens_by_user) = tokio::try_join!(
            NotificationLedger::record_all(&self.pool, kind, recipients),
            self.tokens.resolve(&self.pool, &user_ids),
        )?;

        // One message per device token, skipping recipients whose ledger
        // write was suppressed (dedup) or failed.
        let mut outbound = Vec::new();
        for recipient in recipients {
            if !recorded.contains_key(&recipient.user_id) {
                continue;
            }
            let Some(tokens) = tokens_by_user.get(&recipient.user_id) else {
                continue;
            };

            let rendered = MessageBuilder::render(kind, &recipient.context);
            for token in tokens {
                outbound.push(Outbound {
                    user_id: recipient.user_id,
                    message: DeliveryMessage {
                        to: token.clone(),
                        title: rendered.title.clone(),
                        body: rendered.body.clone(),
                        data: rendered.data.clone(),
                    },
                });
            }
        }

        let tickets = self.batcher.deliver(&outbound).await;
        let report = TicketReconciler::reconcile(&outbound, &tickets)?;

        let pushed_ids: Vec<Uuid> = report
            .pushed_users
            .iter()
            .filter_map(|user_id| recorded.get(user_id).copied())
            .collect();
        NotificationLedger::mark_pushed(&self.pool, &pushed_ids).await?;

        for failure in &report.errors {
            tracing::warn!(
                user_id = %failure.user_id,
                error = %failure.error,
                "Push delivery failed"
            );
        }

        tracing::info!(
            kind = %kind,
            recipients = recipients.len(),
            notifications = recorded.len(),
            pushes = report.success_count,
            "Notification pipeline completed"
        );

        Ok(PipelineReport {
            recipients: recipients.len(),
            notifications_created: recorded.len(),
            pushes_sent: report.success_count,
            push_errors: report.errors.len(),
        })
    }

    async fn fetch_run(&self, run_id: Uuid) -> Result<Option<Run>, AppError> {
        let run = sqlx::query_as("SELECT * FROM runs WHERE id = $1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(run)
    }
}
