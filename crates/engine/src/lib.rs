//! Notification fan-out and delivery engine.
//!
//! Pipeline per domain event: resolve an audience, record one durable
//! notification per recipient, resolve and validate device tokens, render
//! push messages, deliver them in gateway-bounded chunks, and reconcile
//! per-message delivery tickets back into aggregate outcomes.

pub mod audience;
pub mod delivery;
pub mod dispatcher;
pub mod ledger;
pub mod message;
pub mod reconcile;
pub mod sweep;
pub mod tokens;
pub mod window;
