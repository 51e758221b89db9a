pub mod follows;
pub mod health;
pub mod push;
pub mod reminders;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(push::router())
        .merge(follows::router())
        .merge(runs::router())
        .merge(reminders::router())
        .with_state(state)
}
