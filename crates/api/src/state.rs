//! Shared application state for the Axum API server.

use stride_common::config::AppConfig;
use stride_engine::dispatcher::EventDispatcher;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: EventDispatcher,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(dispatcher: EventDispatcher, config: AppConfig) -> Self {
        Self { dispatcher, config }
    }
}
