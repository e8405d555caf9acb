//! Test utilities and common setup.

use std::sync::Arc;

use axum::Router;
use questline::api::{self, AppState};
use questline::store::MemStore;

/// Create a test application over an empty in-memory store.
pub async fn test_app() -> Router {
    let state = AppState::new(Arc::new(MemStore::new()));
    api::create_router(state)
}
