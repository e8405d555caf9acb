//! Application state shared across handlers.

use std::sync::Arc;

use crate::store::Store;
use crate::ws::{HuntChannel, TeamChannel};

/// Application state shared across all handlers.
///
/// The channels own their connection registries; everything here is built
/// once at server start and handed to the router, so tests can substitute
/// their own store or drive the channels directly.
#[derive(Clone)]
pub struct AppState {
    /// User/team/hunt directory and message store.
    pub store: Arc<dyn Store>,
    /// Hunt presence & chat channel.
    pub hunt_channel: Arc<HuntChannel>,
    /// Team presence & chat channel.
    pub team_channel: Arc<TeamChannel>,
    /// Origins allowed by CORS; empty means permissive.
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Create new application state over a store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            hunt_channel: Arc::new(HuntChannel::new(store.clone())),
            team_channel: Arc::new(TeamChannel::new(store.clone())),
            store,
            cors_origins: Vec::new(),
        }
    }

    /// Restrict CORS to the given origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}
