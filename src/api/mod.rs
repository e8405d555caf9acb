//! HTTP API module.
//!
//! REST endpoints over the directory/message store, plus the WebSocket
//! channel routes.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
