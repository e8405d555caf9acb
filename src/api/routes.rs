//! API route definitions.

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::ws;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.cors_origins);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(handlers::health))
        // Directory plumbing
        .route("/api/users", post(handlers::create_user))
        .route("/api/users/{user_id}", get(handlers::get_user))
        // Hunts
        .route(
            "/api/hunts",
            get(handlers::list_hunts).post(handlers::create_hunt),
        )
        .route("/api/hunts/{hunt_id}", get(handlers::get_hunt))
        .route("/api/hunts/{hunt_id}/share", post(handlers::share_hunt))
        .route(
            "/api/hunts/{hunt_id}/completions",
            get(handlers::list_completions),
        )
        .route("/api/hunts/{hunt_id}/complete", post(handlers::complete_hunt))
        .route("/api/hunts/{hunt_id}/messages", get(handlers::hunt_messages))
        // Teams
        .route(
            "/api/teams",
            get(handlers::list_teams).post(handlers::create_team),
        )
        .route("/api/teams/code/{code}", get(handlers::get_team_by_code))
        .route("/api/teams/{team_id}", get(handlers::get_team))
        .route(
            "/api/teams/{team_id}/members",
            get(handlers::list_team_members),
        )
        .route("/api/teams/{team_id}/join", post(handlers::join_team))
        .route("/api/teams/{team_id}/leave", delete(handlers::leave_team))
        .route(
            "/api/teams/{team_id}/message",
            post(handlers::post_team_message),
        )
        .route("/api/teams/{team_id}/messages", get(handlers::team_messages))
        .route("/api/user/teams", get(handlers::user_teams))
        // Real-time channels
        .route("/ws/hunt", get(ws::hunt_ws_handler))
        .route("/ws/team", get(ws::team_ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer.
///
/// With no configured origins the layer is permissive, which suits local
/// and campus-network deployments; configured origins are matched exactly.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| {
                origin.parse::<HeaderValue>().ok().or_else(|| {
                    tracing::warn!("CORS: invalid origin in config: {}", origin);
                    None
                })
            })
            .collect();

        tracing::info!("CORS: allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
