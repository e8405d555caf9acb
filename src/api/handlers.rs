//! API request handlers.
//!
//! Authentication mechanics are out of scope: the acting user is the
//! `userId` query parameter, validated against the directory. Missing or
//! unknown ids answer `401`, mirroring how the WebSocket handshake
//! identifies users.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::models::{
    Hunt, HuntCompletion, Message, NewHunt, NewHuntCompletion, NewTeam, NewUser, Team, TeamMember,
    User,
};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The acting user, passed as `?userId=<n>`.
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    #[serde(rename = "userId")]
    user_id: Option<i64>,
}

/// Resolve the acting user or fail with `401`.
async fn require_user(state: &AppState, actor: &ActorQuery) -> Result<User, ApiError> {
    let user_id = actor
        .user_id
        .ok_or_else(|| ApiError::unauthorized("userId query parameter is required"))?;
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized(format!("unknown user: {user_id}")))
}

// ============================================================================
// Users
// ============================================================================

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if new.username.trim().is_empty() {
        return Err(ApiError::bad_request("username must not be empty"));
    }
    if state
        .store
        .get_user_by_username(&new.username)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(format!(
            "username '{}' is already taken",
            new.username
        )));
    }

    let user = state.store.create_user(new).await?;
    info!(user_id = user.id, username = %user.username, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {user_id}")))?;
    Ok(Json(user))
}

// ============================================================================
// Hunts
// ============================================================================

/// GET /api/hunts
pub async fn list_hunts(
    State(state): State<AppState>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<Hunt>>> {
    let user = require_user(&state, &actor).await?;
    let hunts = state.store.list_visible_hunts(user.id).await?;
    Ok(Json(hunts))
}

/// POST /api/hunts
pub async fn create_hunt(
    State(state): State<AppState>,
    Query(actor): Query<ActorQuery>,
    Json(new): Json<NewHunt>,
) -> ApiResult<(StatusCode, Json<Hunt>)> {
    let user = require_user(&state, &actor).await?;
    if new.name.trim().is_empty() {
        return Err(ApiError::bad_request("hunt name must not be empty"));
    }

    let hunt = state.store.create_hunt(new, user.id).await?;
    info!(hunt_id = hunt.id, creator_id = user.id, "created hunt");
    Ok((StatusCode::CREATED, Json(hunt)))
}

/// GET /api/hunts/{hunt_id}
pub async fn get_hunt(
    State(state): State<AppState>,
    Path(hunt_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Hunt>> {
    let user = require_user(&state, &actor).await?;
    let hunt = state
        .store
        .get_hunt(hunt_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("hunt {hunt_id}")))?;

    if !hunt.visible_to(user.id) {
        return Err(ApiError::forbidden("you don't have access to this hunt"));
    }
    Ok(Json(hunt))
}

/// Sharing settings for a hunt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareHuntRequest {
    pub is_public: bool,
    #[serde(default)]
    pub shared_with: Vec<i64>,
}

/// POST /api/hunts/{hunt_id}/share
pub async fn share_hunt(
    State(state): State<AppState>,
    Path(hunt_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(request): Json<ShareHuntRequest>,
) -> ApiResult<Json<Hunt>> {
    let user = require_user(&state, &actor).await?;
    let hunt = state
        .store
        .get_hunt(hunt_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("hunt {hunt_id}")))?;

    if hunt.creator_id != user.id {
        return Err(ApiError::forbidden("only the creator can share this hunt"));
    }

    let updated = state
        .store
        .update_hunt_sharing(hunt_id, request.is_public, request.shared_with)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("hunt {hunt_id}")))?;
    Ok(Json(updated))
}

/// GET /api/hunts/{hunt_id}/completions
pub async fn list_completions(
    State(state): State<AppState>,
    Path(hunt_id): Path<i64>,
) -> ApiResult<Json<Vec<HuntCompletion>>> {
    let completions = state.store.list_hunt_completions(hunt_id).await?;
    Ok(Json(completions))
}

/// POST /api/hunts/{hunt_id}/complete
pub async fn complete_hunt(
    State(state): State<AppState>,
    Path(hunt_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(new): Json<NewHuntCompletion>,
) -> ApiResult<(StatusCode, Json<HuntCompletion>)> {
    let user = require_user(&state, &actor).await?;
    if state.store.get_hunt(hunt_id).await?.is_none() {
        return Err(ApiError::not_found(format!("hunt {hunt_id}")));
    }

    let completion = state
        .store
        .create_hunt_completion(hunt_id, user.id, new)
        .await?;
    info!(hunt_id, user_id = user.id, "recorded hunt completion");
    Ok((StatusCode::CREATED, Json(completion)))
}

/// GET /api/hunts/{hunt_id}/messages
pub async fn hunt_messages(
    State(state): State<AppState>,
    Path(hunt_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    require_user(&state, &actor).await?;
    let hunt = state
        .store
        .get_hunt(hunt_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("hunt {hunt_id}")))?;
    Ok(Json(hunt.messages))
}

// ============================================================================
// Teams
// ============================================================================

/// GET /api/teams
pub async fn list_teams(
    State(state): State<AppState>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<Team>>> {
    require_user(&state, &actor).await?;
    let teams = state.store.list_teams().await?;
    Ok(Json(teams))
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    Query(actor): Query<ActorQuery>,
    Json(new): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let user = require_user(&state, &actor).await?;
    if new.name.trim().is_empty() || new.code.trim().is_empty() {
        return Err(ApiError::bad_request("team name and code must not be empty"));
    }

    let team = state.store.create_team(new, user.id).await?;
    info!(team_id = team.id, creator_id = user.id, "created team");
    Ok((StatusCode::CREATED, Json(team)))
}

/// GET /api/teams/{team_id}
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Team>> {
    require_user(&state, &actor).await?;
    let team = state
        .store
        .get_team(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("team {team_id}")))?;
    Ok(Json(team))
}

/// GET /api/teams/code/{code}
pub async fn get_team_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Team>> {
    require_user(&state, &actor).await?;
    let team = state
        .store
        .get_team_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("team with code '{code}'")))?;
    Ok(Json(team))
}

/// GET /api/teams/{team_id}/members
pub async fn list_team_members(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    require_user(&state, &actor).await?;
    if state.store.get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found(format!("team {team_id}")));
    }
    let members = state.store.list_team_members(team_id).await?;
    Ok(Json(members))
}

/// POST /api/teams/{team_id}/join
pub async fn join_team(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<(StatusCode, Json<TeamMember>)> {
    let user = require_user(&state, &actor).await?;
    if state.store.get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found(format!("team {team_id}")));
    }

    let members = state.store.list_team_members(team_id).await?;
    if members.iter().any(|member| member.user_id == user.id) {
        return Err(ApiError::conflict("already a team member"));
    }

    let member = state.store.add_team_member(team_id, user.id, false).await?;
    state.store.set_user_team(user.id, Some(team_id)).await?;
    info!(team_id, user_id = user.id, "user joined team");
    Ok((StatusCode::CREATED, Json(member)))
}

/// DELETE /api/teams/{team_id}/leave
pub async fn leave_team(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<StatusCode> {
    let user = require_user(&state, &actor).await?;
    if state.store.get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found(format!("team {team_id}")));
    }

    state.store.remove_team_member(team_id, user.id).await?;
    state.store.set_user_team(user.id, None).await?;
    info!(team_id, user_id = user.id, "user left team");
    Ok(StatusCode::NO_CONTENT)
}

/// Body of a REST-posted team chat message.
#[derive(Debug, Deserialize)]
pub struct TeamMessageBody {
    pub content: String,
}

/// POST /api/teams/{team_id}/message
pub async fn post_team_message(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
    Json(body): Json<TeamMessageBody>,
) -> ApiResult<Json<Team>> {
    let user = require_user(&state, &actor).await?;
    if state.store.get_team(team_id).await?.is_none() {
        return Err(ApiError::not_found(format!("team {team_id}")));
    }

    let members = state.store.list_team_members(team_id).await?;
    if !members.iter().any(|member| member.user_id == user.id) {
        return Err(ApiError::forbidden(
            "you must be a team member to send messages",
        ));
    }
    if body.content.is_empty() {
        return Err(ApiError::bad_request("message content is required"));
    }

    let message = Message {
        sender_id: user.id,
        content: body.content,
        timestamp: chrono::Utc::now(),
    };
    let team = state
        .store
        .append_team_message(team_id, message)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("team {team_id}")))?;
    Ok(Json(team))
}

/// GET /api/teams/{team_id}/messages
pub async fn team_messages(
    State(state): State<AppState>,
    Path(team_id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    require_user(&state, &actor).await?;
    let team = state
        .store
        .get_team(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("team {team_id}")))?;
    Ok(Json(team.messages))
}

/// GET /api/user/teams
pub async fn user_teams(
    State(state): State<AppState>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<Vec<Team>>> {
    let user = require_user(&state, &actor).await?;
    let teams = state.store.list_user_teams(user.id).await?;
    Ok(Json(teams))
}
