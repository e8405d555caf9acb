//! WebSocket upgrade handlers for the hunt and team channels.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::api::AppState;

use super::error::JoinError;
use super::types::{ClientFrame, ServerFrame};

/// Handshake parameters for `/ws/hunt`.
///
/// Kept as raw strings: a malformed id must still be answered with a
/// policy close on the accepted socket, not an HTTP rejection.
#[derive(Debug, Deserialize)]
pub struct HuntSocketQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "huntId")]
    hunt_id: Option<String>,
}

/// Handshake parameters for `/ws/team`.
#[derive(Debug, Deserialize)]
pub struct TeamSocketQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "teamId")]
    team_id: Option<String>,
}

/// WebSocket upgrade handler for the hunt channel.
///
/// GET /ws/hunt?userId=<n>&huntId=<n>
pub async fn hunt_ws_handler(
    State(state): State<AppState>,
    Query(query): Query<HuntSocketQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_hunt_connection(socket, state, query))
}

/// WebSocket upgrade handler for the team channel.
///
/// GET /ws/team?userId=<n>&teamId=<n>
pub async fn team_ws_handler(
    State(state): State<AppState>,
    Query(query): Query<TeamSocketQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_team_connection(socket, state, query))
}

async fn handle_hunt_connection(socket: WebSocket, state: AppState, query: HuntSocketQuery) {
    let (Some(user_id), Some(hunt_id)) = (
        parse_id(query.user_id.as_deref()),
        parse_id(query.hunt_id.as_deref()),
    ) else {
        reject(socket, &JoinError::InvalidHuntIds).await;
        return;
    };

    let (pipe, outbound) = mpsc::unbounded_channel();
    let session = match state.hunt_channel.join(user_id, hunt_id, pipe).await {
        Ok(session) => session,
        Err(err) => {
            info!("rejected hunt join for user {user_id} in hunt {hunt_id}: {err}");
            reject(socket, &err).await;
            return;
        }
    };
    info!("user {user_id} joined hunt {hunt_id}");

    let (sender, mut receiver) = socket.split();
    let forward = tokio::spawn(forward_frames(sender, outbound));

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => state.hunt_channel.dispatch(&session, frame).await,
                Err(err) => {
                    debug!("dropping malformed frame from user {user_id}: {err}");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("socket error for user {user_id} in hunt {hunt_id}: {err}");
                break;
            }
        }
    }

    forward.abort();
    state.hunt_channel.leave(&session);
    info!("user {user_id} left hunt {hunt_id}");
}

async fn handle_team_connection(socket: WebSocket, state: AppState, query: TeamSocketQuery) {
    let (Some(user_id), Some(team_id)) = (
        parse_id(query.user_id.as_deref()),
        parse_id(query.team_id.as_deref()),
    ) else {
        reject(socket, &JoinError::InvalidTeamIds).await;
        return;
    };

    let (pipe, outbound) = mpsc::unbounded_channel();
    let session = match state.team_channel.join(user_id, team_id, pipe).await {
        Ok(session) => session,
        Err(err) => {
            info!("rejected team join for user {user_id} in team {team_id}: {err}");
            reject(socket, &err).await;
            return;
        }
    };
    info!("user {user_id} joined team chat {team_id}");

    let (sender, mut receiver) = socket.split();
    let forward = tokio::spawn(forward_frames(sender, outbound));

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => state.team_channel.dispatch(&session, frame).await,
                Err(err) => {
                    debug!("dropping malformed frame from user {user_id}: {err}");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("socket error for user {user_id} in team {team_id}: {err}");
                break;
            }
        }
    }

    forward.abort();
    state.team_channel.leave(&session);
    info!("user {user_id} left team chat {team_id}");
}

/// Drain the outbound pipe into the socket.
///
/// The pipe closing while the socket is still up means the session was
/// superseded by a newer connection for the same (user, scope): the
/// registry dropped our sender, so we close the socket ourselves.
async fn forward_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<ServerFrame>,
) {
    while let Some(frame) = outbound.recv().await {
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize outbound frame: {err}");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: "Session superseded by a newer connection".into(),
        })))
        .await;
}

/// Close an accepted socket with a policy-violation code and the rejection
/// reason, as the join protocol requires.
async fn reject(mut socket: WebSocket, reason: &JoinError) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Parse a handshake id: present and a well-formed positive integer.
fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw?.parse::<i64>().ok().filter(|id| *id > 0)
}
