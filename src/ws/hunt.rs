//! Hunt presence and chat channel.

use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::store::models::Message;
use crate::store::Store;

use super::error::JoinError;
use super::registry::{FramePipe, Registry};
use super::types::{ClientFrame, ServerFrame};

/// Per-session state the hunt registry tracks.
///
/// Only `clue_index` is ever mutated, and only by the session's own
/// `update_position` frames. `team_id` is read once from the directory at
/// join time and relayed as-is afterwards.
#[derive(Debug)]
struct HuntPresence {
    clue_index: u32,
    team_id: Option<i64>,
}

/// Handle identifying one joined hunt session.
#[derive(Debug)]
pub struct HuntSession {
    pub user_id: i64,
    pub hunt_id: i64,
    conn: u64,
}

/// Per-hunt broadcast domain: tracks connected players, relays position and
/// chat frames, and replays the persisted hunt chat log on join.
///
/// Hunt membership is open; any existing user may join any hunt id, even
/// one with no hunt entity behind it (its history is simply empty and chat
/// appends to it go nowhere).
pub struct HuntChannel {
    registry: Registry<HuntPresence>,
    store: Arc<dyn Store>,
}

impl HuntChannel {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            registry: Registry::new(),
            store,
        }
    }

    /// Authenticate and register a connection.
    ///
    /// On success the pipe has already received the `chat_history` frame and
    /// the updated `player_count` has gone out to every session in the hunt,
    /// the new one included. A previous session for the same user is
    /// superseded: dropping its pipe here closes the old connection.
    pub async fn join(
        &self,
        user_id: i64,
        hunt_id: i64,
        pipe: FramePipe,
    ) -> Result<HuntSession, JoinError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(JoinError::UserNotFound)?;

        let history = self
            .store
            .get_hunt(hunt_id)
            .await?
            .map(|hunt| hunt.messages)
            .unwrap_or_default();

        let registration = self.registry.register(
            hunt_id,
            user_id,
            pipe,
            HuntPresence {
                clue_index: 0,
                team_id: user.team_id,
            },
            ServerFrame::ChatHistory { messages: history },
            |count| ServerFrame::PlayerCount { count },
        );

        if registration.superseded.is_some() {
            debug!("user {user_id} superseded an existing session in hunt {hunt_id}");
        }

        Ok(HuntSession {
            user_id,
            hunt_id,
            conn: registration.conn,
        })
    }

    /// Handle one inbound frame from an active session.
    ///
    /// Unknown frame kinds are dropped without an error echo.
    pub async fn dispatch(&self, session: &HuntSession, frame: ClientFrame) {
        match frame {
            ClientFrame::ChatMessage { message } => {
                if message.content.is_empty() {
                    return;
                }
                let stored = Message {
                    sender_id: session.user_id,
                    content: message.content,
                    timestamp: Utc::now(),
                };
                match self
                    .store
                    .append_hunt_message(session.hunt_id, stored.clone())
                    .await
                {
                    Ok(Some(_)) => self
                        .registry
                        .broadcast(session.hunt_id, ServerFrame::ChatMessage { message: stored }),
                    Ok(None) => {
                        debug!(
                            "dropping chat for hunt {} from user {}: no such hunt",
                            session.hunt_id, session.user_id
                        );
                    }
                    Err(err) => {
                        warn!(
                            "failed to append chat message for hunt {}: {err:?}",
                            session.hunt_id
                        );
                    }
                }
            }

            ClientFrame::UpdatePosition {
                position,
                current_clue_index,
                heading,
            } => {
                let Some(team_id) = self.registry.update_session(
                    session.hunt_id,
                    session.user_id,
                    session.conn,
                    |presence| {
                        presence.clue_index = current_clue_index;
                        presence.team_id
                    },
                ) else {
                    return;
                };

                self.registry.broadcast_others(
                    session.hunt_id,
                    session.user_id,
                    ServerFrame::PlayerPosition {
                        user_id: session.user_id,
                        position,
                        current_clue_index,
                        heading,
                        team_id,
                    },
                );
            }

            ClientFrame::Unknown => {}
        }
    }

    /// Deregister a session and announce the new player count to whoever
    /// remains in the hunt. Safe to call for superseded sessions.
    pub fn leave(&self, session: &HuntSession) {
        self.registry
            .unregister(session.hunt_id, session.user_id, session.conn, |count| {
                ServerFrame::PlayerCount { count }
            });
    }

    /// Live sessions currently registered in the hunt.
    pub fn player_count(&self, hunt_id: i64) -> usize {
        self.registry.session_count(hunt_id)
    }
}
