//! Team presence and chat channel.

use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::store::models::Message;
use crate::store::Store;

use super::error::JoinError;
use super::registry::{FramePipe, Registry};
use super::types::{ClientFrame, ServerFrame};

/// Handle identifying one joined team session.
#[derive(Debug)]
pub struct TeamSession {
    pub user_id: i64,
    pub team_id: i64,
    conn: u64,
}

/// Per-team broadcast domain: the same pattern as the hunt channel, but
/// membership is explicit (only members of the team may join) and the
/// only inbound frame it honors is `chat_message`.
pub struct TeamChannel {
    registry: Registry<()>,
    store: Arc<dyn Store>,
}

impl TeamChannel {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            registry: Registry::new(),
            store,
        }
    }

    /// Authenticate and register a connection.
    ///
    /// Rejects when the user or team does not exist, or the user is not
    /// among the team's members. On success the pipe has received the
    /// `chat_history` frame and the updated `member_count` has gone out to
    /// every session in the team.
    pub async fn join(
        &self,
        user_id: i64,
        team_id: i64,
        pipe: FramePipe,
    ) -> Result<TeamSession, JoinError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(JoinError::UserNotFound)?;

        let team = self
            .store
            .get_team(team_id)
            .await?
            .ok_or(JoinError::TeamNotFound)?;

        let members = self.store.list_team_members(team_id).await?;
        if !members.iter().any(|member| member.user_id == user_id) {
            return Err(JoinError::NotTeamMember);
        }

        let registration = self.registry.register(
            team_id,
            user_id,
            pipe,
            (),
            ServerFrame::ChatHistory {
                messages: team.messages,
            },
            |count| ServerFrame::MemberCount { count },
        );

        if registration.superseded.is_some() {
            debug!("user {user_id} superseded an existing session in team {team_id}");
        }

        Ok(TeamSession {
            user_id,
            team_id,
            conn: registration.conn,
        })
    }

    /// Handle one inbound frame from an active session.
    ///
    /// Only `chat_message` is part of the team protocol; everything else,
    /// `update_position` included, is silently ignored.
    pub async fn dispatch(&self, session: &TeamSession, frame: ClientFrame) {
        let ClientFrame::ChatMessage { message } = frame else {
            return;
        };
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
            .append_team_message(session.team_id, stored.clone())
            .await
        {
            Ok(Some(_)) => self
                .registry
                .broadcast(session.team_id, ServerFrame::ChatMessage { message: stored }),
            Ok(None) => {
                debug!(
                    "dropping chat for team {} from user {}: no such team",
                    session.team_id, session.user_id
                );
            }
            Err(err) => {
                warn!(
                    "failed to append chat message for team {}: {err:?}",
                    session.team_id
                );
            }
        }
    }

    /// Deregister a session and announce the new member count to whoever
    /// remains in the team. Safe to call for superseded sessions.
    pub fn leave(&self, session: &TeamSession) {
        self.registry
            .unregister(session.team_id, session.user_id, session.conn, |count| {
                ServerFrame::MemberCount { count }
            });
    }

    /// Live sessions currently registered in the team.
    pub fn member_count(&self, team_id: i64) -> usize {
        self.registry.session_count(team_id)
    }
}
