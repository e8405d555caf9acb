//! WebSocket frame types for the hunt and team channels.
//!
//! Frames are tagged with a `type` discriminator; tags are snake_case and
//! payload fields camelCase, matching what the web client sends and expects.

use serde::{Deserialize, Serialize};

use crate::store::models::{Coordinates, Message};

/// Chat payload carried by an inbound `chat_message` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatBody {
    pub content: String,
}

/// Frames sent by clients.
///
/// Unrecognized `type` tags deserialize to [`ClientFrame::Unknown`] and are
/// dropped without an error echo, like any malformed payload. Discarding a
/// chat or position frame is cheap for both sides.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Append a chat message to the scope's log and fan it out.
    ChatMessage { message: ChatBody },

    /// Report the player's position and working clue (hunt scope only).
    UpdatePosition {
        position: Coordinates,
        current_clue_index: u32,
        #[serde(default)]
        heading: Option<f64>,
    },

    /// Catch-all for frame kinds this server does not recognize.
    #[serde(other)]
    Unknown,
}

/// Frames pushed by the server, never sent by clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// Full persisted message log for the scope, sent once at join.
    ChatHistory { messages: Vec<Message> },

    /// Live session count for a hunt, re-sent on every join and leave.
    PlayerCount { count: usize },

    /// Live session count for a team, re-sent on every join and leave.
    MemberCount { count: usize },

    /// Fan-out of a newly appended chat message (sender included).
    ChatMessage { message: Message },

    /// Fan-out of a position update (sender excluded).
    PlayerPosition {
        user_id: i64,
        position: Coordinates,
        current_clue_index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        heading: Option<f64>,
        team_id: Option<i64>,
    },
}
