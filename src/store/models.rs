//! Domain records shared by the store, the REST surface, and the channels.
//!
//! Everything here serializes with camelCase field names: the shapes double
//! as the wire format the web client consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One step of a hunt: riddle text, a hint, and the target location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clue {
    pub text: String,
    pub hint: String,
    pub coordinates: Coordinates,
}

/// A chat message as persisted and as relayed over the wire.
///
/// Immutable once appended to a hunt or team log; insertion order is the
/// delivery and replay order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub profile_picture: Option<String>,
    /// The user's current team, if any. Read once at hunt-channel join time.
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunt {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub creator_id: i64,
    pub clues: Vec<Clue>,
    pub created_at: DateTime<Utc>,
    pub is_public: bool,
    pub shared_with: Vec<i64>,
    /// Append-only chat log; the sole source of hunt chat truth.
    pub messages: Vec<Message>,
}

impl Hunt {
    /// Whether the given user may see this hunt.
    pub fn visible_to(&self, user_id: i64) -> bool {
        self.is_public || self.creator_id == user_id || self.shared_with.contains(&user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntCompletion {
    pub id: i64,
    pub hunt_id: i64,
    pub user_id: i64,
    pub team_id: Option<i64>,
    /// Wall-clock time to finish the hunt, in seconds.
    pub completion_time: i64,
    pub hints_used: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
    /// Join code handed out to prospective members.
    pub code: String,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub avatar: Option<String>,
    /// Append-only chat log; the sole source of team chat truth.
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

// ============================================================================
// Creation payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHunt {
    pub name: String,
    pub description: String,
    pub clues: Vec<Clue>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub shared_with: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHuntCompletion {
    pub completion_time: i64,
    pub hints_used: i32,
    #[serde(default)]
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}
