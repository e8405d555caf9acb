//! User/team/hunt directory and message store.
//!
//! The channels and the REST layer consume this through the [`Store`] trait
//! so tests (and any future durable backend) can substitute their own
//! implementation. The shipped backend is [`MemStore`], a memory-resident
//! store: nothing survives a restart.

use anyhow::Result;
use async_trait::async_trait;

pub mod memory;
pub mod models;

pub use memory::MemStore;
pub use models::{
    Clue, Coordinates, Hunt, HuntCompletion, Message, NewHunt, NewHuntCompletion, NewTeam, NewUser,
    Team, TeamMember, User,
};

/// Directory and message-store operations.
///
/// Lookups return `Ok(None)` for unknown ids; errors are reserved for
/// backend failures. Message appends return the updated entity, or `None`
/// when the scope id is unknown, in which case callers relay nothing.
#[async_trait]
pub trait Store: Send + Sync {
    // ========== Users ==========
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create_user(&self, new: NewUser) -> Result<User>;
    /// Set or clear the user's current team. Returns the updated user.
    async fn set_user_team(&self, user_id: i64, team_id: Option<i64>) -> Result<Option<User>>;

    // ========== Hunts ==========
    async fn get_hunt(&self, id: i64) -> Result<Option<Hunt>>;
    /// Hunts visible to the user: public, created by them, or shared with them.
    async fn list_visible_hunts(&self, user_id: i64) -> Result<Vec<Hunt>>;
    async fn create_hunt(&self, new: NewHunt, creator_id: i64) -> Result<Hunt>;
    async fn update_hunt_sharing(
        &self,
        id: i64,
        is_public: bool,
        shared_with: Vec<i64>,
    ) -> Result<Option<Hunt>>;
    async fn append_hunt_message(&self, hunt_id: i64, message: Message) -> Result<Option<Hunt>>;

    // ========== Completions ==========
    async fn list_hunt_completions(&self, hunt_id: i64) -> Result<Vec<HuntCompletion>>;
    async fn create_hunt_completion(
        &self,
        hunt_id: i64,
        user_id: i64,
        new: NewHuntCompletion,
    ) -> Result<HuntCompletion>;

    // ========== Teams ==========
    async fn get_team(&self, id: i64) -> Result<Option<Team>>;
    async fn get_team_by_code(&self, code: &str) -> Result<Option<Team>>;
    async fn list_teams(&self) -> Result<Vec<Team>>;
    /// Create a team; the creator becomes its first (admin) member.
    async fn create_team(&self, new: NewTeam, creator_id: i64) -> Result<Team>;
    async fn add_team_member(
        &self,
        team_id: i64,
        user_id: i64,
        is_admin: bool,
    ) -> Result<TeamMember>;
    async fn remove_team_member(&self, team_id: i64, user_id: i64) -> Result<()>;
    async fn list_team_members(&self, team_id: i64) -> Result<Vec<TeamMember>>;
    /// Teams the user belongs to.
    async fn list_user_teams(&self, user_id: i64) -> Result<Vec<Team>>;
    async fn append_team_message(&self, team_id: i64, message: Message) -> Result<Option<Team>>;
}
