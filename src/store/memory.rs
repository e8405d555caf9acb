//! Memory-resident store implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::models::{
    Clue, Coordinates, Hunt, HuntCompletion, Message, NewHunt, NewHuntCompletion, NewTeam, NewUser,
    Team, TeamMember, User,
};
use super::Store;

/// In-memory store backing the directory and the per-scope message logs.
///
/// All tables share one id counter. State is process-local and gone on
/// restart; durable storage is out of scope.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    hunts: BTreeMap<i64, Hunt>,
    completions: BTreeMap<i64, HuntCompletion>,
    teams: BTreeMap<i64, Team>,
    members: BTreeMap<i64, TeamMember>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with demo content: one user and one public
    /// campus hunt.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        {
            let mut tables = store.inner.write().await;
            let user_id = tables.next_id();
            tables.users.insert(
                user_id,
                User {
                    id: user_id,
                    username: "groundskeeper".to_string(),
                    name: Some("The Groundskeeper".to_string()),
                    profile_picture: None,
                    team_id: None,
                },
            );

            let hunt_id = tables.next_id();
            tables.hunts.insert(
                hunt_id,
                Hunt {
                    id: hunt_id,
                    name: "Campus Classic".to_string(),
                    description: "A lap around the landmarks every first-year should know."
                        .to_string(),
                    creator_id: user_id,
                    clues: demo_clues(),
                    created_at: Utc::now(),
                    is_public: true,
                    shared_with: vec![],
                    messages: vec![],
                },
            );
        }
        store
    }
}

fn demo_clues() -> Vec<Clue> {
    vec![
        Clue {
            text: "Start where every semester starts: the doors everyone walks through on day one."
                .to_string(),
            hint: "The main entrance of the administration building.".to_string(),
            coordinates: Coordinates {
                latitude: 25.494025,
                longitude: 81.866252,
            },
        },
        Clue {
            text: "Shelves of stories stand in silence here. Find the desk where they are checked out."
                .to_string(),
            hint: "The library lending desk.".to_string(),
            coordinates: Coordinates {
                latitude: 25.493889,
                longitude: 81.866344,
            },
        },
        Clue {
            text: "Trade pages for plates: the next clue waits where trays are stacked.".to_string(),
            hint: "The canteen near the academic block.".to_string(),
            coordinates: Coordinates {
                latitude: 25.492983,
                longitude: 81.865861,
            },
        },
        Clue {
            text: "Finish on the field where the whistle blows. Check under the benches.".to_string(),
            hint: "The athletic ground's home-side bench.".to_string(),
            coordinates: Coordinates {
                latitude: 25.492025,
                longitude: 81.864950,
            },
        },
    ]
}

#[async_trait]
impl Store for MemStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let user = User {
            id,
            username: new.username,
            name: new.name,
            profile_picture: new.profile_picture,
            team_id: None,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn set_user_team(&self, user_id: i64, team_id: Option<i64>) -> Result<Option<User>> {
        let mut tables = self.inner.write().await;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };
        user.team_id = team_id;
        Ok(Some(user.clone()))
    }

    async fn get_hunt(&self, id: i64) -> Result<Option<Hunt>> {
        Ok(self.inner.read().await.hunts.get(&id).cloned())
    }

    async fn list_visible_hunts(&self, user_id: i64) -> Result<Vec<Hunt>> {
        let tables = self.inner.read().await;
        Ok(tables
            .hunts
            .values()
            .filter(|hunt| hunt.visible_to(user_id))
            .cloned()
            .collect())
    }

    async fn create_hunt(&self, new: NewHunt, creator_id: i64) -> Result<Hunt> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let hunt = Hunt {
            id,
            name: new.name,
            description: new.description,
            creator_id,
            clues: new.clues,
            created_at: Utc::now(),
            is_public: new.is_public.unwrap_or(true),
            shared_with: new.shared_with.unwrap_or_default(),
            messages: vec![],
        };
        tables.hunts.insert(id, hunt.clone());
        Ok(hunt)
    }

    async fn update_hunt_sharing(
        &self,
        id: i64,
        is_public: bool,
        shared_with: Vec<i64>,
    ) -> Result<Option<Hunt>> {
        let mut tables = self.inner.write().await;
        let Some(hunt) = tables.hunts.get_mut(&id) else {
            return Ok(None);
        };
        hunt.is_public = is_public;
        hunt.shared_with = shared_with;
        Ok(Some(hunt.clone()))
    }

    async fn append_hunt_message(&self, hunt_id: i64, message: Message) -> Result<Option<Hunt>> {
        let mut tables = self.inner.write().await;
        let Some(hunt) = tables.hunts.get_mut(&hunt_id) else {
            return Ok(None);
        };
        hunt.messages.push(message);
        Ok(Some(hunt.clone()))
    }

    async fn list_hunt_completions(&self, hunt_id: i64) -> Result<Vec<HuntCompletion>> {
        let tables = self.inner.read().await;
        Ok(tables
            .completions
            .values()
            .filter(|completion| completion.hunt_id == hunt_id)
            .cloned()
            .collect())
    }

    async fn create_hunt_completion(
        &self,
        hunt_id: i64,
        user_id: i64,
        new: NewHuntCompletion,
    ) -> Result<HuntCompletion> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let completion = HuntCompletion {
            id,
            hunt_id,
            user_id,
            team_id: new.team_id,
            completion_time: new.completion_time,
            hints_used: new.hints_used,
            completed_at: Utc::now(),
        };
        tables.completions.insert(id, completion.clone());
        Ok(completion)
    }

    async fn get_team(&self, id: i64) -> Result<Option<Team>> {
        Ok(self.inner.read().await.teams.get(&id).cloned())
    }

    async fn get_team_by_code(&self, code: &str) -> Result<Option<Team>> {
        let tables = self.inner.read().await;
        Ok(tables.teams.values().find(|team| team.code == code).cloned())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.inner.read().await.teams.values().cloned().collect())
    }

    async fn create_team(&self, new: NewTeam, creator_id: i64) -> Result<Team> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let team = Team {
            id,
            name: new.name,
            code: new.code,
            creator_id,
            created_at: Utc::now(),
            description: new.description,
            avatar: new.avatar,
            messages: vec![],
        };
        tables.teams.insert(id, team.clone());

        let member_id = tables.next_id();
        tables.members.insert(
            member_id,
            TeamMember {
                id: member_id,
                team_id: id,
                user_id: creator_id,
                joined_at: Utc::now(),
                is_admin: true,
            },
        );

        Ok(team)
    }

    async fn add_team_member(
        &self,
        team_id: i64,
        user_id: i64,
        is_admin: bool,
    ) -> Result<TeamMember> {
        let mut tables = self.inner.write().await;
        let id = tables.next_id();
        let member = TeamMember {
            id,
            team_id,
            user_id,
            joined_at: Utc::now(),
            is_admin,
        };
        tables.members.insert(id, member.clone());
        Ok(member)
    }

    async fn remove_team_member(&self, team_id: i64, user_id: i64) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables
            .members
            .retain(|_, member| !(member.team_id == team_id && member.user_id == user_id));
        Ok(())
    }

    async fn list_team_members(&self, team_id: i64) -> Result<Vec<TeamMember>> {
        let tables = self.inner.read().await;
        Ok(tables
            .members
            .values()
            .filter(|member| member.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn list_user_teams(&self, user_id: i64) -> Result<Vec<Team>> {
        let tables = self.inner.read().await;
        let team_ids: Vec<i64> = tables
            .members
            .values()
            .filter(|member| member.user_id == user_id)
            .map(|member| member.team_id)
            .collect();
        Ok(tables
            .teams
            .values()
            .filter(|team| team_ids.contains(&team.id))
            .cloned()
            .collect())
    }

    async fn append_team_message(&self, team_id: i64, message: Message) -> Result<Option<Team>> {
        let mut tables = self.inner.write().await;
        let Some(team) = tables.teams.get_mut(&team_id) else {
            return Ok(None);
        };
        team.messages.push(message);
        Ok(Some(team.clone()))
    }
}
