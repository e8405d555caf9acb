//! Channel protocol tests.
//!
//! Drives the hunt and team channels directly through in-process pipes:
//! the registry and store seams make real sockets unnecessary for testing
//! the join/replay/presence/dispatch/leave protocol.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use questline::store::{Coordinates, MemStore, NewHunt, NewTeam, NewUser, Store};
use questline::ws::{ChatBody, ClientFrame, HuntChannel, JoinError, ServerFrame, TeamChannel};

async fn setup() -> (Arc<MemStore>, HuntChannel, TeamChannel) {
    let store = Arc::new(MemStore::new());
    let hunts = HuntChannel::new(store.clone());
    let teams = TeamChannel::new(store.clone());
    (store, hunts, teams)
}

async fn add_user(store: &MemStore, username: &str) -> i64 {
    store
        .create_user(NewUser {
            username: username.to_string(),
            name: None,
            profile_picture: None,
        })
        .await
        .unwrap()
        .id
}

async fn add_hunt(store: &MemStore, creator_id: i64) -> i64 {
    store
        .create_hunt(
            NewHunt {
                name: "Quad Dash".to_string(),
                description: "Around the quad".to_string(),
                clues: vec![],
                is_public: None,
                shared_with: None,
            },
            creator_id,
        )
        .await
        .unwrap()
        .id
}

fn pipe() -> (
    mpsc::UnboundedSender<ServerFrame>,
    UnboundedReceiver<ServerFrame>,
) {
    mpsc::unbounded_channel()
}

fn drain(rx: &mut UnboundedReceiver<ServerFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

fn chat(content: &str) -> ClientFrame {
    ClientFrame::ChatMessage {
        message: ChatBody {
            content: content.to_string(),
        },
    }
}

// ============================================================================
// Hunt channel
// ============================================================================

/// A first joiner with no prior messages sees exactly an empty history
/// followed by a player count of one.
#[tokio::test]
async fn test_hunt_join_replays_empty_history_then_count() {
    let (store, hunts, _) = setup().await;
    let user = add_user(&store, "ada").await;

    let (tx, mut rx) = pipe();
    hunts.join(user, 3, tx).await.unwrap();

    match rx.try_recv().unwrap() {
        ServerFrame::ChatHistory { messages } => assert!(messages.is_empty()),
        other => panic!("expected chat_history first, got {other:?}"),
    }
    match rx.try_recv().unwrap() {
        ServerFrame::PlayerCount { count } => assert_eq!(count, 1),
        other => panic!("expected player_count second, got {other:?}"),
    }
    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Joining with an unknown user closes the attempt and registers nothing.
#[tokio::test]
async fn test_hunt_join_rejects_unknown_user() {
    let (_, hunts, _) = setup().await;

    let (tx, _rx) = pipe();
    let err = hunts.join(42, 3, tx).await.unwrap_err();
    assert!(matches!(err, JoinError::UserNotFound));
    assert_eq!(err.to_string(), "User not found");
    assert_eq!(hunts.player_count(3), 0);
}

/// Hunt membership is open: a hunt id with no hunt entity joins fine.
#[tokio::test]
async fn test_hunt_join_allows_unknown_hunt() {
    let (store, hunts, _) = setup().await;
    let user = add_user(&store, "ada").await;

    let (tx, mut rx) = pipe();
    hunts.join(user, 999, tx).await.unwrap();

    assert!(matches!(
        rx.try_recv().unwrap(),
        ServerFrame::ChatHistory { .. }
    ));
    assert_eq!(hunts.player_count(999), 1);
}

/// A chat message is persisted and fanned out to everyone, sender included.
#[tokio::test]
async fn test_hunt_chat_reaches_all_including_sender() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;
    let hunt_id = add_hunt(&store, ada).await;

    let (tx_a, mut rx_a) = pipe();
    let (tx_b, mut rx_b) = pipe();
    let session_a = hunts.join(ada, hunt_id, tx_a).await.unwrap();
    hunts.join(bob, hunt_id, tx_b).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);

    hunts.dispatch(&session_a, chat("hi")).await;

    for rx in [&mut rx_a, &mut rx_b] {
        match rx.try_recv().unwrap() {
            ServerFrame::ChatMessage { message } => {
                assert_eq!(message.sender_id, ada);
                assert_eq!(message.content, "hi");
            }
            other => panic!("expected chat_message, got {other:?}"),
        }
    }

    let stored = store.get_hunt(hunt_id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);
}

/// Replayed history equals the appended messages, in order.
#[tokio::test]
async fn test_hunt_history_replay_preserves_order() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let late = add_user(&store, "late").await;
    let hunt_id = add_hunt(&store, ada).await;

    let (tx_a, mut rx_a) = pipe();
    let session_a = hunts.join(ada, hunt_id, tx_a).await.unwrap();
    drain(&mut rx_a);

    for content in ["one", "two", "three"] {
        hunts.dispatch(&session_a, chat(content)).await;
    }

    let (tx_l, mut rx_l) = pipe();
    hunts.join(late, hunt_id, tx_l).await.unwrap();

    match rx_l.try_recv().unwrap() {
        ServerFrame::ChatHistory { messages } => {
            let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["one", "two", "three"]);
        }
        other => panic!("expected chat_history, got {other:?}"),
    }
}

/// Chat with empty content is dropped: nothing stored, nothing relayed.
#[tokio::test]
async fn test_hunt_empty_chat_dropped() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let hunt_id = add_hunt(&store, ada).await;

    let (tx, mut rx) = pipe();
    let session = hunts.join(ada, hunt_id, tx).await.unwrap();
    drain(&mut rx);

    hunts.dispatch(&session, chat("")).await;

    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    let stored = store.get_hunt(hunt_id).await.unwrap().unwrap();
    assert!(stored.messages.is_empty());
}

/// A failed append (unknown hunt) means no broadcast for that message.
#[tokio::test]
async fn test_hunt_chat_to_unknown_hunt_relays_nothing() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;

    let (tx, mut rx) = pipe();
    let session = hunts.join(ada, 999, tx).await.unwrap();
    drain(&mut rx);

    hunts.dispatch(&session, chat("into the void")).await;
    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Position updates go to every other session, never back to the sender,
/// and carry the join-time team id.
#[tokio::test]
async fn test_hunt_position_relay_excludes_sender() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;
    let hunt_id = add_hunt(&store, ada).await;

    let team = store
        .create_team(
            NewTeam {
                name: "Lovelaces".to_string(),
                code: "LACE".to_string(),
                description: None,
                avatar: None,
            },
            ada,
        )
        .await
        .unwrap();
    store.set_user_team(ada, Some(team.id)).await.unwrap();

    let (tx_a, mut rx_a) = pipe();
    let (tx_b, mut rx_b) = pipe();
    let session_a = hunts.join(ada, hunt_id, tx_a).await.unwrap();
    hunts.join(bob, hunt_id, tx_b).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);

    hunts
        .dispatch(
            &session_a,
            ClientFrame::UpdatePosition {
                position: Coordinates {
                    latitude: 25.494,
                    longitude: 81.866,
                },
                current_clue_index: 2,
                heading: Some(45.0),
            },
        )
        .await;

    match rx_b.try_recv().unwrap() {
        ServerFrame::PlayerPosition {
            user_id,
            position,
            current_clue_index,
            heading,
            team_id,
        } => {
            assert_eq!(user_id, ada);
            assert_eq!(position.latitude, 25.494);
            assert_eq!(current_clue_index, 2);
            assert_eq!(heading, Some(45.0));
            assert_eq!(team_id, Some(team.id));
        }
        other => panic!("expected player_position, got {other:?}"),
    }

    assert_eq!(rx_a.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Unknown frame kinds are ignored without feedback.
#[tokio::test]
async fn test_hunt_unknown_frame_ignored() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;

    let (tx, mut rx) = pipe();
    let session = hunts.join(ada, 3, tx).await.unwrap();
    drain(&mut rx);

    hunts.dispatch(&session, ClientFrame::Unknown).await;
    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Leaving re-announces the shrunken player count to whoever remains.
#[tokio::test]
async fn test_hunt_leave_rebroadcasts_count() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;
    let eve = add_user(&store, "eve").await;

    let (tx_a, mut rx_a) = pipe();
    let (tx_b, mut rx_b) = pipe();
    let (tx_e, mut rx_e) = pipe();
    hunts.join(ada, 3, tx_a).await.unwrap();
    hunts.join(bob, 3, tx_b).await.unwrap();
    let session_e = hunts.join(eve, 3, tx_e).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_e);

    hunts.leave(&session_e);

    for rx in [&mut rx_a, &mut rx_b] {
        match rx.try_recv().unwrap() {
            ServerFrame::PlayerCount { count } => assert_eq!(count, 2),
            other => panic!("expected player_count, got {other:?}"),
        }
    }
    assert_eq!(rx_e.try_recv().unwrap_err(), TryRecvError::Empty);
    assert_eq!(hunts.player_count(3), 2);
}

/// A second connection for the same (user, hunt) replaces the first: the
/// count stays at one slot and the superseded pipe is closed.
#[tokio::test]
async fn test_hunt_duplicate_join_supersedes_old_session() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;

    let (tx1, mut rx1) = pipe();
    let session1 = hunts.join(ada, 3, tx1).await.unwrap();
    assert_eq!(drain(&mut rx1).len(), 2, "history and count");

    let (tx2, mut rx2) = pipe();
    let session2 = hunts.join(ada, 3, tx2).await.unwrap();

    assert_eq!(hunts.player_count(3), 1, "one slot, not two");

    // The new pipe got its own history and a count of one.
    let frames = drain(&mut rx2);
    assert!(matches!(frames[0], ServerFrame::ChatHistory { .. }));
    assert!(matches!(frames[1], ServerFrame::PlayerCount { count: 1 }));

    // The superseded pipe was dropped by the registry.
    assert_eq!(rx1.try_recv().unwrap_err(), TryRecvError::Disconnected);

    // The old connection's teardown cannot evict the replacement.
    hunts.leave(&session1);
    assert_eq!(hunts.player_count(3), 1);

    hunts.leave(&session2);
    assert_eq!(hunts.player_count(3), 0);
}

/// The count delivered after every join matches the registry state.
#[tokio::test]
async fn test_hunt_count_tracks_registry() {
    let (store, hunts, _) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;
    let eve = add_user(&store, "eve").await;

    let (tx_a, mut rx_a) = pipe();
    hunts.join(ada, 3, tx_a).await.unwrap();

    for (n, user) in [(2, bob), (3, eve)] {
        let (tx, _rx) = pipe();
        hunts.join(user, 3, tx).await.unwrap();
        let last = drain(&mut rx_a).pop().unwrap();
        match last {
            ServerFrame::PlayerCount { count } => {
                assert_eq!(count, n);
                assert_eq!(count, hunts.player_count(3));
            }
            other => panic!("expected player_count, got {other:?}"),
        }
    }
}

// ============================================================================
// Team channel
// ============================================================================

/// Team joins authenticate user, team, and membership, in that order.
#[tokio::test]
async fn test_team_join_authentication() {
    let (store, _, teams) = setup().await;

    let (tx, _rx) = pipe();
    let err = teams.join(42, 1, tx).await.unwrap_err();
    assert!(matches!(err, JoinError::UserNotFound));

    let ada = add_user(&store, "ada").await;
    let (tx, _rx) = pipe();
    let err = teams.join(ada, 99, tx).await.unwrap_err();
    assert!(matches!(err, JoinError::TeamNotFound));
    assert_eq!(err.to_string(), "Team not found");

    let team = store
        .create_team(
            NewTeam {
                name: "Lovelaces".to_string(),
                code: "LACE".to_string(),
                description: None,
                avatar: None,
            },
            ada,
        )
        .await
        .unwrap();

    // Both the user and the team exist, but there is no membership.
    let outsider = add_user(&store, "outsider").await;
    let (tx, _rx) = pipe();
    let err = teams.join(outsider, team.id, tx).await.unwrap_err();
    assert!(matches!(err, JoinError::NotTeamMember));
    assert_eq!(err.to_string(), "Not a team member");
    assert_eq!(teams.member_count(team.id), 0);
}

/// Members get history, member counts, and chat fan-out.
#[tokio::test]
async fn test_team_chat_roundtrip() {
    let (store, _, teams) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;

    let team = store
        .create_team(
            NewTeam {
                name: "Lovelaces".to_string(),
                code: "LACE".to_string(),
                description: None,
                avatar: None,
            },
            ada,
        )
        .await
        .unwrap();
    store.add_team_member(team.id, bob, false).await.unwrap();

    let (tx_a, mut rx_a) = pipe();
    let session_a = teams.join(ada, team.id, tx_a).await.unwrap();

    let frames = drain(&mut rx_a);
    assert!(matches!(frames[0], ServerFrame::ChatHistory { .. }));
    assert!(matches!(frames[1], ServerFrame::MemberCount { count: 1 }));

    let (tx_b, mut rx_b) = pipe();
    teams.join(bob, team.id, tx_b).await.unwrap();
    drain(&mut rx_b);
    assert!(matches!(
        drain(&mut rx_a).pop().unwrap(),
        ServerFrame::MemberCount { count: 2 }
    ));

    teams.dispatch(&session_a, chat("go team")).await;

    for rx in [&mut rx_a, &mut rx_b] {
        match rx.try_recv().unwrap() {
            ServerFrame::ChatMessage { message } => {
                assert_eq!(message.sender_id, ada);
                assert_eq!(message.content, "go team");
            }
            other => panic!("expected chat_message, got {other:?}"),
        }
    }

    let stored = store.get_team(team.id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);
}

/// The team protocol has no position frames; they are dropped silently.
#[tokio::test]
async fn test_team_ignores_update_position() {
    let (store, _, teams) = setup().await;
    let ada = add_user(&store, "ada").await;
    let team = store
        .create_team(
            NewTeam {
                name: "Lovelaces".to_string(),
                code: "LACE".to_string(),
                description: None,
                avatar: None,
            },
            ada,
        )
        .await
        .unwrap();

    let (tx, mut rx) = pipe();
    let session = teams.join(ada, team.id, tx).await.unwrap();
    drain(&mut rx);

    teams
        .dispatch(
            &session,
            ClientFrame::UpdatePosition {
                position: Coordinates {
                    latitude: 0.0,
                    longitude: 0.0,
                },
                current_clue_index: 0,
                heading: None,
            },
        )
        .await;

    assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Leaving a team session re-announces the member count.
#[tokio::test]
async fn test_team_leave_rebroadcasts_count() {
    let (store, _, teams) = setup().await;
    let ada = add_user(&store, "ada").await;
    let bob = add_user(&store, "bob").await;
    let team = store
        .create_team(
            NewTeam {
                name: "Lovelaces".to_string(),
                code: "LACE".to_string(),
                description: None,
                avatar: None,
            },
            ada,
        )
        .await
        .unwrap();
    store.add_team_member(team.id, bob, false).await.unwrap();

    let (tx_a, mut rx_a) = pipe();
    let (tx_b, mut rx_b) = pipe();
    teams.join(ada, team.id, tx_a).await.unwrap();
    let session_b = teams.join(bob, team.id, tx_b).await.unwrap();
    drain(&mut rx_a);
    drain(&mut rx_b);

    teams.leave(&session_b);

    assert!(matches!(
        rx_a.try_recv().unwrap(),
        ServerFrame::MemberCount { count: 1 }
    ));
    assert_eq!(teams.member_count(team.id), 1);
}
