//! Session registry shared by the hunt and team channels.

use dashmap::DashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::types::ServerFrame;

/// Outbound pipe to one connected client. Sends never block and never
/// yield; delivery to a closed pipe is a swallowed error.
pub type FramePipe = mpsc::UnboundedSender<ServerFrame>;

/// One live session registered against a scope.
#[derive(Debug)]
struct SessionSlot<T> {
    user_id: i64,
    /// Connection serial. A superseded connection's teardown carries its
    /// own serial and therefore cannot evict the slot that replaced it.
    conn: u64,
    pipe: FramePipe,
    data: T,
}

/// Result of registering a session.
#[derive(Debug)]
pub struct Registration {
    /// Serial of the new connection; required to unregister it.
    pub conn: u64,
    /// Pipe of a previous session for the same `(user, scope)` key, if one
    /// was replaced. Dropping it ends that connection's forwarding task.
    pub superseded: Option<FramePipe>,
}

/// Registry of live sessions, keyed by `(userId, scopeId)`.
///
/// One instance per channel type, owned by the channel object and
/// constructed at server start. Sessions within a scope keep insertion
/// order; a duplicate join replaces the slot in place. The join and leave
/// fan-outs run while the scope's session list is exclusively held, so a
/// presence count is always consistent with the registry state it reports
/// and a joining pipe sees its history frame before anything else.
#[derive(Debug)]
pub struct Registry<T> {
    scopes: DashMap<i64, Vec<SessionSlot<T>>>,
    next_conn: AtomicU64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            scopes: DashMap::new(),
            next_conn: AtomicU64::new(1),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and run the join fan-out: `history` is queued on
    /// the new pipe first, then the presence frame built from the updated
    /// session count goes to every session in the scope, the new one
    /// included.
    pub fn register(
        &self,
        scope_id: i64,
        user_id: i64,
        pipe: FramePipe,
        data: T,
        history: ServerFrame,
        presence: impl FnOnce(usize) -> ServerFrame,
    ) -> Registration {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.scopes.entry(scope_id).or_default();

        let _ = pipe.send(history);

        let slot = SessionSlot {
            user_id,
            conn,
            pipe,
            data,
        };
        let superseded = match sessions.iter().position(|s| s.user_id == user_id) {
            Some(idx) => Some(mem::replace(&mut sessions[idx], slot).pipe),
            None => {
                sessions.push(slot);
                None
            }
        };

        let frame = presence(sessions.len());
        for session in sessions.iter() {
            let _ = session.pipe.send(frame.clone());
        }

        Registration { conn, superseded }
    }

    /// Remove a session and announce the new presence count to the
    /// remaining sessions in the scope. Idempotent; a stale serial (a
    /// connection that was superseded earlier) removes nothing.
    pub fn unregister(
        &self,
        scope_id: i64,
        user_id: i64,
        conn: u64,
        presence: impl FnOnce(usize) -> ServerFrame,
    ) -> bool {
        let emptied = {
            let Some(mut sessions) = self.scopes.get_mut(&scope_id) else {
                return false;
            };
            let Some(idx) = sessions
                .iter()
                .position(|s| s.user_id == user_id && s.conn == conn)
            else {
                return false;
            };
            sessions.remove(idx);

            let frame = presence(sessions.len());
            for session in sessions.iter() {
                let _ = session.pipe.send(frame.clone());
            }
            sessions.is_empty()
        };

        if emptied {
            self.scopes.remove_if(&scope_id, |_, sessions| sessions.is_empty());
        }
        true
    }

    /// Deliver a frame to every session in the scope.
    pub fn broadcast(&self, scope_id: i64, frame: ServerFrame) {
        if let Some(sessions) = self.scopes.get(&scope_id) {
            for session in sessions.iter() {
                let _ = session.pipe.send(frame.clone());
            }
        }
    }

    /// Deliver a frame to every session in the scope except the sender's.
    pub fn broadcast_others(&self, scope_id: i64, sender_id: i64, frame: ServerFrame) {
        if let Some(sessions) = self.scopes.get(&scope_id) {
            for session in sessions.iter().filter(|s| s.user_id != sender_id) {
                let _ = session.pipe.send(frame.clone());
            }
        }
    }

    /// Number of live sessions in the scope.
    pub fn session_count(&self, scope_id: i64) -> usize {
        self.scopes.get(&scope_id).map_or(0, |sessions| sessions.len())
    }

    /// Mutate the per-session data of one registered session.
    pub fn update_session<R>(
        &self,
        scope_id: i64,
        user_id: i64,
        conn: u64,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut sessions = self.scopes.get_mut(&scope_id)?;
        let slot = sessions
            .iter_mut()
            .find(|s| s.user_id == user_id && s.conn == conn)?;
        Some(f(&mut slot.data))
    }
}
