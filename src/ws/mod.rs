//! Real-time session layer.
//!
//! Two symmetric broadcast domains share one design: a connection registry
//! keyed by `(userId, scopeId)` holding a live outbound pipe, a join
//! protocol that authenticates the connection, replays history, and
//! announces presence counts, a `type`-tagged frame dispatch, and a leave
//! protocol that deregisters and re-announces. The hunt channel is open to
//! any user; the team channel requires explicit membership. They stay two
//! independent instances of the pattern because those authorization rules
//! differ.

mod error;
mod handler;
mod hunt;
mod registry;
mod team;
mod types;

pub use error::JoinError;
pub use handler::{hunt_ws_handler, team_ws_handler};
pub use hunt::{HuntChannel, HuntSession};
pub use registry::{FramePipe, Registry};
pub use team::{TeamChannel, TeamSession};
pub use types::{ChatBody, ClientFrame, ServerFrame};
