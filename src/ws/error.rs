//! Join-protocol errors.

use thiserror::Error;

/// Reasons a connection attempt is rejected during authentication.
///
/// Fatal to the connection: the socket is closed with a policy-violation
/// code and the `Display` text as the close reason. No retry is attempted
/// server-side; reconnection is entirely a client concern.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Invalid user or hunt ID")]
    InvalidHuntIds,

    #[error("Invalid user or team ID")]
    InvalidTeamIds,

    #[error("User not found")]
    UserNotFound,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Not a team member")]
    NotTeamMember,

    /// Directory lookup failed; the join fails like any other rejection.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
