//! Error types for the session layer.

use tricard_protocol::Username;

/// Errors that can occur while logging in or tracking presence.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credentials were rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The username is already logged in on another connection.
    #[error("player {0} is already online")]
    AlreadyConnected(Username),

    /// No presence entry exists for the username.
    #[error("player {0} is not online")]
    NotFound(Username),
}
