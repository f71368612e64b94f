//! Unified error type for the Tricard server.

use tricard_cards::CardError;
use tricard_protocol::ProtocolError;
use tricard_room::RoomError;
use tricard_session::SessionError;
use tricard_store::StoreError;
use tricard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TricardError {
    /// A card could not be read from its text form.
    #[error(transparent)]
    Card(#[from] CardError),

    /// A frame could not be parsed into a command.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Login or presence failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The match store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room-level error (not found, rejected, stopped).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An environment setting could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Config { key: &'static str, value: String },

    /// The client did not log in in time or closed before logging in.
    #[error("login aborted: {0}")]
    LoginAborted(&'static str),
}
