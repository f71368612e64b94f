//! Error types for the protocol layer.

/// Errors raised while parsing an inbound frame.
///
/// Every variant is a protocol violation: the frame is logged and dropped,
/// and the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was empty or whitespace only.
    #[error("empty command")]
    Empty,

    /// The keyword is not part of the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required field is absent.
    #[error("{command} requires a {field}")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    /// A username or room name contains a reserved character or is empty.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// A field has the wrong shape (e.g. `READY;Room_1;maybe`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
