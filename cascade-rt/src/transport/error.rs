//! Transport-level error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::WireError;

/// Errors raised by the socket layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A send targeted an identity no connected peer has announced.
    #[error("no connected peer with identity '{0}'")]
    UnknownPeer(String),

    #[error("invalid address '{0}': expected tcp://host:port")]
    InvalidAddress(String),
}

/// Errors raised by the request/reply client.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote service answered with an `ERROR` message.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote service answered with a message kind the caller did not
    /// allow for this request.
    #[error("unexpected reply of kind {0}")]
    UnexpectedReply(&'static str),
}
