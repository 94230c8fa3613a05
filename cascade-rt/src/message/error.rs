//! Wire-level error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors raised while framing or unframing a multipart message.
///
/// A `WireError` never terminates a stream: receivers log it as a warning
/// and keep reading (a malformed message from one peer must not take down
/// a service).
#[derive(Error, Debug)]
pub enum WireError {
    /// The multipart message contained no frames at all.
    #[error("empty multipart message")]
    Empty,

    /// The tag frame does not name a known message kind.
    #[error("unknown message tag {0:?}")]
    UnknownTag(String),

    /// A JSON payload frame could not be parsed into the tagged kind.
    #[error("malformed {tag} payload: {source}")]
    Payload {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The number of payload frames does not match the tagged kind.
    #[error("invalid frame count for {tag}: expected {expected}, got {got}")]
    FrameCount {
        tag: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// A frame that must be text (tag, key, identity) is not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    NonUtf8Frame,

    /// `key` and `address` must either both be present or both be absent
    /// on update and result messages.
    #[error("'key' and 'address' must either both be filled or both be empty")]
    KeyAddressMismatch,
}
