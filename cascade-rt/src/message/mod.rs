//! Typed control messages and the multipart wire codec.
//!
//! Every control message exchanged between the orchestrator, the data
//! services and the model processes is one of the variants of [`Message`].
//! On the wire a message is a multipart frame sequence: an ASCII tag frame
//! followed by the payload frames for that kind.

mod codec;
mod error;
mod types;

pub use codec::{decode_message, encode_message};
pub use error::WireError;
pub use types::{
    AcknowledgeMessage, ClearDataMessage, DataMessage, ErrorMessage, GetDataMessage, Message,
    ModelMessage, NewTimeMessage, PathMessage, PutDataMessage, QuitMessage, RegistrationMessage,
    ResultMessage, UpdateMessage, UpdateSeriesMessage,
};
