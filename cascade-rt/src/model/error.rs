//! Model-side error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::init_data::FileType;
use crate::transport::{RequestError, TransportError};

/// Errors raised inside a model subprocess.
///
/// Any of these reaching the stream loop is fatal for the model: an
/// `ERROR` message is sent to the orchestrator and the process exits with
/// status 1.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The init-data server does not know the requested dataset.
    #[error("error retrieving dataset '{0}': not found")]
    DatasetNotFound(String),

    /// A dataset resolved to a file of the wrong type.
    #[error("error retrieving dataset '{name}': expected {expected:?}, got {actual:?}")]
    WrongFileType {
        name: String,
        expected: FileType,
        actual: FileType,
    },

    /// The simulation progressed past its start while the model still
    /// misses required initialization data.
    #[error(
        "model called with timestamp > 0 while initialized: {initialized}, ready for updates: {ready}"
    )]
    NotReadyPastStart { initialized: bool, ready: bool },

    /// The orchestrator sent a message kind the adapter does not handle.
    #[error("unknown message {0}")]
    UnexpectedMessage(&'static str),

    /// The model requires timeline information that the settings lack.
    #[error("missing timeline info in settings")]
    MissingTimelineInfo,

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A failure raised by the model implementation itself.
    #[error("{0}")]
    Failure(String),
}

impl ModelError {
    /// A model-defined failure with the given detail.
    pub fn failure(detail: impl Into<String>) -> Self {
        ModelError::Failure(detail.into())
    }
}
