//! Startup and supervision error types.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::model::ModelError;
use crate::services::ServiceError;
use crate::settings::SettingsError;
use crate::transport::TransportError;

/// Errors that abort a simulation before (or while) it is brought up.
#[derive(Error, Debug)]
pub enum StartupError {
    /// A scenario names a service type that was never registered.
    #[error("unknown service '{0}'")]
    UnknownService(String),

    /// A scenario names a model type that was never registered.
    #[error("unknown model type '{model_type}' for model '{model}'")]
    UnknownModelType { model: String, model_type: String },

    /// A service did not announce its port within the startup timeout.
    #[error("service '{0}' failed to start in time")]
    ServiceStartTimeout(String),

    /// A service exited before announcing its port.
    #[error("service '{0}' exited before announcing its port")]
    ServiceExited(String),

    /// A model worker misses a required service-discovery entry.
    #[error("missing '{0}' in service discovery")]
    MissingService(&'static str),

    /// A worker subprocess was launched without its environment payload.
    #[error("missing environment payload {0}")]
    MissingEnv(&'static str),

    #[error("invalid scenario config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("failed to serialize startup state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
