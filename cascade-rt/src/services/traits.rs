//! The service contract.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use thiserror::Error;

// Layer 3: Internal module imports
use crate::settings::Settings;
use crate::transport::{MessageRouter, TransportError};

/// Errors raised while setting up or running a service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required settings entry is absent.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A service process: configured from settings, then serving its router
/// socket until done.
///
/// The supervisor spawns each service in its own subprocess, binds a router
/// socket for it, and announces the bound port back to the parent before
/// `run` takes over.
#[async_trait]
pub trait Service: Send {
    /// Prepare internal state from the settings snapshot.
    fn setup(&mut self, settings: &Settings) -> Result<(), ServiceError>;

    /// Serve requests until completion; the return value becomes the
    /// process exit code.
    async fn run(&mut self, router: &mut MessageRouter) -> Result<i32, ServiceError>;
}
