//! The explicit plugin registry.
//!
//! Service and model types are registered at program start; the scenario
//! runner validates that every referenced name resolves before any process
//! is spawned. There is no discovery through package metadata: what is not
//! registered does not exist.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use crate::model::{ModelError, SimulationModel};
use crate::services::Service;

/// Constructor for a service instance, invoked inside the service's
/// subprocess.
pub type ServiceFactory = fn() -> Box<dyn Service>;

/// Constructor for a model instance from its scenario config entry,
/// invoked inside the model's subprocess.
pub type ModelFactory = fn(Value) -> Result<Box<dyn SimulationModel>, ModelError>;

/// A registered service type.
#[derive(Clone)]
pub struct ServiceTypeInfo {
    pub name: String,
    pub factory: ServiceFactory,
    /// Auto-use services are part of every simulation without being named
    /// in the scenario config.
    pub auto_use: bool,
    /// Daemon services are fire-and-forget: they are killed when the
    /// supervisor exits. Non-daemon services are joined and contribute
    /// their exit code.
    pub daemon: bool,
}

/// A registered model type.
#[derive(Clone)]
pub struct ModelTypeInfo {
    pub name: String,
    pub factory: ModelFactory,
}

impl std::fmt::Debug for ServiceTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTypeInfo")
            .field("name", &self.name)
            .field("auto_use", &self.auto_use)
            .field("daemon", &self.daemon)
            .finish()
    }
}

impl std::fmt::Debug for ModelTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelTypeInfo")
            .field("name", &self.name)
            .finish()
    }
}
