//! The model-side adapter.
//!
//! Runs inside each model subprocess: translates incoming orchestrator
//! messages into model lifecycle callbacks, fetches subscribed update
//! payloads from the update-data broker, and publishes produced results
//! back to it.

mod clients;
mod connector;
mod error;
mod init_data;
mod traits;

pub use clients::{InitDataClient, UpdateDataClient};
pub use connector::{run_model_stream, LoopOutcome, ModelConnector};
pub(crate) use connector::model_socket_linger;
pub use error::ModelError;
pub use init_data::{DirectoryInitDataHandler, FileType, InitDataHandler, ServicedInitDataHandler};
pub use traits::{InitializeResult, ModelSetup, SimulationModel};
