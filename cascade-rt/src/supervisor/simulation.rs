//! The simulation entry point.
//!
//! A `Simulation` is configured once in the embedding binary's `main`:
//! register plugins, apply a scenario config, then call [`Simulation::run`].
//! `run` doubles as the worker dispatcher: when the process was spawned by
//! a supervisor (detected through the environment), it runs the designated
//! service or model instead of supervising, using the same registries the
//! embedder just populated. The embedder exits with the returned code:
//!
//! ```rust,no_run
//! # async fn main_body() -> Result<(), Box<dyn std::error::Error>> {
//! use cascade_rt::supervisor::Simulation;
//!
//! let mut simulation = Simulation::new()?;
//! // simulation.register_model_type("traffic", traffic_factory);
//! // simulation.configure(&scenario)?;
//! let code = simulation.run().await?;
//! std::process::exit(code);
//! # }
//! ```

// Layer 1: Standard library imports
use std::collections::BTreeMap;
use std::io::Write;

// Layer 2: Third-party crate imports
use serde_json::Value;
use tokio::process::Child;
use tracing::{error, info};

// Layer 3: Internal module imports
use super::error::StartupError;
use super::plugins::{ModelFactory, ModelTypeInfo, ServiceFactory, ServiceTypeInfo};
use super::runner::{
    detect_worker_role, settings_from_env, ModelRunner, ServiceRunner, WorkerRole,
};
use crate::message::{ErrorMessage, Message};
use crate::model::{
    run_model_stream, ModelConnector, ServicedInitDataHandler, UpdateDataClient,
};
use crate::orchestrator::Orchestrator;
use crate::services::{InitDataService, UpdateDataService};
use crate::settings::{ScenarioConfig, Settings};
use crate::timeline::TimelineInfo;
use crate::transport::{MessageDealer, MessageRouter};
use crate::util::init_logging;

/// Discovery keys every model worker requires.
const ORCHESTRATOR_SERVICE: &str = "orchestrator";
const INIT_DATA_SERVICE: &str = "init_data";
const UPDATE_DATA_SERVICE: &str = "update_data";

/// Main class for starting a simulation.
///
/// The three core services are pre-registered: the orchestrator (joined on
/// exit, so its status reaches the exit code), and the init-data and
/// update-data services (daemons, torn down when the supervisor exits).
pub struct Simulation {
    settings: Settings,
    service_types: BTreeMap<String, ServiceTypeInfo>,
    model_types: BTreeMap<String, ModelTypeInfo>,
}

impl Simulation {
    /// A simulation with default settings (environment overrides applied)
    /// and the core services registered.
    pub fn new() -> Result<Self, StartupError> {
        Ok(Self::with_settings(Settings::from_env()?))
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut simulation = Self {
            settings,
            service_types: BTreeMap::new(),
            model_types: BTreeMap::new(),
        };
        simulation.register_service(
            ORCHESTRATOR_SERVICE,
            || Box::new(Orchestrator::new()),
            true,
            false,
        );
        simulation.register_service(
            INIT_DATA_SERVICE,
            || Box::new(InitDataService::new()),
            true,
            true,
        );
        simulation.register_service(
            UPDATE_DATA_SERVICE,
            || Box::new(UpdateDataService::new()),
            true,
            true,
        );
        simulation
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Register a service type. Auto-use services take part in every
    /// simulation; the rest must be named under `services` in the scenario.
    pub fn register_service(
        &mut self,
        name: impl Into<String>,
        factory: ServiceFactory,
        auto_use: bool,
        daemon: bool,
    ) {
        let name = name.into();
        self.service_types.insert(
            name.clone(),
            ServiceTypeInfo {
                name,
                factory,
                auto_use,
                daemon,
            },
        );
    }

    /// Register a model type; scenario model entries reference it through
    /// their `type` field.
    pub fn register_model_type(&mut self, name: impl Into<String>, factory: ModelFactory) {
        let name = name.into();
        self.model_types
            .insert(name.clone(), ModelTypeInfo { name, factory });
    }

    /// Configure from a scenario document.
    pub fn configure(&mut self, scenario: &Value) -> Result<(), StartupError> {
        let config = ScenarioConfig::from_value(scenario)?;
        self.settings.apply_scenario_config(&config)?;
        Ok(())
    }

    /// Set timeline information directly (manual configuration).
    pub fn set_timeline_info(&mut self, info: TimelineInfo) {
        self.settings.timeline_info = Some(info);
    }

    /// Run the simulation to completion; the returned code is the process
    /// exit code (0 on success, the maximum child status otherwise).
    pub async fn run(&mut self) -> Result<i32, StartupError> {
        match detect_worker_role() {
            Some(role) => self.run_worker(role).await,
            None => self.run_supervisor().await,
        }
    }

    /// Service names active for this run: every auto-use service plus the
    /// ones the scenario names.
    fn active_service_names(&self) -> Result<Vec<String>, StartupError> {
        let mut names: Vec<String> = self
            .service_types
            .values()
            .filter(|info| info.auto_use)
            .map(|info| info.name.clone())
            .collect();
        for name in &self.settings.service_types {
            if !self.service_types.contains_key(name) {
                return Err(StartupError::UnknownService(name.clone()));
            }
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    /// Model `(name, type)` pairs in declared order, validated against the
    /// registry.
    fn active_models(&self) -> Result<Vec<(String, String)>, StartupError> {
        self.settings
            .models
            .iter()
            .map(|config| {
                let name = config
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StartupError::InvalidConfig("model config without a 'name'".to_owned())
                    })?
                    .to_owned();
                let model_type = config
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        StartupError::InvalidConfig(format!("model '{name}' without a 'type'"))
                    })?
                    .to_owned();
                if !self.model_types.contains_key(&model_type) {
                    return Err(StartupError::UnknownModelType {
                        model: name,
                        model_type,
                    });
                }
                Ok((name, model_type))
            })
            .collect()
    }

    async fn run_supervisor(&mut self) -> Result<i32, StartupError> {
        init_logging(&self.settings);
        let services = self.active_service_names()?;
        let models = self.active_models()?;

        // daemon children are killed when these handles drop at return
        let mut daemons: Vec<(String, Child)> = Vec::new();
        let mut joined: Vec<(String, Child)> = Vec::new();

        for name in services {
            let daemon = self
                .service_types
                .get(&name)
                .map(|info| info.daemon)
                .unwrap_or(true);
            let runner = ServiceRunner {
                name: &name,
                daemon,
                settings: &self.settings,
            };
            let (child, address) = runner.start().await?;
            info!("Service '{name}' running at {address}");
            self.settings.service_discovery.insert(name.clone(), address);
            if daemon {
                daemons.push((name, child));
            } else {
                joined.push((name, child));
            }
        }

        for (name, _model_type) in &models {
            let runner = ModelRunner {
                name,
                settings: &self.settings,
            };
            let child = runner.start().await?;
            joined.push((name.clone(), child));
        }

        let mut exit_code = 0;
        for (name, mut child) in joined {
            let status = child.wait().await?;
            let code = status.code().unwrap_or(1);
            if code != 0 {
                error!("Process '{name}' exited with status {code}");
            }
            exit_code = exit_code.max(code);
        }
        Ok(exit_code)
    }

    async fn run_worker(&mut self, role: WorkerRole) -> Result<i32, StartupError> {
        let mut settings = settings_from_env()?;
        match role {
            WorkerRole::Service(name) => {
                settings.name = name.clone();
                init_logging(&settings);
                let info = self
                    .service_types
                    .get(&name)
                    .ok_or_else(|| StartupError::UnknownService(name.clone()))?;
                let mut service = (info.factory)();
                service.setup(&settings)?;

                let mut router = MessageRouter::bind().await?;
                // the port announcement is the only thing ever written to stdout
                println!("{}", router.port());
                std::io::stdout().flush()?;

                Ok(service.run(&mut router).await?)
            }
            WorkerRole::Model(name) => {
                settings.name = name.clone();
                init_logging(&settings);
                self.run_model_worker(&name, settings).await
            }
        }
    }

    async fn run_model_worker(
        &mut self,
        name: &str,
        settings: Settings,
    ) -> Result<i32, StartupError> {
        let config = settings
            .model_config(name)
            .cloned()
            .ok_or_else(|| {
                StartupError::InvalidConfig(format!("no model config for '{name}'"))
            })?;
        let model_type = config
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StartupError::InvalidConfig(format!("model '{name}' without a 'type'")))?
            .to_owned();
        let info = self.model_types.get(&model_type).ok_or_else(|| {
            StartupError::UnknownModelType {
                model: name.to_owned(),
                model_type: model_type.clone(),
            }
        })?;

        let discovery = &settings.service_discovery;
        let orchestrator_address = discovery
            .get(ORCHESTRATOR_SERVICE)
            .ok_or(StartupError::MissingService(ORCHESTRATOR_SERVICE))?
            .clone();
        let update_data_address = discovery
            .get(UPDATE_DATA_SERVICE)
            .ok_or(StartupError::MissingService(UPDATE_DATA_SERVICE))?
            .clone();
        let init_data_address = discovery
            .get(INIT_DATA_SERVICE)
            .ok_or(StartupError::MissingService(INIT_DATA_SERVICE))?
            .clone();

        let mut socket = MessageDealer::connect(&orchestrator_address, name).await?;
        let linger = crate::model::model_socket_linger();

        let outcome = async {
            let model = (info.factory)(config.clone())?;
            let updates = UpdateDataClient::new(name, update_data_address);
            let init_data = Box::new(ServicedInitDataHandler::new(name, init_data_address));
            let mut connector =
                ModelConnector::new(name, model, updates, init_data, settings)?;
            let result = run_model_stream(&mut connector, &mut socket).await;
            if result.is_err() {
                connector.shutdown_quietly();
            }
            connector.close().await;
            result
        }
        .await;

        match outcome {
            Ok(code) => {
                socket.close(linger).await;
                Ok(code)
            }
            Err(err) => {
                error!("Model '{name}' failed: {err}");
                let _ = socket
                    .send(&Message::Error(ErrorMessage::new(err.to_string())))
                    .await;
                socket.close(linger).await;
                Ok(1)
            }
        }
    }
}
