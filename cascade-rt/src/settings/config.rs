//! The settings object shared by the supervisor, services and models.
//!
//! Settings are plain values passed down constructors; subprocesses receive
//! a serialized snapshot instead of inheriting process state. Recognized
//! environment variables (prefix `MOVICI_`) override programmatic values.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Layer 3: Internal module imports
use crate::timeline::TimelineInfo;

/// Prefix for recognized environment variables.
pub const ENV_PREFIX: &str = "MOVICI_";

/// Errors raised while applying configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid scenario config: {0}")]
    InvalidScenario(String),

    #[error("unrecognized storage mode '{0}': expected 'api' or 'disk'")]
    InvalidStorage(String),
}

/// Where collected artifacts go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Api,
    #[default]
    Disk,
}

impl StorageMode {
    fn parse(raw: &str) -> Result<Self, SettingsError> {
        match raw {
            "api" => Ok(StorageMode::Api),
            "disk" => Ok(StorageMode::Disk),
            other => Err(SettingsError::InvalidStorage(other.to_owned())),
        }
    }
}

/// The `simulation_info` block of a scenario config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInfo {
    #[serde(default = "default_mode")]
    pub mode: String,
    pub start_time: i64,
    pub time_scale: f64,
    pub reference_time: f64,
    pub duration: i64,
}

fn default_mode() -> String {
    "time_oriented".to_owned()
}

/// A scenario configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub simulation_info: Option<SimulationInfo>,
    #[serde(default)]
    pub models: Vec<Value>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Value>,
}

impl ScenarioConfig {
    pub fn from_value(value: &Value) -> Result<Self, SettingsError> {
        serde_json::from_value(value.clone())
            .map_err(|error| SettingsError::InvalidScenario(error.to_string()))
    }
}

/// Settings consumed throughout the runtime.
///
/// `service_discovery` maps service names to their bound addresses; the
/// supervisor fills it while starting services and injects the result into
/// every model subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub name: String,
    pub timeline_info: Option<TimelineInfo>,
    pub models: Vec<Value>,
    pub model_names: Vec<String>,
    pub service_types: Vec<String>,
    pub datasets: Vec<Value>,
    pub log_level: String,
    pub log_format: String,
    pub data_dir: PathBuf,
    pub storage: StorageMode,
    pub storage_dir: Option<PathBuf>,
    pub temp_dir: PathBuf,
    pub service_discovery: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            timeline_info: None,
            models: Vec::new(),
            model_names: Vec::new(),
            service_types: Vec::new(),
            datasets: Vec::new(),
            log_level: "INFO".to_owned(),
            log_format: "full".to_owned(),
            data_dir: PathBuf::from("."),
            storage: StorageMode::default(),
            storage_dir: None,
            temp_dir: env::temp_dir(),
            service_discovery: HashMap::new(),
        }
    }
}

impl Settings {
    /// Default settings with environment overrides applied.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Absorb a scenario configuration: timeline (in `time_oriented` mode),
    /// model configs with their declared order, extra services and dataset
    /// descriptors.
    pub fn apply_scenario_config(&mut self, config: &ScenarioConfig) -> Result<(), SettingsError> {
        if let Some(info) = &config.simulation_info {
            if info.mode == "time_oriented" {
                self.timeline_info = Some(TimelineInfo::new(
                    info.reference_time,
                    info.time_scale,
                    info.start_time,
                    info.duration,
                ));
            }
        }
        self.model_names = config
            .models
            .iter()
            .map(|model| {
                model
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        SettingsError::InvalidScenario(
                            "every model config requires a 'name'".to_owned(),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.models = config.models.clone();
        self.service_types = config.services.clone();
        self.datasets = config.datasets.clone();
        Ok(())
    }

    /// Apply the recognized `MOVICI_*` environment variables on top of the
    /// current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        if let Some(level) = env_option("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = env_option("LOG_FORMAT") {
            self.log_format = format;
        }
        if let Some(dir) = env_option("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_option("STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = env_option("TEMP_DIR") {
            self.temp_dir = PathBuf::from(dir);
        }
        if let Some(storage) = env_option("STORAGE") {
            self.storage = StorageMode::parse(&storage)?;
        }
        Ok(())
    }

    /// The model config entry with the given name, if present.
    pub fn model_config(&self, name: &str) -> Option<&Value> {
        self.models
            .iter()
            .find(|model| model.get("name").and_then(Value::as_str) == Some(name))
    }
}

fn env_option(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}
