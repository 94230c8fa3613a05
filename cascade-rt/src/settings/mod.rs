//! Runtime settings, scenario configuration and environment overrides.

mod config;

pub use config::{
    ScenarioConfig, Settings, SettingsError, SimulationInfo, StorageMode, ENV_PREFIX,
};
