//! Subprocess spawning for services and model workers.

// Layer 1: Standard library imports
use std::env;
use std::process::Stdio;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::debug;

// Layer 3: Internal module imports
use super::error::StartupError;
use crate::settings::Settings;
use crate::transport::loopback_address;

/// How long a service child may take to announce its bound port.
pub const SERVICE_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const WORKER_ENV: &str = "CASCADE_WORKER";
pub(crate) const WORKER_NAME_ENV: &str = "CASCADE_WORKER_NAME";
pub(crate) const SETTINGS_ENV: &str = "CASCADE_SETTINGS";

/// The role a re-executed child process was spawned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerRole {
    Service(String),
    Model(String),
}

/// Detect whether the current process is a spawned worker.
pub(crate) fn detect_worker_role() -> Option<WorkerRole> {
    let kind = env::var(WORKER_ENV).ok()?;
    let name = env::var(WORKER_NAME_ENV).ok()?;
    match kind.as_str() {
        "service" => Some(WorkerRole::Service(name)),
        "model" => Some(WorkerRole::Model(name)),
        _ => None,
    }
}

/// Deserialize the settings snapshot a worker received from its
/// supervisor, with environment overrides applied on top.
pub(crate) fn settings_from_env() -> Result<Settings, StartupError> {
    let raw = env::var(SETTINGS_ENV).map_err(|_| StartupError::MissingEnv(SETTINGS_ENV))?;
    let mut settings: Settings = serde_json::from_str(&raw)?;
    settings.apply_env_overrides()?;
    Ok(settings)
}

fn worker_command(
    kind: &str,
    name: &str,
    settings: &Settings,
) -> Result<Command, StartupError> {
    let exe = env::current_exe()?;
    let mut command = Command::new(exe);
    command
        .env(WORKER_ENV, kind)
        .env(WORKER_NAME_ENV, name)
        .env(SETTINGS_ENV, serde_json::to_string(settings)?);
    Ok(command)
}

/// Spawns a service subprocess and collects its announced address.
///
/// The child binds a router socket to an ephemeral port and writes the
/// port number as a single line on stdout; everything else the child logs
/// goes to stderr. Missing the announcement window is a startup failure.
pub struct ServiceRunner<'a> {
    pub name: &'a str,
    pub daemon: bool,
    pub settings: &'a Settings,
}

impl ServiceRunner<'_> {
    /// Start the subprocess; returns the child and its service address.
    pub async fn start(&self) -> Result<(Child, String), StartupError> {
        let mut command = worker_command("service", self.name, self.settings)?;
        command
            .stdout(Stdio::piped())
            .kill_on_drop(self.daemon);
        let mut child = command.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StartupError::ServiceExited(self.name.to_owned()))?;

        let mut lines = BufReader::new(stdout).lines();
        let line = timeout(SERVICE_STARTUP_TIMEOUT, lines.next_line())
            .await
            .map_err(|_| StartupError::ServiceStartTimeout(self.name.to_owned()))??
            .ok_or_else(|| StartupError::ServiceExited(self.name.to_owned()))?;
        let port: u16 = line
            .trim()
            .parse()
            .map_err(|_| StartupError::ServiceExited(self.name.to_owned()))?;

        let address = loopback_address(port);
        debug!("Service '{}' announced {address}", self.name);
        Ok((child, address))
    }
}

/// Spawns a model-worker subprocess with the discovery map injected
/// through its settings snapshot.
pub struct ModelRunner<'a> {
    pub name: &'a str,
    pub settings: &'a Settings,
}

impl ModelRunner<'_> {
    pub async fn start(&self) -> Result<Child, StartupError> {
        let mut command = worker_command("model", self.name, self.settings)?;
        // models are joined, never killed; they own their shutdown
        command.kill_on_drop(false);
        let child = command.spawn()?;
        debug!("Model '{}' spawned", self.name);
        Ok(child)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_worker_role() {
        env::remove_var(WORKER_ENV);
        env::remove_var(WORKER_NAME_ENV);
        assert_eq!(detect_worker_role(), None);

        env::set_var(WORKER_ENV, "service");
        env::set_var(WORKER_NAME_ENV, "init_data");
        assert_eq!(
            detect_worker_role(),
            Some(WorkerRole::Service("init_data".to_owned()))
        );

        env::set_var(WORKER_ENV, "model");
        env::set_var(WORKER_NAME_ENV, "model_a");
        assert_eq!(
            detect_worker_role(),
            Some(WorkerRole::Model("model_a".to_owned()))
        );

        env::set_var(WORKER_ENV, "bogus");
        assert_eq!(detect_worker_role(), None);

        env::remove_var(WORKER_ENV);
        env::remove_var(WORKER_NAME_ENV);
    }

    #[test]
    fn test_settings_from_env_requires_payload() {
        env::remove_var(SETTINGS_ENV);
        assert!(matches!(
            settings_from_env(),
            Err(StartupError::MissingEnv(_))
        ));
    }
}
