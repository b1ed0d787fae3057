//! Interface service control
//!
//! Starts, stops and restarts a network interface through the host's init
//! system. OpenRC manages interfaces as `net.<iface>` services, the systemd
//! setup as `net@<iface>` template units.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::common::config::{ServiceConfig, ServiceManagerKind};
use crate::common::{Error, Result};

/// Lifecycle action applied to an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can drive an interface through its lifecycle
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn apply(&self, interface: &str, action: ServiceAction) -> Result<()>;
}

/// Init system running on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    OpenRc,
    Systemd,
}

impl InitSystem {
    /// Detect the init system from its marker paths. OpenRC wins if both exist.
    pub fn detect(openrc_marker: &Path, systemd_marker: &Path) -> Option<Self> {
        if openrc_marker.exists() {
            Some(Self::OpenRc)
        } else if systemd_marker.exists() {
            Some(Self::Systemd)
        } else {
            None
        }
    }

    pub fn client(&self) -> &'static str {
        match self {
            Self::OpenRc => "rc-service",
            Self::Systemd => "systemctl",
        }
    }

    /// Arguments passed to the client for `action` on `interface`
    pub fn args(&self, interface: &str, action: ServiceAction) -> Vec<String> {
        match self {
            Self::OpenRc => vec![format!("net.{}", interface), action.to_string()],
            Self::Systemd => vec![action.to_string(), format!("net@{}", interface)],
        }
    }
}

#[async_trait]
impl ServiceControl for InitSystem {
    async fn apply(&self, interface: &str, action: ServiceAction) -> Result<()> {
        let client = which::which(self.client())
            .map_err(|_| Error::ServiceClientMissing(self.client().to_string()))?;
        let args = self.args(interface, action);

        tracing::info!("{} {}", self.client(), args.join(" "));

        let status = Command::new(&client)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::service_action(action.as_str(), interface, e))?;

        if !status.success() {
            return Err(Error::service_action(
                action.as_str(),
                interface,
                format!("{} exited with code {:?}", self.client(), status.code()),
            ));
        }
        Ok(())
    }
}

/// Service control that only logs; for hosts where the harness must not
/// touch the interface
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopService;

#[async_trait]
impl ServiceControl for NoopService {
    async fn apply(&self, interface: &str, action: ServiceAction) -> Result<()> {
        tracing::info!(interface, %action, "Service manager disabled, skipping");
        Ok(())
    }
}

/// Build the service controller selected by the configuration
pub fn from_config(config: &ServiceConfig) -> Result<Box<dyn ServiceControl>> {
    match config.manager {
        ServiceManagerKind::Openrc => Ok(Box::new(InitSystem::OpenRc)),
        ServiceManagerKind::Systemd => Ok(Box::new(InitSystem::Systemd)),
        ServiceManagerKind::None => Ok(Box::new(NoopService)),
        ServiceManagerKind::Auto => {
            match InitSystem::detect(&config.openrc_marker, &config.systemd_marker) {
                Some(init) => {
                    tracing::debug!(?init, "Detected init system");
                    Ok(Box::new(init))
                }
                None => Err(Error::ServiceManagerNotFound(format!(
                    "{} and {}",
                    config.openrc_marker.display(),
                    config.systemd_marker.display()
                ))),
            }
        }
    }
}
