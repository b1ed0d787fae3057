//! Interface lifecycle controller
//!
//! Swaps the candidate config in, restarts the interface and lets it settle,
//! then puts the original config back and stops the interface. Only the
//! backup step is allowed to fail without a matching restore.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::common::config::HarnessConfig;
use crate::common::{substitute_vars, Error, Result};
use crate::service::{ServiceAction, ServiceControl};

/// Record of what the backup step did, consumed by [`Lifecycle::finalize`]
#[derive(Debug)]
#[must_use = "the backup must be handed back to finalize"]
pub struct Backup {
    /// Whether an active config existed and was moved aside
    parked: bool,
}

/// Drives one interface through a test run
pub struct Lifecycle<'a> {
    harness: &'a HarnessConfig,
    specs: &'a BTreeMap<String, String>,
    service: &'a dyn ServiceControl,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        harness: &'a HarnessConfig,
        specs: &'a BTreeMap<String, String>,
        service: &'a dyn ServiceControl,
    ) -> Self {
        Self {
            harness,
            specs,
            service,
        }
    }

    /// Move the active config aside, if there is one
    pub fn backup(&self) -> Result<Backup> {
        let config = &self.harness.config_file;
        let backup = &self.harness.config_file_backup;
        if !config.is_file() {
            tracing::debug!(path = %config.display(), "No active config to back up");
            return Ok(Backup { parked: false });
        }

        move_file(config, backup).map_err(|source| Error::ConfigBackup {
            path: config.display().to_string(),
            source,
        })?;
        Ok(Backup { parked: true })
    }

    /// Render the candidate template and write it as the active config
    pub fn install_candidate(&self, template: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(template).map_err(|e| Error::FileRead {
            path: template.display().to_string(),
            error: e.to_string(),
        })?;
        let rendered = substitute_vars(&raw, self.specs);

        let config = &self.harness.config_file;
        std::fs::write(config, rendered).map_err(|source| Error::ConfigWrite {
            path: config.display().to_string(),
            source,
        })?;
        tracing::debug!(
            template = %template.display(),
            config = %config.display(),
            "Installed candidate config"
        );
        Ok(())
    }

    /// Restart the interface and wait for it to settle
    pub async fn restart(&self, interface: &str) -> Result<()> {
        self.service.apply(interface, ServiceAction::Restart).await?;

        let delay = self.harness.delay();
        tracing::debug!(?delay, "Waiting for interface to settle");
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Put the original config back and stop the interface
    pub async fn finalize(&self, backup: Backup, interface: &str) -> Result<()> {
        let config = &self.harness.config_file;
        tracing::debug!(path = %config.display(), parked = backup.parked, "Restoring config");

        let restored = if backup.parked {
            move_file(&self.harness.config_file_backup, config)
        } else {
            remove_if_exists(config)
        };
        restored.map_err(|source| Error::ConfigRestore {
            path: config.display().to_string(),
            source,
        })?;

        self.service.apply(interface, ServiceAction::Stop).await
    }
}

/// Rename, falling back to copy and remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if from.is_file() => {
            tracing::debug!("rename {} failed ({}), copying", from.display(), e);
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::NoopService;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn harness(dir: &Path) -> HarnessConfig {
        HarnessConfig {
            config_file: dir.join("net"),
            config_file_backup: dir.join("net.bak"),
            delay_secs: 0.0,
            ..HarnessConfig::default()
        }
    }

    fn specs() -> BTreeMap<String, String> {
        let mut specs = BTreeMap::new();
        specs.insert("iface".to_string(), "eth0".to_string());
        specs
    }

    fn write_template(dir: &Path) -> PathBuf {
        let template = dir.join("candidate.conf");
        std::fs::write(&template, "config_$$IFACE$$=\"dhcp\"\n").unwrap();
        template
    }

    #[tokio::test]
    async fn test_swap_and_restore_existing_config() {
        let dir = tempdir().unwrap();
        let harness = harness(dir.path());
        let specs = specs();
        std::fs::write(&harness.config_file, "original\n").unwrap();

        let lifecycle = Lifecycle::new(&harness, &specs, &NoopService);
        let backup = lifecycle.backup().unwrap();
        assert!(!harness.config_file.exists());
        assert_eq!(
            std::fs::read_to_string(&harness.config_file_backup).unwrap(),
            "original\n"
        );

        lifecycle.install_candidate(&write_template(dir.path())).unwrap();
        assert_eq!(
            std::fs::read_to_string(&harness.config_file).unwrap(),
            "config_eth0=\"dhcp\"\n"
        );

        lifecycle.restart("eth0").await.unwrap();
        lifecycle.finalize(backup, "eth0").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&harness.config_file).unwrap(),
            "original\n"
        );
        assert!(!harness.config_file_backup.exists());
    }

    #[tokio::test]
    async fn test_finalize_without_original_removes_candidate() {
        let dir = tempdir().unwrap();
        let harness = harness(dir.path());
        let specs = specs();

        let lifecycle = Lifecycle::new(&harness, &specs, &NoopService);
        let backup = lifecycle.backup().unwrap();
        lifecycle.install_candidate(&write_template(dir.path())).unwrap();
        assert!(harness.config_file.exists());

        lifecycle.finalize(backup, "eth0").await.unwrap();
        assert!(!harness.config_file.exists());
    }

    #[tokio::test]
    async fn test_missing_backup_fails_restore() {
        let dir = tempdir().unwrap();
        let harness = harness(dir.path());
        let specs = specs();
        std::fs::write(&harness.config_file, "original\n").unwrap();

        let lifecycle = Lifecycle::new(&harness, &specs, &NoopService);
        let backup = lifecycle.backup().unwrap();
        std::fs::remove_file(&harness.config_file_backup).unwrap();

        let err = lifecycle.finalize(backup, "eth0").await.unwrap_err();
        assert!(matches!(err, Error::ConfigRestore { .. }));
    }

    #[test]
    fn test_backup_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let mut harness = harness(dir.path());
        harness.config_file_backup = dir.path().join("missing").join("net.bak");
        let specs = specs();
        std::fs::write(&harness.config_file, "original\n").unwrap();

        let lifecycle = Lifecycle::new(&harness, &specs, &NoopService);
        let err = lifecycle.backup().unwrap_err();
        assert!(matches!(err, Error::ConfigBackup { .. }));
        assert!(harness.config_file.exists());
    }
}
