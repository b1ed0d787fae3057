//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Harness behaviour: mode tokens, config file locations, timings
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Baseline store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Service manager settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Template variables substituted as `$$NAME$$`
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

/// Harness settings
#[derive(Debug, Deserialize)]
pub struct HarnessConfig {
    /// Token naming master mode
    #[serde(default = "default_mode_master")]
    pub mode_master: String,

    /// Token naming slave mode
    #[serde(default = "default_mode_slave")]
    pub mode_slave: String,

    /// Environment variable holding the mode override
    #[serde(default = "default_mode_env")]
    pub mode_env: String,

    /// Active interface configuration file
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    /// Where the active configuration is parked during a run
    #[serde(default = "default_config_file_backup")]
    pub config_file_backup: PathBuf,

    /// Seconds to let the interface settle after a restart
    #[serde(default = "default_delay")]
    pub delay_secs: f64,

    /// Upper bound in seconds for every probe and extractor
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,

    /// Directory `net_config` paths are resolved against.
    /// Defaults to the directory of the test document.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode_master: default_mode_master(),
            mode_slave: default_mode_slave(),
            mode_env: default_mode_env(),
            config_file: default_config_file(),
            config_file_backup: default_config_file_backup(),
            delay_secs: default_delay(),
            timeout_secs: default_timeout(),
            base_dir: None,
        }
    }
}

impl HarnessConfig {
    /// Settle delay. Values [`Config::validate`] would reject fall back to the default.
    pub fn delay(&self) -> Duration {
        seconds(self.delay_secs).unwrap_or_else(|| Duration::from_secs_f64(default_delay()))
    }

    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_secs)
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_timeout()))
    }
}

/// A non-negative duration, or `None` for NaN, infinite, negative or out-of-range values
fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

fn default_mode_master() -> String {
    "master".to_string()
}
fn default_mode_slave() -> String {
    "slave".to_string()
}
fn default_mode_env() -> String {
    "MODE".to_string()
}
fn default_config_file() -> PathBuf {
    PathBuf::from("/etc/conf.d/net")
}
fn default_config_file_backup() -> PathBuf {
    PathBuf::from("/etc/conf.d/net.bak")
}
fn default_delay() -> f64 {
    5.0
}
fn default_timeout() -> f64 {
    10.0
}

/// Baseline store configuration
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Path of the key/value baseline file
    #[serde(default = "default_keystore")]
    pub keystore: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keystore: default_keystore(),
        }
    }
}

fn default_keystore() -> PathBuf {
    PathBuf::from("keystore")
}

/// Which service manager drives the interface
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceManagerKind {
    /// Detect from marker paths
    #[default]
    Auto,
    /// OpenRC (`rc-service net.<iface>`)
    Openrc,
    /// systemd (`systemctl <action> net@<iface>`)
    Systemd,
    /// Skip service calls entirely
    None,
}

/// Service manager configuration
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub manager: ServiceManagerKind,

    /// Path whose presence means OpenRC is running
    #[serde(default = "default_openrc_marker")]
    pub openrc_marker: PathBuf,

    /// Path whose presence means systemd is running
    #[serde(default = "default_systemd_marker")]
    pub systemd_marker: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            manager: ServiceManagerKind::default(),
            openrc_marker: default_openrc_marker(),
            systemd_marker: default_systemd_marker(),
        }
    }
}

fn default_openrc_marker() -> PathBuf {
    PathBuf::from(super::paths::OPENRC_MARKER)
}
fn default_systemd_marker() -> PathBuf {
    PathBuf::from(super::paths::SYSTEMD_MARKER)
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path; the file must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make mode resolution or timing ambiguous
    pub fn validate(&self) -> Result<()> {
        let harness = &self.harness;
        if harness.mode_master.is_empty() || harness.mode_master == harness.mode_slave {
            return Err(super::Error::Config(format!(
                "mode tokens must be distinct and non-empty (master '{}', slave '{}')",
                harness.mode_master, harness.mode_slave
            )));
        }
        if seconds(harness.delay_secs).is_none() {
            return Err(super::Error::Config(format!(
                "delay_secs must be a finite, non-negative number of seconds, got {}",
                harness.delay_secs
            )));
        }
        if !seconds(harness.timeout_secs).is_some_and(|d| !d.is_zero()) {
            return Err(super::Error::Config(format!(
                "timeout_secs must be a finite, positive number of seconds, got {}",
                harness.timeout_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.harness.mode_master, "master");
        assert_eq!(config.harness.mode_slave, "slave");
        assert_eq!(config.harness.mode_env, "MODE");
        assert_eq!(config.harness.timeout(), Duration::from_secs(10));
        assert_eq!(config.service.manager, ServiceManagerKind::Auto);
        assert!(config.specs.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [harness]
            mode_master = "record"
            mode_slave = "check"
            delay_secs = 0.5
            timeout_secs = 1.5
            config_file = "/tmp/net"
            config_file_backup = "/tmp/net.orig"

            [store]
            keystore = "/var/lib/ifprobe/keystore"

            [service]
            manager = "none"

            [specs]
            iface = "eth0"
            ADDR = "10.0.0.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.harness.mode_master, "record");
        assert_eq!(config.harness.delay(), Duration::from_millis(500));
        assert_eq!(config.harness.timeout(), Duration::from_millis(1500));
        assert_eq!(config.store.keystore, PathBuf::from("/var/lib/ifprobe/keystore"));
        assert_eq!(config.service.manager, ServiceManagerKind::None);
        assert_eq!(config.specs.get("iface").map(String::as_str), Some("eth0"));
    }

    #[test]
    fn test_same_mode_tokens_rejected() {
        let err = Config::parse("[harness]\nmode_master = \"x\"\nmode_slave = \"x\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::parse("[harness]\ntimeout_secs = 0.0").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_unbounded_timings_rejected() {
        for field in ["delay_secs", "timeout_secs"] {
            for value in ["inf", "1e30", "-1.0", "nan"] {
                let err = Config::parse(&format!("[harness]\n{field} = {value}")).unwrap_err();
                assert!(
                    matches!(err, crate::Error::Config(_)),
                    "{field} = {value} accepted"
                );
            }
        }
    }

    #[test]
    fn test_unvalidated_timings_do_not_panic() {
        let harness = HarnessConfig {
            delay_secs: f64::INFINITY,
            timeout_secs: 1e30,
            ..HarnessConfig::default()
        };
        assert_eq!(harness.delay(), Duration::from_secs(5));
        assert_eq!(harness.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = Config::parse("[service]\nmanager = \"upstart\"").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
