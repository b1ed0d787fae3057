//! Run mode resolution

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::common::config::HarnessConfig;

/// Whether a run records the baseline or checks against it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Record extracted values into the baseline store
    Master,
    /// Compare extracted values against the baseline store
    Slave,
}

impl Mode {
    /// Map a configured mode token to a mode
    pub fn from_token(token: &str, harness: &HarnessConfig) -> Option<Self> {
        if token == harness.mode_master {
            Some(Self::Master)
        } else if token == harness.mode_slave {
            Some(Self::Slave)
        } else {
            None
        }
    }

    /// Resolve the mode for a run.
    ///
    /// An override naming a configured token wins. Anything else falls back
    /// to detection: OpenRC hosts record, all others verify.
    pub fn resolve(
        requested: Option<&str>,
        harness: &HarnessConfig,
        openrc_marker: &Path,
    ) -> Self {
        if let Some(mode) = requested.and_then(|token| Self::from_token(token, harness)) {
            return mode;
        }
        if let Some(token) = requested {
            tracing::warn!(token, "Unrecognized mode override, detecting from host");
        }

        if openrc_marker.exists() {
            Self::Master
        } else {
            Self::Slave
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("master"),
            Self::Slave => f.write_str("slave"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_override_uses_configured_tokens() {
        let harness = HarnessConfig {
            mode_master: "record".to_string(),
            mode_slave: "check".to_string(),
            ..HarnessConfig::default()
        };
        let dir = tempdir().unwrap();
        let marker = dir.path().join("openrc");

        assert_eq!(Mode::resolve(Some("record"), &harness, &marker), Mode::Master);
        assert_eq!(Mode::resolve(Some("check"), &harness, &marker), Mode::Slave);
        assert_eq!(Mode::from_token("master", &harness), None);
    }

    #[test]
    fn test_detect_from_openrc_marker() {
        let harness = HarnessConfig::default();
        let dir = tempdir().unwrap();
        let marker = dir.path().join("openrc");

        assert_eq!(Mode::resolve(None, &harness, &marker), Mode::Slave);
        assert_eq!(Mode::resolve(Some("bogus"), &harness, &marker), Mode::Slave);

        std::fs::create_dir(&marker).unwrap();
        assert_eq!(Mode::resolve(None, &harness, &marker), Mode::Master);
        assert_eq!(Mode::resolve(Some("slave"), &harness, &marker), Mode::Slave);
    }
}
