//! Error types for the harness
//!
//! Environment errors (config file moves, service control) and verification
//! errors are fatal to a document's run. Probe and extraction failures are not
//! errors at all: they are reported through outcome types and absorbed.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Test Document Errors ===
    #[error("Failed to parse test document '{path}': {error}")]
    DocumentParse { path: String, error: String },

    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    // === Interface Config Errors ===
    #[error("Could not back up config file '{path}': {source}")]
    ConfigBackup {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not write candidate config '{path}': {source}")]
    ConfigWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not restore config file '{path}': {source}")]
    ConfigRestore {
        path: String,
        #[source]
        source: io::Error,
    },

    // === Service Control Errors ===
    #[error("No service manager detected (looked for {0})")]
    ServiceManagerNotFound(String),

    #[error("Service client '{0}' not found in PATH")]
    ServiceClientMissing(String),

    #[error("Could not {action} interface {interface}: {reason}")]
    ServiceAction {
        action: String,
        interface: String,
        reason: String,
    },

    // === Verification Errors ===
    #[error("Key '{key}' mismatch: \"{actual}\" != \"{expected}\"")]
    Mismatch {
        key: String,
        actual: String,
        expected: String,
    },

    #[error("Key '{0}' not found in baseline store. Record it with a master run first")]
    BaselineKeyNotFound(String),

    #[error("{failed} of {total} test documents failed")]
    RunFailed { failed: usize, total: usize },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a verification mismatch error
    pub fn mismatch(key: &str, actual: &str, expected: impl ToString) -> Self {
        Self::Mismatch {
            key: key.to_string(),
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create a failed service action error
    pub fn service_action(action: &str, interface: &str, reason: impl ToString) -> Self {
        Self::ServiceAction {
            action: action.to_string(),
            interface: interface.to_string(),
            reason: reason.to_string(),
        }
    }
}
