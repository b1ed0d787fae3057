//! ifprobe - network interface configuration test harness
//!
//! This library runs YAML-described probes against a network interface,
//! records their extracted values as a baseline or verifies them against one.

pub mod cli;
pub mod commands;
pub mod common;
pub mod lifecycle;
pub mod service;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result};
pub use testing::{Mode, Session, SuiteReport};
