//! Test execution and verification engine
//!
//! Reads YAML test documents, runs their probes against the interface under
//! test and either records the extracted values as a baseline (master mode)
//! or verifies them against one (slave mode).

mod baseline;
mod config;
mod mode;
mod probe;
mod runner;
mod verify;

pub use baseline::{normalize_key, BaselineStore};
pub use config::*;
pub use mode::Mode;
pub use probe::{ExtractOutcome, ProbeOutcome, ShellRunner};
pub use runner::{run_documents, Session, SuiteReport};
pub use verify::Expectation;
