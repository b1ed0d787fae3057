//! CLI command handling
//!
//! Builds the harness components from the configuration and dispatches
//! commands to them.

use colored::Colorize;

use crate::commands::{BaselineCommands, Commands};
use crate::common::{Config, Error, Result};
use crate::service;
use crate::testing::{
    normalize_key, run_documents, BaselineStore, Mode, Session, SuiteReport,
};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config, verbose: bool) -> Result<()> {
    match command {
        Commands::Run {
            documents,
            mode,
            keep_going,
            json,
        } => {
            let requested = mode.or_else(|| std::env::var(&config.harness.mode_env).ok());
            let mode = Mode::resolve(
                requested.as_deref(),
                &config.harness,
                &config.service.openrc_marker,
            );
            tracing::info!(%mode, documents = documents.len(), "Starting run");

            let service = service::from_config(&config.service)?;
            let session = Session::new(&config, &*service, mode)
                .verbose(verbose)
                .progress_to_stderr(json);
            let reports = run_documents(&session, &documents, keep_going).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }

            run_status(&reports, documents.len())
        }

        Commands::Baseline(BaselineCommands::Get { suite, test, key }) => {
            let store = BaselineStore::new(&config.store.keystore);
            let store_key = normalize_key(&[suite, test, key]);
            let value = store.fetch(&store_key)?;
            println!("{}", value);
            Ok(())
        }

        Commands::Baseline(BaselineCommands::List) => {
            let store = BaselineStore::new(&config.store.keystore);
            let entries = store.entries()?;
            if entries.is_empty() {
                println!("No baseline records in {}", store.path().display());
            }
            for (key, value) in entries {
                println!("{} = {}", key.cyan(), value);
            }
            Ok(())
        }

        Commands::Normalize { parts } => {
            println!("{}", normalize_key(&parts));
            Ok(())
        }
    }
}

/// Exit status of a run over `total` documents.
///
/// Documents skipped after a fail-fast stop have no report and count as failed.
fn run_status(reports: &[SuiteReport], total: usize) -> Result<()> {
    let passed = reports.iter().filter(|r| r.passed).count();
    if passed == total {
        Ok(())
    } else {
        Err(Error::RunFailed {
            failed: total - passed,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, passed: bool) -> SuiteReport {
        let err = Error::BaselineKeyNotFound(format!("{name}_test_key"));
        SuiteReport {
            passed,
            error: (!passed).then(|| err.to_string()),
            ..SuiteReport::failed(name, Mode::Slave, &err)
        }
    }

    #[test]
    fn test_run_status_all_passed() {
        let reports = vec![report("a", true), report("b", true)];
        assert!(run_status(&reports, 2).is_ok());
    }

    #[test]
    fn test_run_status_counts_failed_report() {
        let reports = vec![report("a", true), report("b", false)];
        let err = run_status(&reports, 2).unwrap_err();
        assert!(matches!(err, Error::RunFailed { failed: 1, total: 2 }));
    }

    #[test]
    fn test_run_status_counts_documents_skipped_after_stop() {
        // First document failed and the remaining two never ran
        let reports = vec![report("a", false)];
        let err = run_status(&reports, 3).unwrap_err();
        assert!(matches!(err, Error::RunFailed { failed: 3, total: 3 }));
        assert_eq!(err.to_string(), "3 of 3 test documents failed");
    }

    #[test]
    fn test_run_status_empty_run_passes() {
        assert!(run_status(&[], 0).is_ok());
    }
}
