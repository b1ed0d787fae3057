//! Test runner implementation
//!
//! Runs one test document: swaps the candidate config in, runs every probe,
//! extracts its keys and records or verifies them, then restores the host.
//! The first verification failure ends the document.

use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::common::{Config, Error, Result};
use crate::lifecycle::Lifecycle;
use crate::service::ServiceControl;

use super::baseline::{normalize_key, BaselineStore};
use super::config::{KeySpec, TestCase, TestSuite};
use super::mode::Mode;
use super::probe::{ExtractOutcome, ProbeOutcome, ShellRunner};
use super::verify::Expectation;

/// Result of running one test document
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub mode: Mode,
    pub passed: bool,
    pub tests_run: usize,
    pub tests_skipped: usize,
    pub keys_recorded: usize,
    pub keys_verified: usize,
    pub keys_skipped: usize,
    pub error: Option<String>,
}

impl SuiteReport {
    fn new(name: &str, mode: Mode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            passed: false,
            tests_run: 0,
            tests_skipped: 0,
            keys_recorded: 0,
            keys_verified: 0,
            keys_skipped: 0,
            error: None,
        }
    }

    /// Report for a document that failed before producing any counts
    pub fn failed(name: &str, mode: Mode, error: &Error) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(name, mode)
        }
    }
}

/// Executes test documents in a fixed mode
pub struct Session<'a> {
    config: &'a Config,
    service: &'a dyn ServiceControl,
    store: BaselineStore,
    shell: ShellRunner,
    mode: Mode,
    /// Print progress on stderr, leaving stdout to machine-readable output
    progress_to_stderr: bool,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a Config, service: &'a dyn ServiceControl, mode: Mode) -> Self {
        Self {
            config,
            service,
            store: BaselineStore::new(&config.store.keystore),
            shell: ShellRunner::new(config.harness.timeout()),
            mode,
            progress_to_stderr: false,
        }
    }

    /// Show probe and extractor stderr
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.shell = self.shell.show_stderr(verbose);
        self
    }

    pub fn progress_to_stderr(mut self, stderr: bool) -> Self {
        self.progress_to_stderr = stderr;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn say(&self, line: impl fmt::Display) {
        if self.progress_to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    /// Load a test document from a YAML file and run it
    pub async fn run_document(&self, path: &Path) -> Result<SuiteReport> {
        let (report, result) = self.execute_document(path).await;
        result.map(|()| report)
    }

    /// Run a document, keeping its report whether or not it passed.
    ///
    /// A document that cannot be loaded is reported under its path.
    pub async fn execute_document(&self, path: &Path) -> (SuiteReport, Result<()>) {
        let suite = match TestSuite::load(path, self.config) {
            Ok(suite) => suite,
            Err(e) => {
                let report = SuiteReport::failed(&path.display().to_string(), self.mode, &e);
                return (report, Err(e));
            }
        };

        let base_dir = match &self.config.harness.base_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        self.execute_suite(&suite, &base_dir).await
    }

    /// Run a parsed suite, resolving its `net_config` against `base_dir`
    pub async fn run_suite(&self, suite: &TestSuite, base_dir: &Path) -> Result<SuiteReport> {
        let (report, result) = self.execute_suite(suite, base_dir).await;
        result.map(|()| report)
    }

    async fn execute_suite(
        &self,
        suite: &TestSuite,
        base_dir: &Path,
    ) -> (SuiteReport, Result<()>) {
        let mut report = SuiteReport::new(&suite.name, self.mode);
        let result = self.drive(suite, base_dir, &mut report).await;

        match &result {
            Ok(()) => {
                report.passed = true;
                let banner = "Suite Passed".green().bold();
                self.say(format!("\n{} {}\n", "✓".green().bold(), banner));
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        (report, result)
    }

    async fn drive(
        &self,
        suite: &TestSuite,
        base_dir: &Path,
        report: &mut SuiteReport,
    ) -> Result<()> {
        self.say(format!(
            "\n{} {} {}",
            "Running Suite:".blue().bold(),
            suite.name.white().bold(),
            format!("({} mode)", self.mode).dimmed()
        ));

        let lifecycle = Lifecycle::new(&self.config.harness, &self.config.specs, self.service);
        let template = base_dir.join(&suite.net_config);
        let config_file = self.config.harness.config_file.display();

        // A failed backup leaves the host untouched, so there is nothing to restore.
        self.say(format!("Backing up {}", config_file).yellow());
        let backup = lifecycle.backup()?;

        let outcome = self.exercise(&lifecycle, &template, suite, report).await;

        self.say(format!("Restoring {}", config_file).yellow());
        let restored = lifecycle.finalize(backup, &suite.interface).await;

        match (outcome, restored) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(e), Err(restore_err)) => {
                // The run failure was already reported; surface the restore failure too.
                tracing::error!("{}", restore_err);
                Err(e)
            }
        }
    }

    async fn exercise(
        &self,
        lifecycle: &Lifecycle<'_>,
        template: &Path,
        suite: &TestSuite,
        report: &mut SuiteReport,
    ) -> Result<()> {
        lifecycle.install_candidate(template)?;
        lifecycle.restart(&suite.interface).await?;

        self.say(format!("\n{}", "Tests:".cyan()));
        for test in &suite.tests {
            self.run_test(suite, test, report).await?;
        }
        Ok(())
    }

    async fn run_test(
        &self,
        suite: &TestSuite,
        test: &TestCase,
        report: &mut SuiteReport,
    ) -> Result<()> {
        let out = match self.shell.run_probe(&test.command).await? {
            ProbeOutcome::Ok(out) => out,
            ProbeOutcome::TimedOut => {
                self.say(format!(
                    "  {} {}: command '{}' expired",
                    "✗".red(),
                    test.name,
                    test.command
                ));
                report.tests_skipped += 1;
                report.keys_skipped += test.keys.len();
                return Ok(());
            }
            ProbeOutcome::Failed(code) => {
                self.say(format!(
                    "  {} {}: {} {}",
                    "✗".red(),
                    test.name,
                    test.command.dimmed(),
                    exit_description(code).red()
                ));
                report.tests_skipped += 1;
                report.keys_skipped += test.keys.len();
                return Ok(());
            }
        };

        self.say(format!("  {} {}: {}", "✓".green(), test.name, test.command.dimmed()));
        report.tests_run += 1;

        for key in &test.keys {
            self.run_key(suite, test, key, &out, report).await?;
        }
        Ok(())
    }

    async fn run_key(
        &self,
        suite: &TestSuite,
        test: &TestCase,
        key: &KeySpec,
        probe_out: &[u8],
        report: &mut SuiteReport,
    ) -> Result<()> {
        let value = match self.shell.extract(&key.value, key.key_type, probe_out).await? {
            ExtractOutcome::Value(value) => value,
            ExtractOutcome::TimedOut => {
                self.say(format!("    {} {}: extraction timed out", "✗".red(), key.name));
                report.keys_skipped += 1;
                return Ok(());
            }
            ExtractOutcome::Failed(code) => {
                self.say(format!(
                    "    {} {}: extraction failed {}",
                    "✗".red(),
                    key.name,
                    exit_description(code)
                ));
                report.keys_skipped += 1;
                return Ok(());
            }
        };

        let store_key = normalize_key(&[&suite.name, &test.name, &key.name]);
        tracing::debug!(key = %store_key, value = %value, "Extracted value");

        if let Some(expect) = &key.expect {
            self.check(expect, &store_key, &value)?;
        }

        match self.mode {
            Mode::Master => {
                self.store.save(&store_key, &value)?;
                report.keys_recorded += 1;
                self.say(format!(
                    "    Extracting {}: {} {}",
                    key.name,
                    value.green(),
                    "(recorded)".dimmed()
                ));
            }
            Mode::Slave => {
                let baseline = self.store.fetch(&store_key).map_err(|e| {
                    self.print_failure(&value, "<missing>");
                    e
                })?;
                let expected = Expectation::parse(&baseline)?;
                self.check(&expected, &store_key, &value)?;
                report.keys_verified += 1;
                self.say(format!(
                    "    Extracting {}: {} {}",
                    key.name,
                    value.green(),
                    "[ PASS ]".green()
                ));
            }
        }
        Ok(())
    }

    fn check(&self, expect: &Expectation, store_key: &str, value: &str) -> Result<()> {
        expect.check(store_key, value).map_err(|e| {
            self.print_failure(value, &expect.to_string());
            e
        })
    }

    fn print_failure(&self, value: &str, expected: &str) {
        self.say(format!("    {}", "[ FAIL ]".red()));
        self.say(format!("    Backend value {} does not match {}", expected, value).red());
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("(exit code {})", code),
        None => "(killed by signal)".to_string(),
    }
}

/// Run documents in order. Stops at the first failing document unless
/// `keep_going` is set; every attempted document gets a report.
pub async fn run_documents(
    session: &Session<'_>,
    paths: &[PathBuf],
    keep_going: bool,
) -> Vec<SuiteReport> {
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        let (report, result) = session.execute_document(path).await;
        reports.push(report);

        if let Err(e) = result {
            session.say(format!("{} {}: {}", "✗".red().bold(), path.display(), e));
            if !keep_going {
                break;
            }
        }
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_description() {
        assert_eq!(exit_description(Some(2)), "(exit code 2)");
        assert_eq!(exit_description(None), "(killed by signal)");
    }

    #[test]
    fn test_failed_report() {
        let err = Error::BaselineKeyNotFound("a_b_c".to_string());
        let report = SuiteReport::failed("suite.yaml", Mode::Slave, &err);
        assert!(!report.passed);
        assert_eq!(report.tests_run, 0);
        assert!(report.error.unwrap().contains("a_b_c"));
    }

    #[test]
    fn test_progress_goes_to_stdout_unless_redirected() {
        let config = Config::default();
        let service = crate::service::NoopService;

        let session = Session::new(&config, &service, Mode::Master);
        assert!(!session.progress_to_stderr);

        let session = session.progress_to_stderr(true);
        assert!(session.progress_to_stderr);
        assert_eq!(session.mode(), Mode::Master);
    }
}
