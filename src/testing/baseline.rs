//! Baseline store
//!
//! Append-only text file of `<key> = <value>` lines. Master runs append,
//! slave runs read; when a key was recorded more than once the last line
//! wins. Nothing here ever rewrites or compacts the file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

const SEPARATOR: &str = " = ";

/// Build the store key for a suite/test/key triple.
///
/// Each part keeps only its alphanumeric characters; parts are joined with `_`.
pub fn normalize_key<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| {
            part.as_ref()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// File-backed baseline store
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record
    pub fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}{}{}", key, SEPARATOR, value)?;
        tracing::debug!(key, value, store = %self.path.display(), "Recorded baseline value");
        Ok(())
    }

    /// Look up the most recent value recorded for `key`
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        let content = self.read()?;
        let prefix = format!("{}{}", key, SEPARATOR);

        Ok(content
            .lines()
            .filter_map(|line| line.strip_prefix(prefix.as_str()))
            .last()
            .map(|value| value.trim().to_string()))
    }

    /// Like [`lookup`](Self::lookup), but a missing key is an error
    pub fn fetch(&self, key: &str) -> Result<String> {
        self.lookup(key)?
            .ok_or_else(|| Error::BaselineKeyNotFound(key.to_string()))
    }

    /// Effective records in first-recorded order, each with its latest value
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        let content = self.read()?;
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in content.lines() {
            let Some((key, value)) = line.split_once(SEPARATOR) else {
                continue;
            };
            let value = value.trim().to_string();
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key.to_string(), value)),
            }
        }

        Ok(entries)
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })
    }
}
