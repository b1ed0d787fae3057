//! Test document configuration types
//!
//! Defines the data structures for deserializing YAML test documents.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{substitute_vars, Config, Error, Result};

use super::verify::Expectation;

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestSuite {
    /// Name of the suite, first component of every baseline key
    pub name: String,
    /// Candidate interface config template, relative to the base directory
    pub net_config: PathBuf,
    /// Interface under test
    pub interface: String,
    /// Probes to run, in order
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// A probe command whose exit status gates its keys
#[derive(Deserialize, Debug)]
pub struct TestCase {
    pub name: String,
    /// Shell command to execute
    pub command: String,
    /// Values extracted from the command's output
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

/// How the extracted value of a key is formed
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Trimmed stdout of the extraction command
    #[default]
    String,
    /// Exit status of the extraction command, as text
    Boolean,
}

/// A named value derived from probe output
#[derive(Deserialize, Debug)]
pub struct KeySpec {
    pub name: String,
    /// Extraction command, fed the probe's stdout on stdin
    pub value: String,
    #[serde(default, rename = "type")]
    pub key_type: KeyType,
    /// Inline expectation: a literal, or `r(<pattern>)`
    #[serde(default, rename = "match")]
    pub expect: Option<Expectation>,
}

impl TestSuite {
    /// Parse a document after substituting the configured template variables
    pub fn parse(raw: &str, config: &Config) -> std::result::Result<Self, serde_yaml::Error> {
        let document = substitute_vars(raw, &config.specs);
        serde_yaml::from_str(&document)
    }

    /// Read and parse a test document from disk
    pub fn load(path: &Path, config: &Config) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&raw, config).map_err(|e| Error::DocumentParse {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
name: static-ipv4
net_config: templates/static.conf
interface: $$IFACE$$
tests:
  - name: link
    command: ip addr show $$IFACE$$
    keys:
      - name: address
        value: awk '/inet / {print $2}'
        match: r(^10\.0\.0\.)
      - name: state-up
        value: grep -q 'state UP'
        type: boolean
        match: "0"
  - name: route
    command: ip route
"#;

    fn config_with_iface() -> Config {
        let mut config = Config::default();
        config.specs.insert("iface".to_string(), "eth1".to_string());
        config
    }

    #[test]
    fn test_parse_document_substitutes_variables() {
        let suite = TestSuite::parse(DOCUMENT, &config_with_iface()).unwrap();
        assert_eq!(suite.name, "static-ipv4");
        assert_eq!(suite.interface, "eth1");
        assert_eq!(suite.net_config, PathBuf::from("templates/static.conf"));
        assert_eq!(suite.tests.len(), 2);
        assert_eq!(suite.tests[0].command, "ip addr show eth1");
        assert!(suite.tests[1].keys.is_empty());
    }

    #[test]
    fn test_parse_key_types_and_expectations() {
        let suite = TestSuite::parse(DOCUMENT, &config_with_iface()).unwrap();
        let keys = &suite.tests[0].keys;

        assert_eq!(keys[0].key_type, KeyType::String);
        assert!(matches!(keys[0].expect, Some(Expectation::Pattern(_))));

        assert_eq!(keys[1].key_type, KeyType::Boolean);
        match &keys[1].expect {
            Some(Expectation::Literal(s)) => assert_eq!(s, "0"),
            other => panic!("Expected literal expectation, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inline_pattern_rejects_document() {
        let doc = r#"
name: bad
net_config: x
interface: eth0
tests:
  - name: t
    command: "true"
    keys:
      - name: k
        value: cat
        match: r([unclosed)
"#;
        assert!(TestSuite::parse(doc, &Config::default()).is_err());
    }
}
