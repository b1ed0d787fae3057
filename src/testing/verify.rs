//! Value verification
//!
//! Expected values come in two shapes: a literal compared for equality, or a
//! pattern written `r(<regex>)` that must match at the start of the value.
//! The shape is decided once, when the expectation is parsed.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::common::{Error, Result};

/// Expected value of a key
#[derive(Debug, Clone)]
pub enum Expectation {
    Literal(String),
    Pattern(RegexExpectation),
}

/// A compiled `r(...)` expectation, keeping its source text for reports
#[derive(Debug, Clone)]
pub struct RegexExpectation {
    source: String,
    regex: Regex,
}

impl Expectation {
    /// Classify a raw expectation string
    pub fn parse(raw: &str) -> Result<Self> {
        match raw
            .strip_prefix("r(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(pattern) => {
                // Anchor at the start only: the match need not consume the value.
                let regex = Regex::new(&format!(r"\A(?:{})", pattern)).map_err(|e| {
                    Error::InvalidPattern {
                        pattern: raw.to_string(),
                        error: e.to_string(),
                    }
                })?;
                Ok(Self::Pattern(RegexExpectation {
                    source: raw.to_string(),
                    regex,
                }))
            }
            None => Ok(Self::Literal(raw.to_string())),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Literal(expected) => value == expected,
            Self::Pattern(p) => p.regex.is_match(value),
        }
    }

    /// Check `value`, failing with a mismatch error naming `key`
    pub fn check(&self, key: &str, value: &str) -> Result<()> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(Error::mismatch(key, value, self))
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Pattern(p) => f.write_str(&p.source),
        }
    }
}

impl<'de> Deserialize<'de> for Expectation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept scalars of any kind; `match: 0` means the literal "0".
        let raw = match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "match must be a scalar, got {:?}",
                    other
                )))
            }
        };
        Expectation::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_requires_exact_equality() {
        let exp = Expectation::parse("ok").unwrap();
        assert!(matches!(exp, Expectation::Literal(_)));
        assert!(exp.matches("ok"));
        assert!(!exp.matches("ok123"));
        assert!(!exp.matches(" ok"));
    }

    #[test]
    fn test_pattern_matches_by_prefix() {
        let exp = Expectation::parse("r(^ok)").unwrap();
        assert!(exp.matches("ok123"));
        assert!(!exp.matches("not ok"));

        let unanchored = Expectation::parse("r(ok)").unwrap();
        assert!(unanchored.matches("ok!"));
        assert!(!unanchored.matches("is ok"));
    }

    #[test]
    fn test_pattern_with_end_anchor() {
        let exp = Expectation::parse(r"r(^[0-9]+$)").unwrap();
        assert!(exp.matches("42"));
        assert!(!exp.matches("abc"));
        assert!(!exp.matches("42abc"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let exp = Expectation::parse("r(up|down)").unwrap();
        assert!(exp.matches("down"));
        assert!(!exp.matches("going down"));
    }

    #[test]
    fn test_marker_needs_both_ends() {
        assert!(matches!(
            Expectation::parse("r(abc").unwrap(),
            Expectation::Literal(_)
        ));
        assert!(matches!(
            Expectation::parse("router").unwrap(),
            Expectation::Literal(_)
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Expectation::parse("r([a-)").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_check_reports_source_text() {
        let exp = Expectation::parse(r"r(^[0-9]+$)").unwrap();
        let err = exp.check("suite_test_key", "abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key 'suite_test_key' mismatch: \"abc\" != \"r(^[0-9]+$)\""
        );
    }
}
