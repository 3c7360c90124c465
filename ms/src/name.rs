//! Metric name validation
//!
//! A metric name doubles as a variable name in the evaluation harness, so it
//! must be a plain identifier and must not shadow a built-in metric.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::MetricError;

/// Built-in metric names that user metrics cannot override (compared case-insensitively)
pub const RESERVED_NAMES: &[&str] = &[
    "correctness",
    "relevance",
    "answer_relevance",
    "context_relevance",
    "groundedness",
    "faithfulness",
    "coherence",
    "conciseness",
    "fluency",
    "helpfulness",
    "harmfulness",
    "toxicity",
    "similarity",
    "precision",
    "recall",
];

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("metric name pattern is valid"));

/// Check whether a string is a syntactically valid identifier
pub fn is_valid_identifier(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Check whether a name collides with a built-in metric
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// A validated metric name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricName(String);

impl MetricName {
    /// Validate and wrap a metric name
    pub fn parse(name: impl Into<String>) -> Result<Self, MetricError> {
        let name = name.into();
        debug!(%name, "MetricName::parse: called");
        if !is_valid_identifier(&name) {
            debug!("MetricName::parse: not an identifier");
            return Err(MetricError::InvalidName(name));
        }
        if is_reserved(&name) {
            debug!("MetricName::parse: reserved");
            return Err(MetricError::ReservedName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MetricName {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MetricName {
    type Error = MetricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.0
    }
}

impl Borrow<str> for MetricName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
