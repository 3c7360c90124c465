//! Metric store error types

use thiserror::Error;

use crate::MAX_EXAMPLES;

/// Errors raised while validating or storing metric definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    #[error(
        "Invalid metric name '{0}': it should start with a letter or underscore and contain only letters, numbers, or underscores"
    )]
    InvalidName(String),

    #[error("Metric name '{0}' is reserved for a built-in metric")]
    ReservedName(String),

    #[error("Unknown input variable '{0}'. Supported: input, response, reference, context")]
    UnknownVariable(String),

    #[error("Input variables must include '{0}'")]
    MissingRequiredVariable(&'static str),

    #[error("Please fill in the required field: {0}")]
    MissingField(&'static str),

    #[error("A metric can have at most {} examples", MAX_EXAMPLES)]
    TooManyExamples,

    #[error("Example {0} does not exist")]
    ExampleNotFound(usize),

    #[error("Metric not found: {0}")]
    NotFound(String),

    #[error("Failed to serialize metric: {0}")]
    Serialize(String),
}

impl MetricError {
    /// Check if this error came from user-supplied form input
    pub fn is_validation(&self) -> bool {
        !matches!(self, MetricError::NotFound(_) | MetricError::Serialize(_))
    }
}
