//! MetricStore - session-scoped store of LLM-as-judge metric definitions
//!
//! A metric pairs a name with grading criteria, a scoring rubric, the input
//! variables the judge may see, up to three few-shot examples, and the
//! evaluation prompt generated from them.
//!
//! # Invariants
//!
//! - Names are identifiers (`[A-Za-z_][A-Za-z0-9_]*`) and never a reserved
//!   built-in metric name, compared case-insensitively
//! - Variable sets always contain `input` and `response`
//! - A metric holds at most [`MAX_EXAMPLES`] examples
//!
//! # Example
//!
//! ```
//! use metricstore::{MetricDefinition, MetricName, MetricStore, ScoringRubric, VariableSet};
//!
//! let mut store = MetricStore::new();
//! let def = MetricDefinition::new(
//!     MetricName::parse("tone").unwrap(),
//!     "Is the response polite?",
//!     ScoringRubric::parse("1-5").unwrap(),
//!     VariableSet::default(),
//!     vec![],
//! )
//! .unwrap();
//! store.upsert(def);
//! assert!(store.contains("tone"));
//! ```

mod error;
mod metric;
mod name;
mod store;

pub use error::MetricError;
pub use metric::{ExampleRecord, InputVariable, MetricDefinition, RubricPreset, ScoringRubric, VariableSet};
pub use name::{MetricName, RESERVED_NAMES, is_reserved, is_valid_identifier};
pub use store::MetricStore;

/// Maximum number of few-shot examples per metric
pub const MAX_EXAMPLES: usize = 3;
