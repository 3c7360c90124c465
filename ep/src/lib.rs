//! evalprompt - LLM-as-judge evaluation prompt workbench
//!
//! Turns a metric's grading criteria, scoring rubric, input variables and
//! few-shot examples into an evaluation prompt by asking a hosted model, then
//! lets the user edit, regenerate, save, export or delete the result.
//!
//! # Architecture
//!
//! - [`templater`]: picks a system template by variable set and calls the model
//! - [`session`]: form state and the metric store, one method per user action
//! - [`repl`]: rustyline front end over a [`session::Session`]
//! - [`llm`]: chat-completion client trait and the OpenAI implementation
//! - [`prompts`]: handlebars templates with on-disk overrides

pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod session;
pub mod templater;
pub mod wrap;

/// Column width generated prompts are wrapped to by default
pub const DEFAULT_WRAP_WIDTH: usize = 80;

pub use config::Config;
pub use session::{MetricForm, Session, SessionError};
pub use templater::{PromptError, PromptTemplater};
