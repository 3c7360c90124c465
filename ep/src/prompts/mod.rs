//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for evaluation prompt generation.
//!
//! Template loading chain:
//! 1. `{prompts.override-dir}/{name}.pmt` (user override, default `.evalprompt/prompts/`)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ExampleContext, PromptLoader, RequestContext, TemplateKind};
