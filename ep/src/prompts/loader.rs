//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to embedded defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use metricstore::{InputVariable, VariableSet};
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// System template family, keyed by the exact set of input variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// `{input, response, reference}`
    GroundTruth,
    /// `{input, response, context}`
    Rag,
    /// `{input, response}`
    ReferenceFree,
    /// `{input, response, context, reference}`
    ContextReference,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::ReferenceFree,
        TemplateKind::GroundTruth,
        TemplateKind::Rag,
        TemplateKind::ContextReference,
    ];

    /// Select the template whose variable set matches exactly
    pub fn for_variables(vars: &BTreeSet<InputVariable>) -> Option<Self> {
        debug!(?vars, "TemplateKind::for_variables: called");
        let found = Self::ALL.into_iter().find(|kind| kind.variables() == *vars);
        if found.is_none() {
            debug!("TemplateKind::for_variables: no template for this set");
        }
        found
    }

    /// The variable set this template serves
    pub fn variables(&self) -> BTreeSet<InputVariable> {
        use InputVariable::*;
        let vars: &[InputVariable] = match self {
            Self::GroundTruth => &[Input, Response, Reference],
            Self::Rag => &[Input, Response, Context],
            Self::ReferenceFree => &[Input, Response],
            Self::ContextReference => &[Input, Response, Context, Reference],
        };
        vars.iter().copied().collect()
    }

    /// Template file name (without `.pmt`)
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::GroundTruth => "ground-truth",
            Self::Rag => "rag",
            Self::ReferenceFree => "reference-free",
            Self::ContextReference => "context-reference",
        }
    }

    /// Short human description
    pub fn label(&self) -> &'static str {
        match self {
            Self::GroundTruth => "Ground truth comparison",
            Self::Rag => "Contextual groundedness (RAG)",
            Self::ReferenceFree => "Reference-free",
            Self::ContextReference => "Grounded reference agreement",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template_name())
    }
}

/// Context for rendering the user request
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    pub variables: String,
    pub criteria: String,
    pub rubric: String,
    pub examples: Option<String>,
}

impl RequestContext {
    pub fn new(variables: &VariableSet, criteria: &str, rubric: &str, examples: Option<&str>) -> Self {
        debug!(%variables, has_examples = examples.is_some(), "RequestContext::new: called");
        Self {
            variables: variables.iter().map(|v| format!("{{{}}}", v)).collect::<Vec<_>>().join(", "),
            criteria: criteria.trim().to_string(),
            rubric: rubric.trim().to_string(),
            examples: examples.map(str::trim).filter(|e| !e.is_empty()).map(String::from),
        }
    }
}

/// Context for rendering the example generator prompt
#[derive(Debug, Clone, Serialize)]
pub struct ExampleContext {
    pub name: String,
    pub criteria: String,
    pub rubric: String,
    pub fields: String,
    pub existing: Option<String>,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.evalprompt/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates in `override_dir` when it exists
    pub fn new(override_dir: impl AsRef<Path>) -> Self {
        let override_dir = override_dir.as_ref();
        let exists = override_dir.is_dir();
        debug!(?override_dir, %exists, "PromptLoader::new: called");
        Self {
            hbs: Self::engine(),
            override_dir: exists.then(|| override_dir.to_path_buf()),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in override directory");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// System prompt for a template kind
    pub fn system_prompt(&self, kind: TemplateKind) -> Result<String> {
        debug!(%kind, "PromptLoader::system_prompt: called");
        self.load_template(kind.template_name())
    }

    /// Render the user request
    pub fn render_request(&self, context: &RequestContext) -> Result<String> {
        debug!("PromptLoader::render_request: called");
        self.render("request", context)
    }

    /// Render the example generator prompt
    pub fn render_example(&self, context: &ExampleContext) -> Result<String> {
        debug!(name = %context.name, "PromptLoader::render_example: called");
        self.render("example", context)
    }

    fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);
        self.hbs
            .render_template(&template, context)
            .map(|rendered| rendered.trim_end().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
