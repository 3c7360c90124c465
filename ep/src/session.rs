//! Metric editing session
//!
//! Holds the form being edited, the metric store and the templater. Each
//! public method corresponds to one user action in the REPL.

use std::fs;
use std::path::{Path, PathBuf};

use metricstore::{
    ExampleRecord, MAX_EXAMPLES, MetricDefinition, MetricError, MetricName, MetricStore, ScoringRubric, VariableSet,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::templater::{PromptError, PromptTemplater};

/// Session operation errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("No metric selected. Generate one or use /select first")]
    NoSelection,

    #[error("Failed to write {path}: {source}")]
    Deploy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw form fields, validated only when a definition is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricForm {
    pub name: String,
    pub criteria: String,
    pub rubric: String,
    pub variables: VariableSet,
    pub examples: Vec<ExampleRecord>,
}

impl MetricForm {
    /// Form pre-filled from a stored definition
    pub fn from_definition(definition: &MetricDefinition) -> Self {
        let rubric = match &definition.scoring_rubric {
            ScoringRubric::Preset(preset) => preset.key().to_string(),
            ScoringRubric::Custom(text) => text.clone(),
        };
        Self {
            name: definition.name.to_string(),
            criteria: definition.criteria.clone(),
            rubric,
            variables: definition.input_variables.clone(),
            examples: definition.examples().to_vec(),
        }
    }

    /// Validate every field and build a definition with no prompt yet
    pub fn build(&self) -> Result<MetricDefinition, MetricError> {
        debug!(name = %self.name, "MetricForm::build: called");
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MetricError::MissingField("metric name"));
        }
        let name = MetricName::parse(name)?;
        let rubric = ScoringRubric::parse(&self.rubric)?;
        MetricDefinition::new(
            name,
            self.criteria.trim(),
            rubric,
            self.variables.clone(),
            self.examples.clone(),
        )
    }
}

/// One user's editing session
pub struct Session {
    store: MetricStore,
    form: MetricForm,
    selected: Option<MetricName>,
    templater: PromptTemplater,
}

impl Session {
    pub fn new(templater: PromptTemplater) -> Self {
        debug!("Session::new: called");
        Self {
            store: MetricStore::new(),
            form: MetricForm::default(),
            selected: None,
            templater,
        }
    }

    pub fn form(&self) -> &MetricForm {
        &self.form
    }

    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    pub fn templater(&self) -> &PromptTemplater {
        &self.templater
    }

    /// Stored definition for the selected metric
    pub fn current(&self) -> Option<&MetricDefinition> {
        self.selected.as_ref().and_then(|name| self.store.get(name.as_str()))
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_criteria(&mut self, criteria: impl Into<String>) {
        self.form.criteria = criteria.into();
    }

    pub fn set_rubric(&mut self, rubric: impl Into<String>) {
        self.form.rubric = rubric.into();
    }

    /// Parse and set the input variables; the form is unchanged on error
    pub fn set_variables(&mut self, list: &str) -> Result<&VariableSet, SessionError> {
        debug!(%list, "set_variables: called");
        self.form.variables = VariableSet::parse(list)?;
        Ok(&self.form.variables)
    }

    /// Append an example to the form, rejecting more than [`MAX_EXAMPLES`]
    pub fn add_example(&mut self, example: ExampleRecord) -> Result<usize, SessionError> {
        debug!(current = self.form.examples.len(), "add_example: called");
        if self.form.examples.len() >= MAX_EXAMPLES {
            return Err(MetricError::TooManyExamples.into());
        }
        self.form.examples.push(example);
        Ok(self.form.examples.len())
    }

    /// Remove the example at a 1-based position
    pub fn remove_example(&mut self, position: usize) -> Result<ExampleRecord, SessionError> {
        debug!(%position, "remove_example: called");
        if position == 0 || position > self.form.examples.len() {
            return Err(MetricError::ExampleNotFound(position).into());
        }
        Ok(self.form.examples.remove(position - 1))
    }

    pub fn clear_examples(&mut self) {
        debug!("clear_examples: called");
        self.form.examples.clear();
    }

    /// Load an existing metric into the form
    pub fn select(&mut self, name: &str) -> Result<&MetricDefinition, SessionError> {
        debug!(%name, "select: called");
        let definition = self
            .store
            .get(name)
            .ok_or_else(|| MetricError::NotFound(name.to_string()))?;
        self.form = MetricForm::from_definition(definition);
        self.selected = Some(definition.name.clone());
        Ok(definition)
    }

    /// Clear the form and the selection
    pub fn new_metric(&mut self) {
        debug!("new_metric: called");
        self.form = MetricForm::default();
        self.selected = None;
    }

    /// Generate a prompt from the form and store the metric
    ///
    /// The form is validated before any request is sent. An existing metric
    /// with the same name is replaced.
    pub async fn generate(&mut self) -> Result<&MetricDefinition, SessionError> {
        debug!(name = %self.form.name, "generate: called");
        let definition = self.form.build()?;
        self.run_generation(definition).await
    }

    /// Re-run generation for a metric that already exists
    pub async fn regenerate(&mut self) -> Result<&MetricDefinition, SessionError> {
        debug!(name = %self.form.name, "regenerate: called");
        let definition = self.form.build()?;
        if !self.store.contains(definition.name.as_str()) {
            debug!("regenerate: metric does not exist");
            return Err(MetricError::NotFound(definition.name.to_string()).into());
        }
        self.run_generation(definition).await
    }

    async fn run_generation(&mut self, definition: MetricDefinition) -> Result<&MetricDefinition, SessionError> {
        let text = self.templater.generate_for(&definition).await?;
        let name = definition.name.clone();
        self.store.upsert(definition);
        info!(%name, "Generated evaluation prompt");
        self.selected = Some(name.clone());
        Ok(self.store.record_generation(name.as_str(), text)?)
    }

    /// Store an edited prompt for the selected metric
    pub fn save(&mut self, prompt: impl Into<String>) -> Result<&MetricDefinition, SessionError> {
        debug!("save: called");
        let name = self.selected.clone().ok_or(SessionError::NoSelection)?;
        Ok(self.store.save_prompt(name.as_str(), prompt)?)
    }

    /// Restore the selected metric's prompt to the last generated one
    pub fn reset(&mut self) -> Result<&MetricDefinition, SessionError> {
        debug!("reset: called");
        let name = self.selected.clone().ok_or(SessionError::NoSelection)?;
        Ok(self.store.reset_prompt(name.as_str())?)
    }

    /// Write the selected metric as YAML
    pub fn deploy(&self, path: &Path) -> Result<(), SessionError> {
        debug!(?path, "deploy: called");
        let definition = self.current().ok_or(SessionError::NoSelection)?;
        let yaml = definition.to_yaml()?;
        fs::write(path, yaml).map_err(|source| SessionError::Deploy {
            path: path.to_path_buf(),
            source,
        })?;
        info!(name = %definition.name, path = %path.display(), "Deployed metric");
        Ok(())
    }

    /// Delete the selected metric and clear the form
    pub fn delete(&mut self) -> Result<MetricDefinition, SessionError> {
        debug!("delete: called");
        let name = self.selected.clone().ok_or(SessionError::NoSelection)?;
        let removed = self.store.delete(name.as_str())?;
        self.new_metric();
        Ok(removed)
    }

    /// Ask the model for a new example and append it to the form
    pub async fn generate_example(&mut self) -> Result<&ExampleRecord, SessionError> {
        debug!(current = self.form.examples.len(), "generate_example: called");
        if self.form.examples.len() >= MAX_EXAMPLES {
            return Err(MetricError::TooManyExamples.into());
        }
        let definition = self.form.build()?;
        let example = self.templater.generate_example(&definition).await?;
        self.form.examples.push(example);
        Ok(&self.form.examples[self.form.examples.len() - 1])
    }
}
