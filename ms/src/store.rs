//! Session-lifetime metric store

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::{MetricDefinition, MetricError, MetricName};

/// In-memory collection of custom metrics, keyed by name
///
/// Keys are [`MetricName`]s, so invalid or reserved names can never be stored.
#[derive(Debug, Default, Clone)]
pub struct MetricStore {
    metrics: BTreeMap<MetricName, MetricDefinition>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a metric, returning the previous definition if any
    pub fn upsert(&mut self, definition: MetricDefinition) -> Option<MetricDefinition> {
        debug!(name = %definition.name, "MetricStore::upsert: called");
        let previous = self.metrics.insert(definition.name.clone(), definition);
        if previous.is_some() {
            debug!("MetricStore::upsert: replaced existing metric");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Store newly generated text as both the current and the generated prompt
    pub fn record_generation(&mut self, name: &str, text: impl Into<String>) -> Result<&MetricDefinition, MetricError> {
        debug!(%name, "MetricStore::record_generation: called");
        let metric = self.get_mut(name)?;
        let text = text.into();
        metric.generated_prompt = text.clone();
        metric.prompt = text;
        metric.touch();
        Ok(metric)
    }

    /// Replace the current prompt with an edited version
    ///
    /// Saving the same text twice leaves the stored value untouched.
    pub fn save_prompt(&mut self, name: &str, prompt: impl Into<String>) -> Result<&MetricDefinition, MetricError> {
        let prompt = prompt.into();
        debug!(%name, prompt_len = prompt.len(), "MetricStore::save_prompt: called");
        let metric = self.get_mut(name)?;
        if metric.prompt == prompt {
            debug!("MetricStore::save_prompt: unchanged");
            return Ok(metric);
        }
        metric.prompt = prompt;
        metric.touch();
        info!(%name, "Saved prompt");
        Ok(metric)
    }

    /// Restore the current prompt to the last generated one
    pub fn reset_prompt(&mut self, name: &str) -> Result<&MetricDefinition, MetricError> {
        debug!(%name, "MetricStore::reset_prompt: called");
        let metric = self.get_mut(name)?;
        if metric.prompt != metric.generated_prompt {
            metric.prompt = metric.generated_prompt.clone();
            metric.touch();
        }
        Ok(metric)
    }

    /// Remove a metric
    pub fn delete(&mut self, name: &str) -> Result<MetricDefinition, MetricError> {
        debug!(%name, "MetricStore::delete: called");
        match self.metrics.remove(name) {
            Some(metric) => {
                info!(%name, "Deleted metric");
                Ok(metric)
            }
            None => {
                debug!(%name, "MetricStore::delete: not found");
                Err(MetricError::NotFound(name.to_string()))
            }
        }
    }

    /// All metric names in sorted order
    pub fn list(&self) -> Vec<&MetricName> {
        self.metrics.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut MetricDefinition, MetricError> {
        self.metrics
            .get_mut(name)
            .ok_or_else(|| MetricError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScoringRubric, VariableSet};

    fn metric(name: &str) -> MetricDefinition {
        MetricDefinition::new(
            MetricName::parse(name).unwrap(),
            "Does the answer use the right format?",
            ScoringRubric::parse("1-5").unwrap(),
            VariableSet::default(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = MetricStore::new();
        assert!(store.upsert(metric("formatting")).is_none());
        assert!(store.contains("formatting"));
        assert_eq!(store.get("formatting").unwrap().criteria, "Does the answer use the right format?");

        let mut replacement = metric("formatting");
        replacement.criteria = "Count the formats".to_string();
        let previous = store.upsert(replacement).unwrap();
        assert_eq!(previous.criteria, "Does the answer use the right format?");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("formatting").unwrap().criteria, "Count the formats");
    }

    #[test]
    fn test_list_is_sorted() {
        let mut store = MetricStore::new();
        store.upsert(metric("zeta"));
        store.upsert(metric("alpha"));
        store.upsert(metric("_hidden"));
        let names: Vec<&str> = store.list().into_iter().map(MetricName::as_str).collect();
        assert_eq!(names, vec!["_hidden", "alpha", "zeta"]);
    }

    #[test]
    fn test_save_prompt_is_idempotent() {
        let mut store = MetricStore::new();
        store.upsert(metric("formatting"));
        store.record_generation("formatting", "generated").unwrap();

        let first = store.save_prompt("formatting", "edited").unwrap().clone();
        let second = store.save_prompt("formatting", "edited").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(second.prompt, "edited");
        assert_eq!(second.generated_prompt, "generated");
    }

    #[test]
    fn test_save_prompt_missing_metric() {
        let mut store = MetricStore::new();
        assert_eq!(
            store.save_prompt("ghost", "text").unwrap_err(),
            MetricError::NotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_reset_prompt() {
        let mut store = MetricStore::new();
        store.upsert(metric("formatting"));
        store.record_generation("formatting", "generated").unwrap();
        store.save_prompt("formatting", "edited").unwrap();

        let reset = store.reset_prompt("formatting").unwrap();
        assert_eq!(reset.prompt, "generated");
    }

    #[test]
    fn test_record_generation_overwrites_edits() {
        let mut store = MetricStore::new();
        store.upsert(metric("formatting"));
        store.record_generation("formatting", "first").unwrap();
        store.save_prompt("formatting", "edited").unwrap();
        let metric = store.record_generation("formatting", "second").unwrap();
        assert_eq!(metric.prompt, "second");
        assert_eq!(metric.generated_prompt, "second");
    }

    #[test]
    fn test_delete() {
        let mut store = MetricStore::new();
        store.upsert(metric("formatting"));
        let removed = store.delete("formatting").unwrap();
        assert_eq!(removed.name.as_str(), "formatting");
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_does_not_panic() {
        let mut store = MetricStore::new();
        store.upsert(metric("formatting"));
        assert_eq!(
            store.delete("ghost").unwrap_err(),
            MetricError::NotFound("ghost".to_string())
        );
        assert_eq!(
            store.delete("1-not-a-name").unwrap_err(),
            MetricError::NotFound("1-not-a-name".to_string())
        );
        assert_eq!(store.len(), 1);
    }
}
