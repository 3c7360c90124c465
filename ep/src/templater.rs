//! Prompt Templater
//!
//! Turns a metric's criteria, rubric, variables and examples into an
//! evaluation prompt with one chat-completion call.

use std::sync::Arc;

use metricstore::{ExampleRecord, InputVariable, MetricDefinition, VariableSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{self, CompletionRequest, LlmClient, LlmError, StopReason};
use crate::prompts::{ExampleContext, PromptLoader, RequestContext, TemplateKind};
use crate::wrap;

/// Errors from prompt or example generation
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("No template for input variables [{0}]")]
    UnsupportedVariables(String),

    #[error("No completion found.")]
    NoCompletion,

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Could not read generated example: {0}")]
    InvalidExample(String),
}

/// Generates evaluation prompts and few-shot examples
pub struct PromptTemplater {
    llm: Arc<dyn LlmClient>,
    loader: PromptLoader,
    wrap_width: usize,
    max_tokens: u32,
}

impl PromptTemplater {
    pub fn new(llm: Arc<dyn LlmClient>, loader: PromptLoader, wrap_width: usize, max_tokens: u32) -> Self {
        debug!(model = %llm.model(), %wrap_width, %max_tokens, "PromptTemplater::new: called");
        Self {
            llm,
            loader,
            wrap_width,
            max_tokens,
        }
    }

    /// Build the client and template loader described by the configuration
    pub fn from_config(config: &Config) -> Result<Self, PromptError> {
        debug!(provider = %config.llm.provider, "PromptTemplater::from_config: called");
        let llm = llm::create_client(&config.llm)?;
        let loader = match config.prompts.override_path() {
            Some(dir) => PromptLoader::new(dir),
            None => PromptLoader::embedded_only(),
        };
        Ok(Self::new(
            llm,
            loader,
            config.prompts.wrap_width,
            config.llm.max_tokens,
        ))
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Generate an evaluation prompt
    ///
    /// Selects the system template by exact variable-set match, renders the
    /// request, calls the model once and wraps the answer to the configured width.
    pub async fn generate(
        &self,
        variables: &VariableSet,
        criteria: &str,
        scoring_rubric: &str,
        examples: Option<&str>,
    ) -> Result<String, PromptError> {
        debug!(%variables, has_examples = examples.is_some(), "generate: called");
        let kind = TemplateKind::for_variables(variables.as_set())
            .ok_or_else(|| PromptError::UnsupportedVariables(variables.to_string()))?;

        let system_prompt = self
            .loader
            .system_prompt(kind)
            .map_err(|e| PromptError::Template(e.to_string()))?;
        let request = self
            .loader
            .render_request(&RequestContext::new(variables, criteria, scoring_rubric, examples))
            .map_err(|e| PromptError::Template(e.to_string()))?;

        info!(template = %kind, model = %self.llm.model(), "Generating evaluation prompt");
        let text = self.complete(system_prompt, request).await?;
        Ok(wrap::fill(&text, self.wrap_width))
    }

    /// Generate an evaluation prompt for a stored definition
    pub async fn generate_for(&self, definition: &MetricDefinition) -> Result<String, PromptError> {
        debug!(name = %definition.name, "generate_for: called");
        let examples = definition.few_shot_text();
        self.generate(
            &definition.input_variables,
            &definition.criteria,
            definition.scoring_rubric.text(),
            examples.as_deref(),
        )
        .await
    }

    /// Ask the model for one new few-shot example for this definition
    pub async fn generate_example(&self, definition: &MetricDefinition) -> Result<ExampleRecord, PromptError> {
        debug!(name = %definition.name, "generate_example: called");
        let context = ExampleContext {
            name: definition.name.to_string(),
            criteria: definition.criteria.clone(),
            rubric: definition.scoring_rubric.text().to_string(),
            fields: example_fields(&definition.input_variables).join(", "),
            existing: definition.few_shot_text(),
        };
        let system_prompt = self
            .loader
            .render_example(&context)
            .map_err(|e| PromptError::Template(e.to_string()))?;

        info!(name = %definition.name, "Generating few-shot example");
        let text = self
            .complete(system_prompt, "Write the example now.".to_string())
            .await?;
        parse_example(&text, &definition.input_variables)
    }

    async fn complete(&self, system_prompt: String, user: String) -> Result<String, PromptError> {
        let response = self
            .llm
            .complete(CompletionRequest::single(system_prompt, user, self.max_tokens))
            .await?;

        if response.stop_reason == StopReason::MaxTokens {
            warn!("Completion was truncated at the token limit");
        }

        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                warn!("No completion found");
                Err(PromptError::NoCompletion)
            }
        }
    }
}

/// JSON keys the example generator must fill, in display order
fn example_fields(vars: &VariableSet) -> Vec<&'static str> {
    let mut fields = vec!["input", "response"];
    if vars.contains(InputVariable::Context) {
        fields.push("context");
    }
    if vars.contains(InputVariable::Reference) {
        fields.push("reference");
    }
    fields.extend(["score", "critique"]);
    fields
}

/// Locate the JSON object in a model answer
///
/// A fenced code block wins over any braces in the surrounding prose; the
/// outermost brace pair is only the fallback.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(fence) = text.find("```") {
        let after = &text[fence + 3..];
        // Skip the info string (`json`, `JSON`, nothing) up to the newline
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        let block = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        };
        let block = block.trim();
        if block.starts_with('{') && block.ends_with('}') {
            return Some(block);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse the model's JSON answer, tolerating a surrounding code fence
fn parse_example(text: &str, vars: &VariableSet) -> Result<ExampleRecord, PromptError> {
    debug!(text_len = text.len(), "parse_example: called");
    let json = extract_json(text)
        .ok_or_else(|| PromptError::InvalidExample("no JSON object in response".to_string()))?;

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| PromptError::InvalidExample(e.to_string()))?;

    let field = |key: &str| -> Option<String> {
        match value.get(key)? {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    };
    let required = |key: &str| -> Result<String, PromptError> {
        field(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PromptError::InvalidExample(format!("missing field '{}'", key)))
    };

    Ok(ExampleRecord {
        input: required("input")?,
        response: required("response")?,
        reference: if vars.contains(InputVariable::Reference) {
            Some(required("reference")?)
        } else {
            None
        },
        context: if vars.contains(InputVariable::Context) {
            Some(required("context")?)
        } else {
            None
        },
        score: required("score")?,
        critique: required("critique")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, Role};
    use metricstore::{MetricName, ScoringRubric};

    fn templater(mock: Arc<MockLlmClient>, width: usize) -> PromptTemplater {
        PromptTemplater::new(mock, PromptLoader::embedded_only(), width, 4096)
    }

    fn definition(vars: &str) -> MetricDefinition {
        definition_with(vars, vec![])
    }

    fn definition_with(vars: &str, examples: Vec<ExampleRecord>) -> MetricDefinition {
        MetricDefinition::new(
            MetricName::parse("grounded_answer").unwrap(),
            "Is the answer supported by the context?",
            ScoringRubric::parse("1-5").unwrap(),
            VariableSet::parse(vars).unwrap(),
            examples,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_selects_template_and_wraps() {
        let long = "Score the answer carefully. ".repeat(10);
        let mock = Arc::new(MockLlmClient::with_texts(&[&long]));
        let t = templater(mock.clone(), 40);

        let vars = VariableSet::parse("input,response,reference").unwrap();
        let out = t.generate(&vars, "Matches reference", "1 to 5", None).await.unwrap();

        assert!(out.lines().all(|l| l.chars().count() <= 40));
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system_prompt.contains("REFERENCE RESPONSE:"));
        assert!(!requests[0].system_prompt.contains("CONTEXT:"));
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert!(requests[0].messages[0].content.contains("Evaluation criteria: Matches reference"));
        assert!(!requests[0].messages[0].content.contains("Few shot examples"));
    }

    #[tokio::test]
    async fn test_generate_includes_examples() {
        let mock = Arc::new(MockLlmClient::with_texts(&["prompt"]));
        let t = templater(mock.clone(), 80);

        let vars = VariableSet::parse("input,response,context").unwrap();
        t.generate(&vars, "Grounded", "1 to 5", Some("Example 1: ..."))
            .await
            .unwrap();

        let request = &mock.requests()[0];
        assert!(request.system_prompt.contains("Contextual Groundedness"));
        assert!(request.messages[0].content.contains("Few shot examples: Example 1: ..."));
    }

    #[tokio::test]
    async fn test_generate_empty_completion() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse::default()]));
        let t = templater(mock, 80);
        let err = t
            .generate(&VariableSet::default(), "Polite", "pass-fail", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::NoCompletion));
        assert_eq!(err.to_string(), "No completion found.");
    }

    #[tokio::test]
    async fn test_generate_surfaces_llm_failure() {
        let mock = Arc::new(MockLlmClient::new(vec![]));
        let t = templater(mock, 80);
        let err = t
            .generate(&VariableSet::default(), "Polite", "pass-fail", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::Llm(_)));
    }

    #[tokio::test]
    async fn test_generate_for_formats_examples() {
        let mock = Arc::new(MockLlmClient::with_texts(&["prompt"]));
        let t = templater(mock.clone(), 80);

        let def = definition_with(
            "input,response,context",
            vec![ExampleRecord {
                input: "Who wrote it?".to_string(),
                response: "Ada".to_string(),
                context: Some("Ada wrote it.".to_string()),
                score: "5".to_string(),
                critique: "Grounded.".to_string(),
                ..Default::default()
            }],
        );

        assert_eq!(t.generate_for(&def).await.unwrap(), "prompt");
        let content = &mock.requests()[0].messages[0].content;
        assert!(content.contains("Scoring rubric: Score from 1 (worst) to 5 (best)"));
        assert!(content.contains("QUESTION: Who wrote it?"));
        assert!(content.contains("CONTEXT: Ada wrote it."));
    }

    #[tokio::test]
    async fn test_generate_example_parses_fenced_json() {
        let answer = "```json\n{\"input\": \"What is 2+2?\", \"response\": \"4\", \"context\": \"Arithmetic.\", \"score\": 5, \"critique\": \"Correct and grounded.\"}\n```";
        let mock = Arc::new(MockLlmClient::with_texts(&[answer]));
        let t = templater(mock.clone(), 80);

        let example = t.generate_example(&definition("input,response,context")).await.unwrap();
        assert_eq!(example.input, "What is 2+2?");
        assert_eq!(example.context.as_deref(), Some("Arithmetic."));
        assert_eq!(example.reference, None);
        assert_eq!(example.score, "5");

        let system = &mock.requests()[0].system_prompt;
        assert!(system.contains("Fields to fill: input, response, context, score, critique"));
    }

    #[tokio::test]
    async fn test_generate_example_rejects_missing_fields() {
        let mock = Arc::new(MockLlmClient::with_texts(&["{\"input\": \"q\", \"response\": \"a\"}"]));
        let t = templater(mock, 80);
        let err = t.generate_example(&definition("input,response")).await.unwrap_err();
        assert!(matches!(err, PromptError::InvalidExample(ref m) if m.contains("score")));
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let mut config = Config::default();
        config.llm.provider = "other".to_string();
        assert!(matches!(
            PromptTemplater::from_config(&config),
            Err(PromptError::Llm(LlmError::Config(_)))
        ));
    }

    #[test]
    fn test_parse_example_fence_wins_over_braces_in_preamble() {
        let text = "Here is an example that uses {input} and {response}:\n```json\n{\"input\": \"q\", \"response\": \"a\", \"score\": \"4\", \"critique\": \"Fine.\"}\n```\nLet me know if you need more {examples}.";
        let example = parse_example(text, &VariableSet::default()).unwrap();
        assert_eq!(example.input, "q");
        assert_eq!(example.score, "4");
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("Sure: {\"a\": {\"b\": 2}} done"), Some("{\"a\": {\"b\": 2}}"));
        assert_eq!(extract_json("```text\nno json here\n```"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_example_without_json() {
        let err = parse_example("I cannot do that.", &VariableSet::default()).unwrap_err();
        assert!(matches!(err, PromptError::InvalidExample(_)));
    }

    #[test]
    fn test_example_fields() {
        let vars = VariableSet::parse("input,response,reference,context").unwrap();
        assert_eq!(
            example_fields(&vars),
            vec!["input", "response", "context", "reference", "score", "critique"]
        );
    }
}
