//! Metric definition model

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{MAX_EXAMPLES, MetricError, MetricName};

/// A variable the evaluation prompt may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputVariable {
    Input,
    Response,
    Reference,
    Context,
}

impl InputVariable {
    pub const ALL: [InputVariable; 4] = [
        InputVariable::Input,
        InputVariable::Response,
        InputVariable::Reference,
        InputVariable::Context,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Response => "response",
            Self::Reference => "reference",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for InputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputVariable {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "input" => Ok(Self::Input),
            "response" => Ok(Self::Response),
            "reference" => Ok(Self::Reference),
            "context" => Ok(Self::Context),
            other => Err(MetricError::UnknownVariable(other.to_string())),
        }
    }
}

/// Set of input variables; always contains `input` and `response`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeSet<InputVariable>", into = "BTreeSet<InputVariable>")]
pub struct VariableSet(BTreeSet<InputVariable>);

impl VariableSet {
    /// Build a set, requiring `input` and `response`
    pub fn new(vars: impl IntoIterator<Item = InputVariable>) -> Result<Self, MetricError> {
        let set: BTreeSet<InputVariable> = vars.into_iter().collect();
        debug!(?set, "VariableSet::new: called");
        if !set.contains(&InputVariable::Input) {
            return Err(MetricError::MissingRequiredVariable("input"));
        }
        if !set.contains(&InputVariable::Response) {
            return Err(MetricError::MissingRequiredVariable("response"));
        }
        Ok(Self(set))
    }

    /// Parse a comma or whitespace separated list such as `input,response,context`
    pub fn parse(list: &str) -> Result<Self, MetricError> {
        debug!(%list, "VariableSet::parse: called");
        let vars = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(InputVariable::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(vars)
    }

    pub fn contains(&self, var: InputVariable) -> bool {
        self.0.contains(&var)
    }

    pub fn iter(&self) -> impl Iterator<Item = InputVariable> + '_ {
        self.0.iter().copied()
    }

    pub fn as_set(&self) -> &BTreeSet<InputVariable> {
        &self.0
    }
}

impl Default for VariableSet {
    fn default() -> Self {
        Self([InputVariable::Input, InputVariable::Response].into_iter().collect())
    }
}

impl fmt::Display for VariableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|v| v.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

impl TryFrom<BTreeSet<InputVariable>> for VariableSet {
    type Error = MetricError;

    fn try_from(value: BTreeSet<InputVariable>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VariableSet> for BTreeSet<InputVariable> {
    fn from(set: VariableSet) -> Self {
        set.0
    }
}

/// Predefined scoring scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RubricPreset {
    #[serde(rename = "1-5")]
    OneToFive,
    #[serde(rename = "1-10")]
    OneToTen,
    #[serde(rename = "pass-fail")]
    PassFail,
    #[serde(rename = "0-100")]
    Percentage,
}

impl RubricPreset {
    pub const ALL: [RubricPreset; 4] = [
        RubricPreset::OneToFive,
        RubricPreset::OneToTen,
        RubricPreset::PassFail,
        RubricPreset::Percentage,
    ];

    /// Short key used to select the preset
    pub fn key(&self) -> &'static str {
        match self {
            Self::OneToFive => "1-5",
            Self::OneToTen => "1-10",
            Self::PassFail => "pass-fail",
            Self::Percentage => "0-100",
        }
    }

    /// Text sent to the model
    pub fn description(&self) -> &'static str {
        match self {
            Self::OneToFive => "Score from 1 (worst) to 5 (best)",
            Self::OneToTen => "Score from 1 (worst) to 10 (best)",
            Self::PassFail => "Binary score: 0 (fail) or 1 (pass)",
            Self::Percentage => "Score from 0 (worst) to 100 (best)",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key().eq_ignore_ascii_case(key.trim()))
    }
}

/// A scoring rubric: a preset scale or free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ScoringRubric {
    Preset(RubricPreset),
    Custom(String),
}

impl ScoringRubric {
    /// Parse user input; preset keys select a preset, anything else is custom text
    pub fn parse(text: &str) -> Result<Self, MetricError> {
        debug!(%text, "ScoringRubric::parse: called");
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MetricError::MissingField("scoring rubric"));
        }
        match RubricPreset::from_key(trimmed) {
            Some(preset) => {
                debug!(?preset, "ScoringRubric::parse: matched preset");
                Ok(Self::Preset(preset))
            }
            None => Ok(Self::Custom(trimmed.to_string())),
        }
    }

    /// Text sent to the model
    pub fn text(&self) -> &str {
        match self {
            Self::Preset(preset) => preset.description(),
            Self::Custom(text) => text,
        }
    }
}

impl fmt::Display for ScoringRubric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A few-shot example used to steer the generated prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub input: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub score: String,
    pub critique: String,
}

impl ExampleRecord {
    /// Render this example for the few-shot section, limited to the given variables
    pub fn render(&self, index: usize, vars: &VariableSet) -> String {
        let mut out = format!("Example {}:\nQUESTION: {}\n", index, self.input);
        if vars.contains(InputVariable::Context)
            && let Some(context) = &self.context
        {
            out.push_str(&format!("CONTEXT: {}\n", context));
        }
        if vars.contains(InputVariable::Reference)
            && let Some(reference) = &self.reference
        {
            out.push_str(&format!("REFERENCE RESPONSE: {}\n", reference));
        }
        out.push_str(&format!(
            "AI ASSISTANT ANSWER: {}\nSCORE: {}\nCRITIQUE: {}",
            self.response, self.score, self.critique
        ));
        out
    }
}

/// A named evaluation metric and its generated prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub name: MetricName,
    pub criteria: String,
    pub scoring_rubric: ScoringRubric,
    pub input_variables: VariableSet,
    #[serde(default, deserialize_with = "deserialize_examples")]
    examples: Vec<ExampleRecord>,
    /// Current prompt, possibly edited by the user
    #[serde(default)]
    pub prompt: String,
    /// Last prompt returned by the generator
    #[serde(default)]
    pub generated_prompt: String,
    pub updated_at: DateTime<Utc>,
}

impl MetricDefinition {
    /// Validate the form fields and build a definition with no prompt yet
    pub fn new(
        name: MetricName,
        criteria: impl Into<String>,
        scoring_rubric: ScoringRubric,
        input_variables: VariableSet,
        examples: Vec<ExampleRecord>,
    ) -> Result<Self, MetricError> {
        let criteria = criteria.into();
        debug!(%name, example_count = examples.len(), "MetricDefinition::new: called");
        if criteria.trim().is_empty() {
            return Err(MetricError::MissingField("criteria"));
        }
        if let ScoringRubric::Custom(text) = &scoring_rubric
            && text.trim().is_empty()
        {
            return Err(MetricError::MissingField("scoring rubric"));
        }
        if examples.len() > MAX_EXAMPLES {
            return Err(MetricError::TooManyExamples);
        }
        Ok(Self {
            name,
            criteria,
            scoring_rubric,
            input_variables,
            examples,
            prompt: String::new(),
            generated_prompt: String::new(),
            updated_at: Utc::now(),
        })
    }

    pub fn examples(&self) -> &[ExampleRecord] {
        &self.examples
    }

    /// Few-shot section text, or `None` when there are no examples
    pub fn few_shot_text(&self) -> Option<String> {
        if self.examples.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .examples
            .iter()
            .enumerate()
            .map(|(i, ex)| ex.render(i + 1, &self.input_variables))
            .collect();
        Some(rendered.join("\n\n"))
    }

    /// Serialize for deployment to an evaluation harness
    pub fn to_yaml(&self) -> Result<String, MetricError> {
        serde_yaml::to_string(self).map_err(|e| MetricError::Serialize(e.to_string()))
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn deserialize_examples<'de, D>(deserializer: D) -> Result<Vec<ExampleRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let examples = Vec::<ExampleRecord>::deserialize(deserializer)?;
    if examples.len() > MAX_EXAMPLES {
        return Err(serde::de::Error::custom(MetricError::TooManyExamples));
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> MetricName {
        MetricName::parse(s).unwrap()
    }

    fn example(tag: &str) -> ExampleRecord {
        ExampleRecord {
            input: format!("question {tag}"),
            response: format!("answer {tag}"),
            reference: Some(format!("reference {tag}")),
            context: Some(format!("context {tag}")),
            score: "4".to_string(),
            critique: "Mostly right".to_string(),
        }
    }

    #[test]
    fn test_variable_set_requires_input_and_response() {
        assert_eq!(
            VariableSet::new([InputVariable::Response]),
            Err(MetricError::MissingRequiredVariable("input"))
        );
        assert_eq!(
            VariableSet::new([InputVariable::Input, InputVariable::Context]),
            Err(MetricError::MissingRequiredVariable("response"))
        );
        assert!(VariableSet::new([InputVariable::Input, InputVariable::Response]).is_ok());
    }

    #[test]
    fn test_variable_set_parse() {
        let set = VariableSet::parse("input, response context").unwrap();
        assert!(set.contains(InputVariable::Context));
        assert!(!set.contains(InputVariable::Reference));
        assert_eq!(set.to_string(), "input, response, context");

        assert_eq!(
            VariableSet::parse("input,response,history"),
            Err(MetricError::UnknownVariable("history".to_string()))
        );
        assert_eq!(
            VariableSet::parse("response"),
            Err(MetricError::MissingRequiredVariable("input"))
        );
    }

    #[test]
    fn test_variable_set_deserialize_validates() {
        assert!(serde_yaml::from_str::<VariableSet>("[input, response, reference]").is_ok());
        assert!(serde_yaml::from_str::<VariableSet>("[response]").is_err());
    }

    #[test]
    fn test_rubric_parse() {
        assert_eq!(
            ScoringRubric::parse("1-5").unwrap(),
            ScoringRubric::Preset(RubricPreset::OneToFive)
        );
        assert_eq!(
            ScoringRubric::parse(" PASS-FAIL ").unwrap(),
            ScoringRubric::Preset(RubricPreset::PassFail)
        );
        assert_eq!(
            ScoringRubric::parse("one point per format").unwrap(),
            ScoringRubric::Custom("one point per format".to_string())
        );
        assert_eq!(
            ScoringRubric::parse("   "),
            Err(MetricError::MissingField("scoring rubric"))
        );
        assert_eq!(
            ScoringRubric::Preset(RubricPreset::OneToTen).text(),
            "Score from 1 (worst) to 10 (best)"
        );
    }

    #[test]
    fn test_definition_requires_criteria() {
        let result = MetricDefinition::new(
            name("tone"),
            "  ",
            ScoringRubric::Preset(RubricPreset::OneToFive),
            VariableSet::default(),
            vec![],
        );
        assert_eq!(result, Err(MetricError::MissingField("criteria")));
    }

    #[test]
    fn test_definition_rejects_four_examples() {
        let result = MetricDefinition::new(
            name("tone"),
            "Is the tone polite?",
            ScoringRubric::Preset(RubricPreset::OneToFive),
            VariableSet::default(),
            vec![example("a"), example("b"), example("c"), example("d")],
        );
        assert_eq!(result, Err(MetricError::TooManyExamples));
    }

    #[test]
    fn test_few_shot_text_respects_variables() {
        let def = MetricDefinition::new(
            name("grounded"),
            "Is the answer grounded?",
            ScoringRubric::Preset(RubricPreset::OneToFive),
            VariableSet::parse("input,response,context").unwrap(),
            vec![example("a")],
        )
        .unwrap();

        let text = def.few_shot_text().unwrap();
        assert!(text.starts_with("Example 1:\nQUESTION: question a"));
        assert!(text.contains("CONTEXT: context a"));
        assert!(!text.contains("REFERENCE RESPONSE"));
        assert!(text.ends_with("CRITIQUE: Mostly right"));
    }

    #[test]
    fn test_few_shot_text_none_without_examples() {
        let def = MetricDefinition::new(
            name("tone"),
            "Is the tone polite?",
            ScoringRubric::Custom("1 or 0".to_string()),
            VariableSet::default(),
            vec![],
        )
        .unwrap();
        assert!(def.few_shot_text().is_none());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_invariants() {
        let mut def = MetricDefinition::new(
            name("reference_match"),
            "Does the answer match the reference?",
            ScoringRubric::Preset(RubricPreset::OneToFive),
            VariableSet::parse("input,response,reference").unwrap(),
            vec![example("a")],
        )
        .unwrap();
        def.prompt = "Evaluate the answer.".to_string();

        let yaml = def.to_yaml().unwrap();
        assert!(yaml.contains("name: reference_match"));
        assert!(yaml.contains("kind: preset"));

        let back: MetricDefinition = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, def);

        let tampered = yaml.replace("name: reference_match", "name: Toxicity");
        assert!(serde_yaml::from_str::<MetricDefinition>(&tampered).is_err());
    }
}
