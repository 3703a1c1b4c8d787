//! Hint and validation collaborator
//!
//! The lab never depends on a specific backend. Front ends plug in a
//! [`Mentor`] and wrap it in [`DegradingMentor`] so that any failure turns
//! into the fixed fallback answers instead of an error.

use async_trait::async_trait;
use autolab_common::{ApiStyle, Error, Result, Scenario};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Hint returned when the hint service fails
pub const HINT_FALLBACK: &str = "I'm sorry, I encountered an error while processing your request.";

/// Hint returned when the service answered with nothing
pub const HINT_EMPTY: &str = "I'm sorry, I couldn't generate a helpful response at this time.";

/// Feedback returned when the validation service fails
pub const VALIDATION_FALLBACK: &str = "Validation service is temporarily unavailable.";

/// Verdict on a learner's solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_correct: bool,
    pub feedback: String,
}

impl Validation {
    pub fn unavailable() -> Self {
        Self {
            is_correct: false,
            feedback: VALIDATION_FALLBACK.to_string(),
        }
    }
}

/// Remote hint/validation service
#[async_trait]
pub trait Mentor: Send + Sync {
    /// Answer a learner question in the context of a scenario
    async fn hint(&self, question: &str, style: ApiStyle, scenario_description: Option<&str>) -> Result<String>;

    /// Judge a solution against a scenario
    async fn validate(&self, code: &str, scenario: &Scenario, style: ApiStyle) -> Result<Validation>;
}

#[async_trait]
impl<M: Mentor + ?Sized> Mentor for Box<M> {
    async fn hint(&self, question: &str, style: ApiStyle, scenario_description: Option<&str>) -> Result<String> {
        (**self).hint(question, style, scenario_description).await
    }

    async fn validate(&self, code: &str, scenario: &Scenario, style: ApiStyle) -> Result<Validation> {
        (**self).validate(code, scenario, style).await
    }
}

/// Mentor used when no service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineMentor;

#[async_trait]
impl Mentor for OfflineMentor {
    async fn hint(&self, _question: &str, _style: ApiStyle, _scenario_description: Option<&str>) -> Result<String> {
        Err(Error::ServiceUnavailable("no mentor endpoint configured".to_string()))
    }

    async fn validate(&self, _code: &str, _scenario: &Scenario, _style: ApiStyle) -> Result<Validation> {
        Err(Error::ServiceUnavailable("no mentor endpoint configured".to_string()))
    }
}

/// Wraps a mentor so that failures degrade to the fixed fallbacks
pub struct DegradingMentor<M> {
    inner: M,
}

impl<M: Mentor> DegradingMentor<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub async fn hint(&self, question: &str, style: ApiStyle, scenario_description: Option<&str>) -> String {
        match self.inner.hint(question, style, scenario_description).await {
            Ok(answer) if answer.trim().is_empty() => HINT_EMPTY.to_string(),
            Ok(answer) => answer,
            Err(e) => {
                warn!("Hint service failed: {}", e);
                HINT_FALLBACK.to_string()
            }
        }
    }

    pub async fn validate(&self, code: &str, scenario: &Scenario, style: ApiStyle) -> Validation {
        match self.inner.validate(code, scenario, style).await {
            Ok(validation) => validation,
            Err(e) => {
                warn!("Validation service failed: {}", e);
                Validation::unavailable()
            }
        }
    }
}

/// Prompt sent to the hint service
pub fn hint_prompt(question: &str, style: ApiStyle, scenario_description: Option<&str>) -> String {
    format!(
        "You are a world-class {style} automation expert. Help the user with their question about {style}.\n\
         Context: The user is practicing on an app with the following scenario: {context}.\n\n\
         User Question: {question}\n\n\
         Provide clear, concise code snippets for {style} and explanations. Use Markdown formatting.",
        style = style,
        context = scenario_description.unwrap_or("General Learning"),
        question = question,
    )
}

/// Prompt sent to the validation service
pub fn validation_prompt(code: &str, scenario: &Scenario, style: ApiStyle) -> String {
    format!(
        "ACT AS A CODE REVIEWER FOR {upper}.\n\
         Challenge: {title}\n\
         Tool: {style}\n\
         Description: {description}\n\
         Objectives: {objectives}\n\
         Reference {style} Snippet: {reference}\n\n\
         User's Attempt ({style}):\n```typescript\n{code}\n```\n\n\
         Review the user's attempt specifically using {style} syntax.\n\
         1. Is it functionally correct for {style}?\n\
         2. Does it meet all objectives?\n\
         3. Give 2 constructive tips for improvement if needed.\n\n\
         Your output must be JSON with the fields isCorrect (boolean) and feedback (markdown string).",
        upper = style.to_string().to_uppercase(),
        title = scenario.title,
        style = style,
        description = scenario.description,
        objectives = scenario.learning_objectives.join(", "),
        reference = scenario.reference_code(style),
        code = code,
    )
}

/// Parse a validation answer, tolerating a fenced JSON block
pub fn parse_validation(text: &str) -> Result<Validation> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(body.trim())?)
}
