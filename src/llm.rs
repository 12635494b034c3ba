//! LLM capability boundary and structured-output contracts.
//!
//! The LLM provider client itself is out of scope: it is treated purely as
//! a capability to "produce a JSON object matching a schema". Every
//! structured call funnels through [`generate`], which validates the
//! model's JSON against a `schemars`-derived schema before trusting it,
//! rather than relying on partial/best-effort parsing.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

/// A capability to turn `(system prompt, user prompt)` into raw text.
/// Concrete implementations live outside this crate's scope; this trait is
/// the seam the orchestrator depends on instead of any particular provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Extract a JSON block from raw LLM text: a ```json fenced block if
/// present, otherwise the widest brace-matched span.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return Some(text[content_start..content_start + end].trim());
        }
    }
    if let Some(start) = text.find('{')
        && let Some(end) = text.rfind('}')
    {
        return Some(&text[start..=end]);
    }
    None
}

/// Validate `text` as JSON matching `T`'s schema and deserialize it.
fn validate_and_parse<T: DeserializeOwned + JsonSchema>(text: &str) -> Result<T> {
    let json_str = extract_json_block(text).ok_or_else(|| anyhow!("no JSON block in LLM response"))?;
    let value: serde_json::Value =
        serde_json::from_str(json_str).context("LLM response was not valid JSON")?;

    let schema = schemars::schema_for!(T);
    let schema_value = serde_json::to_value(&schema).context("failed to serialize schema")?;
    let compiled = jsonschema::validator_for(&schema_value).context("failed to compile schema")?;
    if !compiled.is_valid(&value) {
        return Err(anyhow!("LLM response failed schema validation"));
    }

    serde_json::from_value(value).context("LLM response did not deserialize into the expected type")
}

/// The single structured-generation primitive every pipeline stage uses.
/// Renders `user` against `system`, validates the response, and returns a
/// typed value. Callers are expected to catch the `Err` and substitute the
/// stage's documented local fallback — this function never retries.
pub async fn generate<T: DeserializeOwned + JsonSchema>(
    client: &dyn LlmClient,
    system: &str,
    user: &str,
) -> Result<T> {
    let text = client.complete(system, user).await?;
    validate_and_parse(&text)
}

// ============================================================================
// Structured-output contracts
// ============================================================================

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
pub struct ImportanceScores {
    pub scores: HashMap<String, f64>,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubQuery {
    pub query: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
pub struct SubQueries {
    pub queries: Vec<SubQuery>,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
pub struct SummarizerOutput {
    /// At most 5 factual learnings.
    pub learnings: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub summary: String,
    pub valuable: bool,
    pub gaps: Vec<String>,
    pub should_continue: bool,
    pub next_search_topic: String,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualityOutput {
    pub meets_quality: bool,
    pub missing_elements: Vec<String>,
    pub additional_queries: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
pub struct ComponentSummaryOutput {
    pub summary: String,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutput {
    pub section_content: String,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FallbackReportOutput {
    pub report_markdown: String,
}

#[derive(Debug, Clone, serde::Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingDecisionOutput {
    pub should_continue: bool,
    pub reasoning: String,
    pub recommended_breadth: u32,
    pub recommended_depth: u32,
}

pub mod testing {
    //! A scripted [`LlmClient`] for unit and integration tests. Avoids any
    //! network dependency; responses are matched in call order.

    use super::*;
    use tokio::sync::Mutex;

    pub struct ScriptedLlmClient {
        responses: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedLlmClient {
        /// Responses are consumed front-to-back; once exhausted, the client
        /// returns an error (surfacing "ran out of script" as an LLM failure,
        /// which pipeline stages must already tolerate).
        pub fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
            }
        }

        pub fn always_error(message: &str) -> Self {
            Self {
                responses: Mutex::new(vec![Err(message.to_string())]),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlmClient {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            let mut responses = self.responses.lock().await;
            match responses.pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(anyhow!(e)),
                None => {
                    if let Some(last) = responses.first().cloned() {
                        return last.map_err(|e| anyhow!(e));
                    }
                    Err(anyhow!("scripted client exhausted"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let text = "Here you go:\n```json\n{\"query\": \"x\", \"reasoning\": \"y\"}\n```\n";
        assert_eq!(
            extract_json_block(text),
            Some(r#"{"query": "x", "reasoning": "y"}"#)
        );
    }

    #[test]
    fn extracts_raw_braces_when_no_fence() {
        let text = "some preamble {\"a\": 1} trailing";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn rejects_schema_mismatch() {
        let text = "{\"wrong_field\": 1}";
        let parsed: Result<SummarizerOutput> = validate_and_parse(text);
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_valid_summarizer_output() {
        let text = "```json\n{\"learnings\": [\"a\", \"b\"]}\n```";
        let parsed: SummarizerOutput = validate_and_parse(text).unwrap();
        assert_eq!(parsed.learnings, vec!["a".to_string(), "b".to_string()]);
    }
}
