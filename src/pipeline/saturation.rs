//! Saturation evaluator: tracks which success criteria are covered and
//! whether a component's research has run dry.

use serde_json::json;
use tracing::warn;

use crate::llm::generate;
use crate::model::{Component, SaturationResult};
use crate::prompts::{self, PromptName};

use super::Capabilities;

/// Classify each success criterion as covered/remaining and return an
/// overall coverage percentage. Short-circuits to
/// `isSaturated=false, coverage=0` while `completed_iterations` is below
/// the minimal-iteration gate.
pub async fn evaluate_saturation(
    caps: &Capabilities<'_>,
    component: &Component,
    learnings: &[String],
    completed_iterations: u32,
    planned_iterations: u32,
) -> SaturationResult {
    let gate = (planned_iterations as f64 * caps.saturation.minimal_iteration_gate_pct).ceil() as u32;
    if completed_iterations < gate.max(1) {
        return SaturationResult::not_enough_iterations(&component.success_criteria);
    }

    let context = json!({
        "component_name": component.name,
        "success_criteria": component.success_criteria,
        "learnings": learnings,
    });

    let rendered = match prompts::render(PromptName::Saturation, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render saturation prompt: {e}");
            return SaturationResult::llm_error_fallback();
        }
    };

    match generate::<SaturationResult>(caps.llm, "You evaluate research coverage.", &rendered).await {
        Ok(mut result) => {
            result.coverage_percentage = result.coverage_percentage.min(100);
            result
        }
        Err(e) => {
            warn!("saturation evaluator LLM call failed: {e}");
            SaturationResult::llm_error_fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaturationConfig, TextBudgetConfig};
    use crate::llm::testing::ScriptedLlmClient;
    use crate::search::testing::ScriptedSearchClient;

    fn component() -> Component {
        Component {
            name: "A".to_string(),
            description: "d".to_string(),
            sub_questions: vec!["q".to_string()],
            success_criteria: vec!["c1".to_string(), "c2".to_string()],
        }
    }

    #[tokio::test]
    async fn short_circuits_below_minimal_iteration_gate() {
        let llm = ScriptedLlmClient::always_error("should not be called");
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

        let result = evaluate_saturation(&caps, &component(), &[], 0, 10).await;
        assert!(!result.is_saturated);
        assert_eq!(result.coverage_percentage, 0);
    }

    #[tokio::test]
    async fn clamps_coverage_to_100() {
        let response = r#"{"isSaturated":true,"coveragePercentage":140,"coveredCriteria":["c1","c2"],"remainingCriteria":[],"gapDetails":{},"reasoning":"done"}"#;
        let llm = ScriptedLlmClient::new(vec![Ok(response.to_string())]);
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

        let result = evaluate_saturation(&caps, &component(), &["l".to_string()], 5, 10).await;
        assert_eq!(result.coverage_percentage, 100);
    }

    #[tokio::test]
    async fn llm_failure_yields_continue_semantics() {
        let llm = ScriptedLlmClient::always_error("boom");
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

        let result = evaluate_saturation(&caps, &component(), &["l".to_string()], 5, 10).await;
        assert!(!result.is_saturated);
        assert_eq!(result.coverage_percentage, 0);
    }
}
