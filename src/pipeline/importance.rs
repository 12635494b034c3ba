//! Importance scorer: weighs each component's relative contribution to the
//! main objective so the rebalancer can bias depth toward what matters most.

use std::collections::HashMap;

use serde_json::json;
use tracing::warn;

use crate::llm::generate;
use crate::model::ResearchPlan;
use crate::prompts::{self, PromptName};

use super::Capabilities;

/// Returns `name -> score`, intended to sum to ~100. On failure, equal
/// allocation `100 / |components|`.
pub async fn score_components(caps: &Capabilities<'_>, plan: &ResearchPlan) -> HashMap<String, f64> {
    let equal_allocation = || {
        let share = 100.0 / plan.components.len().max(1) as f64;
        plan.components.iter().map(|c| (c.name.clone(), share)).collect()
    };

    let context = json!({
        "main_objective": plan.main_objective,
        "components": plan.components.iter().map(|c| json!({"name": c.name, "description": c.description})).collect::<Vec<_>>(),
    });

    let rendered = match prompts::render(PromptName::Importance, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render importance prompt: {e}");
            return equal_allocation();
        }
    };

    match generate::<crate::llm::ImportanceScores>(caps.llm, "You score research component importance.", &rendered)
        .await
    {
        Ok(result) => {
            let mut scores = equal_allocation();
            for (name, score) in result.scores {
                if scores.contains_key(&name) {
                    scores.insert(name, score);
                }
            }
            scores
        }
        Err(e) => {
            warn!("importance scorer LLM call failed: {e}; using equal allocation");
            equal_allocation()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaturationConfig, TextBudgetConfig};
    use crate::llm::testing::ScriptedLlmClient;
    use crate::model::Component;
    use crate::search::testing::ScriptedSearchClient;

    fn plan() -> ResearchPlan {
        ResearchPlan {
            main_objective: "obj".to_string(),
            components: vec![
                Component {
                    name: "A".to_string(),
                    description: "d".to_string(),
                    sub_questions: vec!["q".to_string()],
                    success_criteria: vec!["c".to_string()],
                },
                Component {
                    name: "B".to_string(),
                    description: "d".to_string(),
                    sub_questions: vec!["q".to_string()],
                    success_criteria: vec!["c".to_string()],
                },
            ],
            sequencing: vec!["A".to_string(), "B".to_string()],
            potential_pivots: vec![],
        }
    }

    #[tokio::test]
    async fn equal_allocation_on_failure() {
        let llm = ScriptedLlmClient::always_error("boom");
        let search = ScriptedSearchClient::always_empty();
        let text_budget = TextBudgetConfig::default();
        let saturation = SaturationConfig::default();
        let caps = Capabilities {
            llm: &llm,
            search: &search,
            prompts_dir: None,
            text_budget: &text_budget,
            saturation: &saturation,
        };

        let scores = score_components(&caps, &plan()).await;
        assert_eq!(scores["A"], 50.0);
        assert_eq!(scores["B"], 50.0);
    }

    #[tokio::test]
    async fn uses_llm_scores_when_valid() {
        let llm = ScriptedLlmClient::new(vec![Ok(r#"{"scores": {"A": 70, "B": 30}}"#.to_string())]);
        let search = ScriptedSearchClient::always_empty();
        let text_budget = TextBudgetConfig::default();
        let saturation = SaturationConfig::default();
        let caps = Capabilities {
            llm: &llm,
            search: &search,
            prompts_dir: None,
            text_budget: &text_budget,
            saturation: &saturation,
        };

        let scores = score_components(&caps, &plan()).await;
        assert_eq!(scores["A"], 70.0);
        assert_eq!(scores["B"], 30.0);
    }
}
