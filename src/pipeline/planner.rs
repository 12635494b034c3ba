//! Planner: turns a query and any clarifying Q&A into a structured research
//! plan.

use serde_json::json;
use tracing::warn;

use crate::config::FeedbackPair;
use crate::llm::generate;
use crate::model::ResearchPlan;
use crate::prompts::{self, PromptName};

use super::Capabilities;

/// Given `(query, optional Q&A pairs)`, produce a valid `ResearchPlan`. On
/// LLM failure or a structurally invalid response, fall back to the minimal
/// single-component plan.
pub async fn create_plan(caps: &Capabilities<'_>, query: &str, qa_pairs: &[FeedbackPair]) -> ResearchPlan {
    let context = json!({
        "query": query,
        "qa_pairs": qa_pairs.iter().map(|p| json!({"question": p.question, "response": p.response})).collect::<Vec<_>>(),
    });

    let rendered = match prompts::render(PromptName::Plan, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render plan prompt: {e}; using minimal plan");
            return ResearchPlan::minimal(query);
        }
    };

    match generate::<ResearchPlan>(caps.llm, "You are a meticulous research planner.", &rendered).await {
        Ok(plan) => match plan.validate() {
            Ok(()) => plan,
            Err(reason) => {
                warn!("planner returned an invalid plan ({reason}); using minimal plan");
                ResearchPlan::minimal(query)
            }
        },
        Err(e) => {
            warn!("planner LLM call failed: {e}; using minimal plan");
            ResearchPlan::minimal(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaturationConfig, TextBudgetConfig};
    use crate::llm::testing::ScriptedLlmClient;
    use crate::search::testing::ScriptedSearchClient;

    #[tokio::test]
    async fn falls_back_to_minimal_plan_on_llm_error() {
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

        let plan = create_plan(&caps, "impact of four-day workweek on productivity", &[]).await;
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].name, "Basic Research");
    }

    #[tokio::test]
    async fn accepts_a_valid_llm_plan() {
        let response = r#"{"mainObjective":"obj","components":[
            {"name":"A","description":"d","subQuestions":["q1"],"successCriteria":["c1"]},
            {"name":"B","description":"d","subQuestions":["q2"],"successCriteria":["c2"]}
        ],"sequencing":["A","B"],"potentialPivots":[]}"#;
        let llm = ScriptedLlmClient::new(vec![Ok(response.to_string())]);
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

        let plan = create_plan(&caps, "q", &[]).await;
        assert_eq!(plan.components.len(), 2);
        assert_eq!(plan.sequencing, vec!["A".to_string(), "B".to_string()]);
    }
}
