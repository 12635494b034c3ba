//! Quick-pass runner.
//!
//! One cheap deep-research call per component at breadth=2/depth=1, launched
//! concurrently. No worker shares mutable state with another: a failure in
//! one component's research must never abort the others.

use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::model::{Component, ComponentResult};

use super::researcher::deep_research;
use super::Capabilities;

const QUICK_PASS_BREADTH: usize = 2;
const QUICK_PASS_DEPTH: usize = 1;

/// Run the quick pass over every component and return one [`ComponentResult`]
/// per component, in the same order as `components`. A component whose
/// sub-routine fails to produce anything useful still gets a result with an
/// empty summary rather than dropping out of the vector.
pub async fn run_quick_pass(
    caps: &Capabilities<'_>,
    components: &[Component],
    per_component_budget: Duration,
    cancel: &CancellationToken,
) -> Vec<ComponentResult> {
    let futures = components.iter().map(|component| {
        let query = component.sub_questions.first().cloned().unwrap_or_else(|| component.name.clone());
        async move {
            let outcome = deep_research(
                caps,
                component,
                &query,
                QUICK_PASS_BREADTH,
                QUICK_PASS_DEPTH,
                per_component_budget,
                cancel,
            )
            .await;

            if outcome.learnings.is_empty() {
                warn!("quick pass for component '{}' produced no learnings", component.name);
            }

            ComponentResult {
                learnings: outcome.learnings,
                visited_urls: outcome.visited_urls,
                summary: String::new(),
                time_spent_ms: outcome.elapsed.as_millis() as u64,
            }
        }
    });

    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaturationConfig, TextBudgetConfig};
    use crate::llm::testing::ScriptedLlmClient;
    use crate::search::testing::ScriptedSearchClient;

    fn components() -> Vec<Component> {
        vec![
            Component {
                name: "A".to_string(),
                description: "d".to_string(),
                sub_questions: vec!["question a".to_string()],
                success_criteria: vec!["c1".to_string()],
            },
            Component {
                name: "B".to_string(),
                description: "d".to_string(),
                sub_questions: vec!["question b".to_string()],
                success_criteria: vec!["c2".to_string()],
            },
        ]
    }

    #[tokio::test]
    async fn runs_one_result_per_component_even_on_total_failure() {
        let llm = ScriptedLlmClient::always_error("boom");
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };
        let cancel = CancellationToken::new();

        let results = run_quick_pass(&caps, &components(), Duration::from_secs(60), &cancel).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.summary.is_empty()));
    }
}
