//! Turns summarized learnings into a structured analysis: a digest,
//! a valuable/not-valuable call, and the gap map driving the next round
//! of sub-queries.

use serde_json::json;
use tracing::warn;

use crate::llm::{AnalysisOutput, generate};
use crate::prompts::{self, PromptName};
use crate::text::{basics_topic, simplify_query};

use super::Capabilities;

/// Given summarized learnings for a query, produce the analysis contract.
/// `raw_bodies` are the page bodies the learnings were summarized from,
/// used only to detect the empty/low-content short-circuit.
pub async fn analyze(caps: &Capabilities<'_>, query: &str, learnings: &[String], raw_bodies: &[String]) -> AnalysisOutput {
    let no_useful_content = raw_bodies.is_empty() || raw_bodies.iter().all(|b| b.len() < 50);
    if no_useful_content {
        return AnalysisOutput {
            summary: String::new(),
            valuable: false,
            gaps: Vec::new(),
            should_continue: true,
            next_search_topic: basics_topic(query),
        };
    }

    let context = json!({"query": query, "learnings": learnings});
    let rendered = match prompts::render(PromptName::Analysis, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render analysis prompt: {e}");
            return error_fallback(query, caps.text_budget.fallback_query_max_words);
        }
    };

    let mut output = match generate::<AnalysisOutput>(caps.llm, "You analyze research findings.", &rendered).await {
        Ok(o) => o,
        Err(e) => {
            warn!("analysis LLM call failed: {e}");
            return error_fallback(query, caps.text_budget.fallback_query_max_words);
        }
    };

    if !output.valuable {
        output.should_continue = true;
        output.next_search_topic = simplify_query(query, caps.text_budget.fallback_query_max_words);
    }

    output
}

fn error_fallback(query: &str, max_words: usize) -> AnalysisOutput {
    AnalysisOutput {
        summary: String::new(),
        valuable: false,
        gaps: Vec::new(),
        should_continue: true,
        next_search_topic: simplify_query(query, max_words),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaturationConfig, TextBudgetConfig};
    use crate::llm::testing::ScriptedLlmClient;
    use crate::search::testing::ScriptedSearchClient;

    fn caps<'a>(llm: &'a ScriptedLlmClient, search: &'a ScriptedSearchClient, tb: &'a TextBudgetConfig, sat: &'a SaturationConfig) -> Capabilities<'a> {
        Capabilities { llm, search, prompts_dir: None, text_budget: tb, saturation: sat }
    }

    #[tokio::test]
    async fn short_circuits_on_empty_content() {
        let llm = ScriptedLlmClient::always_error("should not be called");
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let c = caps(&llm, &search, &tb, &sat);

        let out = analyze(&c, "four day workweek productivity", &[], &[]).await;
        assert!(out.should_continue);
        assert_eq!(out.next_search_topic, "four day workweek basics");
    }

    #[tokio::test]
    async fn forces_continue_and_simplified_topic_when_not_valuable() {
        let response = r#"{"summary":"s","valuable":false,"gaps":[],"shouldContinue":false,"nextSearchTopic":"ignored"}"#;
        let llm = ScriptedLlmClient::new(vec![Ok(response.to_string())]);
        let search = ScriptedSearchClient::always_empty();
        let tb = TextBudgetConfig::default();
        let sat = SaturationConfig::default();
        let c = caps(&llm, &search, &tb, &sat);

        let out = analyze(&c, "\"exact\" site:reddit.com remote work productivity data", &["l".to_string()], &["a".repeat(100)]).await;
        assert!(out.should_continue);
        assert_eq!(out.next_search_topic, simplify_query("\"exact\" site:reddit.com remote work productivity data", 4));
    }
}
