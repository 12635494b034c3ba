//! Sub-query generator: turns a gap map into a fresh batch of search
//! queries biased toward the least-covered areas.

use serde_json::json;
use tracing::warn;

use crate::llm::{SubQueries, generate};
use crate::model::GapMap;
use crate::prompts::{self, PromptName};
use crate::text::is_valid_sub_query;

use super::Capabilities;

/// Up to `count` queries, each 2-5 words, no quotes, no disallowed `site:`
/// operators, biased toward non-neutral gap entries. Invalid candidates
/// returned by the LLM are dropped rather than trusted verbatim.
pub async fn generate_sub_queries(
    caps: &Capabilities<'_>,
    current_query: &str,
    recent_learnings: &[String],
    main_topic: Option<&str>,
    component_context: Option<&str>,
    gaps: &GapMap,
    count: usize,
) -> Vec<String> {
    let non_neutral = gaps.non_neutral_criteria();
    let last_learnings: Vec<&String> = recent_learnings.iter().rev().take(7).collect();

    let context = json!({
        "current_query": current_query,
        "count": count,
        "main_topic": main_topic,
        "component_context": component_context,
        "recent_learnings": last_learnings,
        "non_neutral_gaps": non_neutral,
    });

    let rendered = match prompts::render(PromptName::SubQuery, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render sub-query prompt: {e}");
            return Vec::new();
        }
    };

    let queries = match generate::<SubQueries>(caps.llm, "You generate concise web search queries.", &rendered).await
    {
        Ok(result) => result.queries,
        Err(e) => {
            warn!("sub-query generator LLM call failed: {e}");
            return Vec::new();
        }
    };

    queries
        .into_iter()
        .map(|sq| sq.query)
        .filter(|q| is_valid_sub_query(q))
        .take(count)
        .collect()
}
