//! The deep-research sub-routine and the time-pressure breadth/depth
//! degradation it's driven with.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm::{SummarizerOutput, generate};
use crate::model::{Component, GapMap};
use crate::prompts::{self, PromptName};
use crate::search::{SearchOptions, has_useful_content};
use crate::text::{simplify_query, trim_content};

use super::analysis::analyze;
use super::saturation::evaluate_saturation;
use super::subquery::generate_sub_queries;
use super::Capabilities;

const MIN_REMAINING_TO_CONTINUE: Duration = Duration::from_secs(20);

pub struct DeepResearchOutcome {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub elapsed: Duration,
}

/// One collected page's markdown, trimmed to the content budget, kept
/// alongside its source URL for the summarizer prompt.
struct CollectedPage {
    url: String,
    markdown: String,
}

async fn search_sub_query(caps: &Capabilities<'_>, sub_query: &str) -> Vec<CollectedPage> {
    let options = SearchOptions::default();
    let response = match caps.search.search(sub_query, &options).await {
        Ok(r) => r,
        Err(e) => {
            warn!("search failed for sub-query '{sub_query}': {e}");
            return Vec::new();
        }
    };

    if has_useful_content(&response) {
        return collect_pages(caps, &response);
    }

    // Single fallback retry with a simplified query.
    let fallback_query = simplify_query(sub_query, caps.text_budget.fallback_query_max_words);
    debug!("search for '{sub_query}' was empty; retrying with '{fallback_query}'");
    let retry = match caps.search.search(&fallback_query, &options).await {
        Ok(r) => r,
        Err(e) => {
            warn!("fallback search failed for '{fallback_query}': {e}");
            return Vec::new();
        }
    };

    if has_useful_content(&retry) {
        collect_pages(caps, &retry)
    } else {
        Vec::new()
    }
}

fn collect_pages(caps: &Capabilities<'_>, response: &crate::search::SearchResponse) -> Vec<CollectedPage> {
    response
        .data
        .iter()
        .filter_map(|p| {
            let markdown = p.markdown.as_ref()?;
            if markdown.len() <= 100 {
                return None;
            }
            Some(CollectedPage {
                url: p.url.clone().unwrap_or_default(),
                markdown: trim_content(markdown, caps.text_budget),
            })
        })
        .collect()
}

async fn summarize(caps: &Capabilities<'_>, query: &str, pages: &[CollectedPage]) -> Vec<String> {
    if pages.is_empty() {
        return Vec::new();
    }
    let context = json!({
        "query": query,
        "pages": pages.iter().map(|p| json!({"url": p.url, "markdown": p.markdown})).collect::<Vec<_>>(),
    });
    let rendered = match prompts::render(PromptName::Summarizer, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render summarizer prompt: {e}");
            return Vec::new();
        }
    };
    match generate::<SummarizerOutput>(caps.llm, "You extract factual learnings from search results.", &rendered).await {
        Ok(mut out) => {
            out.learnings.truncate(5);
            out.learnings
        }
        Err(e) => {
            warn!("summarizer LLM call failed: {e}");
            Vec::new()
        }
    }
}

/// The deep-research sub-routine: `depth` iterations over the active query,
/// each widening into up to `breadth` sub-queries.
pub async fn deep_research(
    caps: &Capabilities<'_>,
    component: &Component,
    initial_query: &str,
    breadth: usize,
    depth: usize,
    budget: Duration,
    cancel: &CancellationToken,
) -> DeepResearchOutcome {
    let start = Instant::now();
    let mut query = initial_query.to_string();
    let mut learnings = Vec::new();
    let mut visited_urls = Vec::new();
    let gaps = GapMap::initial(&component.success_criteria);

    for iteration in 0..depth {
        let elapsed = start.elapsed();
        let remaining = budget.saturating_sub(elapsed);
        if remaining < MIN_REMAINING_TO_CONTINUE || cancel.is_cancelled() {
            break;
        }

        let sub_queries = generate_sub_queries(
            caps,
            &query,
            &learnings,
            Some(component.name.as_str()),
            Some(component.description.as_str()),
            &gaps,
            breadth,
        )
        .await;

        let mut iteration_pages = Vec::new();
        for sub_query in &sub_queries {
            if cancel.is_cancelled() {
                break;
            }
            let pages = search_sub_query(caps, sub_query).await;
            for page in &pages {
                if !page.url.is_empty() {
                    visited_urls.push(page.url.clone());
                }
            }
            iteration_pages.extend(pages);
        }

        let raw_bodies: Vec<String> = iteration_pages.iter().map(|p| p.markdown.clone()).collect();
        let new_learnings = summarize(caps, &query, &iteration_pages).await;
        learnings.extend(new_learnings.clone());

        let analysis = analyze(caps, &query, &new_learnings, &raw_bodies).await;
        if !analysis.should_continue {
            break;
        }
        if !analysis.next_search_topic.is_empty() {
            query = analysis.next_search_topic;
        }

        if iteration > 0 {
            let saturation = evaluate_saturation(caps, component, &learnings, (iteration + 1) as u32, depth as u32).await;
            if saturation.is_saturated || saturation.coverage_percentage >= caps.saturation.mid_depth_threshold_pct {
                info!(
                    "component '{}' exiting depth loop early at iteration {} (coverage {}%)",
                    component.name, iteration, saturation.coverage_percentage
                );
                break;
            }
        }
    }

    DeepResearchOutcome {
        learnings,
        visited_urls,
        elapsed: start.elapsed(),
    }
}

/// Breadth/depth degradation given the time available per remaining
/// sub-question.
pub fn degrade_breadth_depth(time_per_q: Duration, configured_breadth: usize, configured_depth: usize, multiplier: f64) -> (usize, usize) {
    if time_per_q < Duration::from_secs(30) {
        (1, 1)
    } else if time_per_q < Duration::from_secs(60) {
        ((configured_breadth / 2).max(1), 1)
    } else {
        let depth = ((configured_depth as f64) * multiplier).round().max(1.0) as usize;
        (configured_breadth, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrades_to_minimum_under_severe_time_pressure() {
        assert_eq!(degrade_breadth_depth(Duration::from_secs(10), 4, 3, 1.0), (1, 1));
    }

    #[test]
    fn halves_breadth_under_moderate_time_pressure() {
        assert_eq!(degrade_breadth_depth(Duration::from_secs(45), 4, 3, 1.0), (2, 1));
    }

    #[test]
    fn never_halves_breadth_below_one() {
        assert_eq!(degrade_breadth_depth(Duration::from_secs(45), 1, 3, 1.0), (1, 1));
    }

    #[test]
    fn uses_configured_breadth_and_scaled_depth_when_time_is_plentiful() {
        assert_eq!(degrade_breadth_depth(Duration::from_secs(120), 3, 2, 1.5), (3, 3));
    }
}
