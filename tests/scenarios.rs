//! End-to-end scenario coverage for the research pipeline.

use research_orchestrator::config::RunConfig;
use research_orchestrator::llm::testing::ScriptedLlmClient;
use research_orchestrator::llm::LlmClient;
use research_orchestrator::pipeline::Capabilities;
use research_orchestrator::progress::CapturingSink;
use research_orchestrator::search::testing::ScriptedSearchClient;
use research_orchestrator::search::{SearchPage, SearchResponse};
use research_orchestrator::{run, SaturationConfig, TextBudgetConfig};
use tokio_util::sync::CancellationToken;

fn plan_response() -> String {
    r#"{"mainObjective":"impact of four-day workweek on productivity","components":[
        {"name":"Employee wellbeing","description":"d","subQuestions":["wellbeing effects"],"successCriteria":["covers wellbeing studies"]},
        {"name":"Business output","description":"d","subQuestions":["output effects"],"successCriteria":["covers output studies"]},
        {"name":"Adoption barriers","description":"d","subQuestions":["barriers to adoption"],"successCriteria":["covers barriers"]}
    ],"sequencing":["Employee wellbeing","Business output","Adoption barriers"],"potentialPivots":[]}"#
        .to_string()
}

fn page(url: &str) -> SearchResponse {
    SearchResponse {
        data: vec![SearchPage {
            url: Some(url.to_string()),
            markdown: Some("a".repeat(200)),
        }],
    }
}

/// Every call the orchestrator might make returns a benign, schema-valid
/// response so the full pipeline runs to completion without touching a real
/// network or provider.
fn benign_llm_script(calls: usize) -> ScriptedLlmClient {
    let mut responses = Vec::new();
    responses.push(Ok(plan_response()));
    responses.push(Ok(r#"{"scores": {"Employee wellbeing": 40, "Business output": 40, "Adoption barriers": 20}}"#.to_string()));
    for _ in 0..calls {
        responses.push(Ok(r#"{"queries": [{"query": "four day workweek study", "reasoning": "r"}]}"#.to_string()));
        responses.push(Ok(r#"{"learnings": ["a relevant finding"]}"#.to_string()));
        responses.push(Ok(r#"{"summary":"s","valuable":true,"gaps":[],"shouldContinue":false,"nextSearchTopic":""}"#.to_string()));
        responses.push(Ok(r#"{"summary": "component summary"}"#.to_string()));
        responses.push(Ok(r#"{"meetsQuality":true,"missingElements":[],"additionalQueries":[]}"#.to_string()));
        responses.push(Ok(r#"{"sectionContent": "## Section\nbody"}"#.to_string()));
    }
    responses.push(Ok(r#"{"reportMarkdown": "# Final Report\n\nSynthesized."}"#.to_string()));
    ScriptedLlmClient::new(responses)
}

#[tokio::test]
async fn scenario_1_full_run_covers_all_components_with_sources() {
    let llm = benign_llm_script(3);
    let search = ScriptedSearchClient::new(vec![Ok(page("http://example.com/a"))]);
    let tb = TextBudgetConfig::default();
    let sat = SaturationConfig::default();
    let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

    let mut config = RunConfig::new("impact of four-day workweek on productivity".to_string());
    config.max_duration_minutes = 10;
    config.breadth = 3;
    config.depth = 2;
    let sink = CapturingSink::new();

    let outcome = run(&caps, &config, &sink, CancellationToken::new()).await;
    assert!(!outcome.report_markdown.is_empty());
    assert!(outcome.report_markdown.contains("Sources"));
    assert!(outcome.report_markdown.contains("http://example.com/a"));
}

#[tokio::test]
async fn scenario_3_empty_search_never_panics_and_produces_no_learnings() {
    let llm = ScriptedLlmClient::always_error("no planner reached in this scenario");
    let search = ScriptedSearchClient::always_empty();
    let tb = TextBudgetConfig::default();
    let sat = SaturationConfig::default();
    let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

    let mut config = RunConfig::new("topic with no results".to_string());
    config.max_duration_minutes = 1;
    let sink = CapturingSink::new();

    let outcome = run(&caps, &config, &sink, CancellationToken::new()).await;
    assert!(outcome.learnings.is_empty());
    assert!(!outcome.report_markdown.is_empty());
}

#[tokio::test]
async fn scenario_5_missing_synthesis_falls_back_to_primary_model_report() {
    use research_orchestrator::pipeline::report::assemble_report;

    let llm = ScriptedLlmClient::new(vec![Ok(r#"{"reportMarkdown": "# Fallback Report"}"#.to_string())]);
    let search = ScriptedSearchClient::always_empty();
    let tb = TextBudgetConfig::default();
    let sat = SaturationConfig::default();
    let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };
    let sink = CapturingSink::new();

    let report = assemble_report(&caps, "q", &["## Section\nbody".to_string()], &[], &[], &sink).await;
    assert!(report.contains("Fallback Report"));
}

#[tokio::test]
async fn scenario_6_test_anthropic_mode_short_circuits_without_planning_or_searching() {
    let llm = ScriptedLlmClient::new(vec![Ok("ok".to_string())]);
    let search = ScriptedSearchClient::always_empty();
    let tb = TextBudgetConfig::default();
    let sat = SaturationConfig::default();
    let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

    let mut config = RunConfig::new("q".to_string());
    config.test_anthropic_mode = true;
    let sink = CapturingSink::new();

    let outcome = run(&caps, &config, &sink, CancellationToken::new()).await;
    assert!(outcome.report_markdown.contains("Smoke Test"));
    assert!(outcome.learnings.is_empty());
    assert!(outcome.visited_urls.is_empty());
}

#[tokio::test]
async fn cancellation_stops_the_component_loop_without_panicking() {
    let llm = benign_llm_script(3);
    let search = ScriptedSearchClient::new(vec![Ok(page("http://example.com/a"))]);
    let tb = TextBudgetConfig::default();
    let sat = SaturationConfig::default();
    let caps = Capabilities { llm: &llm, search: &search, prompts_dir: None, text_budget: &tb, saturation: &sat };

    let mut config = RunConfig::new("impact of four-day workweek on productivity".to_string());
    config.max_duration_minutes = 10;
    let sink = CapturingSink::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = run(&caps, &config, &sink, cancel).await;
    assert_eq!(outcome.stats.completed_iterations, 0);
}

#[tokio::test]
async fn scripted_llm_client_surfaces_ok_and_error_responses_in_order() {
    let client = ScriptedLlmClient::new(vec![Ok("first".to_string()), Err("boom".to_string())]);
    assert_eq!(client.complete("s", "u").await.unwrap(), "first");
    assert!(client.complete("s", "u").await.is_err());
}
