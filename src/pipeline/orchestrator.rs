//! The top-level driver: wires the time-state machine, quick pass,
//! rebalancer, per-component research loop, and report assembly into one run.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::llm::{ComponentSummaryOutput, SchedulingDecisionOutput, generate};
use crate::model::{
    ComponentResult, ContinueDecision, ResearchPlan, ResearchState, ResearchStats,
    should_continue_component,
};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::{self, PromptName};

use super::importance::score_components;
use super::planner::create_plan;
use super::quality::evaluate_quality;
use super::quick_pass::run_quick_pass;
use super::rebalancer::rebalance;
use super::report::{assemble_report, build_section};
use super::researcher::{deep_research, degrade_breadth_depth};
use super::saturation::evaluate_saturation;
use super::Capabilities;

/// Per-run timing and completion summary.
pub struct TimeStats {
    pub total_time_ms: u64,
    pub component_times_ms: HashMap<String, u64>,
    pub completed_components: Vec<String>,
    pub skipped_components: Vec<String>,
    pub average_iteration_time_ms: Option<f64>,
}

/// Result of the `test_anthropic_mode` connectivity smoke test.
pub struct ApiTestResult {
    pub success: bool,
    pub message: String,
}

pub struct RunOutcome {
    pub report_markdown: String,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub research_plan: ResearchPlan,
    pub component_results: HashMap<String, ComponentResult>,
    pub time_stats: TimeStats,
    pub api_test_result: Option<ApiTestResult>,
    pub stats: ResearchStats,
}

const QUALITY_GATE_MIN_REMAINING: Duration = Duration::from_secs(3 * 60);
const COMPONENT_MIN_REMAINING_TO_CONTINUE: Duration = Duration::from_secs(20);
const SCHEDULING_TIE_BREAK_SYSTEM: &str = "You decide whether a time-constrained research run should keep going on its current component.";

/// How a component's sub-question loop should pick breadth/depth, decided
/// once per component before the loop starts.
#[derive(Debug, Clone, Copy)]
enum ComponentPlan {
    /// Research nothing further; the component goes straight to `skipped`.
    Skip,
    /// Use this fixed breadth/depth for every remaining sub-question.
    Fixed(usize, usize),
    /// Recompute breadth/depth from the remaining time before each
    /// sub-question.
    Dynamic,
}

/// What the scheduling tie-break LLM call decided for an `AskLlm` component.
enum SchedulingOutcome {
    Skip,
    Research { breadth: usize, depth: usize },
}

/// Run the full pipeline end to end. `cancel` is consulted between every
/// component and may be triggered externally (a wall-clock timer, a signal
/// handler) without corrupting in-flight state.
pub async fn run(
    caps: &Capabilities<'_>,
    config: &RunConfig,
    progress: &dyn ProgressSink,
    cancel: CancellationToken,
) -> RunOutcome {
    if config.test_anthropic_mode {
        return run_smoke_test(caps, config, progress).await;
    }

    progress.emit(ProgressEvent::new("progress", "planning research"));
    let mut plan = create_plan(caps, &config.query, &config.feedback_responses).await;

    let scores = score_components(caps, &plan).await;
    let multipliers = rebalance(&mut plan, &scores, &config.component_depth_multipliers);

    let mut state = ResearchState::init(&plan, config.max_duration_minutes);
    state.cancel = cancel;
    let mut stats = ResearchStats::default();

    let mut results: HashMap<String, ComponentResult> = HashMap::new();
    let mut all_learnings: Vec<String> = config.existing_learnings.clone();
    let mut all_visited_urls: Vec<String> = config.existing_visited_urls.clone();

    progress.emit(ProgressEvent::new("progress", "running quick pass"));
    let quick_pass_budget = Duration::from_secs(60);
    let quick_results = run_quick_pass(caps, &plan.components, quick_pass_budget, &state.cancel).await;
    for (component, result) in plan.components.iter().zip(quick_results) {
        all_learnings.extend(result.learnings.clone());
        all_visited_urls.extend(result.visited_urls.clone());
        results.insert(component.name.clone(), result);
    }

    while let Some(name) = state.in_progress.clone() {
        state.tick();
        if state.is_cancelled() {
            info!("research cancelled; stopping before component '{name}'");
            break;
        }

        let Some(component) = plan.component(&name) else {
            warn!("in_progress component '{name}' not found in plan; skipping");
            state.complete(&name, 0);
            continue;
        };

        let decision = should_continue_component(&state, &stats, component.sub_questions.len());
        let component_plan = match decision {
            ContinueDecision::Continue => ComponentPlan::Dynamic,
            ContinueDecision::ContinueMinimal => ComponentPlan::Fixed(1, 1),
            ContinueDecision::AskLlm => match resolve_scheduling_tie_break(caps, &state, &stats, config).await {
                SchedulingOutcome::Skip => ComponentPlan::Skip,
                SchedulingOutcome::Research { breadth, depth } => ComponentPlan::Fixed(breadth, depth),
            },
        };

        if matches!(component_plan, ComponentPlan::Skip) {
            progress.emit(ProgressEvent::new("progress", format!("skipping component: {name}")));
            state.skip(&name);
            continue;
        }

        progress.emit(ProgressEvent::new("progress", format!("researching component: {name}")));
        let component_start = Instant::now();
        let multiplier = multipliers.get(&name).copied().unwrap_or(1.0);

        let mut accumulated = results.remove(&name).unwrap_or_default();
        // quick_pass already researched sub_questions[0]; don't repeat it.
        let pending_sub_questions: Vec<&String> = component.sub_questions.iter().skip(1).collect();
        let mut remaining_sub_q_count = pending_sub_questions.len();
        let mut completed_sub_iterations: u32 = 1;

        for sub_question in pending_sub_questions {
            if state.is_cancelled() {
                break;
            }
            state.tick();
            if state.remaining_time < COMPONENT_MIN_REMAINING_TO_CONTINUE {
                break;
            }

            let time_per_q = Duration::from_millis(
                (state.remaining_time.as_millis() as u64) / remaining_sub_q_count.max(1) as u64,
            );
            let (breadth, depth) = match component_plan {
                ComponentPlan::Dynamic => {
                    degrade_breadth_depth(time_per_q, config.breadth as usize, config.depth as usize, multiplier)
                }
                ComponentPlan::Fixed(b, d) => (b, d),
                ComponentPlan::Skip => unreachable!("skipped components never enter the research loop"),
            };

            let per_question_budget = state.remaining_time / remaining_sub_q_count.max(1) as u32;
            let outcome = deep_research(caps, component, sub_question, breadth, depth, per_question_budget, &state.cancel).await;
            accumulated.learnings.extend(outcome.learnings.clone());
            accumulated.visited_urls.extend(outcome.visited_urls.clone());
            all_learnings.extend(outcome.learnings);
            all_visited_urls.extend(outcome.visited_urls);
            state.tick();
            remaining_sub_q_count = remaining_sub_q_count.saturating_sub(1);
            completed_sub_iterations += 1;

            let saturation = evaluate_saturation(
                caps,
                component,
                &accumulated.learnings,
                completed_sub_iterations,
                component.sub_questions.len() as u32,
            )
            .await;
            if saturation.is_saturated || saturation.coverage_percentage >= caps.saturation.component_threshold_pct {
                info!(
                    "component '{name}' saturated after {completed_sub_iterations} sub-question(s) (coverage {}%)",
                    saturation.coverage_percentage
                );
                break;
            }
        }

        accumulated.summary = summarize_component(caps, component, &accumulated.learnings).await;

        let gap_fill_breadth = match component_plan {
            ComponentPlan::Fixed(b, _) => b.max(1),
            _ => config.breadth as usize,
        };

        state.tick();
        if state.remaining_time >= QUALITY_GATE_MIN_REMAINING {
            let quality = evaluate_quality(caps, component, &accumulated.summary).await;
            if !quality.meets_quality && !quality.additional_queries.is_empty() {
                progress.emit(ProgressEvent::new("progress", format!("filling gaps for component: {name}")));
                for query in &quality.additional_queries {
                    if state.is_cancelled() {
                        break;
                    }
                    let outcome = deep_research(caps, component, query, gap_fill_breadth, 1, Duration::from_secs(45), &state.cancel).await;
                    accumulated.learnings.extend(outcome.learnings.clone());
                    accumulated.visited_urls.extend(outcome.visited_urls.clone());
                    all_learnings.extend(outcome.learnings);
                    all_visited_urls.extend(outcome.visited_urls);
                }
                accumulated.summary = summarize_component(caps, component, &accumulated.learnings).await;
            }
        }

        let spent_ms = component_start.elapsed().as_millis() as u64;
        accumulated.time_spent_ms += spent_ms;
        results.insert(name.clone(), accumulated);

        stats.record_component(spent_ms);
        stats.record_iteration(spent_ms);
        state.complete(&name, spent_ms);
    }

    progress.emit(ProgressEvent::new("progress", "assembling report"));
    let mut sections = Vec::new();
    for name in &state.completed {
        let Some(component) = plan.component(name) else { continue };
        let Some(result) = results.get(name) else { continue };
        sections.push(build_section(caps, component, result).await);
    }

    let report_markdown = assemble_report(caps, &config.query, &sections, &all_learnings, &all_visited_urls, progress).await;

    let time_stats = TimeStats {
        total_time_ms: state.elapsed.as_millis() as u64,
        component_times_ms: state.component_times_ms.clone(),
        completed_components: state.completed.clone(),
        skipped_components: state.skipped.clone(),
        average_iteration_time_ms: stats.average_iteration_time_ms(),
    };

    RunOutcome {
        report_markdown,
        learnings: all_learnings,
        visited_urls: all_visited_urls,
        research_plan: plan,
        component_results: results,
        time_stats,
        api_test_result: None,
        stats,
    }
}

async fn summarize_component(caps: &Capabilities<'_>, component: &crate::model::Component, learnings: &[String]) -> String {
    if learnings.is_empty() {
        return String::new();
    }
    let context = json!({
        "component_name": component.name,
        "success_criteria": component.success_criteria,
        "learnings": learnings,
    });
    let rendered = match prompts::render(PromptName::ComponentSummary, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render component summary prompt: {e}");
            return learnings.join(" ");
        }
    };
    match generate::<ComponentSummaryOutput>(caps.llm, "You summarize a component's research learnings.", &rendered).await {
        Ok(output) if !output.summary.trim().is_empty() => output.summary,
        _ => learnings.join(" "),
    }
}

/// Consult the scheduling-decision LLM contract when the time/state machine
/// can't decide on its own. A `shouldContinue=false` decision skips the
/// component entirely. Defaults to continuing with the configured
/// breadth/depth on any LLM failure.
async fn resolve_scheduling_tie_break(
    caps: &Capabilities<'_>,
    state: &ResearchState,
    stats: &ResearchStats,
    config: &RunConfig,
) -> SchedulingOutcome {
    let context = json!({
        "remaining_time_ms": state.remaining_time.as_millis() as u64,
        "remaining_components": state.remaining_count(),
        "recent_iteration_time_ms": stats.recent_iteration_time_ms(),
    });
    let rendered = match prompts::render(PromptName::SchedulingDecision, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render scheduling-decision prompt: {e}");
            return SchedulingOutcome::Research { breadth: config.breadth as usize, depth: config.depth as usize };
        }
    };
    match generate::<SchedulingDecisionOutput>(caps.llm, SCHEDULING_TIE_BREAK_SYSTEM, &rendered).await {
        Ok(decision) if decision.should_continue => SchedulingOutcome::Research {
            breadth: (decision.recommended_breadth as usize).max(1),
            depth: (decision.recommended_depth as usize).max(1),
        },
        Ok(_) => SchedulingOutcome::Skip,
        Err(e) => {
            warn!("scheduling-decision LLM call failed: {e}; defaulting to continue");
            SchedulingOutcome::Research { breadth: config.breadth as usize, depth: config.depth as usize }
        }
    }
}

/// A cheap end-to-end smoke test that exercises the LLM/search capability
/// wiring without running the full pipeline.
async fn run_smoke_test(caps: &Capabilities<'_>, config: &RunConfig, progress: &dyn ProgressSink) -> RunOutcome {
    progress.emit(ProgressEvent::new("progress", "running test-anthropic-mode smoke test"));
    let reply = caps
        .llm
        .complete("You are a connectivity check.", "Reply with the single word: ok")
        .await;
    let (report_markdown, api_test_result) = match reply {
        Ok(text) => (
            format!("# Smoke Test\n\nLLM connectivity check returned: {text}"),
            ApiTestResult { success: true, message: text },
        ),
        Err(e) => (
            format!("# Smoke Test\n\nLLM connectivity check failed: {e}"),
            ApiTestResult { success: false, message: e.to_string() },
        ),
    };
    info!("smoke test completed for query '{}'", config.query);
    RunOutcome {
        report_markdown,
        learnings: Vec::new(),
        visited_urls: Vec::new(),
        research_plan: ResearchPlan::minimal(&config.query),
        component_results: HashMap::new(),
        time_stats: TimeStats {
            total_time_ms: 0,
            component_times_ms: HashMap::new(),
            completed_components: Vec::new(),
            skipped_components: Vec::new(),
            average_iteration_time_ms: None,
        },
        api_test_result: Some(api_test_result),
        stats: ResearchStats::default(),
    }
}
