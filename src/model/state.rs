//! `ResearchState`, `ResearchStats`, and the time/state machine driving
//! each iteration of the research loop.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::plan::ResearchPlan;

#[derive(Debug, Clone, Default)]
pub struct ResearchStats {
    pub completed_iterations: u32,
    pub total_iterations_time_ms: u64,
    pub iteration_times_ms: Vec<u64>,
    pub component_times_ms: Vec<u64>,
}

impl ResearchStats {
    pub fn average_iteration_time_ms(&self) -> Option<f64> {
        if self.completed_iterations == 0 {
            None
        } else {
            Some(self.total_iterations_time_ms as f64 / self.completed_iterations as f64)
        }
    }

    pub fn average_component_time_ms(&self) -> Option<f64> {
        if self.component_times_ms.is_empty() {
            None
        } else {
            Some(self.component_times_ms.iter().sum::<u64>() as f64 / self.component_times_ms.len() as f64)
        }
    }

    pub fn record_iteration(&mut self, duration_ms: u64) {
        self.iteration_times_ms.push(duration_ms);
        self.total_iterations_time_ms += duration_ms;
        self.completed_iterations += 1;
    }

    pub fn record_component(&mut self, duration_ms: u64) {
        self.component_times_ms.push(duration_ms);
    }

    /// Mean of the last 3 recorded iteration times, falling back to the
    /// overall average, falling back to 60s.
    pub fn recent_iteration_time_ms(&self) -> f64 {
        let recent: Vec<u64> = self
            .iteration_times_ms
            .iter()
            .rev()
            .take(3)
            .copied()
            .collect();
        if !recent.is_empty() {
            recent.iter().sum::<u64>() as f64 / recent.len() as f64
        } else if let Some(avg) = self.average_iteration_time_ms() {
            avg
        } else {
            60_000.0
        }
    }
}

/// Tracks progress through the rebalanced sequencing. Owned exclusively by
/// the orchestrator loop; never shared under contention.
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub start_time: Instant,
    pub current_time: Instant,
    pub elapsed: Duration,
    pub budget: Duration,
    pub remaining_time: Duration,
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub in_progress: Option<String>,
    pub remaining: Vec<String>,
    pub component_times_ms: HashMap<String, u64>,
    pub cancel: CancellationToken,
}

impl ResearchState {
    /// Builds the initial state for a plan: full budget remaining, the
    /// first component in the rebalanced sequencing already `in_progress`.
    pub fn init(plan: &ResearchPlan, budget_minutes: u64) -> Self {
        let now = Instant::now();
        let budget = Duration::from_secs(budget_minutes * 60);
        Self {
            start_time: now,
            current_time: now,
            elapsed: Duration::ZERO,
            budget,
            remaining_time: budget,
            completed: Vec::new(),
            skipped: Vec::new(),
            in_progress: plan.sequencing.first().cloned(),
            remaining: plan.sequencing.clone(),
            component_times_ms: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// `tick(state)` — refreshes current_time/elapsed/remaining_time.
    /// Idempotent up to monotonicity: calling twice in immediate succession
    /// changes elapsed/remaining by at most the time between calls.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.current_time = now;
        self.elapsed = now.duration_since(self.start_time);
        self.remaining_time = self.budget.saturating_sub(self.elapsed);
    }

    /// Moves `name` into `completed` and advances `in_progress` to the new
    /// head of `remaining`.
    pub fn complete(&mut self, name: &str, spent_ms: u64) {
        self.remaining.retain(|c| c != name);
        if !self.completed.iter().any(|c| c == name) {
            self.completed.push(name.to_string());
        }
        self.component_times_ms.insert(name.to_string(), spent_ms);
        self.in_progress = self.remaining.first().cloned();
    }

    /// Moves `name` into `skipped` without recording a component time, used
    /// when the scheduling decision calls for researching nothing at all.
    pub fn skip(&mut self, name: &str) {
        self.remaining.retain(|c| c != name);
        if !self.skipped.iter().any(|c| c == name) {
            self.skipped.push(name.to_string());
        }
        self.in_progress = self.remaining.first().cloned();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn remaining_count(&self) -> usize {
        self.remaining.len()
    }
}

/// Outcome of `shouldContinueComponent` before any LLM tie-break is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueDecision {
    Continue,
    ContinueMinimal,
    AskLlm,
}

/// Decides whether the current component should keep researching given the
/// time remaining. Callers that receive `AskLlm` must consult the
/// scheduling-decision LLM contract and default to continuing on error.
pub fn should_continue_component(
    state: &ResearchState,
    stats: &ResearchStats,
    sub_question_count: usize,
) -> ContinueDecision {
    // 1. remainingTime > 5 min -> continue
    if state.remaining_time > Duration::from_secs(5 * 60) {
        return ContinueDecision::Continue;
    }

    // 2. only one component remains -> continue regardless of estimate
    if state.remaining_count() <= 1 {
        return ContinueDecision::Continue;
    }

    // 3. recentIterationTime
    let recent_iteration_ms = stats.recent_iteration_time_ms();

    // 4. estimatedComponentTime
    let estimated_component_ms = stats
        .average_component_time_ms()
        .unwrap_or_else(|| recent_iteration_ms * sub_question_count.min(3) as f64);

    // 5. reserve time for the others
    let remaining_count = state.remaining_count() as f64;
    let others_reserve_ms = (remaining_count - 1.0).max(0.0) * recent_iteration_ms;
    let own_need_ms = estimated_component_ms.max(recent_iteration_ms);
    let remaining_ms = state.remaining_time.as_millis() as f64;

    if remaining_ms >= own_need_ms + others_reserve_ms {
        return ContinueDecision::Continue;
    }

    // 6. minimal research if remaining covers at least one iteration each
    if remaining_ms / remaining_count >= recent_iteration_ms {
        return ContinueDecision::ContinueMinimal;
    }

    // 7. otherwise ask the LLM
    ContinueDecision::AskLlm
}
