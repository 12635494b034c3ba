//! Rebalancer: reorders the plan by importance and derives a per-component
//! depth multiplier.

use std::collections::HashMap;

use crate::model::ResearchPlan;

/// Sort `sequencing` by descending importance score; compute a depth
/// multiplier per component in `[0.5, 2.0]`.
///
/// The mean score used is `100/|components|`, not the actual mean of
/// returned scores — if the LLM violates the "sum ≈ 100" hint, multipliers
/// may skew, contained by the clamp.
pub fn rebalance(
    plan: &mut ResearchPlan,
    scores: &HashMap<String, f64>,
    overrides: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mean_score = 100.0 / plan.components.len().max(1) as f64;

    plan.sequencing.sort_by(|a, b| {
        let sa = scores.get(a).copied().unwrap_or(0.0);
        let sb = scores.get(b).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut multipliers = HashMap::new();
    for name in &plan.sequencing {
        if let Some(&m) = overrides.get(name) {
            multipliers.insert(name.clone(), m.clamp(0.5, 2.0));
            continue;
        }
        let score = scores.get(name).copied().unwrap_or(mean_score);
        let multiplier = (0.5 + (score / mean_score) * 0.75).clamp(0.5, 2.0);
        multipliers.insert(name.clone(), multiplier);
    }
    multipliers
}
