//! Per-component research output and the saturation-tracking gap values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentResult {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub summary: String,
    pub time_spent_ms: u64,
}

impl ComponentResult {
    pub fn merge(&mut self, other: ComponentResult) {
        self.learnings.extend(other.learnings);
        self.visited_urls.extend(other.visited_urls);
        if !other.summary.is_empty() {
            self.summary = other.summary;
        }
        self.time_spent_ms += other.time_spent_ms;
    }
}

/// Reserved neutral gap values used before a component has any real findings.
pub const GAP_NO_COVERAGE_YET: &str = "No coverage yet";
pub const GAP_INITIAL: &str = "Initial gap";
pub const GAP_UNKNOWN_CONTINUING: &str = "Unknown gap; continuing";

/// `criterion -> gap description`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapMap(pub HashMap<String, String>);

impl GapMap {
    pub fn initial(success_criteria: &[String]) -> Self {
        let mut map = HashMap::new();
        for c in success_criteria {
            map.insert(c.clone(), GAP_INITIAL.to_string());
        }
        Self(map)
    }

    pub fn no_coverage(success_criteria: &[String]) -> Self {
        let mut map = HashMap::new();
        for c in success_criteria {
            map.insert(c.clone(), GAP_NO_COVERAGE_YET.to_string());
        }
        Self(map)
    }

    /// Criteria whose gap entry is not one of the reserved neutral values —
    /// used by the sub-query generator to bias toward real gaps.
    pub fn non_neutral_criteria(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| {
                v.as_str() != GAP_NO_COVERAGE_YET
                    && v.as_str() != GAP_INITIAL
                    && v.as_str() != GAP_UNKNOWN_CONTINUING
            })
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaturationResult {
    pub is_saturated: bool,
    pub coverage_percentage: u32,
    pub covered_criteria: Vec<String>,
    pub remaining_criteria: Vec<String>,
    pub reasoning: String,
    #[serde(default)]
    pub gap_details: HashMap<String, String>,
}

impl SaturationResult {
    /// Short-circuit result used when too few iterations have run.
    pub fn not_enough_iterations(success_criteria: &[String]) -> Self {
        Self {
            is_saturated: false,
            coverage_percentage: 0,
            covered_criteria: Vec::new(),
            remaining_criteria: success_criteria.to_vec(),
            reasoning: "fewer than the minimal-iteration gate has run".to_string(),
            gap_details: success_criteria
                .iter()
                .map(|c| (c.clone(), GAP_NO_COVERAGE_YET.to_string()))
                .collect(),
        }
    }

    /// Fallback used when the LLM call errors: "continue" semantics, coverage 0.
    pub fn llm_error_fallback() -> Self {
        Self {
            is_saturated: false,
            coverage_percentage: 0,
            covered_criteria: Vec::new(),
            remaining_criteria: Vec::new(),
            reasoning: "saturation evaluation failed; continuing".to_string(),
            gap_details: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_map_non_neutral_excludes_reserved_values() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), GAP_INITIAL.to_string());
        map.insert("b".to_string(), "missing recent data".to_string());
        let gap = GapMap(map);
        let non_neutral = gap.non_neutral_criteria();
        assert_eq!(non_neutral, vec!["b"]);
    }

    #[test]
    fn component_result_merge_sums_time() {
        let mut a = ComponentResult {
            time_spent_ms: 100,
            ..Default::default()
        };
        let b = ComponentResult {
            time_spent_ms: 50,
            learnings: vec!["x".to_string()],
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(a.time_spent_ms, 150);
        assert_eq!(a.learnings, vec!["x".to_string()]);
    }
}
