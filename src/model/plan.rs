//! The research plan: an ordered set of components, each with its own
//! sub-questions and success criteria.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    pub description: String,
    pub sub_questions: Vec<String>,
    pub success_criteria: Vec<String>,
}

impl Component {
    pub fn basic_research(query: &str) -> Self {
        Self {
            name: "Basic Research".to_string(),
            description: format!("Direct research into: {query}"),
            sub_questions: vec![query.to_string()],
            success_criteria: vec!["Answers the original query".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPlan {
    pub main_objective: String,
    pub components: Vec<Component>,
    pub sequencing: Vec<String>,
    pub potential_pivots: Vec<String>,
}

impl ResearchPlan {
    /// The minimal valid plan the planner falls back to on LLM failure.
    pub fn minimal(query: &str) -> Self {
        let component = Component::basic_research(query);
        let name = component.name.clone();
        Self {
            main_objective: query.to_string(),
            components: vec![component],
            sequencing: vec![name],
            potential_pivots: Vec::new(),
        }
    }

    /// `sequencing` is a permutation of component names and every component
    /// is uniquely named; at least one component exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.components.is_empty() {
            return Err("plan must have at least one component".to_string());
        }
        let mut names: Vec<&str> = self.components.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        let unique_count = {
            let mut n = names.clone();
            n.dedup();
            n.len()
        };
        if unique_count != names.len() {
            return Err("component names must be unique".to_string());
        }
        let mut seq = self.sequencing.clone();
        seq.sort();
        if seq != names {
            return Err("sequencing must be a permutation of component names".to_string());
        }
        for c in &self.components {
            if c.sub_questions.is_empty() {
                return Err(format!("component {} has no sub-questions", c.name));
            }
            if c.success_criteria.is_empty() {
                return Err(format!("component {} has no success criteria", c.name));
            }
        }
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_plan_is_valid() {
        let plan = ResearchPlan::minimal("four-day workweek productivity");
        assert!(plan.validate().is_ok());
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].name, "Basic Research");
    }

    #[test]
    fn rejects_duplicate_component_names() {
        let mut plan = ResearchPlan::minimal("q");
        plan.components.push(plan.components[0].clone());
        plan.sequencing.push("Basic Research".to_string());
        assert!(plan.validate().is_err());
    }

    #[test]
    fn rejects_sequencing_not_matching_components() {
        let mut plan = ResearchPlan::minimal("q");
        plan.sequencing = vec!["Nonexistent".to_string()];
        assert!(plan.validate().is_err());
    }
}
