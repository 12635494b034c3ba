//! Quality evaluator: checks a component's research against its success
//! criteria and proposes follow-up queries for anything still missing.

use serde_json::json;
use tracing::warn;

use crate::llm::{QualityOutput, generate};
use crate::model::Component;
use crate::prompts::{self, PromptName};

use super::Capabilities;

/// Ask whether a component's success criteria are met and, if not, up to 2
/// follow-up queries plus the missing elements. Callers are responsible for
/// skipping this entirely when `remainingTime < 3 min`.
pub async fn evaluate_quality(caps: &Capabilities<'_>, component: &Component, summary: &str) -> QualityOutput {
    let context = json!({
        "component_name": component.name,
        "success_criteria": component.success_criteria,
        "summary": summary,
    });

    let rendered = match prompts::render(PromptName::Quality, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render quality prompt: {e}");
            return fallback();
        }
    };

    match generate::<QualityOutput>(caps.llm, "You judge whether research meets its success criteria.", &rendered).await {
        Ok(mut output) => {
            output.additional_queries.truncate(2);
            output
        }
        Err(e) => {
            warn!("quality evaluator LLM call failed: {e}");
            fallback()
        }
    }
}

fn fallback() -> QualityOutput {
    QualityOutput {
        meets_quality: true,
        missing_elements: Vec::new(),
        additional_queries: Vec::new(),
    }
}
