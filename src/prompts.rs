//! Bundled prompt templates for every LLM call the pipeline makes.
//!
//! Resolution order: an explicit `--prompts-dir` path, then a project-local
//! `.research/prompts/`, then the bundled default embedded via
//! `include_str!`. Prompt wording is never load-bearing on its own — only
//! the JSON contract each template asks for matters, since every caller
//! validates the response against a schema before trusting it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;

macro_rules! bundled {
    ($name:ident, $file:literal) => {
        pub const $name: &str = include_str!(concat!("prompts/", $file));
    };
}

bundled!(DEFAULT_PLAN, "plan.md.jinja");
bundled!(DEFAULT_IMPORTANCE, "importance.md.jinja");
bundled!(DEFAULT_SUBQUERY, "subquery.md.jinja");
bundled!(DEFAULT_SUMMARIZER, "summarizer.md.jinja");
bundled!(DEFAULT_ANALYSIS, "analysis.md.jinja");
bundled!(DEFAULT_SATURATION, "saturation.md.jinja");
bundled!(DEFAULT_QUALITY, "quality.md.jinja");
bundled!(DEFAULT_COMPONENT_SUMMARY, "component_summary.md.jinja");
bundled!(DEFAULT_SECTION, "section.md.jinja");
bundled!(DEFAULT_FALLBACK_REPORT, "fallback_report.md.jinja");
bundled!(DEFAULT_SCHEDULING_DECISION, "scheduling_decision.md.jinja");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptName {
    Plan,
    Importance,
    SubQuery,
    Summarizer,
    Analysis,
    Saturation,
    Quality,
    ComponentSummary,
    Section,
    FallbackReport,
    SchedulingDecision,
}

impl PromptName {
    fn file_stem(self) -> &'static str {
        match self {
            PromptName::Plan => "plan",
            PromptName::Importance => "importance",
            PromptName::SubQuery => "subquery",
            PromptName::Summarizer => "summarizer",
            PromptName::Analysis => "analysis",
            PromptName::Saturation => "saturation",
            PromptName::Quality => "quality",
            PromptName::ComponentSummary => "component_summary",
            PromptName::Section => "section",
            PromptName::FallbackReport => "fallback_report",
            PromptName::SchedulingDecision => "scheduling_decision",
        }
    }

    fn bundled(self) -> &'static str {
        match self {
            PromptName::Plan => DEFAULT_PLAN,
            PromptName::Importance => DEFAULT_IMPORTANCE,
            PromptName::SubQuery => DEFAULT_SUBQUERY,
            PromptName::Summarizer => DEFAULT_SUMMARIZER,
            PromptName::Analysis => DEFAULT_ANALYSIS,
            PromptName::Saturation => DEFAULT_SATURATION,
            PromptName::Quality => DEFAULT_QUALITY,
            PromptName::ComponentSummary => DEFAULT_COMPONENT_SUMMARY,
            PromptName::Section => DEFAULT_SECTION,
            PromptName::FallbackReport => DEFAULT_FALLBACK_REPORT,
            PromptName::SchedulingDecision => DEFAULT_SCHEDULING_DECISION,
        }
    }
}

enum PromptSource {
    File(PathBuf),
    Bundled(&'static str),
}

impl PromptSource {
    fn content(&self) -> Result<String> {
        match self {
            PromptSource::File(path) => {
                std::fs::read_to_string(path).with_context(|| format!("failed to read prompt {path:?}"))
            }
            PromptSource::Bundled(text) => Ok(text.to_string()),
        }
    }
}

fn resolve(name: PromptName, prompts_dir: Option<&Path>) -> PromptSource {
    if let Some(dir) = prompts_dir {
        let explicit = dir.join(format!("{}.md.jinja", name.file_stem()));
        if explicit.exists() {
            return PromptSource::File(explicit);
        }
    }
    let project_local = Path::new(".research/prompts").join(format!("{}.md.jinja", name.file_stem()));
    if project_local.exists() {
        return PromptSource::File(project_local);
    }
    PromptSource::Bundled(name.bundled())
}

static ENV: Lazy<minijinja::Environment<'static>> = Lazy::new(minijinja::Environment::new);

/// Render a prompt template against a JSON-shaped context.
pub fn render(name: PromptName, prompts_dir: Option<&Path>, context: &serde_json::Value) -> Result<String> {
    let source = resolve(name, prompts_dir).content()?;
    ENV.render_str(&source, context)
        .with_context(|| format!("failed to render {} prompt", name.file_stem()))
}
