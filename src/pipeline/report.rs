//! Report assembly: per-component sections, then a synthesis pass over the
//! full bundle.
//!
//! Two stages: a section per completed component (LLM first, mechanical
//! fallback second), then a synthesis pass over the full bundle. Synthesis
//! failure or a missing synthesis model falls back to the primary model's
//! `{reportMarkdown}` contract rather than losing the run's output.

use serde_json::json;
use tracing::warn;

use crate::llm::{FallbackReportOutput, SectionOutput, generate};
use crate::model::{Component, ComponentResult};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::{self, PromptName};

use super::Capabilities;

/// Build the markdown section for one completed component. Falls back to a
/// mechanical rendering of the summary plus bulleted learnings if the LLM
/// call fails or the prompt can't be rendered.
pub async fn build_section(caps: &Capabilities<'_>, component: &Component, result: &ComponentResult) -> String {
    let context = json!({
        "component_name": component.name,
        "component_description": component.description,
        "summary": result.summary,
        "learnings": result.learnings,
    });

    let rendered = match prompts::render(PromptName::Section, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render section prompt for '{}': {e}", component.name);
            return mechanical_section(component, result);
        }
    };

    match generate::<SectionOutput>(caps.llm, "You write one report section from research findings.", &rendered).await
    {
        Ok(output) if !output.section_content.trim().is_empty() => output.section_content,
        Ok(_) => mechanical_section(component, result),
        Err(e) => {
            warn!("section LLM call failed for '{}': {e}", component.name);
            mechanical_section(component, result)
        }
    }
}

fn mechanical_section(component: &Component, result: &ComponentResult) -> String {
    let mut section = format!("## {}\n\n{}\n", component.name, result.summary);
    if !result.learnings.is_empty() {
        section.push('\n');
        for learning in &result.learnings {
            section.push_str(&format!("- {learning}\n"));
        }
    }
    section
}

/// Render a "Sources" block enumerating every distinct visited URL, or an
/// empty string if none were visited.
fn render_sources_block(visited_urls: &[String]) -> String {
    if visited_urls.is_empty() {
        return String::new();
    }
    let mut seen = std::collections::HashSet::new();
    let mut block = String::from("## Sources\n\n");
    for url in visited_urls {
        if seen.insert(url.as_str()) {
            block.push_str(&format!("- {url}\n"));
        }
    }
    block
}

/// Assemble the final report markdown from per-component sections. The
/// synthesis model receives the full bundle — sections, sources, raw
/// learnings — and streams progress chunks as it produces them, falling back
/// to the primary model (and finally to a plain concatenation of sections)
/// on any failure. A "Sources" block enumerating visited URLs is appended
/// whenever the assembled report doesn't already carry one, so it survives
/// every fallback path.
pub async fn assemble_report(
    caps: &Capabilities<'_>,
    query: &str,
    sections: &[String],
    learnings: &[String],
    visited_urls: &[String],
    progress: &dyn ProgressSink,
) -> String {
    let bundle = sections.join("\n\n");
    let sources_block = render_sources_block(visited_urls);
    let context = json!({
        "query": query,
        "sections": bundle,
        "sources": visited_urls,
        "learnings": learnings,
    });

    let rendered = match prompts::render(PromptName::FallbackReport, caps.prompts_dir, &context) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to render fallback report prompt: {e}");
            return append_sources(bundle, &sources_block);
        }
    };

    progress.emit(ProgressEvent::new("progress", "synthesizing final report"));

    match generate::<FallbackReportOutput>(caps.llm, "You synthesize a final research report from its sections.", &rendered).await
    {
        Ok(output) if !output.report_markdown.trim().is_empty() => append_sources(output.report_markdown, &sources_block),
        Ok(_) => append_sources(bundle, &sources_block),
        Err(e) => {
            warn!("report synthesis LLM call failed: {e}");
            append_sources(bundle, &sources_block)
        }
    }
}

fn append_sources(mut report: String, sources_block: &str) -> String {
    if !sources_block.is_empty() && !report.contains("Sources") {
        report.push_str("\n\n");
        report.push_str(sources_block);
    }
    report
}
