use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::Parser;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use research_orchestrator::{Capabilities, LlmClient, RunConfig, SearchClient, StdoutSink};
use research_orchestrator::search::{SearchOptions, SearchResponse};

/// Time-budgeted, plan-driven research orchestrator.
#[derive(Parser, Debug)]
#[command(name = "research-orchestrator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The research query
    query: String,

    /// Initial search breadth per component
    #[arg(long)]
    breadth: Option<u32>,

    /// Initial research depth per component
    #[arg(long)]
    depth: Option<u32>,

    /// Overall time budget in minutes
    #[arg(long)]
    max_duration: Option<u64>,

    /// Per-component depth multiplier override, e.g. `--component-depth-multiplier Pricing=1.5`
    #[arg(long = "component-depth-multiplier", value_name = "NAME=FLOAT")]
    component_depth_multiplier: Vec<String>,

    /// Path to a file of newline-separated learnings carried over from a prior run
    #[arg(long)]
    learnings_file: Option<PathBuf>,

    /// Path to a file of newline-separated visited URLs carried over from a prior run
    #[arg(long)]
    visited_urls_file: Option<PathBuf>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the final report to this path instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the cheap end-to-end connectivity smoke test instead of a full run
    #[arg(long)]
    test_anthropic_mode: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Invokes an external executable (named by `RESEARCH_LLM_COMMAND`) as the
/// concrete LLM provider. The provider itself is out of this crate's scope;
/// this is the integration seam a deployment wires up. The child is sent
/// `{"system":..,"user":..}` on stdin and must print the raw completion
/// text to stdout.
struct ProcessLlmClient {
    command: String,
}

#[async_trait]
impl LlmClient for ProcessLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let payload = json!({"system": system, "user": user}).to_string();
        run_capability_process(&self.command, &["complete"], &payload).await
    }
}

/// Invokes an external executable (named by `RESEARCH_SEARCH_COMMAND`) as the
/// concrete web-search provider, the same capability-boundary seam as
/// [`ProcessLlmClient`]. The child receives `{"query":..,"limit":..}` and must
/// print a JSON array of `{"url":..,"markdown":..}` objects.
struct ProcessSearchClient {
    command: String,
}

#[async_trait]
impl SearchClient for ProcessSearchClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let payload = json!({"query": query, "limit": options.limit}).to_string();
        let raw = run_capability_process(&self.command, &["search"], &payload).await?;
        let pages: Vec<research_orchestrator::search::SearchPage> =
            serde_json::from_str(&raw).context("search provider did not return a JSON page array")?;
        Ok(SearchResponse { data: pages })
    }
}

async fn run_capability_process(command: &str, args: &[&str], stdin_payload: &str) -> Result<String> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn capability process '{command}'"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(stdin_payload.as_bytes()).await.context("failed to write to capability process stdin")?;
    }

    let output = child.wait_with_output().await.context("capability process failed")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("capability process '{command}' exited with {}: {stderr}", output.status));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_multipliers(raw: &[String]) -> Result<HashMap<String, f64>> {
    let mut map = HashMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --component-depth-multiplier '{entry}', expected NAME=FLOAT"))?;
        let value: f64 = value
            .parse()
            .with_context(|| format!("invalid multiplier value in '{entry}'"))?;
        map.insert(name.to_string(), value);
    }
    Ok(map)
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    Ok(content.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    info!("research orchestrator starting for query: {}", cli.query);

    let mut config = RunConfig::load_with_env(cli.config.as_deref(), cli.query.clone())?;
    if let Some(breadth) = cli.breadth {
        config.breadth = breadth;
    }
    if let Some(depth) = cli.depth {
        config.depth = depth;
    }
    if let Some(max_duration) = cli.max_duration {
        config.max_duration_minutes = max_duration;
    }
    if cli.test_anthropic_mode {
        config.test_anthropic_mode = true;
    }
    config.component_depth_multipliers.extend(parse_multipliers(&cli.component_depth_multiplier)?);
    if let Some(path) = &cli.learnings_file {
        config.existing_learnings.extend(read_lines(path)?);
    }
    if let Some(path) = &cli.visited_urls_file {
        config.existing_visited_urls.extend(read_lines(path)?);
    }

    let llm_command = std::env::var("RESEARCH_LLM_COMMAND")
        .context("RESEARCH_LLM_COMMAND must name the LLM provider executable")?;
    let search_command = std::env::var("RESEARCH_SEARCH_COMMAND")
        .context("RESEARCH_SEARCH_COMMAND must name the web-search provider executable")?;
    let llm = ProcessLlmClient { command: llm_command };
    let search = ProcessSearchClient { command: search_command };

    let caps = Capabilities {
        llm: &llm,
        search: &search,
        prompts_dir: config.prompts_dir.as_deref(),
        text_budget: &config.text_budget,
        saturation: &config.saturation,
    };

    let sink = StdoutSink;
    let outcome = research_orchestrator::run(&caps, &config, &sink, CancellationToken::new()).await;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &outcome.report_markdown).with_context(|| format!("failed to write report to {path:?}"))?;
            info!("report written to {path:?}");
        }
        None => {
            println!("{}", outcome.report_markdown);
        }
    }

    if outcome.learnings.is_empty() {
        warn!("run produced no learnings");
    }
    info!(
        "completed {} component(s), skipped {}",
        outcome.time_stats.completed_components.len(),
        outcome.time_stats.skipped_components.len()
    );
    if !outcome.time_stats.skipped_components.is_empty() {
        warn!("skipped components: {:?}", outcome.time_stats.skipped_components);
    }

    Ok(())
}
