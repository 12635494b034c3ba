//! Run configuration: CLI defaults, on-disk overrides, environment overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tokenizer and trim-budget knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBudgetConfig {
    pub context_window_tokens: usize,
    pub min_trim_chunk_chars: usize,
    pub per_content_trim_chars: usize,
    pub fallback_query_max_words: usize,
}

impl Default for TextBudgetConfig {
    fn default() -> Self {
        Self {
            context_window_tokens: 120_000,
            min_trim_chunk_chars: 140,
            per_content_trim_chars: 25_000,
            fallback_query_max_words: 4,
        }
    }
}

/// Saturation thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaturationConfig {
    pub component_threshold_pct: u32,
    pub mid_depth_threshold_pct: u32,
    pub minimal_iteration_gate_pct: f64,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            component_threshold_pct: 75,
            mid_depth_threshold_pct: 65,
            minimal_iteration_gate_pct: 0.10,
        }
    }
}

/// Top-level run configuration: the query and pipeline knobs plus the
/// ambient settings a deployable binary needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub query: String,
    #[serde(default = "default_breadth")]
    pub breadth: u32,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u64,
    #[serde(default)]
    pub component_depth_multipliers: HashMap<String, f64>,
    #[serde(default)]
    pub existing_learnings: Vec<String>,
    #[serde(default)]
    pub existing_visited_urls: Vec<String>,
    #[serde(default)]
    pub feedback_responses: Vec<FeedbackPair>,
    #[serde(default)]
    pub test_anthropic_mode: bool,
    #[serde(default)]
    pub text_budget: TextBudgetConfig,
    #[serde(default)]
    pub saturation: SaturationConfig,
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackPair {
    pub question: String,
    pub response: String,
}

fn default_breadth() -> u32 {
    3
}
fn default_depth() -> u32 {
    2
}
fn default_max_duration_minutes() -> u64 {
    30
}

impl RunConfig {
    pub fn new(query: String) -> Self {
        Self {
            query,
            breadth: default_breadth(),
            depth: default_depth(),
            max_duration_minutes: default_max_duration_minutes(),
            component_depth_multipliers: HashMap::new(),
            existing_learnings: Vec::new(),
            existing_visited_urls: Vec::new(),
            feedback_responses: Vec::new(),
            test_anthropic_mode: false,
            text_budget: TextBudgetConfig::default(),
            saturation: SaturationConfig::default(),
            prompts_dir: None,
            output_path: None,
        }
    }

    /// Load a base config from a YAML file, then apply environment overrides.
    pub fn load_with_env(path: Option<&Path>, fallback_query: String) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::new(fallback_query),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse config file {:?}", path))
    }

    /// Apply `RESEARCH_*` environment variable overrides. Precedence: env
    /// beats whatever was loaded from a config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RESEARCH_BREADTH")
            && let Ok(n) = v.parse()
        {
            self.breadth = n;
        }
        if let Ok(v) = std::env::var("RESEARCH_DEPTH")
            && let Ok(n) = v.parse()
        {
            self.depth = n;
        }
        if let Ok(v) = std::env::var("RESEARCH_MAX_DURATION_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.max_duration_minutes = n;
        }
        if let Ok(v) = std::env::var("RESEARCH_PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("RESEARCH_TEST_ANTHROPIC_MODE") {
            self.test_anthropic_mode = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}
