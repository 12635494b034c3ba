//! Error taxonomy for the orchestrator.
//!
//! Most failures in the pipeline (LLM schema mismatch, empty search results,
//! a dropped progress sink) are not fatal: each component has a documented
//! local fallback and the orchestrator degrades rather than aborting. Only
//! the two cases below stop a run outright.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no LLM handle available")]
    NoLlmHandle,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
