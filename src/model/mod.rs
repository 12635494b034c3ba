pub mod plan;
pub mod result;
pub mod state;

pub use plan::{Component, ResearchPlan};
pub use result::{ComponentResult, GapMap, SaturationResult};
pub use state::{ContinueDecision, ResearchState, ResearchStats, should_continue_component};
