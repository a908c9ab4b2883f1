// Environmental analysis: scoring, insight derivation, rule-based recommendations,
// prioritization and roadmap allocation. Pure functions over an Evaluation snapshot.

pub mod handlers;
pub mod insights;
pub mod pipeline;
pub mod ranking;
pub mod recommendations;
pub mod roadmap;
pub mod scoring;

pub use pipeline::{run_analysis, Analysis};
