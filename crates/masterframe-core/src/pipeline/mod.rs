pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{combine_stack, load_stack, run_stage, run_stage_reported};
pub use types::{CancelFlag, NoOpReporter, PipelineStage, ProgressReporter};
