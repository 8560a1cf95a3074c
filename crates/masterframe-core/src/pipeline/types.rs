use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MasterFrameError, Result};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Rejecting,
    Scaling,
    Combining,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading frames"),
            Self::Rejecting => write!(f, "Rejecting outliers"),
            Self::Scaling => write!(f, "Scaling frames"),
            Self::Combining => write!(f, "Combining"),
            Self::Writing => write!(f, "Writing master"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_stage` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Shared flag a caller sets to stop a running stage.
///
/// Checked between frame loads and between pipeline stages.
pub type CancelFlag = Arc<AtomicBool>;

pub(super) fn check_cancelled(cancel: Option<&CancelFlag>) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(MasterFrameError::Cancelled),
        _ => Ok(()),
    }
}
