use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::combine::combine;
use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{MasterFrameError, Result};
use crate::frame::{Frame, Stack};
use crate::io::loader::{load_frame, LoadOptions};
use crate::io::writer::write_master;
use crate::master::{MasterFrame, Provenance};
use crate::reject::reject;
use crate::scale::scale;

use super::config::{CombineConfig, StageConfig};
use super::types::{check_cancelled, CancelFlag, NoOpReporter, PipelineStage, ProgressReporter};

/// Load every input into a stack, in input order.
///
/// Frames are decoded in parallel for larger inputs; whichever way they are
/// read, the first failing input (in input order) is the error reported.
pub fn load_stack(
    inputs: &[PathBuf],
    options: &LoadOptions,
    reporter: &Arc<dyn ProgressReporter>,
    cancel: Option<&CancelFlag>,
) -> Result<Stack> {
    if inputs.is_empty() {
        return Err(MasterFrameError::NoInputFrames);
    }
    reporter.begin_stage(PipelineStage::Loading, Some(inputs.len()));
    let done = AtomicUsize::new(0);

    let load_one = |path: &PathBuf| -> Result<Frame> {
        check_cancelled(cancel)?;
        let frame = load_frame(path, options)?;
        reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(frame)
    };

    let loaded: Vec<Result<Frame>> = if inputs.len() >= PARALLEL_FRAME_THRESHOLD {
        inputs.par_iter().map(load_one).collect()
    } else {
        // Sequential loads stop at the first failure.
        let mut loaded = Vec::with_capacity(inputs.len());
        for path in inputs {
            let result = load_one(path);
            let failed = result.is_err();
            loaded.push(result);
            if failed {
                break;
            }
        }
        loaded
    };

    let mut stack = Stack::default();
    for frame in loaded {
        stack.push(frame?)?;
    }
    check_cancelled(cancel)?;
    reporter.finish_stage();

    let (h, w) = stack.dim();
    info!(frames = stack.len(), width = w, height = h, "Stack loaded");
    Ok(stack)
}

/// Reject, scale and combine an in-memory stack. Performs no I/O.
pub fn combine_stack(
    stack: &Stack,
    stage: &str,
    config: &CombineConfig,
    reporter: &Arc<dyn ProgressReporter>,
    cancel: Option<&CancelFlag>,
) -> Result<MasterFrame> {
    config.validate()?;
    if stack.is_empty() {
        return Err(MasterFrameError::NoInputFrames);
    }
    let rejection = config.rejection_policy();

    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Rejecting, None);
    let mask = reject(stack, &rejection)?;
    reporter.finish_stage();

    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Scaling, Some(stack.len()));
    let scaled = scale(stack, &config.scale);
    reporter.finish_stage();

    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Combining, None);
    let combined = combine(&scaled.stack, &mask, &config.combine_method)?;
    reporter.finish_stage();

    info!(
        stage,
        frames = stack.len(),
        method = config.combine_method.name(),
        reject = rejection.name(),
        scale = config.scale.name(),
        "Stack combined"
    );

    let provenance = Provenance {
        stage: stage.to_string(),
        source_count: stack.len(),
        combine_method: config.combine_method,
        rejection_policy: rejection,
        scaling_policy: config.scale,
        input_file_names: stack.source_names(),
        scale_factors: scaled.factors,
    };
    Ok(MasterFrame::new(combined.data, provenance))
}

/// Run a full stage with a thread-safe progress reporter and optional
/// cancellation: load, reject, scale, combine, write.
///
/// Nothing is written unless every earlier step succeeded.
pub fn run_stage_reported(
    config: &StageConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: Option<CancelFlag>,
) -> Result<MasterFrame> {
    let cancel = cancel.as_ref();
    config.combine.validate()?;
    if config.inputs.is_empty() {
        return Err(MasterFrameError::NoInputFrames);
    }
    info!(
        stage = %config.stage,
        inputs = config.inputs.len(),
        output = %config.output.display(),
        "Processing stage"
    );

    let stack = load_stack(
        &config.inputs,
        &config.combine.load_options(),
        &reporter,
        cancel,
    )?;
    let master = combine_stack(&stack, &config.stage, &config.combine, &reporter, cancel)?;
    drop(stack);

    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Writing, None);
    write_master(&master, &config.output, config.combine.overwrite)?;
    reporter.finish_stage();
    Ok(master)
}

/// Run a full stage without progress reporting or cancellation.
pub fn run_stage(config: &StageConfig) -> Result<MasterFrame> {
    run_stage_reported(config, Arc::new(NoOpReporter), None)
}
