use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{MasterFrameError, Result};
use crate::frame::{Frame, Stack};
use crate::reject::PixelMask;
use crate::stats::{mean, median_in_place};

/// Statistic reducing a pixel's surviving samples to one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombineMethod {
    #[default]
    Median,
    /// Arithmetic mean (configured as `average`).
    #[serde(rename = "average", alias = "mean")]
    Mean,
}

impl CombineMethod {
    /// Configuration keyword for the method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "average",
        }
    }

    /// Reduce a non-empty survivor list. Reorders `survivors`.
    pub fn reduce(&self, survivors: &mut [f32]) -> f32 {
        match self {
            Self::Median => median_in_place(survivors),
            Self::Mean => mean(survivors),
        }
    }
}

impl std::fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Median => write!(f, "Median"),
            Self::Mean => write!(f, "Average"),
        }
    }
}

/// Copy the samples of `(row, col)` that survive `mask` into `out`.
///
/// The survivor count varies per pixel under sigma and percentile clipping,
/// so each pixel gets its own variable-length list.
pub fn gather_survivors(stack: &Stack, mask: &PixelMask, row: usize, col: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        stack
            .frames()
            .iter()
            .enumerate()
            .filter(|(i, _)| mask.survives(*i, row, col))
            .map(|(_, frame)| frame.data[[row, col]]),
    );
}

/// Reduce the stack to one frame using only the samples `mask` keeps.
///
/// Parallelizes at the row level for images >= 256x256.
pub fn combine(stack: &Stack, mask: &PixelMask, method: &CombineMethod) -> Result<Frame> {
    if stack.is_empty() {
        return Err(MasterFrameError::NoInputFrames);
    }
    let n = stack.len();
    let (h, w) = stack.dim();
    let (mn, mh, mw) = mask.dim();
    if (mn, mh, mw) != (n, h, w) {
        return Err(MasterFrameError::ShapeMismatch {
            path: "pixel mask".into(),
            expected: (h, w),
            actual: (mh, mw),
        });
    }

    let combine_row = |row: usize| -> Result<Vec<f32>> {
        let mut survivors = Vec::with_capacity(n);
        let mut out = vec![0.0f32; w];
        for (col, value) in out.iter_mut().enumerate() {
            gather_survivors(stack, mask, row, col, &mut survivors);
            if survivors.is_empty() {
                return Err(MasterFrameError::EmptyPixelSet { row, col });
            }
            *value = method.reduce(&mut survivors);
        }
        Ok(out)
    };

    let rows: Vec<Result<Vec<f32>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().map(combine_row).collect()
    } else {
        (0..h).map(combine_row).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data?.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
    Ok(Frame::new(result))
}
