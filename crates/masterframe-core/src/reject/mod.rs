//! Per-pixel outlier rejection across a stack.
//!
//! Every policy looks only at the N samples sharing a `(row, col)` position;
//! spatial neighbours never influence each other.

pub mod minmax;
pub mod percentile;
pub mod sigma_clip;

use ndarray::Array3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{MasterFrameError, Result};
use crate::frame::Stack;

/// Outlier rejection applied before combining.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RejectionPolicy {
    #[default]
    None,
    /// Drop the `nlow` lowest and `nhigh` highest samples.
    MinMax { nlow: usize, nhigh: usize },
    /// Iterative clipping around the mean.
    SigmaClip {
        low_sigma: f32,
        high_sigma: f32,
        max_iterations: u32,
    },
    /// Drop samples outside the given percentile band.
    PercentileClip { low_pct: f32, high_pct: f32 },
}

impl RejectionPolicy {
    /// Configuration keyword for the policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MinMax { .. } => "minmax",
            Self::SigmaClip { .. } => "sigclip",
            Self::PercentileClip { .. } => "pclip",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::None | Self::MinMax { .. } => Ok(()),
            Self::SigmaClip {
                low_sigma,
                high_sigma,
                ..
            } => {
                for (name, v) in [("low_sigma", low_sigma), ("high_sigma", high_sigma)] {
                    if !v.is_finite() || v <= 0.0 {
                        return Err(MasterFrameError::InvalidConfig(format!(
                            "{name} must be a positive number, got {v}"
                        )));
                    }
                }
                Ok(())
            }
            Self::PercentileClip { low_pct, high_pct } => {
                for (name, v) in [("low_pct", low_pct), ("high_pct", high_pct)] {
                    if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                        return Err(MasterFrameError::InvalidConfig(format!(
                            "{name} must be within [0, 100], got {v}"
                        )));
                    }
                }
                if low_pct > high_pct {
                    return Err(MasterFrameError::InvalidConfig(format!(
                        "low_pct ({low_pct}) must not exceed high_pct ({high_pct})"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for RejectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::MinMax { nlow, nhigh } => write!(f, "MinMax (nlow={nlow}, nhigh={nhigh})"),
            Self::SigmaClip {
                low_sigma,
                high_sigma,
                max_iterations,
            } => write!(
                f,
                "Sigma Clip (low={low_sigma}, high={high_sigma}, iterations={max_iterations})"
            ),
            Self::PercentileClip { low_pct, high_pct } => {
                write!(f, "Percentile Clip ({low_pct}%..{high_pct}%)")
            }
        }
    }
}

/// Survival flags for every sample of a stack, shape = (frames, height, width).
///
/// `true` means the sample takes part in the combination.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelMask {
    keep: Array3<bool>,
}

impl PixelMask {
    pub fn all_true(frames: usize, height: usize, width: usize) -> Self {
        Self {
            keep: Array3::from_elem((frames, height, width), true),
        }
    }

    pub fn from_array(keep: Array3<bool>) -> Self {
        Self { keep }
    }

    /// (frames, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.keep.dim()
    }

    pub fn survives(&self, frame: usize, row: usize, col: usize) -> bool {
        self.keep[[frame, row, col]]
    }

    pub fn as_array(&self) -> &Array3<bool> {
        &self.keep
    }

    pub fn rejected_count(&self) -> usize {
        self.keep.iter().filter(|&&k| !k).count()
    }

    /// Number of surviving samples at one pixel.
    pub fn survivor_count(&self, row: usize, col: usize) -> usize {
        (0..self.keep.dim().0)
            .filter(|&i| self.keep[[i, row, col]])
            .count()
    }
}

/// Compute which samples survive `policy`.
pub fn reject(stack: &Stack, policy: &RejectionPolicy) -> Result<PixelMask> {
    policy.validate()?;
    let n = stack.len();
    if n == 0 {
        return Err(MasterFrameError::NoInputFrames);
    }
    let (h, w) = stack.dim();

    let mask = match *policy {
        RejectionPolicy::None => PixelMask::all_true(n, h, w),
        RejectionPolicy::MinMax { nlow, nhigh } => {
            if n <= nlow + nhigh {
                warn!(
                    frames = n,
                    nlow, nhigh, "Too few frames for minmax rejection, combining unclipped"
                );
                PixelMask::all_true(n, h, w)
            } else {
                per_pixel(stack, |values, keep| {
                    minmax::reject_pixel(values, keep, nlow, nhigh)
                })
            }
        }
        RejectionPolicy::SigmaClip {
            low_sigma,
            high_sigma,
            max_iterations,
        } => per_pixel(stack, |values, keep| {
            sigma_clip::clip_pixel(values, keep, low_sigma, high_sigma, max_iterations)
        }),
        RejectionPolicy::PercentileClip { low_pct, high_pct } => {
            per_pixel(stack, |values, keep| {
                percentile::clip_pixel(values, keep, low_pct, high_pct)
            })
        }
    };

    let total = n * h * w;
    let rejected = mask.rejected_count();
    info!(
        policy = policy.name(),
        rejected,
        fraction = if total > 0 { rejected as f64 / total as f64 } else { 0.0 },
        "Rejection complete"
    );
    Ok(mask)
}

/// Run a per-pixel rejection kernel over the whole stack.
///
/// The kernel receives the N samples of one pixel and a keep-slice that
/// starts all-true. Parallelizes at the row level for large frames.
fn per_pixel<F>(stack: &Stack, kernel: F) -> PixelMask
where
    F: Fn(&[f32], &mut [bool]) + Sync,
{
    let n = stack.len();
    let (h, w) = stack.dim();

    let row_mask = |row: usize| -> Vec<bool> {
        let mut values = vec![0.0f32; n];
        let mut keep = vec![true; w * n];
        for col in 0..w {
            stack.pixel_column(row, col, &mut values);
            kernel(&values, &mut keep[col * n..(col + 1) * n]);
        }
        keep
    };

    let rows: Vec<Vec<bool>> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().map(row_mask).collect()
    } else {
        (0..h).map(row_mask).collect()
    };

    let mut keep = Array3::from_elem((n, h, w), true);
    for (row, row_keep) in rows.iter().enumerate() {
        for col in 0..w {
            for i in 0..n {
                keep[[i, row, col]] = row_keep[col * n + i];
            }
        }
    }
    PixelMask { keep }
}
