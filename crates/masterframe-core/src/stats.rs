//! Sample statistics shared by the rejection, scaling and combine engines.
//!
//! Sums are accumulated in `f64` so large stacks and large frames do not lose
//! precision; results are returned as `f32` to match frame samples.

use ndarray::Array2;

use crate::consts::MAD_TO_SIGMA;

/// Median of `values`, reordering them in place.
///
/// Uses `select_nth_unstable` for O(n) median without full sort. For an even
/// count the two middle values are averaged. Returns NaN for an empty slice.
pub fn median_in_place(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        f32::NAN
    } else if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        let upper = values[mid];
        let lower = *values[..mid]
            .select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b))
            .1;
        ((lower as f64 + upper as f64) / 2.0) as f32
    }
}

/// Median of `values` without disturbing them.
pub fn median(values: &[f32]) -> f32 {
    let mut scratch = values.to_vec();
    median_in_place(&mut scratch)
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

/// Mean and population standard deviation of the samples selected by `mask`.
///
/// Returns `None` when no sample is selected.
pub fn masked_mean_stddev(values: &[f32], mask: &[bool]) -> Option<(f32, f32)> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (&v, &keep) in values.iter().zip(mask) {
        if keep {
            sum += v as f64;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;

    let mut var_sum = 0.0f64;
    for (&v, &keep) in values.iter().zip(mask) {
        if keep {
            let d = v as f64 - mean;
            var_sum += d * d;
        }
    }
    let stddev = (var_sum / count as f64).sqrt();
    Some((mean as f32, stddev as f32))
}

/// Percentile of already ascending-sorted samples, `pct` in [0, 100].
///
/// Linear interpolation between closest ranks: rank = pct/100 * (n-1).
pub fn percentile_sorted(sorted: &[f32], pct: f32) -> f32 {
    let n = sorted.len();
    if n == 0 {
        return f32::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct.clamp(0.0, 100.0) as f64 / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    (sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac) as f32
}

/// Median absolute deviation around `center`. `scratch` is overwritten.
pub fn mad_with_scratch(values: &[f32], center: f32, scratch: &mut Vec<f32>) -> f32 {
    scratch.clear();
    scratch.extend(values.iter().map(|&v| (v - center).abs()));
    median_in_place(scratch)
}

/// Robust mode estimate: `median - 1.4826 * MAD`.
pub fn robust_mode(values: &[f32]) -> f32 {
    let mut scratch = values.to_vec();
    let center = median_in_place(&mut scratch);
    let mad = mad_with_scratch(values, center, &mut scratch);
    center - MAD_TO_SIGMA * mad
}

/// Summary statistics of a whole frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub median: f32,
    pub stddev: f32,
}

impl FrameStats {
    pub fn of(data: &Array2<f32>) -> Self {
        let values: Vec<f32> = data.iter().copied().collect();
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let all = vec![true; values.len()];
        let (mean, stddev) = masked_mean_stddev(&values, &all).unwrap_or((f32::NAN, f32::NAN));
        Self {
            min,
            max,
            mean,
            median: median(&values),
            stddev,
        }
    }
}
