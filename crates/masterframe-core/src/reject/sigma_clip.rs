use crate::stats::masked_mean_stddev;

/// Iterative sigma clipping of one pixel's samples.
///
/// Each iteration computes the mean and standard deviation of the surviving
/// samples and excludes any survivor outside
/// `[mean - low_sigma*std, mean + high_sigma*std]`. Stops when nothing
/// changes, the spread collapses, or `max_iterations` is reached.
///
/// Never empties the pixel: if an iteration would reject every survivor, only
/// the survivor closest to that iteration's mean is kept.
pub fn clip_pixel(
    values: &[f32],
    keep: &mut [bool],
    low_sigma: f32,
    high_sigma: f32,
    max_iterations: u32,
) {
    for _ in 0..max_iterations {
        let Some((mean, stddev)) = masked_mean_stddev(values, keep) else {
            break;
        };
        if stddev <= f32::EPSILON * mean.abs().max(1.0) {
            break;
        }
        let lo = mean - low_sigma * stddev;
        let hi = mean + high_sigma * stddev;

        let outside = |i: usize| values[i] < lo || values[i] > hi;
        let mut changed = false;
        let mut remaining = 0usize;
        for i in 0..values.len() {
            if keep[i] {
                if outside(i) {
                    changed = true;
                } else {
                    remaining += 1;
                }
            }
        }
        if !changed {
            break;
        }

        if remaining == 0 {
            let closest = closest_survivor(values, keep, mean);
            keep.iter_mut().for_each(|k| *k = false);
            if let Some(i) = closest {
                keep[i] = true;
            }
            break;
        }

        for i in 0..values.len() {
            if keep[i] && outside(i) {
                keep[i] = false;
            }
        }
    }
}

/// Index of the surviving sample nearest `target`; the lowest index wins ties.
pub(crate) fn closest_survivor(values: &[f32], keep: &[bool], target: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, (&v, &k)) in values.iter().zip(keep).enumerate() {
        if !k {
            continue;
        }
        let d = (v - target).abs();
        match best {
            Some((_, bd)) if bd <= d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}
