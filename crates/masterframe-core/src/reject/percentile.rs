use super::sigma_clip::closest_survivor;
use crate::stats::percentile_sorted;

/// Exclude samples strictly outside the `[low_pct, high_pct]` percentile band
/// of one pixel.
///
/// If the band is narrower than the spacing between samples and would leave
/// nothing, the sample nearest the band centre survives.
pub fn clip_pixel(values: &[f32], keep: &mut [bool], low_pct: f32, high_pct: f32) {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let lo = percentile_sorted(&sorted, low_pct);
    let hi = percentile_sorted(&sorted, high_pct);

    let mut remaining = 0usize;
    for (k, &v) in keep.iter_mut().zip(values) {
        *k = v >= lo && v <= hi;
        remaining += usize::from(*k);
    }

    if remaining == 0 {
        keep.iter_mut().for_each(|k| *k = true);
        let center = lo + (hi - lo) / 2.0;
        let closest = closest_survivor(values, keep, center);
        keep.iter_mut().for_each(|k| *k = false);
        if let Some(i) = closest {
            keep[i] = true;
        }
    }
}
