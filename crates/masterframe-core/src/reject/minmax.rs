/// Exclude the `nlow` smallest and `nhigh` largest samples of one pixel.
///
/// Ties keep stack order (stable sort), so among equal values the earlier
/// frames are treated as lower. The caller guarantees `nlow + nhigh < n`.
pub fn reject_pixel(values: &[f32], keep: &mut [bool], nlow: usize, nhigh: usize) {
    let n = values.len();
    debug_assert!(nlow + nhigh < n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    for &i in order[..nlow].iter().chain(&order[n - nhigh..]) {
        keep[i] = false;
    }
}
