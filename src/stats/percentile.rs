//! Percentiles over sorted samples

/// Linearly interpolated percentile of an ascending slice
///
/// `p` is a fraction in `[0, 1]`; the rank is `p * (n - 1)`. Returns 0 for
/// an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let weight = rank - lo as f64;
                sorted[lo] + (sorted[hi] - sorted[lo]) * weight
            }
        }
    }
}

/// Sort in place, ascending
pub fn sort_values(values: &mut [f64]) {
    values.sort_unstable_by(f64::total_cmp);
}
