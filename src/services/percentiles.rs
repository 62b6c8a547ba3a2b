//! Nearest-rank percentile helpers for already-sorted slices.
//!
//! - Empty input => `None`.
//! - The rank is `ceil(P / 100 * N)`, at least 1 and at most N, so
//!   `P0` is the first element and `P100` the last.

/// Zero-based index of the nearest-rank percentile in a sorted slice of
/// `len` elements.
pub fn nearest_rank_index(len: usize, percentile: f64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let percentile = if percentile.is_finite() {
        percentile.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let rank = (percentile / 100.0 * len as f64).ceil() as usize;
    Some(rank.clamp(1, len) - 1)
}

/// Returns the percentile value from a slice that is already sorted in
/// ascending order.
pub fn value_sorted<T: Copy>(sorted_values: &[T], percentile: f64) -> Option<T> {
    let index = nearest_rank_index(sorted_values.len(), percentile)?;
    sorted_values.get(index).copied()
}

/// Convenience wrapper for `f64` results.
pub fn value_f64_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    value_sorted(sorted_values, percentile).unwrap_or(0.0)
}
