//! Nearest-entry search over ascending sequences.
//!
//! Both codeword quantization and cue lookup resolve a target against a
//! non-decreasing sequence with the same bracketing discipline, so their
//! boundary rounding matches exactly.

/// Returns the index of the entry nearest to `target`.
///
/// `value_at(i)` must be non-decreasing in `i` for `i < len`. The search
/// narrows a bracket `[l, r]` (starting at `[0, len - 1]`) with
/// `target < value_at(m)` moving `r` and anything else moving `l`, then picks
/// `l` only when it is strictly closer. Exact ties resolve to `r`.
///
/// Returns `None` for an empty sequence.
///
/// # Example
///
/// ```rust
/// use hdrv_core::search::nearest_index;
///
/// let stamps = [0.0, 5000.0, 9000.0];
/// assert_eq!(nearest_index(stamps.len(), 5000.0, |i| stamps[i]), Some(1));
/// assert_eq!(nearest_index(stamps.len(), 7000.0, |i| stamps[i]), Some(2));
/// ```
pub fn nearest_index(len: usize, target: f64, value_at: impl Fn(usize) -> f64) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let mut l = 0usize;
    let mut r = len - 1;
    while l + 1 < r {
        let m = (l + r) / 2;
        if target < value_at(m) {
            r = m;
        } else {
            l = m;
        }
    }

    if target - value_at(l) < value_at(r) - target {
        Some(l)
    } else {
        Some(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single() {
        assert_eq!(nearest_index(0, 1.0, |_| 0.0), None);
        assert_eq!(nearest_index(1, -5.0, |_| 3.0), Some(0));
    }

    #[test]
    fn test_tie_goes_right() {
        let v = [0.0, 2.0, 4.0];
        assert_eq!(nearest_index(v.len(), 1.0, |i| v[i]), Some(1));
        assert_eq!(nearest_index(v.len(), 3.0, |i| v[i]), Some(2));
        assert_eq!(nearest_index(v.len(), 0.9, |i| v[i]), Some(0));
    }

    #[test]
    fn test_clamps_out_of_range() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(nearest_index(v.len(), -100.0, |i| v[i]), Some(0));
        assert_eq!(nearest_index(v.len(), 100.0, |i| v[i]), Some(3));
    }

    #[test]
    fn test_flat_runs() {
        let v = [0.0, 1.0, 1.0, 1.0, 2.0];
        let idx = nearest_index(v.len(), 1.0, |i| v[i]).unwrap();
        assert_eq!(v[idx], 1.0);
    }
}
