//! Logarithmic luminance encoding between two bounds.
//!
//! Codewords are spaced evenly in `log10` luminance:
//!
//! ```text
//! encode(L) = (log10 L - log10 Lmin) / (log10 Lmax - log10 Lmin)
//! decode(v) = 10^(v * (log10 Lmax - log10 Lmin) + log10 Lmin)
//! ```

/// Maps luminance to a normalized log signal.
#[inline]
pub fn encode(l: f32, l_min: f32, l_max: f32) -> f32 {
    let (lo, hi) = (l_min.log10(), l_max.log10());
    (l.log10() - lo) / (hi - lo)
}

/// Maps a normalized log signal back to luminance.
#[inline]
pub fn decode(v: f32, l_min: f32, l_max: f32) -> f32 {
    decode_f64(v as f64, l_min as f64, l_max as f64) as f32
}

/// Double precision [`decode`], used for table construction.
#[inline]
pub fn decode_f64(v: f64, l_min: f64, l_max: f64) -> f64 {
    let (lo, hi) = (l_min.log10(), l_max.log10());
    10f64.powf(v * (hi - lo) + lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds() {
        assert_relative_eq!(decode(0.0, 0.005, 10000.0), 0.005, max_relative = 1e-5);
        assert_relative_eq!(decode(1.0, 0.005, 10000.0), 10000.0, max_relative = 1e-5);
    }

    #[test]
    fn test_roundtrip() {
        for &l in &[0.01f32, 1.0, 42.0, 5000.0] {
            let v = encode(l, 0.005, 10000.0);
            assert_relative_eq!(decode(v, 0.005, 10000.0), l, max_relative = 1e-4);
        }
    }
}
