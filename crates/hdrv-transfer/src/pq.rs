//! Perceptual Quantizer (PQ) transfer function.
//!
//! PQ encodes absolute luminance up to a peak `l_max` into a [0, 1] signal
//! spaced according to contrast sensitivity.
//!
//! # Range
//!
//! - Encoded: [0, 1]
//! - Linear: [0, l_max] cd/m2
//!
//! # Reference
//!
//! SMPTE ST 2084:2014. The constants here are the rounded decimal values
//! used by HDR video packaging tools, so tables built from them stay
//! compatible with streams produced by those tools.
//!
//! # Usage
//!
//! ```rust
//! use hdrv_transfer::pq;
//!
//! let signal = pq::oetf(100.0, 10000.0);
//! let nits = pq::eotf(signal, 10000.0);
//! assert!((nits - 100.0).abs() < 0.01);
//! ```

/// Default peak luminance in cd/m2.
pub const L_MAX: f32 = 10000.0;

const M: f64 = 78.8438;
const N: f64 = 0.1593;
const C1: f64 = 0.8359;
const C2: f64 = 18.8516;
const C3: f64 = 18.6875;

/// Encodes luminance to a PQ signal, computed in double precision.
#[inline]
pub fn oetf_f64(l: f64, l_max: f64) -> f64 {
    let lp = (l.max(0.0) / l_max).powf(N);
    ((C1 + C2 * lp) / (1.0 + C3 * lp)).powf(M)
}

/// Decodes a PQ signal to luminance, computed in double precision.
#[inline]
pub fn eotf_f64(v: f64, l_max: f64) -> f64 {
    let vp = v.clamp(0.0, 1.0).powf(1.0 / M);
    l_max * ((vp - C1).max(0.0) / (C2 - C3 * vp)).powf(1.0 / N)
}

/// PQ OETF: encodes absolute luminance (cd/m2) to a PQ signal.
///
/// # Arguments
///
/// * `l` - Luminance in cd/m2, negative values treated as zero
/// * `l_max` - Peak luminance the curve is normalized to
///
/// # Returns
///
/// PQ encoded value. Zero luminance maps to a tiny positive signal
/// (`c1^m`), which decodes back to zero.
#[inline]
pub fn oetf(l: f32, l_max: f32) -> f32 {
    oetf_f64(l as f64, l_max as f64) as f32
}

/// PQ EOTF: decodes a PQ signal to absolute luminance (cd/m2).
///
/// # Arguments
///
/// * `v` - PQ encoded value, clamped to [0, 1]
/// * `l_max` - Peak luminance the curve is normalized to
#[inline]
pub fn eotf(v: f32, l_max: f32) -> f32 {
    eotf_f64(v as f64, l_max as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roundtrip() {
        let test_values = [0.01, 0.1, 0.5, 1.0, 10.0, 100.0, 1000.0, 10000.0];
        for &l in &test_values {
            let encoded = oetf(l, L_MAX);
            let decoded = eotf(encoded, L_MAX);
            assert_relative_eq!(decoded, l, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(eotf(0.0, L_MAX), 0.0);
        assert_relative_eq!(eotf(1.0, L_MAX), L_MAX, max_relative = 1e-6);
        assert_relative_eq!(oetf(L_MAX, L_MAX), 1.0, max_relative = 1e-5);
    }

    #[test]
    fn test_reference_white() {
        // 100 nits sits close to half signal
        let signal = oetf(100.0, L_MAX);
        assert!((signal - 0.508).abs() < 0.01);
    }

    #[test]
    fn test_monotonic() {
        let mut prev = -1.0;
        for i in 0..=1000 {
            let l = eotf(i as f32 / 1000.0, L_MAX);
            assert!(l >= prev);
            prev = l;
        }
    }
}
