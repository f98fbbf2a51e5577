//! Just-noticeable-difference (JND) mapping tables.
//!
//! Each codeword step of a JND table is one detection threshold wide: the
//! curve integrates `dL / threshold(L)` over the visible range, then spaces
//! codewords evenly in that accumulated JND count. Two threshold models are
//! supported:
//!
//! - [`JndModel::Ferwerda`] - Ferwerda et al. threshold-versus-intensity
//!   functions, taking the lower of the cone and rod thresholds
//! - [`JndModel::HdrVdp`] - peak contrast sensitivity from the HDR-VDP
//!   visual model, threshold `L / S(L)`
//!
//! Tables exist for 10, 11 and 12 bit codewords over a fixed
//! [`JND_L_MIN`]..[`JND_L_MAX`] range. They are computed once and cached.
//! Other bit depths use the nearest supported table, resampled to the
//! requested codeword count.

use std::sync::OnceLock;

use tracing::{debug, warn};

/// Lower luminance bound of every JND table, in cd/m2.
pub const JND_L_MIN: f64 = 0.005;

/// Upper luminance bound of every JND table, in cd/m2.
pub const JND_L_MAX: f64 = 10000.0;

/// Bit depths with a native table.
pub const SUPPORTED_BIT_DEPTHS: [u32; 3] = [10, 11, 12];

// Integration grid, uniform in ln(L).
const GRID: usize = 16384;

// HDR-VDP peak sensitivity fit: S(L) = P1 * (1 + (P2 / L)^P3)^-P4
const P1: f64 = 30.162;
const P2: f64 = 4.0627;
const P3: f64 = 1.6596;
const P4: f64 = 0.2712;

/// Visual threshold model behind a JND table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JndModel {
    /// Ferwerda threshold-versus-intensity.
    Ferwerda,
    /// HDR-VDP contrast sensitivity.
    HdrVdp,
}

impl JndModel {
    /// Smallest detectable luminance increment at adaptation luminance `l`.
    pub fn threshold(self, l: f64) -> f64 {
        match self {
            JndModel::Ferwerda => ferwerda_threshold(l),
            JndModel::HdrVdp => l / hdrvdp_sensitivity(l),
        }
    }

    fn slot(self) -> usize {
        match self {
            JndModel::Ferwerda => 0,
            JndModel::HdrVdp => 1,
        }
    }
}

fn ferwerda_threshold(l: f64) -> f64 {
    let x = l.log10();

    let cone = if x <= -2.6 {
        -0.72
    } else if x >= 1.9 {
        x - 1.255
    } else {
        (0.249 * x + 0.65).powf(2.7) - 0.72
    };

    let rod = if x <= -3.94 {
        -2.86
    } else if x >= -1.44 {
        x - 0.395
    } else {
        (0.405 * x + 1.6).powf(2.18) - 2.86
    };

    10f64.powf(cone).min(10f64.powf(rod))
}

fn hdrvdp_sensitivity(l: f64) -> f64 {
    P1 * (1.0 + (P2 / l).powf(P3)).powf(-P4)
}

/// Supported bit depth closest to `bits`.
pub fn nearest_supported(bits: u32) -> u32 {
    bits.clamp(SUPPORTED_BIT_DEPTHS[0], SUPPORTED_BIT_DEPTHS[2])
}

/// Returns the JND mapping table with `2^bits` entries.
pub fn table(model: JndModel, bits: u32) -> Vec<f32> {
    let native = nearest_supported(bits);
    let base = cached(model, native);

    if native == bits {
        return base.to_vec();
    }

    warn!(
        "No {}-bit {:?} JND table, resampling the {}-bit table",
        bits, model, native
    );
    resample(base, 1usize << bits)
}

fn cached(model: JndModel, bits: u32) -> &'static [f32] {
    static TABLES: [[OnceLock<Vec<f32>>; 3]; 2] = [
        [OnceLock::new(), OnceLock::new(), OnceLock::new()],
        [OnceLock::new(), OnceLock::new(), OnceLock::new()],
    ];

    let depth_slot = (bits - SUPPORTED_BIT_DEPTHS[0]) as usize;
    TABLES[model.slot()][depth_slot].get_or_init(|| build(model, 1usize << bits))
}

/// Integrates threshold steps on a log grid and inverts the cumulative count.
fn build(model: JndModel, size: usize) -> Vec<f32> {
    debug!("Building {:?} JND table with {} entries", model, size);

    let lo = JND_L_MIN.ln();
    let hi = JND_L_MAX.ln();
    let step = (hi - lo) / (GRID - 1) as f64;

    // JND count per unit ln(L)
    let density = |ln_l: f64| {
        let l = ln_l.exp();
        l / model.threshold(l)
    };

    let mut cumulative = vec![0.0f64; GRID];
    let mut prev = density(lo);
    for k in 1..GRID {
        let cur = density(lo + k as f64 * step);
        cumulative[k] = cumulative[k - 1] + 0.5 * (prev + cur) * step;
        prev = cur;
    }
    let total = cumulative[GRID - 1];

    let max = (size - 1) as f64;
    let mut mapping: Vec<f32> = (0..size)
        .map(|i| {
            let target = total * i as f64 / max;
            let k = cumulative
                .partition_point(|&c| c <= target)
                .saturating_sub(1)
                .min(GRID - 2);
            let span = cumulative[k + 1] - cumulative[k];
            let t = ((target - cumulative[k]) / span).clamp(0.0, 1.0);
            (lo + (k as f64 + t) * step).exp() as f32
        })
        .collect();

    mapping[0] = JND_L_MIN as f32;
    mapping[size - 1] = JND_L_MAX as f32;
    mapping
}

/// Linear resampling of a monotonic table to `size` entries.
fn resample(base: &[f32], size: usize) -> Vec<f32> {
    let src_max = (base.len() - 1) as f64;
    let dst_max = (size - 1).max(1) as f64;

    (0..size)
        .map(|i| {
            let pos = i as f64 / dst_max * src_max;
            let k = (pos.floor() as usize).min(base.len() - 2);
            let t = pos - k as f64;
            let a = base[k] as f64;
            let b = base[k + 1] as f64;
            (a + (b - a) * t) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_monotonic(t: &[f32]) {
        for w in t.windows(2) {
            assert!(w[0] <= w[1], "{} > {}", w[0], w[1]);
        }
    }

    #[test]
    fn test_native_tables() {
        for model in [JndModel::Ferwerda, JndModel::HdrVdp] {
            for bits in SUPPORTED_BIT_DEPTHS {
                let t = table(model, bits);
                assert_eq!(t.len(), 1 << bits);
                assert_monotonic(&t);
                assert_relative_eq!(t[0], JND_L_MIN as f32);
                assert_relative_eq!(t[t.len() - 1], JND_L_MAX as f32);
            }
        }
    }

    #[test]
    fn test_fallback_resamples() {
        let t8 = table(JndModel::Ferwerda, 8);
        assert_eq!(t8.len(), 256);
        assert_monotonic(&t8);
        assert_relative_eq!(t8[255], JND_L_MAX as f32, max_relative = 1e-6);

        let t14 = table(JndModel::HdrVdp, 14);
        assert_eq!(t14.len(), 1 << 14);
        assert_monotonic(&t14);
    }

    #[test]
    fn test_thresholds_positive_and_increasing() {
        for model in [JndModel::Ferwerda, JndModel::HdrVdp] {
            let mut prev = 0.0;
            for e in -2..=4 {
                let l = 10f64.powi(e);
                let t = model.threshold(l);
                assert!(t > 0.0);
                assert!(t > prev);
                prev = t;
            }
        }
    }

    #[test]
    fn test_weber_regime() {
        // Photopic cones: threshold ratio settles near 10^-1.255
        let ratio = JndModel::Ferwerda.threshold(1000.0) / 1000.0;
        assert_relative_eq!(ratio, 10f64.powf(-1.255), max_relative = 1e-9);
    }

    #[test]
    fn test_nearest_supported() {
        assert_eq!(nearest_supported(8), 10);
        assert_eq!(nearest_supported(11), 11);
        assert_eq!(nearest_supported(16), 12);
    }
}
