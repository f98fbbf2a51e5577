//! Discretized codeword-to-luminance mapping tables.
//!
//! A [`TransferFunctionTable`] holds `2^bit_depth` luminance values, one per
//! codeword, for the chosen [`PtfKind`]. The table is always non-decreasing;
//! construction rejects anything else, since the quantizer's binary search
//! depends on it.
//!
//! | Kind | `mapping[i]` |
//! |------|--------------|
//! | PQ | `pq::eotf(i / max, Lmax)` |
//! | Log | `10^((i / max) * (log10 Lmax - log10 Lmin) + log10 Lmin)` |
//! | Linear | `Lmax * i / max` |
//! | PSI, HDR-VDP | cached JND tables, see [`crate::jnd`] |
//!
//! # Usage
//!
//! ```rust
//! use hdrv_core::PtfKind;
//! use hdrv_transfer::TransferFunctionTable;
//!
//! let table = TransferFunctionTable::new(PtfKind::Pq, 11, 0.005, 10000.0).unwrap();
//! assert_eq!(table.len(), 2048);
//! assert_eq!(table.max_code(), 2047);
//! ```

use hdrv_core::search::nearest_index;
use hdrv_core::{Error, PtfKind, Result};
use tracing::debug;

use crate::jnd::{self, JndModel};
use crate::{log, pq};

/// Highest supported codeword bit depth.
pub const MAX_BIT_DEPTH: u32 = 16;

/// Monotonic lookup table from integer codewords to physical luminance.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunctionTable {
    kind: PtfKind,
    bit_depth: u32,
    l_min: f32,
    l_max: f32,
    mapping: Vec<f32>,
}

impl TransferFunctionTable {
    /// Builds the table for a transfer function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the bit depth is outside
    /// `1..=MAX_BIT_DEPTH` or the luminance range is not `0 < l_min < l_max`.
    pub fn new(kind: PtfKind, bit_depth: u32, l_min: f32, l_max: f32) -> Result<Self> {
        validate(bit_depth, l_min, l_max)?;

        let size = 1usize << bit_depth;
        let max = (size - 1) as f64;
        let (lo, hi) = (l_min as f64, l_max as f64);

        let mapping: Vec<f32> = match kind {
            PtfKind::Pq => (0..size)
                .map(|i| pq::eotf_f64(i as f64 / max, hi) as f32)
                .collect(),
            PtfKind::Log => (0..size)
                .map(|i| log::decode_f64(i as f64 / max, lo, hi) as f32)
                .collect(),
            PtfKind::Linear => (0..size).map(|i| (hi * i as f64 / max) as f32).collect(),
            PtfKind::Psi => jnd::table(JndModel::Ferwerda, bit_depth),
            PtfKind::JndHdrVdp => jnd::table(JndModel::HdrVdp, bit_depth),
        };

        debug!(
            "Built {} table: {} entries, [{}, {}] cd/m2",
            kind.token(),
            mapping.len(),
            mapping[0],
            mapping[size - 1]
        );

        Self::from_mapping(kind, bit_depth, l_min, l_max, mapping)
    }

    /// Wraps a mapping table read back from a stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the length is not `2^bit_depth` or the
    /// values decrease anywhere.
    pub fn from_mapping(
        kind: PtfKind,
        bit_depth: u32,
        l_min: f32,
        l_max: f32,
        mapping: Vec<f32>,
    ) -> Result<Self> {
        validate(bit_depth, l_min, l_max)?;

        let size = 1usize << bit_depth;
        if mapping.len() != size {
            return Err(Error::config(format!(
                "mapping table has {} entries, expected {} for {}-bit codewords",
                mapping.len(),
                size,
                bit_depth
            )));
        }

        if let Some(i) = first_decrease(&mapping) {
            return Err(Error::config(format!(
                "mapping table is not monotonic at codeword {i}"
            )));
        }

        Ok(Self {
            kind,
            bit_depth,
            l_min,
            l_max,
            mapping,
        })
    }

    /// Transfer function the table was built for.
    #[inline]
    pub fn kind(&self) -> PtfKind {
        self.kind
    }

    /// Codeword bit depth.
    #[inline]
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    /// Lower luminance bound the table was configured with.
    #[inline]
    pub fn l_min(&self) -> f32 {
        self.l_min
    }

    /// Upper luminance bound the table was configured with.
    #[inline]
    pub fn l_max(&self) -> f32 {
        self.l_max
    }

    /// Number of entries, `2^bit_depth`.
    #[inline]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Always `false`; a table has at least two entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Largest codeword, `2^bit_depth - 1`.
    #[inline]
    pub fn max_code(&self) -> u32 {
        (self.mapping.len() - 1) as u32
    }

    /// The raw mapping values.
    #[inline]
    pub fn mapping(&self) -> &[f32] {
        &self.mapping
    }

    /// Luminance for a codeword, clamped to the table.
    #[inline]
    pub fn lookup(&self, code: u32) -> f32 {
        self.mapping[(code as usize).min(self.mapping.len() - 1)]
    }

    /// Codeword whose luminance is nearest to `value`.
    ///
    /// Out-of-range values clamp to the first or last codeword. When `value`
    /// is exactly halfway between two entries the upper one wins.
    pub fn nearest_code(&self, value: f32) -> u32 {
        let target = value as f64;
        nearest_index(self.mapping.len(), target, |i| self.mapping[i] as f64).unwrap_or(0) as u32
    }

    /// Width of the table around `code`: the larger of its two neighbor gaps.
    pub fn step_at(&self, code: u32) -> f32 {
        let i = (code as usize).min(self.mapping.len() - 1);
        let below = if i > 0 {
            self.mapping[i] - self.mapping[i - 1]
        } else {
            0.0
        };
        let above = if i + 1 < self.mapping.len() {
            self.mapping[i + 1] - self.mapping[i]
        } else {
            0.0
        };
        below.max(above)
    }

    /// Checks the non-decreasing invariant.
    pub fn is_monotonic(&self) -> bool {
        first_decrease(&self.mapping).is_none()
    }
}

fn validate(bit_depth: u32, l_min: f32, l_max: f32) -> Result<()> {
    if !(1..=MAX_BIT_DEPTH).contains(&bit_depth) {
        return Err(Error::config(format!(
            "PTF bit depth {bit_depth} outside 1..={MAX_BIT_DEPTH}"
        )));
    }
    if !(l_min > 0.0 && l_min < l_max && l_max.is_finite()) {
        return Err(Error::config(format!(
            "invalid luminance range [{l_min}, {l_max}]"
        )));
    }
    Ok(())
}

fn first_decrease(mapping: &[f32]) -> Option<usize> {
    mapping
        .windows(2)
        .position(|w| w[1] < w[0] || w[0].is_nan() || w[1].is_nan())
        .map(|i| i + 1)
}
