//! Perceptual transfer function (PTF) kinds.
//!
//! A PTF allocates integer codewords to physical luminance. The numeric
//! code of each kind is stored in the container, so the discriminants are
//! fixed and must not be renumbered.
//!
//! | Kind | Code | Token |
//! |------|------|-------|
//! | [`PtfKind::Psi`] | 0 | `PSI` |
//! | [`PtfKind::Pq`] | 1 | `PQ` |
//! | [`PtfKind::Log`] | 2 | `LOG` |
//! | [`PtfKind::JndHdrVdp`] | 3 | `HDRVDP` |
//! | [`PtfKind::Linear`] | 4 | `LINEAR` |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Transfer function used to build the luminance mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PtfKind {
    /// Perceptual curve from Ferwerda's threshold-versus-intensity model.
    #[serde(rename = "PSI")]
    Psi = 0,
    /// SMPTE ST 2084 perceptual quantizer.
    #[default]
    #[serde(rename = "PQ")]
    Pq = 1,
    /// Logarithmic spacing between the luminance bounds.
    #[serde(rename = "LOG")]
    Log = 2,
    /// Just-noticeable-difference curve from the HDR-VDP sensitivity model.
    #[serde(rename = "HDRVDP")]
    JndHdrVdp = 3,
    /// Linear scaling up to the maximum luminance.
    #[serde(rename = "LINEAR")]
    Linear = 4,
}

impl PtfKind {
    /// All kinds in code order.
    pub const ALL: [PtfKind; 5] = [
        PtfKind::Psi,
        PtfKind::Pq,
        PtfKind::Log,
        PtfKind::JndHdrVdp,
        PtfKind::Linear,
    ];

    /// Numeric code stored in the container.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Looks up a kind by its stored code.
    pub fn from_code(code: u32) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or(Error::UnknownPtf { code })
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            PtfKind::Pq => "Perceptual quantizer (PQ, SMPTE ST 2084)",
            PtfKind::Log => "Logarithmic",
            PtfKind::JndHdrVdp => "JND HDR-VDP",
            PtfKind::Psi => "Perceptual - Ferwerda's t.v.i.",
            PtfKind::Linear => "Linear scaling",
        }
    }

    /// Short command-line token.
    pub fn token(self) -> &'static str {
        match self {
            PtfKind::Psi => "PSI",
            PtfKind::Pq => "PQ",
            PtfKind::Log => "LOG",
            PtfKind::JndHdrVdp => "HDRVDP",
            PtfKind::Linear => "LINEAR",
        }
    }

    /// Whether the table depends on the configured luminance range.
    ///
    /// The JND-based kinds come from fixed tables and ignore it.
    #[inline]
    pub fn uses_luminance_range(self) -> bool {
        matches!(self, PtfKind::Pq | PtfKind::Log | PtfKind::Linear)
    }
}

impl fmt::Display for PtfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for PtfKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|k| k.token() == upper)
            .ok_or_else(|| Error::config(format!("unknown transfer function '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(PtfKind::Psi.code(), 0);
        assert_eq!(PtfKind::Pq.code(), 1);
        assert_eq!(PtfKind::Log.code(), 2);
        assert_eq!(PtfKind::JndHdrVdp.code(), 3);
        assert_eq!(PtfKind::Linear.code(), 4);
    }

    #[test]
    fn test_from_code() {
        for kind in PtfKind::ALL {
            assert_eq!(PtfKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(matches!(
            PtfKind::from_code(5),
            Err(Error::UnknownPtf { code: 5 })
        ));
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("pq".parse::<PtfKind>().unwrap(), PtfKind::Pq);
        assert_eq!("HDRVDP".parse::<PtfKind>().unwrap(), PtfKind::JndHdrVdp);
        assert_eq!(" Linear ".parse::<PtfKind>().unwrap(), PtfKind::Linear);
        assert!("gamma".parse::<PtfKind>().is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(PtfKind::Pq.name(), "Perceptual quantizer (PQ, SMPTE ST 2084)");
        assert_eq!(PtfKind::Psi.name(), "Perceptual - Ferwerda's t.v.i.");
        assert!(PtfKind::Log.uses_luminance_range());
        assert!(!PtfKind::Psi.uses_luminance_range());
    }
}
