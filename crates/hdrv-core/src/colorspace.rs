//! Encoding color space kinds.
//!
//! Frames enter the pipeline as linear RGB and are converted into one of
//! these spaces before quantization. Channel 0 is always the
//! luminance-like channel.
//!
//! | Kind | Code | Channel 0 | Channels 1-2 |
//! |------|------|-----------|--------------|
//! | [`ColorSpaceKind::Luv`] | 0 | Y | scaled u', v' |
//! | [`ColorSpaceKind::Rgb`] | 1 | R | G, B |
//! | [`ColorSpaceKind::YCbCr`] | 2 | PQ luma | Cb, Cr |
//! | [`ColorSpaceKind::Xyz`] | 3 | X | Y, Z |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Color space used for the encoded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum ColorSpaceKind {
    /// Luminance plus CIE 1976 u'v' chromaticity.
    #[default]
    #[serde(rename = "LUV")]
    Luv = 0,
    /// Pre-scaled linear RGB.
    #[serde(rename = "RGB")]
    Rgb = 1,
    /// BT.2020 luma/chroma over PQ-encoded RGB.
    #[serde(rename = "YCBCR")]
    YCbCr = 2,
    /// CIE XYZ.
    #[serde(rename = "XYZ")]
    Xyz = 3,
}

impl ColorSpaceKind {
    /// All kinds in code order.
    pub const ALL: [ColorSpaceKind; 4] = [
        ColorSpaceKind::Luv,
        ColorSpaceKind::Rgb,
        ColorSpaceKind::YCbCr,
        ColorSpaceKind::Xyz,
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
            .ok_or(Error::UnknownColorSpace { code })
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ColorSpaceKind::Luv => "Lu'v'",
            ColorSpaceKind::Rgb => "RGB",
            ColorSpaceKind::YCbCr => "YCbCr (ITU-R BT.2020)",
            ColorSpaceKind::Xyz => "XYZ",
        }
    }

    /// Short command-line token.
    pub fn token(self) -> &'static str {
        match self {
            ColorSpaceKind::Luv => "LUV",
            ColorSpaceKind::Rgb => "RGB",
            ColorSpaceKind::YCbCr => "YCBCR",
            ColorSpaceKind::Xyz => "XYZ",
        }
    }

    /// Whether every channel goes through the luminance table.
    ///
    /// RGB and XYZ channels all carry physical luminance; the other spaces
    /// have normalized chroma in channels 1 and 2.
    #[inline]
    pub fn all_channels_luminance(self) -> bool {
        matches!(self, ColorSpaceKind::Rgb | ColorSpaceKind::Xyz)
    }
}

impl fmt::Display for ColorSpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ColorSpaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|k| k.token() == upper)
            .ok_or_else(|| Error::config(format!("unknown color space '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ColorSpaceKind::Luv.code(), 0);
        assert_eq!(ColorSpaceKind::Rgb.code(), 1);
        assert_eq!(ColorSpaceKind::YCbCr.code(), 2);
        assert_eq!(ColorSpaceKind::Xyz.code(), 3);
        assert!(ColorSpaceKind::from_code(4).is_err());
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("ycbcr".parse::<ColorSpaceKind>().unwrap(), ColorSpaceKind::YCbCr);
        assert_eq!("LUV".parse::<ColorSpaceKind>().unwrap(), ColorSpaceKind::Luv);
        assert!("lab".parse::<ColorSpaceKind>().is_err());
    }

    #[test]
    fn test_luminance_channels() {
        assert!(ColorSpaceKind::Rgb.all_channels_luminance());
        assert!(ColorSpaceKind::Xyz.all_channels_luminance());
        assert!(!ColorSpaceKind::Luv.all_channels_luminance());
        assert!(!ColorSpaceKind::YCbCr.all_channels_luminance());
    }
}
