//! Encoder parameters.
//!
//! Parameters can be built in code, or loaded from and saved to YAML:
//!
//! ```yaml
//! ptf: PQ
//! color_space: LUV
//! ptf_bit_depth: 11
//! color_bit_depth: 8
//! max_luminance: 10000.0
//! fps: 24.0
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use hdrv_core::{ColorSpaceKind, PtfKind};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::packer::ByteOrder;
use crate::quantizer::QuantizerConfig;

/// Settings for an encode session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    /// Codec quantizer scale, 0 is best quality.
    pub quantizer_scale: u32,
    /// Bits per luminance codeword.
    pub ptf_bit_depth: u32,
    /// Bits per chroma codeword.
    pub color_bit_depth: u32,
    /// Factor applied to input values before the color transform.
    pub pre_scaling: f32,
    /// Lower luminance bound in cd/m².
    pub min_luminance: f32,
    /// Upper luminance bound in cd/m².
    pub max_luminance: f32,
    /// Frames per second.
    pub fps: f32,
    /// Perceptual transfer function.
    pub ptf: PtfKind,
    /// Encoding color space.
    pub color_space: ColorSpaceKind,
    /// Target bitrate in kbit/s.
    pub bitrate: u32,
    /// Codec profile, see [`crate::packer::profile_layout`].
    pub profile: u32,
    /// Force a keyframe every N frames, 0 leaves it to the codec.
    pub keyframe_interval: u32,
    /// Codec sample bit depth: 8, 10 or 12.
    pub encoding_bit_depth: u32,
    /// Request lossless coding.
    pub lossless: bool,
    /// Byte order of two-byte samples.
    pub byte_order: ByteOrder,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            quantizer_scale: 2,
            ptf_bit_depth: 11,
            color_bit_depth: 8,
            pre_scaling: 1.0,
            min_luminance: 0.005,
            max_luminance: 10000.0,
            fps: 25.0,
            ptf: PtfKind::Pq,
            color_space: ColorSpaceKind::Luv,
            bitrate: 10000,
            profile: 2,
            keyframe_interval: 0,
            encoding_bit_depth: 12,
            lossless: false,
            byte_order: ByteOrder::Little,
        }
    }
}

impl EncoderParams {
    /// Loads parameters from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> CodecResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CodecError::ParamsNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses parameters from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> CodecResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes to YAML.
    pub fn to_yaml_string(&self) -> CodecResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes parameters to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> CodecResult<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> CodecResult<()> {
        let fail = |msg: String| Err(CodecError::invalid_params(msg));

        if !(1..=16).contains(&self.ptf_bit_depth) {
            return fail(format!("PTF bit depth {} outside 1..=16", self.ptf_bit_depth));
        }
        if !(1..=16).contains(&self.color_bit_depth) {
            return fail(format!("color bit depth {} outside 1..=16", self.color_bit_depth));
        }
        if !matches!(self.encoding_bit_depth, 8 | 10 | 12) {
            return fail(format!(
                "encoding bit depth {} is not 8, 10 or 12",
                self.encoding_bit_depth
            ));
        }
        if self.profile > 3 {
            return fail(format!("profile {} outside 0..=3", self.profile));
        }
        if self.quantizer_scale > 63 {
            return fail(format!("quantizer scale {} above 63", self.quantizer_scale));
        }
        if !(self.min_luminance > 0.0 && self.min_luminance < self.max_luminance)
            || !self.max_luminance.is_finite()
        {
            return fail(format!(
                "luminance range [{}, {}] is empty or not positive",
                self.min_luminance, self.max_luminance
            ));
        }
        if !(self.pre_scaling > 0.0 && self.pre_scaling.is_finite()) {
            return fail(format!("pre-scaling {} must be positive", self.pre_scaling));
        }
        if !(self.fps > 0.0 && self.fps <= 1000.0) {
            return fail(format!("fps {} outside (0, 1000]", self.fps));
        }
        Ok(())
    }

    /// Profile matched to the encoding bit depth.
    ///
    /// 8-bit encoding needs a one-byte profile (0 or 1), deeper encoding a
    /// two-byte one (2 or 3).
    pub fn adjusted_profile(&self) -> u32 {
        match (self.profile, self.encoding_bit_depth) {
            (p, 8) if p > 1 => p - 2,
            (p, d) if p < 2 && d > 8 => p + 2,
            (p, _) => p,
        }
    }

    /// Builds the quantizer configuration these parameters describe.
    pub fn quantizer_config(&self) -> CodecResult<QuantizerConfig> {
        QuantizerConfig::new(
            self.ptf,
            self.ptf_bit_depth,
            self.color_bit_depth,
            self.color_space,
            self.min_luminance,
            self.max_luminance,
        )
    }

    /// Keyframe requested for frame `index`.
    pub fn wants_keyframe(&self, index: u64) -> bool {
        index == 0 || (self.keyframe_interval > 0 && index % u64::from(self.keyframe_interval) == 0)
    }
}
