//! Frame-level conversion between linear RGB and the encoding color spaces.
//!
//! The forward direction multiplies by the pre-scaling factor `sc` before
//! converting; the inverse divides it out after converting back.
//!
//! # Spaces
//!
//! - **XYZ**: fixed RGB->XYZ matrix, components clamped to `[1e-4, 1e8]`.
//! - **Lu'v'**: XYZ as above, then `Y` plus u'v' chromaticity scaled by
//!   `410/255`. The inverse rebuilds XYZ from `Y` and the chromaticity ratios.
//! - **YCbCr**: PQ-encode R, G, B, form BT.2020 luma `y`, derive Cb/Cr offset
//!   into `[0, 1]`, then store luma back as luminance through the PQ EOTF so
//!   it can share the luminance table. The inverse clamps RGB signals to
//!   `[0, 1]` before decoding.
//! - **RGB**: scaling only.

use glam::{Mat3, Vec3};
use hdrv_core::{ColorSpaceKind, Frame};
use hdrv_transfer::pq;

use crate::error::{ColorError, ColorResult};

/// Lower clamp for intermediate XYZ components.
pub const XYZ_MIN: f32 = 1e-4;

/// Upper clamp for intermediate XYZ components.
pub const XYZ_MAX: f32 = 1e8;

/// Scale applied to u'v' so chroma spans the channel range.
const UV_SCALE: f32 = 410.0 / 255.0;

// BT.2020 luma weights and chroma divisors
const KR: f32 = 0.2627;
const KG: f32 = 0.6780;
const KB: f32 = 0.0593;
const CB_DIV: f32 = 1.8814;
const CR_DIV: f32 = 1.4746;

/// Linear RGB to CIE XYZ (row-major).
pub const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412424, 0.357579, 0.180464],
    [0.212656, 0.715158, 0.072186],
    [0.019332, 0.119193, 0.950444],
];

/// CIE XYZ to linear RGB (row-major).
pub const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240708, -1.537259, -0.498570],
    [-0.969257, 1.875995, 0.041555],
    [0.055636, -0.203996, 1.057069],
];

fn from_rows(rows: &[[f32; 3]; 3]) -> Mat3 {
    Mat3::from_cols_array_2d(rows).transpose()
}

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Linear RGB into the encoding space.
    ToEncoding,
    /// Encoding space back to linear RGB.
    ToRgb,
}

/// Converts frames between linear RGB and one encoding color space.
#[derive(Debug, Clone)]
pub struct ColorTransformer {
    space: ColorSpaceKind,
    l_max: f32,
    rgb_to_xyz: Mat3,
    xyz_to_rgb: Mat3,
}

impl ColorTransformer {
    /// Creates a transformer.
    ///
    /// `l_max` is the peak luminance of the PQ curve used by the YCbCr path.
    pub fn new(space: ColorSpaceKind, l_max: f32) -> Self {
        Self {
            space,
            l_max,
            rgb_to_xyz: from_rows(&RGB_TO_XYZ),
            xyz_to_rgb: from_rows(&XYZ_TO_RGB),
        }
    }

    /// Creates a transformer from a stored color space code.
    ///
    /// Unknown codes are a configuration error; nothing is transformed.
    pub fn from_code(code: u32, l_max: f32) -> ColorResult<Self> {
        Ok(Self::new(ColorSpaceKind::from_code(code)?, l_max))
    }

    /// Target encoding space.
    #[inline]
    pub fn space(&self) -> ColorSpaceKind {
        self.space
    }

    /// Converts a whole frame in place.
    ///
    /// # Errors
    ///
    /// Fails before touching any sample if the frame has fewer than three
    /// channels or `sc` is not a positive finite number.
    pub fn transform(&self, frame: &mut Frame, direction: Direction, sc: f32) -> ColorResult<()> {
        if !(sc > 0.0 && sc.is_finite()) {
            return Err(ColorError::InvalidScale(sc));
        }

        let [c0, c1, c2] = frame.planes3_mut()?;
        for ((a, b), c) in c0.iter_mut().zip(c1.iter_mut()).zip(c2.iter_mut()) {
            let px = [*a, *b, *c];
            let out = match direction {
                Direction::ToEncoding => self.forward_pixel(px, sc),
                Direction::ToRgb => self.inverse_pixel(px, sc),
            };
            *a = out[0];
            *b = out[1];
            *c = out[2];
        }
        Ok(())
    }

    /// Linear RGB frame into the encoding space.
    pub fn to_encoding(&self, frame: &mut Frame, sc: f32) -> ColorResult<()> {
        self.transform(frame, Direction::ToEncoding, sc)
    }

    /// Encoding-space frame back to linear RGB.
    pub fn to_rgb(&self, frame: &mut Frame, sc: f32) -> ColorResult<()> {
        self.transform(frame, Direction::ToRgb, sc)
    }

    /// Forward conversion of one pixel.
    pub fn forward_pixel(&self, rgb: [f32; 3], sc: f32) -> [f32; 3] {
        let rgb = Vec3::from_array(rgb) * sc;
        match self.space {
            ColorSpaceKind::Rgb => rgb.to_array(),
            ColorSpaceKind::Xyz => self.clamped_xyz(rgb).to_array(),
            ColorSpaceKind::Luv => {
                let xyz = self.clamped_xyz(rgb);
                let sum = xyz.x + xyz.y + xyz.z;
                let x = xyz.x / sum;
                let y = xyz.y / sum;
                let denom = -2.0 * x + 12.0 * y + 3.0;
                [xyz.y, 4.0 * x / denom * UV_SCALE, 9.0 * y / denom * UV_SCALE]
            }
            ColorSpaceKind::YCbCr => {
                let r = pq::oetf(rgb.x.max(1e-10), self.l_max);
                let g = pq::oetf(rgb.y.max(1e-10), self.l_max);
                let b = pq::oetf(rgb.z.max(1e-10), self.l_max);
                let y = KR * r + KG * g + KB * b;
                [
                    pq::eotf((219.0 * y + 16.0) / 255.0, self.l_max),
                    (224.0 * ((b - y) / CB_DIV) + 128.0) / 255.0,
                    (224.0 * ((r - y) / CR_DIV) + 128.0) / 255.0,
                ]
            }
        }
    }

    /// Inverse conversion of one pixel.
    pub fn inverse_pixel(&self, enc: [f32; 3], sc: f32) -> [f32; 3] {
        match self.space {
            ColorSpaceKind::Rgb => (Vec3::from_array(enc) / sc).to_array(),
            ColorSpaceKind::Xyz => (self.xyz_to_rgb * Vec3::from_array(enc) / sc).to_array(),
            ColorSpaceKind::Luv => {
                let l = enc[0];
                let u = enc[1] / UV_SCALE;
                let v = enc[2] / UV_SCALE;
                let denom = 6.0 * u - 16.0 * v + 12.0;
                let x = 9.0 * u / denom;
                let y = 4.0 * v / denom;
                let xyz = Vec3::new(x / y * l, l, (1.0 - x - y) / y * l)
                    .clamp(Vec3::splat(XYZ_MIN), Vec3::splat(XYZ_MAX));
                (self.xyz_to_rgb * xyz / sc).to_array()
            }
            ColorSpaceKind::YCbCr => {
                let y = pq::oetf(enc[0], self.l_max);
                let y = (255.0 * y - 16.0) / 219.0;
                let blue = y + CB_DIV * (255.0 * enc[1] - 128.0) / 224.0;
                let red = y + CR_DIV * (255.0 * enc[2] - 128.0) / 224.0;
                let green = (y - KR * red - KB * blue) / KG;
                [red, green, blue].map(|c| pq::eotf(c.clamp(0.0, 1.0), self.l_max) / sc)
            }
        }
    }

    fn clamped_xyz(&self, rgb: Vec3) -> Vec3 {
        (self.rgb_to_xyz * rgb).clamp(Vec3::splat(XYZ_MIN), Vec3::splat(XYZ_MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn roundtrip(space: ColorSpaceKind, rgb: [f32; 3], sc: f32) -> [f32; 3] {
        let t = ColorTransformer::new(space, 10000.0);
        t.inverse_pixel(t.forward_pixel(rgb, sc), sc)
    }

    #[test]
    fn test_rgb_scaling() {
        let t = ColorTransformer::new(ColorSpaceKind::Rgb, 10000.0);
        let mut frame = Frame::from_data(1, 1, 3, vec![1.0, 1.0, 1.0]).unwrap();
        t.to_encoding(&mut frame, 2.0).unwrap();
        assert_eq!(frame.data(), &[2.0, 2.0, 2.0]);
        t.to_rgb(&mut frame, 2.0).unwrap();
        assert_eq!(frame.data(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_roundtrip_all_spaces() {
        let samples = [[100.0, 50.0, 10.0], [1.0, 1.0, 1.0], [0.2, 3.0, 0.7], [5000.0, 2000.0, 800.0]];
        for space in ColorSpaceKind::ALL {
            for rgb in samples {
                let back = roundtrip(space, rgb, 1.0);
                for c in 0..3 {
                    assert_relative_eq!(back[c], rgb[c], max_relative = 2e-3);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_with_prescaling() {
        for space in ColorSpaceKind::ALL {
            let rgb = [2.0, 1.0, 0.5];
            let back = roundtrip(space, rgb, 50.0);
            for c in 0..3 {
                assert_relative_eq!(back[c], rgb[c], max_relative = 2e-3);
            }
        }
    }

    #[test]
    fn test_luv_channel0_is_luminance() {
        let t = ColorTransformer::new(ColorSpaceKind::Luv, 10000.0);
        let out = t.forward_pixel([100.0, 100.0, 100.0], 1.0);
        assert_relative_eq!(out[0], 100.0, max_relative = 1e-5);
        // D65 white: u' ~ 0.1978, v' ~ 0.4683
        assert_relative_eq!(out[1], 0.1978 * UV_SCALE, max_relative = 1e-3);
        assert_relative_eq!(out[2], 0.4683 * UV_SCALE, max_relative = 1e-3);
    }

    #[test]
    fn test_xyz_clamps() {
        let t = ColorTransformer::new(ColorSpaceKind::Xyz, 10000.0);
        let out = t.forward_pixel([-5.0, 0.0, 0.0], 1.0);
        assert_eq!(out, [XYZ_MIN; 3]);
        let out = t.forward_pixel([1e9, 1e9, 1e9], 1.0);
        assert!(out.iter().all(|&v| v <= XYZ_MAX));
    }

    #[test]
    fn test_ycbcr_neutral_chroma() {
        let t = ColorTransformer::new(ColorSpaceKind::YCbCr, 10000.0);
        let out = t.forward_pixel([100.0, 100.0, 100.0], 1.0);
        assert_relative_eq!(out[1], 128.0 / 255.0, max_relative = 1e-5);
        assert_relative_eq!(out[2], 128.0 / 255.0, max_relative = 1e-5);
    }

    #[test]
    fn test_rejects_bad_scale_and_channels() {
        let t = ColorTransformer::new(ColorSpaceKind::Rgb, 10000.0);
        let mut frame = Frame::new(2, 2, 3).unwrap();
        assert!(matches!(
            t.to_encoding(&mut frame, 0.0),
            Err(ColorError::InvalidScale(_))
        ));

        let mut mono = Frame::new(2, 2, 1).unwrap();
        assert!(matches!(t.to_encoding(&mut mono, 1.0), Err(ColorError::Core(_))));
    }

    #[test]
    fn test_unknown_code() {
        assert!(ColorTransformer::from_code(2, 10000.0).is_ok());
        assert!(ColorTransformer::from_code(42, 10000.0).is_err());
    }
}
