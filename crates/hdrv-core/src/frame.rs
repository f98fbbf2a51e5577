//! Planar floating-point frame buffer.
//!
//! A [`Frame`] owns `channels * height * width` samples stored plane by
//! plane: all of channel 0, then all of channel 1, and so on. Within a plane
//! samples are row-major.
//!
//! ```text
//! data: [ c0 row0 .. c0 rowH | c1 row0 .. c1 rowH | c2 row0 .. c2 rowH ]
//! ```
//!
//! Channel 0 is luminance-like. Channels 1 and 2 are interpreted according
//! to the color space the frame is currently in.
//!
//! # Usage
//!
//! ```rust
//! use hdrv_core::Frame;
//!
//! let mut frame = Frame::new(4, 2, 3).unwrap();
//! frame.plane_mut(0).fill(100.0);
//! assert_eq!(frame.plane(0).len(), 8);
//! assert_eq!(frame.mean(0), 100.0);
//! ```

use crate::error::{Error, Result};

/// Planar float frame, exclusively owned by the caller between pipeline calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Frame {
    /// Allocates a zero-filled frame.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        let len = Self::sample_count(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0.0; len],
        })
    }

    /// Wraps an existing planar sample buffer.
    pub fn from_data(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        let expected = Self::sample_count(width, height, channels)?;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    fn sample_count(width: usize, height: usize, channels: usize) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "zero-sized frame"));
        }
        if channels == 0 {
            return Err(Error::channel_mismatch(1, 0));
        }
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| Error::invalid_dimensions(width, height, "sample count overflows"))
    }

    /// Builds the synthetic 3-channel calibration frame.
    ///
    /// Rows are split into three bands:
    /// - top tenth: quadratic ramp `10000 * x^2 / w^2` on every channel
    /// - second tenth: 20 equal luminance steps across the width
    /// - remainder: a checkerboard in channel 0, and quadratic ramps in
    ///   channels 1 and 2 on every other band of rows
    pub fn test_pattern(width: usize, height: usize) -> Result<Self> {
        let mut frame = Self::new(width, height, 3)?;
        let (w, h) = (width, height);
        let (wf, hf) = (w as f32, h as f32);
        let plane = w * h;

        for y in 0..h {
            let band = (20 * y / h) % 2;
            for x in 0..w {
                let ramp = 10000.0 * (x * x) as f32 / (wf * wf);
                let idx = x + y * w;
                let values = if y < h / 10 {
                    [ramp; 3]
                } else if y < h / 5 {
                    [10000.0 * ((20 * x) / w) as f32 / 20.0; 3]
                } else {
                    let checker = band ^ ((30 * x / w) % 2);
                    [
                        10000.0 * checker as f32,
                        10000.0 * band as f32 * (y * y) as f32 / (hf * hf),
                        10000.0 * band as f32 * (x * x) as f32 / (wf * wf),
                    ]
                };
                for (c, v) in values.into_iter().enumerate() {
                    frame.data[c * plane + idx] = v;
                }
            }
        }

        Ok(frame)
    }

    /// Frame width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of channels (planes).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per plane.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// All samples, plane by plane.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to all samples.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the frame and returns its sample buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    #[inline]
    pub fn plane(&self, channel: usize) -> &[f32] {
        let n = self.pixel_count();
        &self.data[channel * n..(channel + 1) * n]
    }

    /// Mutable samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    #[inline]
    pub fn plane_mut(&mut self, channel: usize) -> &mut [f32] {
        let n = self.pixel_count();
        &mut self.data[channel * n..(channel + 1) * n]
    }

    /// Splits the first three planes into disjoint mutable slices.
    pub fn planes3_mut(&mut self) -> Result<[&mut [f32]; 3]> {
        if self.channels < 3 {
            return Err(Error::channel_mismatch(3, self.channels));
        }
        let n = self.pixel_count();
        let (p0, rest) = self.data.split_at_mut(n);
        let (p1, rest) = rest.split_at_mut(n);
        let p2 = &mut rest[..n];
        Ok([p0, p1, p2])
    }

    /// Arithmetic mean of one channel.
    pub fn mean(&self, channel: usize) -> f32 {
        let plane = self.plane(channel);
        let sum: f64 = plane.iter().map(|&v| v as f64).sum();
        (sum / plane.len() as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_layout() {
        let data: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let frame = Frame::from_data(4, 2, 3, data).unwrap();
        assert_eq!(frame.plane(0)[0], 0.0);
        assert_eq!(frame.plane(1)[0], 8.0);
        assert_eq!(frame.plane(2)[7], 23.0);
    }

    #[test]
    fn test_rejects_bad_buffers() {
        assert!(matches!(
            Frame::from_data(4, 2, 3, vec![0.0; 10]),
            Err(Error::BufferSize { expected: 24, got: 10 })
        ));
        assert!(Frame::new(0, 2, 3).is_err());
        assert!(Frame::new(2, 2, 0).is_err());
    }

    #[test]
    fn test_planes3_mut_disjoint() {
        let mut frame = Frame::new(2, 2, 3).unwrap();
        {
            let [r, g, b] = frame.planes3_mut().unwrap();
            r.fill(1.0);
            g.fill(2.0);
            b.fill(3.0);
        }
        assert_eq!(frame.mean(0), 1.0);
        assert_eq!(frame.mean(1), 2.0);
        assert_eq!(frame.mean(2), 3.0);

        let mut mono = Frame::new(2, 2, 1).unwrap();
        assert!(mono.planes3_mut().is_err());
    }

    #[test]
    fn test_pattern_bands() {
        let frame = Frame::test_pattern(40, 40).unwrap();
        assert_eq!(frame.channels(), 3);

        // Top band: quadratic ramp, identical on all channels
        let x = 20;
        let expected = 10000.0 * (x * x) as f32 / 1600.0;
        for c in 0..3 {
            assert_relative_eq!(frame.plane(c)[x], expected);
        }

        // Step band: 20 steps across the width
        let row = 5 * 40;
        assert_relative_eq!(frame.plane(0)[row + 39], 10000.0 * 19.0 / 20.0);

        // Checkerboard values are either 0 or 10000
        for &v in &frame.plane(0)[8 * 40..] {
            assert!(v == 0.0 || v == 10000.0);
        }
    }
}
