//! Encode command.
//!
//! Reads raw planar f32 frames (or generates a test pattern) and writes a
//! Matroska stream using the raw codec.

use std::io::Write;

use anyhow::{Context, Result, bail};
use hdrv_codec::{Encoder, EncoderParams, RawCodec};
use hdrv_core::Frame;
use tracing::{debug, info};

use crate::EncodeArgs;

/// Test pattern length when `--frames` is not given.
const DEFAULT_PATTERN_FRAMES: usize = 25;

/// Runs the encode command.
pub fn run(args: EncodeArgs, verbose: bool) -> Result<()> {
    let is_mkv = args
        .output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("mkv"));
    if !is_mkv {
        bail!("output must be a .mkv file: {}", args.output.display());
    }

    let params = build_params(&args)?;
    if let Some(path) = &args.save_config {
        params
            .save(path)
            .with_context(|| format!("Failed to save parameters: {}", path.display()))?;
        info!("Saved parameters to {}", path.display());
    }

    let (width, height) = match (args.test_pattern, args.width, args.height) {
        (Some(size), _, _) => size,
        (None, Some(w), Some(h)) => (w, h),
        _ => bail!("either --test-pattern or --input with --width and --height is required"),
    };

    let output = super::create_output(&args.output)?;
    let mut encoder = Encoder::create(output, width, height, params, RawCodec::new())
        .context("Failed to start encoding")?;

    match &args.input {
        Some(path) => {
            let mut reader = super::open_input(path)?;
            let limit = args.frames.unwrap_or(usize::MAX);
            while (encoder.frames_encoded() as usize) < limit {
                let Some(mut frame) = super::read_raw_frame(&mut reader, width, height)
                    .with_context(|| format!("Failed to read: {}", path.display()))?
                else {
                    break;
                };
                encoder.encode_frame(&mut frame)?;
            }
        }
        None => {
            let pattern = Frame::test_pattern(width, height)?;
            for _ in 0..args.frames.unwrap_or(DEFAULT_PATTERN_FRAMES) {
                encoder.encode_frame(&mut pattern.clone())?;
            }
        }
    }

    let frames = encoder.frames_encoded();
    let mut output = encoder.finish().context("Failed to finish stream")?;
    output.flush()?;

    if verbose {
        let size = std::fs::metadata(&args.output)?.len();
        println!(
            "{}: {} frames, {}",
            args.output.display(),
            frames,
            super::format_size(size)
        );
    }
    Ok(())
}

/// Parameters from `--config`, overridden by individual flags.
fn build_params(args: &EncodeArgs) -> Result<EncoderParams> {
    let mut p = match &args.config {
        Some(path) => EncoderParams::from_file(path)
            .with_context(|| format!("Failed to load parameters: {}", path.display()))?,
        None => EncoderParams::default(),
    };

    if let Some(v) = args.fps {
        p.fps = v;
    }
    if let Some(v) = args.profile {
        p.profile = v;
    }
    if let Some(v) = args.quantizer {
        p.quantizer_scale = v;
    }
    if let Some(v) = args.pre_scaling {
        p.pre_scaling = v;
    }
    if let Some(v) = args.ptf_bitdepth {
        p.ptf_bit_depth = v;
    }
    if let Some(v) = args.color_bitdepth {
        p.color_bit_depth = v;
    }
    if let Some(v) = args.ptf {
        p.ptf = v;
    }
    if let Some(v) = args.color_space {
        p.color_space = v;
    }
    if let Some(v) = args.max_luminance {
        p.max_luminance = v;
    }
    if let Some(v) = args.min_luminance {
        p.min_luminance = v;
    }
    if let Some(v) = args.bitrate {
        p.bitrate = v;
    }
    if let Some(v) = args.keyframe_interval {
        p.keyframe_interval = v;
    }
    if let Some(v) = args.encoding_bitdepth {
        p.encoding_bit_depth = v;
    }
    if args.lossless {
        p.lossless = true;
    }
    if let Some(s) = &args.byte_order {
        p.byte_order = super::parse_byte_order(s)?;
    }

    p.validate()?;
    debug!("Encoder parameters: {:?}", p);
    Ok(p)
}
