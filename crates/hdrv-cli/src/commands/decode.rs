//! Decode command.

use std::io::Write;

use anyhow::{Context, Result};
use hdrv_codec::{Decoder, RawCodec};
use tracing::info;

use crate::DecodeArgs;

/// Runs the decode command, writing planar f32 frames.
pub fn run(args: DecodeArgs, verbose: bool) -> Result<()> {
    let order = super::parse_byte_order(&args.byte_order)?;
    let input = super::open_input(&args.input)?;
    let mut decoder = Decoder::open(input, RawCodec::new())
        .with_context(|| format!("Failed to open stream: {}", args.input.display()))?
        .with_byte_order(order);

    if let Some(start) = args.start {
        decoder
            .seek_to_time(start, false)
            .with_context(|| format!("Failed to seek to {start}"))?;
    }

    let mut output = super::create_output(&args.output)?;
    let limit = args.frames.unwrap_or(usize::MAX);
    let mut count = 0usize;
    while count < limit {
        let Some(frame) = decoder.decode_frame()? else {
            break;
        };
        super::write_raw_frame(&mut output, &frame)?;
        count += 1;
    }
    output.flush()?;

    info!(
        "Decoded {} frames ({}x{}) to {}",
        count,
        decoder.width(),
        decoder.height(),
        args.output.display()
    );
    if verbose {
        if let Some(tc) = decoder.last_timecode() {
            println!("Last frame at {} ms", tc);
        }
    }
    Ok(())
}
