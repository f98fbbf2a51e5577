//! Stream info command.
//!
//! Prints container structure and the quantizer settings stored in the
//! metadata attachments.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hdrv_codec::{Decoder, RawCodec};

use crate::InfoArgs;

/// Runs the info command.
pub fn run(args: InfoArgs, verbose: bool) -> Result<()> {
    for path in &args.input {
        print_stream(&args, path, verbose)?;
        if args.input.len() > 1 {
            println!();
        }
    }
    Ok(())
}

fn print_stream(args: &InfoArgs, path: &Path, verbose: bool) -> Result<()> {
    let file_size = fs::metadata(path)?.len();
    let mut decoder = Decoder::open(super::open_input(path)?, RawCodec::new())
        .with_context(|| format!("Failed to open stream: {}", path.display()))?;
    decoder.container_mut().load_cues()?;

    let container = decoder.container();
    let seg = container.info();
    let track = decoder.track();
    let meta = decoder.metadata();
    let cfg = &meta.config;

    println!("{}", path.display());
    println!("  File size:      {}", super::format_size(file_size));
    println!("  Resolution:     {}x{}", track.width, track.height);
    println!("  Codec:          {}", track.codec_id);
    println!("  Duration:       {:.3} s", container.duration_ms() / 1000.0);
    if let Some(d) = track.default_duration {
        println!("  Frame duration: {} ns", d);
    }
    println!("  PTF:            {} ({}-bit)", cfg.ptf().name(), cfg.ptf_bit_depth());
    println!(
        "  Color space:    {} ({}-bit)",
        cfg.color_space.name(),
        cfg.color_bit_depth
    );
    println!(
        "  Luminance:      {} - {} cd/m²",
        cfg.min_lum(),
        cfg.max_lum()
    );
    println!("  Pre-scaling:    {}", meta.pre_scaling);
    println!("  Cue points:     {}", container.cues().len());

    if verbose {
        let ebml = container.ebml_header();
        println!("  Doc type:       {} v{}", ebml.doc_type, ebml.doc_type_version);
        println!("  Timecode scale: {} ns", seg.timecode_scale);
        println!("  Track number:   {}", track.number);
        println!("  Muxing app:     {}", seg.muxing_app);
        println!("  Writing app:    {}", seg.writing_app);
    }

    if args.attachments {
        println!("  Attachments:");
        for (uid, file) in container.attachments() {
            println!(
                "    {:>4}  {:<16} {:>8}  {}",
                uid,
                file.description,
                super::format_size(file.data.len() as u64),
                file.name
            );
        }
    }

    if args.cues {
        println!("  Cues:");
        let ms_per_tick = seg.timecode_scale as f64 / 1e6;
        for cue in container.cues() {
            println!(
                "    {:>10.3} s  track {}  cluster @ {}",
                cue.time as f64 * ms_per_tick / 1000.0,
                cue.track,
                cue.cluster_position
            );
        }
    }
    Ok(())
}
