//! hdrv - HDR video encoder, decoder and inspector
//!
//! Stores floating point RGB frames in Matroska using perceptual
//! quantization, and reads them back.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use hdrv_core::{ColorSpaceKind, PtfKind};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "hdrv")]
#[command(author, version, about = "HDR video encoder and decoder")]
#[command(long_about = "
Encodes linear RGB frames into Matroska with a perceptual transfer function,
and decodes them back to floating point.

Raw frames are planar little-endian f32: all R samples, then G, then B.

Examples:
  hdrv encode --test-pattern 320x240 --frames 50 -o pattern.mkv
  hdrv encode -i frames.raw --width 1920 --height 1080 -o out.mkv --ptf PQ --color-space LUV
  hdrv encode -i frames.raw --width 1920 --height 1080 -o out.mkv --config params.yaml
  hdrv decode out.mkv -o frames.raw --start 0.5
  hdrv info out.mkv --cues
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode raw float frames or a test pattern
    #[command(visible_alias = "e")]
    Encode(EncodeArgs),

    /// Decode a stream to raw float frames
    #[command(visible_alias = "d")]
    Decode(DecodeArgs),

    /// Show container and quantizer information
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[derive(Args)]
struct EncodeArgs {
    /// Output file (.mkv)
    #[arg(short, long)]
    output: PathBuf,

    /// Raw planar f32 input
    #[arg(short, long, conflicts_with = "test_pattern", requires_all = ["width", "height"])]
    input: Option<PathBuf>,

    /// Frame width for raw input
    #[arg(long)]
    width: Option<usize>,

    /// Frame height for raw input
    #[arg(long)]
    height: Option<usize>,

    /// Generate a test pattern of the given size, e.g. 640x480
    #[arg(long, value_parser = parse_size)]
    test_pattern: Option<(usize, usize)>,

    /// Number of frames (test pattern default: 25, raw input: all)
    #[arg(short = 'n', long)]
    frames: Option<usize>,

    /// Load encoder parameters from YAML; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective parameters to YAML
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    fps: Option<f32>,

    /// Codec profile (0-3)
    #[arg(long)]
    profile: Option<u32>,

    /// Quantizer scale (0-63, 0 is best)
    #[arg(short, long)]
    quantizer: Option<u32>,

    /// Factor applied to input values
    #[arg(long)]
    pre_scaling: Option<f32>,

    /// Bits per luminance codeword
    #[arg(long = "ptf-bitdepth")]
    ptf_bitdepth: Option<u32>,

    /// Bits per chroma codeword
    #[arg(long = "color-bitdepth")]
    color_bitdepth: Option<u32>,

    /// Transfer function: PSI, PQ, LOG, HDRVDP, LINEAR
    #[arg(long)]
    ptf: Option<PtfKind>,

    /// Color space: LUV, RGB, YCBCR, XYZ
    #[arg(long)]
    color_space: Option<ColorSpaceKind>,

    /// Maximum luminance in cd/m²
    #[arg(long)]
    max_luminance: Option<f32>,

    /// Minimum luminance in cd/m²
    #[arg(long)]
    min_luminance: Option<f32>,

    /// Target bitrate in kbit/s
    #[arg(long)]
    bitrate: Option<u32>,

    /// Force a keyframe every N frames
    #[arg(short, long)]
    keyframe_interval: Option<u32>,

    /// Codec sample bit depth (8, 10, 12)
    #[arg(long = "encoding-bitdepth")]
    encoding_bitdepth: Option<u32>,

    /// Request lossless coding
    #[arg(long)]
    lossless: bool,

    /// Byte order of two-byte samples: little, big
    #[arg(long)]
    byte_order: Option<String>,
}

#[derive(Args)]
struct DecodeArgs {
    /// Input stream
    input: PathBuf,

    /// Raw planar f32 output
    #[arg(short, long)]
    output: PathBuf,

    /// Start position as a fraction of the duration (0-1)
    #[arg(short, long)]
    start: Option<f64>,

    /// Stop after this many frames
    #[arg(short = 'n', long)]
    frames: Option<usize>,

    /// Byte order of two-byte samples: little, big
    #[arg(long, default_value = "little")]
    byte_order: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Input stream(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// List cue points
    #[arg(long)]
    cues: bool,

    /// List attachments
    #[arg(short, long)]
    attachments: bool,
}

/// Parses `WIDTHxHEIGHT`.
fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.trim().parse().map_err(|e| format!("width '{w}': {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("height '{h}': {e}"))?;
    Ok((w, h))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Encode(args) => commands::encode::run(args, cli.verbose),
        Commands::Decode(args) => commands::decode::run(args, cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.verbose),
    }
}
