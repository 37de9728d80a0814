//! Compress command - compress a single raw clip

use anyhow::{Context, Result};
use clap::Args;
use nether_anim::{CompressedAnimation, CompressionSettings, RotationFormat, compress};
use std::path::{Path, PathBuf};

use crate::clip::{SEQUENCE_EXT, load_clip, load_settings, load_skeleton, write_sequence};

/// Arguments for the compress command
#[derive(Args)]
pub struct CompressArgs {
    /// Raw clip JSON
    pub input: PathBuf,

    /// Skeleton JSON the clip animates
    #[arg(short, long)]
    pub skeleton: PathBuf,

    /// Output .nanim file (defaults to the input with a .nanim extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compression settings TOML (defaults to linear key removal, Fixed48NoW)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Rotation format override (e.g. Float96NoW, Fixed32NoW)
    #[arg(short, long)]
    pub rotation_format: Option<String>,

    /// Also try the alternative candidates and keep the smallest acceptable one
    #[arg(long)]
    pub alternatives: bool,
}

/// Execute the compress command
pub fn execute(args: CompressArgs) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension(SEQUENCE_EXT));
    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => CompressionSettings::default(),
    };
    if let Some(name) = &args.rotation_format {
        settings.rotation_format = parse_rotation_format(name)?;
    }
    if args.alternatives {
        settings.alternatives.enabled = true;
    }

    tracing::info!("Compressing {:?} -> {:?}", args.input, output);
    let compressed = compress_clip(&args.input, &args.skeleton, &settings)?;
    write_sequence(&output, &compressed.sequence)?;

    let stats = compressed.stats();
    println!("Compressed {} with {}", compressed.name, compressed.candidate);
    println!(
        "  Size: {} -> {} bytes",
        compressed.raw_size,
        compressed.compressed_size()
    );
    println!(
        "  Keys: {} translation, {} rotation",
        stats.total_translation_keys, stats.total_rotation_keys
    );
    println!(
        "  Error: avg {:.5}, max {:.5} (bone {} at {:.3}s)",
        compressed.error.average_error,
        compressed.error.max_error,
        compressed.error.max_error_bone,
        compressed.error.max_error_time
    );
    Ok(())
}

/// Load a clip and its skeleton and compress it
pub fn compress_clip(
    input: &Path,
    skeleton: &Path,
    settings: &CompressionSettings,
) -> Result<CompressedAnimation> {
    let skeleton = load_skeleton(skeleton)?;
    let clip = load_clip(input)?;
    compress(&clip, &skeleton, settings)
        .with_context(|| format!("Failed to compress {}", input.display()))
}

/// Parse a rotation format name, ignoring case
pub fn parse_rotation_format(name: &str) -> Result<RotationFormat> {
    RotationFormat::ALL
        .into_iter()
        .find(|format| format!("{:?}", format).eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            let names: Vec<String> = RotationFormat::ALL
                .iter()
                .map(|format| format!("{:?}", format))
                .collect();
            anyhow::anyhow!(
                "Unknown rotation format '{}' (expected one of: {})",
                name,
                names.join(", ")
            )
        })
}
