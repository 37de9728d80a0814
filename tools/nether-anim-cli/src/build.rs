//! Build command - compress every clip listed in anim.toml

use anyhow::{Context, Result};
use clap::Args;
use nether_anim::{BatchSummary, RawAnimation, compress_batch};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::clip::{SEQUENCE_EXT, load_clip, load_skeleton, write_sequence};
use crate::manifest::AnimManifest;

/// Arguments for the build command
#[derive(Args)]
pub struct BuildArgs {
    /// Path to anim.toml manifest file
    #[arg(default_value = "anim.toml")]
    pub manifest: PathBuf,

    /// Output directory (overrides manifest)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let summary = build(&args.manifest, args.output.as_deref())?;

    println!("Compressed {} clips", summary.sequences);
    println!(
        "  Size: {} -> {} bytes ({:.2}x)",
        summary.raw_bytes,
        summary.compressed_bytes,
        summary.compression_ratio()
    );
    if let Some(worst) = &summary.worst_sequence {
        println!("  Worst error: {:.5} ({})", summary.worst_error, worst);
    }
    let mut wins: Vec<_> = summary.candidate_wins.iter().collect();
    wins.sort();
    for (candidate, count) in wins {
        println!("  {}: {}", candidate, count);
    }
    Ok(())
}

/// Compress all clips of a manifest and write one `.nanim` per clip.
pub fn build(manifest_path: &Path, output: Option<&Path>) -> Result<BatchSummary> {
    let manifest = AnimManifest::load(manifest_path)?;
    manifest.validate()?;

    let project_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let skeleton = load_skeleton(&project_dir.join(&manifest.skeleton))?;

    // Load clips in parallel; the manifest id names the sequence
    let clips: Result<Vec<RawAnimation>> = manifest
        .clips
        .par_iter()
        .map(|entry| {
            let mut clip = load_clip(&project_dir.join(&entry.path))?;
            clip.name = entry.id.clone();
            Ok(clip)
        })
        .collect();
    let clips = clips?;
    tracing::info!("Loaded {} clips from {}", clips.len(), manifest_path.display());

    let (compressed, summary) = compress_batch(&clips, &skeleton, &manifest.compression)
        .context("Failed to compress clips")?;

    let output_dir = manifest.output_dir(project_dir, output);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    for animation in &compressed {
        let path = output_dir.join(format!("{}.{}", animation.name, SEQUENCE_EXT));
        write_sequence(&path, &animation.sequence)?;
        tracing::info!(
            "  {} -> {} ({} bytes, {})",
            animation.name,
            path.display(),
            animation.compressed_size(),
            animation.candidate
        );
    }

    Ok(summary)
}
