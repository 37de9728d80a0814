//! Inspect command - describe a compressed sequence file

use anyhow::Result;
use clap::Args;
use nether_anim::layout::{FrameTable, find_pad_errors};
use nether_anim::{CompressedSequence, SequenceStats};
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use crate::clip::read_sequence;

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// Compressed .nanim file
    pub input: PathBuf,

    /// Dump every track's offsets, key counts and frame tables
    #[arg(short, long)]
    pub tracks: bool,
}

/// Execute the inspect command
pub fn execute(args: InspectArgs) -> Result<()> {
    let sequence = read_sequence(&args.input)?;
    println!("=== {} ===", args.input.display());
    print!("{}", describe(&sequence, args.tracks)?);
    Ok(())
}

/// Human-readable report of a sequence
pub fn describe(sequence: &CompressedSequence, show_tracks: bool) -> Result<String> {
    let stats = SequenceStats::from_sequence(sequence);
    let mut out = String::new();

    writeln!(
        out,
        "Formats: translation {:?}, rotation {:?}, {:?}",
        sequence.translation_format, sequence.rotation_format, sequence.key_encoding
    )?;
    writeln!(
        out,
        "Frames: {} over {:.3}s",
        sequence.num_frames, sequence.sequence_length
    )?;
    writeln!(out, "Tracks: {}", stats.num_tracks)?;
    writeln!(
        out,
        "Translation keys: {} ({} bytes each, {} single-key tracks)",
        stats.total_translation_keys,
        stats.translation_key_size,
        stats.single_translation_key_tracks
    )?;
    writeln!(
        out,
        "Rotation keys: {} ({} bytes each, {} single-key tracks)",
        stats.total_rotation_keys, stats.rotation_key_size, stats.single_rotation_key_tracks
    )?;
    writeln!(
        out,
        "Stream: {} bytes, {} bytes with track table",
        stats.stream_bytes,
        sequence.compressed_size()
    )?;

    let pad_errors = find_pad_errors(sequence);
    if pad_errors.is_empty() {
        writeln!(out, "Pad check: ok")?;
    } else {
        writeln!(
            out,
            "Pad check: {} bad pad bytes, first at stream offset {}",
            pad_errors.len(),
            pad_errors[0]
        )?;
    }

    if show_tracks {
        for (track, offsets) in sequence.track_offsets.iter().enumerate() {
            let translation = sequence.translation_track(track);
            let rotation = sequence.rotation_track(track);
            writeln!(
                out,
                "Track {}: translation @{} x{}, rotation @{} x{} ({:?})",
                track,
                offsets.translation_offset,
                offsets.num_translation_keys,
                offsets.rotation_offset,
                offsets.num_rotation_keys,
                rotation.format()
            )?;
            if let Some(table) = translation.frame_table() {
                writeln!(
                    out,
                    "  translation frames: {}",
                    frame_list(&table, translation.num_keys())
                )?;
            }
            if let Some(table) = rotation.frame_table() {
                writeln!(
                    out,
                    "  rotation frames: {}",
                    frame_list(&table, rotation.num_keys())
                )?;
            }
        }
    }

    Ok(out)
}

fn frame_list(table: &FrameTable<'_>, num_keys: usize) -> String {
    (0..num_keys)
        .map(|index| table.get(index).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
