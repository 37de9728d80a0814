//! Sample command - print interpolated bone atoms at a playback time

use anyhow::Result;
use clap::Args;
use nether_anim::{BoneAtom, CompressedSequence, sample_bone_atom};
use std::path::PathBuf;

use crate::clip::read_sequence;

/// Arguments for the sample command
#[derive(Args)]
pub struct SampleArgs {
    /// Compressed .nanim file
    pub input: PathBuf,

    /// Playback time in seconds
    #[arg(short, long, default_value_t = 0.0)]
    pub time: f32,

    /// Only sample this track (default: every track)
    #[arg(long)]
    pub track: Option<usize>,

    /// Treat the sequence as looping
    #[arg(short, long)]
    pub looping: bool,
}

/// Execute the sample command
pub fn execute(args: SampleArgs) -> Result<()> {
    let sequence = read_sequence(&args.input)?;
    let atoms = sample_tracks(&sequence, args.time, args.track, args.looping)?;
    println!(
        "t = {:.4}s of {:.4}s{}",
        args.time,
        sequence.sequence_length,
        if args.looping { " (looping)" } else { "" }
    );
    for (track, atom) in atoms {
        println!("{}", format_atom(track, &atom));
    }
    Ok(())
}

/// Sample one track or all of them
pub fn sample_tracks(
    sequence: &CompressedSequence,
    time: f32,
    track: Option<usize>,
    looping: bool,
) -> Result<Vec<(usize, BoneAtom)>> {
    let tracks = match track {
        Some(track) if track >= sequence.num_tracks() => {
            anyhow::bail!(
                "Track {} out of range (sequence has {} tracks)",
                track,
                sequence.num_tracks()
            );
        }
        Some(track) => track..track + 1,
        None => 0..sequence.num_tracks(),
    };
    Ok(tracks
        .map(|track| (track, sample_bone_atom(sequence, track, time, looping)))
        .collect())
}

fn format_atom(track: usize, atom: &BoneAtom) -> String {
    let t = atom.translation;
    let r = atom.rotation;
    format!(
        "track {:>3}: translation ({:.4}, {:.4}, {:.4}) rotation ({:.4}, {:.4}, {:.4}, {:.4})",
        track, t.x, t.y, t.z, r.x, r.y, r.z, r.w
    )
}
