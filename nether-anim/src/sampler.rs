//! Pose reconstruction: playback time to interpolated bone atoms
//!
//! Translation and rotation are bracketed independently with the sequence's
//! key codec; they may hold different key counts but always share the codec.

use crate::codec::{KeyCodec, KeySpan, SamplePosition, codec_for};
use crate::layout::CompressedSequence;
use crate::math::{BoneAtom, blend_rotation};
use crate::skeleton::Skeleton;

/// Output slot and source track for batch sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoneTrackPair {
    pub atom_index: usize,
    pub track_index: usize,
}

/// Local transform of one track at `time` seconds.
pub fn sample_bone_atom(
    sequence: &CompressedSequence,
    track: usize,
    time: f32,
    looping: bool,
) -> BoneAtom {
    sample_bone_atom_at(sequence, track, sequence.relative_position(time), looping)
}

/// Local transform of one track at a normalized position in `[0, 1]`.
pub fn sample_bone_atom_at(
    sequence: &CompressedSequence,
    track: usize,
    relative_pos: f32,
    looping: bool,
) -> BoneAtom {
    let position = SamplePosition {
        relative_pos,
        looping,
        num_frames: sequence.num_frames,
    };
    sample_track(sequence, codec_for(sequence.key_encoding), &position, track)
}

/// Sample every pair at one shared time into `atoms`.
///
/// # Panics
/// If a pair's `atom_index` is outside `atoms`.
pub fn sample_pose(
    sequence: &CompressedSequence,
    pairs: &[BoneTrackPair],
    time: f32,
    looping: bool,
    atoms: &mut [BoneAtom],
) {
    let codec = codec_for(sequence.key_encoding);
    let position = SamplePosition {
        relative_pos: sequence.relative_position(time),
        looping,
        num_frames: sequence.num_frames,
    };
    for pair in pairs {
        atoms[pair.atom_index] = sample_track(sequence, codec, &position, pair.track_index);
    }
}

/// Local pose for a whole skeleton.
///
/// Bones without a track keep their reference pose. An empty `bone_to_track`
/// maps bone `i` to track `i` when that track exists.
pub fn sample_skeleton_pose(
    sequence: &CompressedSequence,
    skeleton: &Skeleton,
    bone_to_track: &[Option<usize>],
    time: f32,
    looping: bool,
) -> Vec<BoneAtom> {
    let mut atoms = skeleton.reference_pose();
    let pairs: Vec<BoneTrackPair> = (0..atoms.len())
        .filter_map(|bone| {
            let track = if bone_to_track.is_empty() {
                Some(bone)
            } else {
                bone_to_track.get(bone).copied().flatten()
            };
            track
                .filter(|&track| track < sequence.num_tracks())
                .map(|track_index| BoneTrackPair {
                    atom_index: bone,
                    track_index,
                })
        })
        .collect();
    sample_pose(sequence, &pairs, time, looping, &mut atoms);
    atoms
}

fn sample_track(
    sequence: &CompressedSequence,
    codec: &dyn KeyCodec,
    position: &SamplePosition,
    track: usize,
) -> BoneAtom {
    let translations = sequence.translation_track(track);
    let span = codec.key_span(position, translations.num_keys(), translations.frame_table());
    let translation = if is_single(&span) {
        translations.key(span.index0)
    } else {
        translations
            .key(span.index0)
            .lerp(translations.key(span.index1), span.alpha)
    };

    let rotations = sequence.rotation_track(track);
    let span = codec.key_span(position, rotations.num_keys(), rotations.frame_table());
    let rotation = if is_single(&span) {
        rotations.key(span.index0)
    } else {
        blend_rotation(rotations.key(span.index0), rotations.key(span.index1), span.alpha)
    };

    BoneAtom::new(translation, rotation)
}

fn is_single(span: &KeySpan) -> bool {
    span.index0 == span.index1
}
