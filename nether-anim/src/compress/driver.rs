//! Reduction, encoding and the alternative-format search

use crate::error::Result;
use crate::formats::{SequenceFormat, TranslationFormat};
use crate::layout::{CompressedSequence, SequenceStats, encode_tracks};
use crate::math::BoneAtom;
use crate::reduce::reduce_linear_keys;
use crate::sampler::sample_skeleton_pose;
use crate::skeleton::Skeleton;
use crate::tracks::{
    BoneTrack, RawAnimation, TRIVIAL_POSITION_DELTA, TRIVIAL_ROTATION_DELTA,
    filter_intermittent_keys, filter_trivial_keys, separate_raw_tracks,
};

use super::{
    CompressionCandidate, CompressionSettings, ErrorStats, ReductionScheme,
    compute_compression_error,
};

/// A sequence after compression, with everything needed to play it back.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedAnimation {
    pub name: String,
    pub sequence: CompressedSequence,
    pub bone_to_track: Vec<Option<usize>>,
    pub additive_reference: Option<Vec<BoneAtom>>,
    /// Label of the candidate that produced `sequence`
    pub candidate: String,
    pub error: ErrorStats,
    /// Size of the uncompressed tracks in bytes
    pub raw_size: usize,
}

impl CompressedAnimation {
    pub fn compressed_size(&self) -> usize {
        self.sequence.compressed_size()
    }

    pub fn stats(&self) -> SequenceStats {
        SequenceStats::from_sequence(&self.sequence)
    }

    /// Local pose of every skeleton bone, with additive deltas applied.
    pub fn sample_pose(&self, skeleton: &Skeleton, time: f32, looping: bool) -> Vec<BoneAtom> {
        let mut atoms =
            sample_skeleton_pose(&self.sequence, skeleton, &self.bone_to_track, time, looping);
        if let Some(additive) = &self.additive_reference {
            for (bone, atom) in atoms.iter_mut().enumerate() {
                let track = if self.bone_to_track.is_empty() {
                    Some(bone)
                } else {
                    self.bone_to_track.get(bone).copied().flatten()
                };
                if let Some(base) = track.and_then(|track| additive.get(track)) {
                    *atom = atom.apply_to(base);
                }
            }
        }
        atoms
    }
}

/// Reduced tracks for one scheme, ready for bitwise encoding.
///
/// `format` only matters for linear key removal, which plays reduced ancestors
/// back in the target rotation format.
pub fn reduce_tracks(
    animation: &RawAnimation,
    skeleton: &Skeleton,
    scheme: &ReductionScheme,
    format: SequenceFormat,
) -> Result<Vec<BoneTrack>> {
    animation.validate()?;
    let separate = || {
        separate_raw_tracks(&animation.tracks, animation.num_frames, animation.sequence_length)
    };

    match scheme {
        ReductionScheme::BitwiseOnly => Ok(separate()),
        ReductionScheme::RemoveTrivialKeys => {
            let mut tracks = separate();
            filter_trivial_keys(&mut tracks, TRIVIAL_POSITION_DELTA, TRIVIAL_ROTATION_DELTA);
            Ok(tracks)
        }
        ReductionScheme::RemoveEveryOtherKey {
            min_keys,
            start_index,
        } => {
            let mut tracks = separate();
            filter_trivial_keys(&mut tracks, TRIVIAL_POSITION_DELTA, TRIVIAL_ROTATION_DELTA);
            for track in &mut tracks {
                let translation = &mut track.translation;
                if translation.keys.len() > *min_keys {
                    filter_intermittent_keys(
                        &mut translation.keys,
                        &mut translation.times,
                        *start_index,
                        2,
                    );
                }
                let rotation = &mut track.rotation;
                if rotation.keys.len() > *min_keys {
                    filter_intermittent_keys(
                        &mut rotation.keys,
                        &mut rotation.times,
                        *start_index,
                        2,
                    );
                }
            }
            Ok(tracks)
        }
        ReductionScheme::RemoveLinearKeys(settings) => {
            reduce_linear_keys(animation, skeleton, settings, format)
        }
    }
}

/// Reduce and encode with one candidate configuration.
pub fn compress_candidate(
    animation: &RawAnimation,
    skeleton: &Skeleton,
    translation_format: TranslationFormat,
    candidate: &CompressionCandidate,
) -> Result<CompressedAnimation> {
    let format = candidate.sequence_format(translation_format)?;
    let tracks = reduce_tracks(animation, skeleton, &candidate.scheme, format)?;
    let sequence = encode_tracks(&tracks, format, animation.num_frames, animation.sequence_length)?;
    let error = compute_compression_error(animation, skeleton, &sequence)?;
    Ok(CompressedAnimation {
        name: animation.name.clone(),
        sequence,
        bone_to_track: animation.bone_to_track.clone(),
        additive_reference: animation.additive_reference.clone(),
        candidate: candidate.label(),
        error,
        raw_size: animation.raw_size(),
    })
}

/// Compress one animation, then try the configured alternatives.
///
/// An alternative replaces the current best only when it is smaller and its
/// max error is within the master tolerance or below the current best's.
pub fn compress(
    animation: &RawAnimation,
    skeleton: &Skeleton,
    settings: &CompressionSettings,
) -> Result<CompressedAnimation> {
    settings.validate()?;
    if animation.num_frames == 0 {
        tracing::warn!("Sequence '{}' has no frames", animation.name);
    }

    let mut best = compress_candidate(
        animation,
        skeleton,
        settings.translation_format,
        &settings.primary(),
    )?;

    let alternatives = &settings.alternatives;
    if alternatives.enabled && animation.num_frames > 2 {
        for candidate in &alternatives.candidates {
            let attempt = match compress_candidate(
                animation,
                skeleton,
                settings.translation_format,
                candidate,
            ) {
                Ok(attempt) => attempt,
                Err(e) => {
                    tracing::warn!(
                        "Sequence '{}': skipping {}: {}",
                        animation.name,
                        candidate.label(),
                        e
                    );
                    continue;
                }
            };

            let smaller = attempt.compressed_size() < best.compressed_size();
            let accurate = attempt.error.max_error <= alternatives.master_tolerance
                || attempt.error.max_error < best.error.max_error;
            if smaller && accurate {
                tracing::debug!(
                    "Sequence '{}': {} wins ({} -> {} bytes, max error {:.5})",
                    animation.name,
                    attempt.candidate,
                    best.compressed_size(),
                    attempt.compressed_size(),
                    attempt.error.max_error
                );
                best = attempt;
            } else if smaller {
                tracing::warn!(
                    "Sequence '{}': {} rejected, max error {:.5} exceeds tolerance {:.5}",
                    animation.name,
                    attempt.candidate,
                    attempt.error.max_error,
                    alternatives.master_tolerance
                );
            }
        }
    }

    let stats = best.stats();
    tracing::info!(
        "Compressed '{}' with {}: {} -> {} bytes, {} keys, max error {:.5} (bone {} at {:.3}s)",
        best.name,
        best.candidate,
        best.raw_size,
        best.compressed_size(),
        stats.total_keys(),
        best.error.max_error,
        best.error.max_error_bone,
        best.error.max_error_time
    );
    Ok(best)
}
