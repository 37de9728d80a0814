//! End effector error of a compressed sequence against its raw source

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::layout::CompressedSequence;
use crate::math::{BoneAtom, origin};
use crate::sampler::sample_skeleton_pose;
use crate::skeleton::Skeleton;
use crate::tracks::RawAnimation;

/// World-space end effector drift of a compressed sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub average_error: f32,
    pub max_error: f32,
    /// Seconds
    pub max_error_time: f32,
    pub max_error_bone: usize,
}

/// Play both versions back and compare every end effector.
///
/// Samples `num_frames` evenly spaced times in `[0, sequence_length)`. Bones
/// without a track use the reference pose, and additive tracks are laid over
/// the animation's reference pose before forward kinematics.
pub fn compute_compression_error(
    animation: &RawAnimation,
    skeleton: &Skeleton,
    sequence: &CompressedSequence,
) -> Result<ErrorStats> {
    let hierarchy = skeleton.hierarchy()?;
    for bone in 0..skeleton.num_bones() {
        if let Some(track) = animation.track_for_bone(bone)
            && track >= sequence.num_tracks()
        {
            return Err(AnimError::TrackMapping {
                bone,
                track,
                num_tracks: sequence.num_tracks(),
            });
        }
    }

    let mut stats = ErrorStats::default();
    if animation.num_frames == 0 || hierarchy.end_effectors().is_empty() {
        return Ok(stats);
    }

    let absolute = animation.absolute_tracks();
    let reference = skeleton.reference_pose();
    let time_step = animation.sequence_length / animation.num_frames as f32;
    let mut total_error = 0.0f64;
    let mut samples = 0usize;

    for step in 0..animation.num_frames {
        let time = step as f32 * time_step;
        let relative_pos = sequence.relative_position(time);

        let raw_locals: Vec<BoneAtom> = (0..skeleton.num_bones())
            .map(|bone| match animation.track_for_bone(bone) {
                Some(track) => absolute[track].sample(relative_pos, false),
                None => reference[bone],
            })
            .collect();
        let mut compressed_locals =
            sample_skeleton_pose(sequence, skeleton, &animation.bone_to_track, time, false);
        if let Some(additive) = &animation.additive_reference {
            for (bone, atom) in compressed_locals.iter_mut().enumerate() {
                if let Some(track) = animation.track_for_bone(bone) {
                    *atom = atom.apply_to(&additive[track]);
                }
            }
        }

        let raw_world = hierarchy.world_transforms(&raw_locals);
        let compressed_world = hierarchy.world_transforms(&compressed_locals);
        for &effector in hierarchy.end_effectors() {
            let error = origin(&raw_world[effector]).distance(origin(&compressed_world[effector]));
            total_error += error as f64;
            samples += 1;
            if error > stats.max_error {
                stats.max_error = error;
                stats.max_error_time = time;
                stats.max_error_bone = effector;
            }
        }
    }

    stats.average_error = (total_error / samples as f64) as f32;
    Ok(stats)
}
