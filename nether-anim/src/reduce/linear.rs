//! Sliding-window key removal driven by local and end effector error

use glam::{Affine3A, Quat, Vec3};
use hashbrown::HashSet;

use super::{LinearKey, LinearKeySettings, WorldBoneTable};
use crate::error::Result;
use crate::formats::{KeyEncoding, SequenceFormat};
use crate::layout::{encode_tracks, frame_index_for_time};
use crate::math::{BoneAtom, enforce_shortest_arc, origin};
use crate::sampler::sample_bone_atom_at;
use crate::skeleton::{BoneHierarchy, Skeleton};
use crate::tracks::{
    BoneTrack, RawAnimation, TRIVIAL_POSITION_DELTA, TRIVIAL_ROTATION_DELTA, filter_trivial_keys,
    separate_raw_tracks,
};

/// Effector errors below this are left alone by retargeting
const RETARGET_MIN_ERROR: f32 = 1.0e-5;

/// Offsets shorter than this give no usable heading
const MIN_HEADING_LENGTH: f32 = 1.0e-4;

/// cos(60 degrees): larger heading corrections are rejected
const MIN_HEADING_DOT: f32 = 0.5;

/// A heading correction must land this close to the desired direction
const HEADING_TOLERANCE: f32 = 0.001;

/// Reduce every track of `animation` with linear key removal.
///
/// Trivial keys are removed first. `format` is the sequence format the result
/// will be encoded with; its rotation format is used when feeding reduced
/// ancestors back into the world table. Additive animations are reduced in
/// absolute space and returned as deltas again.
pub fn reduce_linear_keys(
    animation: &RawAnimation,
    skeleton: &Skeleton,
    settings: &LinearKeySettings,
    format: SequenceFormat,
) -> Result<Vec<BoneTrack>> {
    settings.validate()?;
    animation.validate()?;
    let hierarchy = skeleton.hierarchy()?;

    let absolute = animation.absolute_tracks();
    let mut tracks =
        separate_raw_tracks(&absolute, animation.num_frames, animation.sequence_length);
    filter_trivial_keys(&mut tracks, TRIVIAL_POSITION_DELTA, TRIVIAL_ROTATION_DELTA);

    let num_frames = animation.num_frames as usize;
    if num_frames > 2 {
        let reference = skeleton.reference_pose();
        let raw_world = WorldBoneTable::build(&hierarchy, num_frames, |bone, frame| {
            match animation.track_for_bone(bone) {
                Some(track) => absolute[track].key_at(frame).to_affine(),
                None => reference[bone].to_affine(),
            }
        });
        let mut reducer = Reducer {
            animation,
            hierarchy: &hierarchy,
            reference,
            settings,
            format: SequenceFormat {
                key_encoding: KeyEncoding::VariableRate,
                ..format
            },
            new_world: WorldBoneTable::new(hierarchy.num_bones(), num_frames),
            raw_world,
            num_frames,
        };
        reducer.run(&mut tracks)?;
    }

    if let Some(reference) = &animation.additive_reference {
        restore_additive(&mut tracks, reference);
    }
    Ok(tracks)
}

struct Reducer<'a> {
    animation: &'a RawAnimation,
    hierarchy: &'a BoneHierarchy,
    reference: Vec<BoneAtom>,
    settings: &'a LinearKeySettings,
    format: SequenceFormat,
    /// Forward kinematics of the unreduced animation
    raw_world: WorldBoneTable,
    /// Forward kinematics of the bones reduced so far, as they will play back
    new_world: WorldBoneTable,
    num_frames: usize,
}

/// Window limits for one channel of one bone
struct ChannelLimits<'a> {
    max_diff: f32,
    parent_key_scale: f32,
    /// Frames where the guiding ancestor kept a key
    guide_frames: &'a HashSet<usize>,
}

impl Reducer<'_> {
    fn run(&mut self, tracks: &mut [BoneTrack]) -> Result<()> {
        let mut reduced = vec![false; tracks.len()];
        for bone in 0..self.hierarchy.num_bones() {
            let Some(track_index) = self.animation.track_for_bone(bone) else {
                let local = self.reference[bone].to_affine();
                self.new_world.update_bone(self.hierarchy, bone, |_| local);
                continue;
            };

            // A track shared by several bones is reduced for the first of them
            if !reduced[track_index] {
                let guide_frames = self.guide_frames(bone, tracks);
                let track = &mut tracks[track_index];
                let before = (track.translation.keys.len(), track.rotation.keys.len());
                if self.settings.retarget {
                    self.retarget(bone, track);
                }
                self.reduce_bone(bone, track, &guide_frames);
                tracing::debug!(
                    "Bone {}: translation keys {} -> {}, rotation keys {} -> {}",
                    bone,
                    before.0,
                    track.translation.keys.len(),
                    before.1,
                    track.rotation.keys.len()
                );
                reduced[track_index] = true;
            }
            self.update_new_world(bone, &tracks[track_index])?;
        }
        Ok(())
    }

    /// Key frames of the nearest ancestor that owns a track
    fn guide_frames(&self, bone: usize, tracks: &[BoneTrack]) -> HashSet<usize> {
        let Some(guide) = self
            .hierarchy
            .bones_to_root(bone)
            .iter()
            .find_map(|&ancestor| self.animation.track_for_bone(ancestor))
        else {
            return HashSet::new();
        };
        let guide = &tracks[guide];
        guide
            .translation
            .times
            .iter()
            .chain(&guide.rotation.times)
            .map(|&time| {
                let frame = frame_index_for_time(
                    time,
                    self.animation.num_frames,
                    self.animation.sequence_length,
                );
                frame as usize
            })
            .collect()
    }

    /// Encode the bone's reduced keys and play them back into the world table.
    fn update_new_world(&mut self, bone: usize, track: &BoneTrack) -> Result<()> {
        let sequence = encode_tracks(
            std::slice::from_ref(track),
            self.format,
            self.animation.num_frames,
            self.animation.sequence_length,
        )?;
        let last_frame = (self.num_frames - 1) as f32;
        self.new_world.update_bone(self.hierarchy, bone, |frame| {
            sample_bone_atom_at(&sequence, 0, frame as f32 / last_frame, false).to_affine()
        });
        Ok(())
    }

    /// Target with the largest world error if `bone` sat at `base` while every
    /// descendant kept its raw offset from it.
    fn worst_effector(
        &self,
        bone: usize,
        frame: usize,
        base: &Affine3A,
        targets: &[usize],
    ) -> Option<(usize, f32)> {
        let raw_base_inverse = self.raw_world.get(bone, frame).inverse();
        targets
            .iter()
            .map(|&target| {
                let raw_target = self.raw_world.get(target, frame);
                let proposed = *base * (raw_base_inverse * *raw_target);
                (target, origin(&proposed).distance(origin(raw_target)))
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn effector_error(
        &self,
        bone: usize,
        frame: usize,
        local: &BoneAtom,
        targets: &[usize],
    ) -> f32 {
        let base = self.new_world.parent_world(self.hierarchy, bone, frame) * local.to_affine();
        self.worst_effector(bone, frame, &base, targets)
            .map_or(0.0, |(_, error)| error)
    }

    /// Pull per-frame keys back toward the raw end effector positions, compensating
    /// for error already introduced by reduced ancestors.
    fn retarget(&self, bone: usize, track: &mut BoneTrack) {
        let full_translation = track.translation.keys.len() == self.num_frames;
        let full_rotation = track.rotation.keys.len() == self.num_frames;
        if !full_translation && !full_rotation {
            return;
        }

        let targets = self.hierarchy.target_end_effectors(bone);
        let mut adjusted = 0usize;
        for frame in 0..self.num_frames {
            let local = local_at(track, frame);
            let parent_world = self.new_world.parent_world(self.hierarchy, bone, frame);
            let base = parent_world * local.to_affine();
            let Some((target, error)) = self.worst_effector(bone, frame, &base, &targets) else {
                continue;
            };
            if error <= RETARGET_MIN_ERROR {
                continue;
            }

            if target == bone {
                let raw_local = parent_world.inverse() * *self.raw_world.get(bone, frame);
                let corrected = BoneAtom::from_affine(&raw_local);
                if full_translation {
                    track.translation.keys[frame] = corrected.translation;
                }
                if full_rotation {
                    track.rotation.keys[frame] = corrected.rotation;
                }
                adjusted += 1;
            } else if full_rotation
                && let Some(adjustment) = heading_correction(
                    &base,
                    self.raw_world.get(bone, frame),
                    self.raw_world.get(target, frame),
                )
            {
                let key = &mut track.rotation.keys[frame];
                *key = (*key * adjustment).normalize();
                adjusted += 1;
            }
        }

        let keys = &mut track.rotation.keys;
        for index in 1..keys.len() {
            keys[index] = enforce_shortest_arc(keys[index - 1], keys[index]);
        }
        if adjusted > 0 {
            tracing::debug!("Bone {}: retargeted {} frames", bone, adjusted);
        }
    }

    fn reduce_bone(&self, bone: usize, track: &mut BoneTrack, guide_frames: &HashSet<usize>) {
        let targets = self.hierarchy.target_end_effectors(bone);
        let tolerance = self
            .settings
            .effector_tolerance(self.hierarchy.end_effector_distance(bone));
        let world_ok = |frame: usize, local: BoneAtom, scale: f32| {
            self.effector_error(bone, frame, &local, &targets) * scale <= tolerance
        };

        // Rotation first, judged with the unreduced translation
        if track.rotation.keys.len() == self.num_frames {
            let translation = &track.translation;
            let limits = ChannelLimits {
                max_diff: self.settings.max_angle_diff,
                parent_key_scale: self.settings.parent_key_scale,
                guide_frames,
            };
            let retained = reduce_channel(
                &track.rotation.keys,
                &track.rotation.times,
                &limits,
                |frame, rotation: Quat, scale| {
                    let translation = translation.keys[frame.min(translation.keys.len() - 1)];
                    world_ok(frame, BoneAtom::new(translation, rotation), scale)
                },
            );
            retain_keys(&mut track.rotation.keys, &mut track.rotation.times, &retained);
        }

        // Translation second, judged with the rotation as it will play back
        if track.translation.keys.len() == self.num_frames {
            let rotation = &track.rotation;
            let time_per_frame = self.animation.time_per_frame();
            let limits = ChannelLimits {
                max_diff: self.settings.max_pos_diff,
                parent_key_scale: self.settings.parent_key_scale,
                guide_frames,
            };
            let retained = reduce_channel(
                &track.translation.keys,
                &track.translation.times,
                &limits,
                |frame, translation: Vec3, scale| {
                    let time = frame as f32 * time_per_frame;
                    let rotation = interpolate_at(&rotation.keys, &rotation.times, time);
                    world_ok(frame, BoneAtom::new(translation, rotation), scale)
                },
            );
            retain_keys(&mut track.translation.keys, &mut track.translation.times, &retained);
        }
    }
}

/// Indices of the keys to keep from one full-rate channel.
///
/// Grows a window from the last retained key as far as every interior key both
/// matches the lerp of the window ends and passes `world_ok`. The first and
/// last keys are always kept.
fn reduce_channel<T: LinearKey>(
    keys: &[T],
    times: &[f32],
    limits: &ChannelLimits<'_>,
    world_ok: impl Fn(usize, T, f32) -> bool,
) -> Vec<usize> {
    let Some(last) = keys.len().checked_sub(1) else {
        return Vec::new();
    };
    let mut retained = vec![0];
    let mut low = 0;
    while low < last {
        let mut high = last;
        while high > low + 1 && !window_fits(keys, times, low, high, limits, &world_ok) {
            high -= 1;
        }
        retained.push(high);
        low = high;
    }
    retained
}

fn window_fits<T: LinearKey>(
    keys: &[T],
    times: &[f32],
    low: usize,
    high: usize,
    limits: &ChannelLimits<'_>,
    world_ok: &impl Fn(usize, T, f32) -> bool,
) -> bool {
    let span = times[high] - times[low];
    (low + 1..high).all(|index| {
        let alpha = if span > 0.0 {
            (times[index] - times[low]) / span
        } else {
            0.0
        };
        let value = T::interpolate(keys[low], keys[high], alpha);
        // Errors on frames the guide kept are weighted up so those keys tend to survive
        let scale = if limits.guide_frames.contains(&index) {
            limits.parent_key_scale
        } else {
            1.0
        };
        // World error is only worth computing once the local curve fits
        T::delta(value, keys[index]) * scale <= limits.max_diff && world_ok(index, value, scale)
    })
}

/// Value of a reduced channel at `time`, interpolating between its keys.
pub(super) fn interpolate_at<T: LinearKey>(keys: &[T], times: &[f32], time: f32) -> T {
    let upper = times.partition_point(|&key_time| key_time <= time);
    if upper == 0 {
        return keys[0];
    }
    if upper >= keys.len() {
        return keys[keys.len() - 1];
    }
    let lower = upper - 1;
    let span = times[upper] - times[lower];
    let alpha = if span > 0.0 {
        (time - times[lower]) / span
    } else {
        0.0
    };
    T::interpolate(keys[lower], keys[upper], alpha.clamp(0.0, 1.0))
}

/// Current local transform of a full or single-key track at `frame`
fn local_at(track: &BoneTrack, frame: usize) -> BoneAtom {
    let translations = &track.translation.keys;
    let rotations = &track.rotation.keys;
    BoneAtom::new(
        translations[frame.min(translations.len() - 1)],
        rotations[frame.min(rotations.len() - 1)],
    )
}

/// Rotation, applied on the bone side of its local key, that turns the raw
/// heading toward `raw_target` into the heading it has from `base`.
fn heading_correction(base: &Affine3A, raw_base: &Affine3A, raw_target: &Affine3A) -> Option<Quat> {
    let current = origin(&(raw_base.inverse() * *raw_target));
    let desired = base.inverse().transform_point3(origin(raw_target));
    if current.length() < MIN_HEADING_LENGTH || desired.length() < MIN_HEADING_LENGTH {
        return None;
    }
    let (current, desired) = (current.normalize(), desired.normalize());
    let dot = current.dot(desired);
    if dot <= MIN_HEADING_DOT || dot >= 1.0 {
        return None;
    }

    let mut adjustment = Quat::from_rotation_arc(current, desired);
    if adjustment.w < 0.0 {
        adjustment = -adjustment;
    }
    ((adjustment * current - desired).length() < HEADING_TOLERANCE).then_some(adjustment)
}

fn retain_keys<T: Copy>(keys: &mut Vec<T>, times: &mut Vec<f32>, retained: &[usize]) {
    *keys = retained.iter().map(|&index| keys[index]).collect();
    *times = retained.iter().map(|&index| times[index]).collect();
}

/// Turn absolute keys back into deltas from the additive reference pose.
fn restore_additive(tracks: &mut [BoneTrack], reference: &[BoneAtom]) {
    for (track, base) in tracks.iter_mut().zip(reference) {
        for key in &mut track.translation.keys {
            *key -= base.translation;
        }
        let inverse = base.rotation.inverse();
        for key in &mut track.rotation.keys {
            *key = (*key * inverse).normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(guide_frames: &HashSet<usize>, max_diff: f32) -> ChannelLimits<'_> {
        ChannelLimits {
            max_diff,
            parent_key_scale: 2.0,
            guide_frames,
        }
    }

    fn frame_times(count: usize) -> Vec<f32> {
        (0..count).map(|i| i as f32).collect()
    }

    #[test]
    fn test_reduce_channel_linear_ramp() {
        let keys: Vec<Vec3> = (0..10).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let guide = HashSet::new();
        let retained =
            reduce_channel(&keys, &frame_times(10), &limits(&guide, 0.01), |_, _, _| true);
        assert_eq!(retained, vec![0, 9]);
    }

    #[test]
    fn test_reduce_channel_keeps_corner() {
        // Up 0..=5, flat afterwards
        let keys: Vec<Vec3> = (0..10)
            .map(|i| Vec3::new(0.0, (i.min(5)) as f32, 0.0))
            .collect();
        let guide = HashSet::new();
        let retained =
            reduce_channel(&keys, &frame_times(10), &limits(&guide, 0.01), |_, _, _| true);
        assert_eq!(retained, vec![0, 5, 9]);
    }

    #[test]
    fn test_reduce_channel_world_veto() {
        let keys: Vec<Vec3> = (0..5).map(|i| Vec3::splat(i as f32)).collect();
        let guide = HashSet::new();
        let retained =
            reduce_channel(&keys, &frame_times(5), &limits(&guide, 1.0), |_, _, _| false);
        assert_eq!(retained, vec![0, 1, 2, 3, 4], "every interior key is vetoed");
    }

    #[test]
    fn test_guide_frames_weight_error() {
        // Frame 1 sits 0.08 off the line from 0 to 2: inside 0.1, but not once doubled
        let keys = vec![Vec3::ZERO, Vec3::new(1.0, 0.08, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        let times = frame_times(3);
        let unguided = HashSet::new();
        let retained = reduce_channel(&keys, &times, &limits(&unguided, 0.1), |_, _, _| true);
        assert_eq!(retained, vec![0, 2]);

        let guided: HashSet<usize> = [1].into_iter().collect();
        let retained = reduce_channel(&keys, &times, &limits(&guided, 0.1), |_, _, _| true);
        assert_eq!(retained, vec![0, 1, 2], "guided frame must be kept");
    }

    #[test]
    fn test_guide_frames_never_loosen_tolerance() {
        // Frame 1 is 0.15 off the line: over tolerance whether guided or not
        let keys = vec![Vec3::ZERO, Vec3::new(1.0, 0.15, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        let guided: HashSet<usize> = [1].into_iter().collect();
        let retained =
            reduce_channel(&keys, &frame_times(3), &limits(&guided, 0.1), |_, _, _| true);
        assert_eq!(retained, vec![0, 1, 2]);
    }

    #[test]
    fn test_guide_scale_reaches_world_check() {
        let keys: Vec<Vec3> = (0..5).map(|i| Vec3::splat(i as f32)).collect();
        let guided: HashSet<usize> = [2].into_iter().collect();
        // Vetoes only scaled frames, so only frame 2 survives as an interior key
        let guide_limits = limits(&guided, 0.01);
        let retained = reduce_channel(&keys, &frame_times(5), &guide_limits, |_, _, scale| {
            scale == 1.0
        });
        assert_eq!(retained, vec![0, 2, 4]);
    }

    #[test]
    fn test_interpolate_at_brackets_times() {
        let keys = vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)];
        let times = vec![0.0, 2.0];
        assert_eq!(interpolate_at(&keys, &times, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(interpolate_at(&keys, &times, 3.0), keys[1]);
        assert_eq!(interpolate_at(&[Vec3::ONE], &[0.0], 1.0), Vec3::ONE);
    }

    #[test]
    fn test_heading_correction_turns_toward_target() {
        let raw_base = Affine3A::IDENTITY;
        let raw_target = Affine3A::from_translation(Vec3::X);
        // The reduced bone is turned 10 degrees about Z; the correction must undo it
        let base = Affine3A::from_rotation_z(10f32.to_radians());
        let adjustment = heading_correction(&base, &raw_base, &raw_target).unwrap();
        let corrected = base * Affine3A::from_quat(adjustment) * raw_target;
        assert!(
            origin(&corrected).abs_diff_eq(Vec3::X, 1e-4),
            "corrected target at {:?}",
            origin(&corrected)
        );
    }

    #[test]
    fn test_heading_correction_rejects_large_turns() {
        let raw_target = Affine3A::from_translation(Vec3::X);
        let base = Affine3A::from_rotation_z(75f32.to_radians());
        assert!(heading_correction(&base, &Affine3A::IDENTITY, &raw_target).is_none());
        let unturned = heading_correction(&Affine3A::IDENTITY, &Affine3A::IDENTITY, &raw_target);
        assert!(unturned.is_none());
    }
}
