//! Tests for linear key removal

use super::*;
use crate::formats::{KeyEncoding, RotationFormat, SequenceFormat};
use crate::layout::encode_tracks;
use crate::math::{BoneAtom, origin};
use crate::sampler::sample_skeleton_pose;
use crate::skeleton::{BoneHierarchy, Skeleton, SkeletonBone};
use crate::tracks::{RawAnimation, RawTrack};
use glam::Affine3A;
use std::f32::consts::{FRAC_PI_2, TAU};

const FLOAT96: SequenceFormat =
    SequenceFormat::new(RotationFormat::Float96NoW, KeyEncoding::VariableRate);

fn chain_skeleton(bones: usize, bone_length: f32) -> Skeleton {
    Skeleton::new(
        (0..bones)
            .map(|i| SkeletonBone {
                name: format!("bone{}", i),
                parent: i.checked_sub(1),
                reference: BoneAtom::new(Vec3::new(0.0, bone_length, 0.0), Quat::IDENTITY),
            })
            .collect(),
    )
}

/// Chain whose bones swing about Z with phase-shifted sine curves while the root drifts.
fn swinging_chain(bones: usize, num_frames: u32) -> (Skeleton, RawAnimation) {
    let skeleton = chain_skeleton(bones, 1.0);
    let length = 2.0;
    let tracks = (0..bones)
        .map(|bone| {
            let mut track = RawTrack::default();
            for frame in 0..num_frames {
                let t = frame as f32 / (num_frames - 1) as f32;
                let angle = 0.4 * (TAU * t + bone as f32).sin();
                track.rotations.push(Quat::from_rotation_z(angle));
                if bone == 0 {
                    track.positions.push(Vec3::new(t * 3.0, (TAU * t).cos() * 0.5, 0.0));
                }
            }
            if bone > 0 {
                track.positions.push(Vec3::new(0.0, 1.0, 0.0));
            }
            track
        })
        .collect();
    let animation = RawAnimation {
        name: "swing".into(),
        num_frames,
        sequence_length: length,
        tracks,
        ..Default::default()
    };
    (skeleton, animation)
}

fn raw_world_pose(
    hierarchy: &BoneHierarchy,
    animation: &RawAnimation,
    frame: usize,
) -> Vec<Affine3A> {
    let locals: Vec<BoneAtom> = animation.tracks.iter().map(|t| t.key_at(frame)).collect();
    hierarchy.world_transforms(&locals)
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_settings_defaults() {
    let settings = LinearKeySettings::default();
    assert_eq!(settings.max_pos_diff, 0.1);
    assert_eq!(settings.max_angle_diff, 0.025);
    assert_eq!(settings.max_effector_diff, 0.01);
    assert_eq!(settings.min_effector_diff, 0.02);
    assert_eq!(settings.parent_key_scale, 2.0);
    assert!(settings.retarget);
    assert!(settings.validate().is_ok());

    let parsed: LinearKeySettings = serde_json::from_str(r#"{"max_pos_diff": 0.5}"#).unwrap();
    assert_eq!(parsed.max_pos_diff, 0.5);
    assert_eq!(parsed.parent_key_scale, 2.0);
}

#[test]
fn test_settings_validation() {
    let negative = LinearKeySettings {
        max_angle_diff: -0.1,
        ..Default::default()
    };
    assert!(negative.validate().is_err());

    let small_scale = LinearKeySettings {
        parent_key_scale: 0.5,
        ..Default::default()
    };
    assert!(small_scale.validate().is_err());

    let nan = LinearKeySettings {
        max_pos_diff: f32::NAN,
        ..Default::default()
    };
    assert!(nan.validate().is_err());
}

#[test]
fn test_effector_tolerance_by_distance() {
    let settings = LinearKeySettings::default();
    assert_eq!(settings.effector_tolerance(0), 0.02);
    assert_eq!(settings.effector_tolerance(1), 0.02);
    assert_eq!(settings.effector_tolerance(2), 0.01);
}

#[test]
fn test_linear_key_metrics() {
    assert_eq!(Vec3::delta(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0)), 5.0);
    let half = Vec3::interpolate(Vec3::ZERO, Vec3::splat(2.0), 0.5);
    assert_eq!(half, Vec3::ONE);

    let quarter_turn = Quat::from_rotation_z(FRAC_PI_2);
    // acos(cos(pi/4)) / pi
    assert!((Quat::delta(Quat::IDENTITY, quarter_turn) - 0.25).abs() < 1e-5);
    assert_eq!(Quat::delta(quarter_turn, -quarter_turn), 0.0);
}

// ============================================================================
// World Bone Table
// ============================================================================

#[test]
fn test_world_table_composes_parents() {
    let hierarchy = BoneHierarchy::from_parents(&[None, Some(0)]).unwrap();
    let table = WorldBoneTable::build(&hierarchy, 3, |bone, frame| {
        if bone == 0 {
            Affine3A::from_translation(Vec3::new(frame as f32, 0.0, 0.0))
        } else {
            Affine3A::from_translation(Vec3::Y)
        }
    });
    assert_eq!(table.num_bones(), 2);
    assert_eq!(table.num_frames(), 3);
    assert_eq!(origin(table.get(1, 2)), Vec3::new(2.0, 1.0, 0.0));
    assert_eq!(table.parent_world(&hierarchy, 0, 1), Affine3A::IDENTITY);
    assert_eq!(table.parent_world(&hierarchy, 1, 1), *table.get(0, 1));
}

// ============================================================================
// Reduction
// ============================================================================

#[test]
fn test_constant_tracks_reduce_to_single_keys() {
    let skeleton = chain_skeleton(3, 1.0);
    let atom = BoneAtom::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_x(0.3));
    let animation = RawAnimation {
        num_frames: 20,
        sequence_length: 1.0,
        tracks: (0..3)
            .map(|_| RawTrack {
                positions: vec![atom.translation; 20],
                rotations: vec![atom.rotation; 20],
            })
            .collect(),
        ..Default::default()
    };
    let tracks =
        reduce_linear_keys(&animation, &skeleton, &LinearKeySettings::default(), FLOAT96).unwrap();
    for (index, track) in tracks.iter().enumerate() {
        assert_eq!(track.translation.keys.len(), 1, "track {} translation", index);
        assert_eq!(track.rotation.keys.len(), 1, "track {} rotation", index);
        assert_eq!(track.translation.times, vec![0.0]);
    }
}

#[test]
fn test_two_frame_animation_is_untouched() {
    let (skeleton, animation) = swinging_chain(2, 2);
    let tracks =
        reduce_linear_keys(&animation, &skeleton, &LinearKeySettings::default(), FLOAT96).unwrap();
    assert_eq!(tracks[0].translation.keys.len(), 2, "nothing lies between two frames");
    assert_eq!(tracks[1].translation.keys.len(), 1);
}

#[test]
fn test_reduction_removes_keys() {
    let (skeleton, animation) = swinging_chain(4, 61);
    let tracks =
        reduce_linear_keys(&animation, &skeleton, &LinearKeySettings::default(), FLOAT96).unwrap();
    let raw_keys: usize = animation
        .tracks
        .iter()
        .map(|t| t.positions.len() + t.rotations.len())
        .sum();
    let kept: usize = tracks.iter().map(|t| t.num_keys()).sum();
    assert!(kept < raw_keys * 3 / 4, "kept {} of {} keys", kept, raw_keys);

    for track in &tracks {
        let times = &track.rotation.times;
        assert_eq!(times[0], 0.0);
        assert!(times.windows(2).all(|w| w[0] < w[1]), "times must increase");
        let last = *times.last().unwrap();
        assert!((last - animation.sequence_length).abs() < 1e-5, "last key at {}", last);
    }
}

#[test]
fn test_local_error_within_tolerance() {
    let (skeleton, animation) = swinging_chain(4, 61);
    let settings = LinearKeySettings {
        retarget: false,
        ..Default::default()
    };
    let tracks = reduce_linear_keys(&animation, &skeleton, &settings, FLOAT96).unwrap();

    for (index, (raw, reduced)) in animation.tracks.iter().zip(&tracks).enumerate() {
        for frame in 0..animation.num_frames as usize {
            let time = frame as f32 * animation.time_per_frame();
            let rotation =
                linear::interpolate_at(&reduced.rotation.keys, &reduced.rotation.times, time);
            let error = Quat::delta(rotation, raw.key_at(frame).rotation);
            assert!(
                error <= settings.max_angle_diff + 1e-4,
                "track {} frame {}: rotation error {}",
                index,
                frame,
                error
            );
            let translation =
                linear::interpolate_at(&reduced.translation.keys, &reduced.translation.times, time);
            let error = translation.distance(raw.key_at(frame).translation);
            assert!(
                error <= settings.max_pos_diff + 1e-4,
                "track {} frame {}: translation error {}",
                index,
                frame,
                error
            );
        }
    }
}

#[test]
fn test_end_effector_error_bounded() {
    let (skeleton, animation) = swinging_chain(4, 61);
    let settings = LinearKeySettings::default();
    let tracks = reduce_linear_keys(&animation, &skeleton, &settings, FLOAT96).unwrap();
    let sequence = encode_tracks(&tracks, FLOAT96, animation.num_frames, animation.sequence_length)
        .unwrap();
    let hierarchy = skeleton.hierarchy().unwrap();

    for frame in 0..animation.num_frames as usize {
        let time = frame as f32 * animation.time_per_frame();
        let locals = sample_skeleton_pose(&sequence, &skeleton, &[], time, false);
        let reduced = hierarchy.world_transforms(&locals);
        let raw = raw_world_pose(&hierarchy, &animation, frame);
        for &effector in hierarchy.end_effectors() {
            // Loosest tolerance any bone on the effector's chain was reduced against
            let tolerance = std::iter::once(effector)
                .chain(hierarchy.bones_to_root(effector).iter().copied())
                .map(|bone| settings.effector_tolerance(hierarchy.end_effector_distance(bone)))
                .fold(0.0f32, f32::max);
            let error = origin(&reduced[effector]).distance(origin(&raw[effector]));
            assert!(
                error <= tolerance + 1e-3,
                "frame {}: effector {} error {} over tolerance {}",
                frame,
                effector,
                error,
                tolerance
            );
        }
    }
}

/// Two-bone chain over 21 frames. The root slides to x = 1 by frame 10 and
/// then holds, so it keeps a key there. The leaf holds identity except for a
/// turn about Z at frame 10 whose lerp error is `bump_error`.
fn guided_bump(bump_error: f32) -> (Skeleton, RawAnimation) {
    let skeleton = chain_skeleton(2, 1.0);
    let bump = Quat::from_rotation_z(bump_error * TAU);
    let root = RawTrack {
        positions: (0..21u32)
            .map(|frame| Vec3::new(frame.min(10) as f32 * 0.1, 0.0, 0.0))
            .collect(),
        rotations: vec![Quat::IDENTITY],
    };
    let leaf = RawTrack {
        positions: vec![Vec3::Y],
        rotations: (0..21u32)
            .map(|frame| if frame == 10 { bump } else { Quat::IDENTITY })
            .collect(),
    };
    let animation = RawAnimation {
        name: "bump".into(),
        num_frames: 21,
        sequence_length: 1.0,
        tracks: vec![root, leaf],
        ..Default::default()
    };
    (skeleton, animation)
}

fn key_frames(times: &[f32]) -> Vec<u32> {
    times.iter().map(|&t| (t * 20.0).round() as u32).collect()
}

#[test]
fn test_guide_key_kept_when_over_tolerance() {
    let (skeleton, animation) = guided_bump(0.04);
    let settings = LinearKeySettings {
        retarget: false,
        ..Default::default()
    };
    let tracks = reduce_linear_keys(&animation, &skeleton, &settings, FLOAT96).unwrap();

    assert_eq!(key_frames(&tracks[0].translation.times), vec![0, 10, 20]);
    assert_eq!(
        key_frames(&tracks[1].rotation.times),
        vec![0, 10, 20],
        "leaf key at frame 10 exceeds max_angle_diff and must stay"
    );
}

#[test]
fn test_guide_key_kept_within_scaled_tolerance() {
    // 0.02 fits max_angle_diff 0.025 alone but not once doubled by parent_key_scale
    let (skeleton, animation) = guided_bump(0.02);
    let guided = LinearKeySettings {
        retarget: false,
        ..Default::default()
    };
    let tracks = reduce_linear_keys(&animation, &skeleton, &guided, FLOAT96).unwrap();
    assert_eq!(key_frames(&tracks[1].rotation.times), vec![0, 10, 20]);

    let unguided = LinearKeySettings {
        parent_key_scale: 1.0,
        ..guided
    };
    let tracks = reduce_linear_keys(&animation, &skeleton, &unguided, FLOAT96).unwrap();
    assert_eq!(key_frames(&tracks[1].rotation.times), vec![0, 20]);
}

#[test]
fn test_additive_keys_restored_as_deltas() {
    let skeleton = chain_skeleton(1, 0.0);
    let reference = BoneAtom::new(Vec3::new(0.0, 5.0, 0.0), Quat::from_rotation_z(0.3));
    let animation = RawAnimation {
        num_frames: 10,
        sequence_length: 1.0,
        tracks: vec![RawTrack {
            positions: (0..10).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
            rotations: vec![Quat::IDENTITY; 10],
        }],
        additive_reference: Some(vec![reference]),
        ..Default::default()
    };
    let tracks =
        reduce_linear_keys(&animation, &skeleton, &LinearKeySettings::default(), FLOAT96).unwrap();
    let track = &tracks[0];
    assert_eq!(track.translation.keys.len(), 2);
    assert!(track.translation.keys[0].abs_diff_eq(Vec3::ZERO, 1e-5));
    assert!(track.translation.keys[1].abs_diff_eq(Vec3::new(9.0, 0.0, 0.0), 1e-4));
    assert_eq!(track.rotation.keys.len(), 1);
    assert!(track.rotation.keys[0].abs_diff_eq(Quat::IDENTITY, 1e-5));
}

#[test]
fn test_invalid_settings_rejected() {
    let (skeleton, animation) = swinging_chain(2, 10);
    let settings = LinearKeySettings {
        parent_key_scale: 0.0,
        ..Default::default()
    };
    assert!(reduce_linear_keys(&animation, &skeleton, &settings, FLOAT96).is_err());
}
