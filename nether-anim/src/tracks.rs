//! Raw per-frame animation data and the reduced tracks built from it

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::codec::constant_rate_span;
use crate::error::{AnimError, Result};
use crate::math::{BoneAtom, blend_rotation, enforce_shortest_arc, quat_error};

/// Translation keys closer than this to the first key are dropped as trivial
pub const TRIVIAL_POSITION_DELTA: f32 = 0.0001;

/// Rotation keys within this `quat_error` of the first key are dropped as trivial
pub const TRIVIAL_ROTATION_DELTA: f32 = 0.0003;

// =============================================================================
// Raw data
// =============================================================================

/// One bone's raw keys: either one key per frame or a single constant key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
}

impl RawTrack {
    /// Track holding the same transform for the whole sequence
    pub fn constant(atom: BoneAtom) -> Self {
        Self {
            positions: vec![atom.translation],
            rotations: vec![atom.rotation],
        }
    }

    /// Local transform at a raw frame; single-key channels hold for every frame.
    pub fn key_at(&self, frame: usize) -> BoneAtom {
        let translation = match self.positions.len() {
            0 => Vec3::ZERO,
            n => self.positions[frame.min(n - 1)],
        };
        let rotation = match self.rotations.len() {
            0 => Quat::IDENTITY,
            n => self.rotations[frame.min(n - 1)].normalize(),
        };
        BoneAtom::new(translation, rotation)
    }

    /// Interpolated local transform at a normalized position.
    ///
    /// Keys are evenly spaced, so this uses the constant-rate bracketing rules.
    pub fn sample(&self, relative_pos: f32, looping: bool) -> BoneAtom {
        let translation = match self.positions.len() {
            0 => Vec3::ZERO,
            n => {
                let span = constant_rate_span(relative_pos, looping, n);
                self.positions[span.index0].lerp(self.positions[span.index1], span.alpha)
            }
        };
        let rotation = match self.rotations.len() {
            0 => Quat::IDENTITY,
            n => {
                let span = constant_rate_span(relative_pos, looping, n);
                if span.index0 == span.index1 {
                    self.rotations[span.index0].normalize()
                } else {
                    blend_rotation(
                        self.rotations[span.index0],
                        self.rotations[span.index1],
                        span.alpha,
                    )
                }
            }
        };
        BoneAtom::new(translation, rotation)
    }
}

/// Uncompressed source animation handed to the compressor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnimation {
    pub name: String,
    pub num_frames: u32,
    /// Seconds
    pub sequence_length: f32,
    pub tracks: Vec<RawTrack>,
    /// Track index per skeleton bone. Empty means bone `i` uses track `i` when it exists.
    #[serde(default)]
    pub bone_to_track: Vec<Option<usize>>,
    /// Per-track reference pose when the keys are deltas from it
    #[serde(default)]
    pub additive_reference: Option<Vec<BoneAtom>>,
}

impl RawAnimation {
    pub fn is_additive(&self) -> bool {
        self.additive_reference.is_some()
    }

    /// Track driving `bone`, if any
    pub fn track_for_bone(&self, bone: usize) -> Option<usize> {
        if self.bone_to_track.is_empty() {
            (bone < self.tracks.len()).then_some(bone)
        } else {
            self.bone_to_track.get(bone).copied().flatten()
        }
    }

    /// Bytes the tracks occupy as plain `f32` vectors and quaternions
    pub fn raw_size(&self) -> usize {
        self.tracks
            .iter()
            .map(|track| track.positions.len() * 12 + track.rotations.len() * 16)
            .sum()
    }

    /// Seconds between consecutive raw frames
    pub fn time_per_frame(&self) -> f32 {
        if self.num_frames > 1 {
            self.sequence_length / (self.num_frames - 1) as f32
        } else {
            0.0
        }
    }

    /// Check key counts, the bone mapping and the additive pose.
    pub fn validate(&self) -> Result<()> {
        for (index, track) in self.tracks.iter().enumerate() {
            for (channel, count) in [
                ("translation", track.positions.len()),
                ("rotation", track.rotations.len()),
            ] {
                if count == 0 {
                    return Err(AnimError::InvalidRawTrack {
                        track: index,
                        reason: format!("no {} keys", channel),
                    });
                }
                if count != 1 && count != self.num_frames as usize {
                    return Err(AnimError::InvalidRawTrack {
                        track: index,
                        reason: format!(
                            "{} {} keys, expected 1 or {}",
                            count, channel, self.num_frames
                        ),
                    });
                }
            }
        }
        for (bone, track) in self.bone_to_track.iter().enumerate() {
            if let Some(track) = *track
                && track >= self.tracks.len()
            {
                return Err(AnimError::TrackMapping {
                    bone,
                    track,
                    num_tracks: self.tracks.len(),
                });
            }
        }
        if let Some(reference) = &self.additive_reference
            && reference.len() != self.tracks.len()
        {
            return Err(AnimError::AdditivePoseMismatch {
                expected: self.tracks.len(),
                got: reference.len(),
            });
        }
        Ok(())
    }

    /// Copy of the tracks with additive deltas applied to the reference pose
    pub fn absolute_tracks(&self) -> Vec<RawTrack> {
        let Some(reference) = &self.additive_reference else {
            return self.tracks.clone();
        };
        self.tracks
            .iter()
            .zip(reference)
            .map(|(track, base)| RawTrack {
                positions: track.positions.iter().map(|p| *p + base.translation).collect(),
                rotations: track
                    .rotations
                    .iter()
                    .map(|r| (*r * base.rotation).normalize())
                    .collect(),
            })
            .collect()
    }
}

// =============================================================================
// Reduced tracks
// =============================================================================

/// Retained translation keys with their times in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationTrack {
    pub keys: Vec<Vec3>,
    pub times: Vec<f32>,
}

/// Retained rotation keys with their times in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationTrack {
    pub keys: Vec<Quat>,
    pub times: Vec<f32>,
}

/// Both channels of one bone after reduction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTrack {
    pub translation: TranslationTrack,
    pub rotation: RotationTrack,
}

impl BoneTrack {
    pub fn num_keys(&self) -> usize {
        self.translation.keys.len() + self.rotation.keys.len()
    }
}

/// Split raw per-frame data into timed tracks.
///
/// Rotations are normalized and made sign-continuous so neighbouring keys
/// never interpolate the long way round.
pub fn separate_raw_tracks(
    tracks: &[RawTrack],
    num_frames: u32,
    sequence_length: f32,
) -> Vec<BoneTrack> {
    let time_per_frame = if num_frames > 1 {
        sequence_length / (num_frames - 1) as f32
    } else {
        0.0
    };
    let times = |count: usize| -> Vec<f32> {
        (0..count).map(|i| i as f32 * time_per_frame).collect()
    };

    tracks
        .iter()
        .map(|raw| {
            let mut rotations: Vec<Quat> = Vec::with_capacity(raw.rotations.len());
            for key in &raw.rotations {
                let key = key.normalize();
                let key = match rotations.last() {
                    Some(previous) => enforce_shortest_arc(*previous, key),
                    None => key,
                };
                rotations.push(key);
            }
            BoneTrack {
                translation: TranslationTrack {
                    keys: raw.positions.clone(),
                    times: times(raw.positions.len()),
                },
                rotation: RotationTrack {
                    times: times(rotations.len()),
                    keys: rotations,
                },
            }
        })
        .collect()
}

/// Collapse channels whose keys never move away from the first key.
pub fn filter_trivial_keys(tracks: &mut [BoneTrack], max_pos_delta: f32, max_rot_delta: f32) {
    for track in tracks.iter_mut() {
        let translation = &mut track.translation;
        if let Some(&first) = translation.keys.first()
            && translation.keys.len() > 1
            && translation.keys.iter().all(|k| first.distance(*k) <= max_pos_delta)
        {
            translation.keys.truncate(1);
            translation.times.truncate(1);
        }

        let rotation = &mut track.rotation;
        if let Some(&first) = rotation.keys.first()
            && rotation.keys.len() > 1
            && rotation.keys.iter().all(|k| quat_error(first, *k) <= max_rot_delta)
        {
            rotation.keys.truncate(1);
            rotation.times.truncate(1);
        }
    }
}

/// Keep keys `0..start_index`, then every `interval`-th key, then the final key.
pub fn filter_intermittent_keys<T: Copy>(
    keys: &mut Vec<T>,
    times: &mut Vec<f32>,
    start_index: usize,
    interval: usize,
) {
    let count = keys.len();
    if count < 2 || interval < 2 {
        return;
    }
    let final_index = count - 1;
    let start_index = start_index.min(final_index);

    let mut retained: Vec<usize> = (0..start_index).collect();
    retained.extend((start_index..count).step_by(interval));
    if retained.last() != Some(&final_index) {
        retained.push(final_index);
    }

    *keys = retained.iter().map(|&i| keys[i]).collect();
    *times = retained.iter().map(|&i| times[i]).collect();
}
