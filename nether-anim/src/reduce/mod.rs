//! Linear key removal
//!
//! Drops interior keys that linear interpolation of their neighbours can
//! reproduce, bounding both the bone's own curve error and the world-space
//! drift of the end effectors below it.
//!
//! Bones are reduced parent-first. After each bone its reduced keys are encoded
//! with the target rotation format and sampled back into the world bone table,
//! so every child is judged against what its ancestors will actually play.

mod linear;
mod world;

#[cfg(test)]
mod tests;

pub use linear::reduce_linear_keys;
pub use world::WorldBoneTable;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::math::{blend_rotation, quat_error};

/// Tolerances for linear key removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearKeySettings {
    /// Largest translation lerp error kept out of a bone's own curve
    #[serde(default = "default_max_pos_diff")]
    pub max_pos_diff: f32,
    /// Largest rotation lerp error, as `acos(|q0 . q1|) / pi`
    #[serde(default = "default_max_angle_diff")]
    pub max_angle_diff: f32,
    /// World drift allowed at end effectors more than one hop below the bone
    #[serde(default = "default_max_effector_diff")]
    pub max_effector_diff: f32,
    /// World drift allowed when the bone is an end effector or its parent
    #[serde(default = "default_min_effector_diff")]
    pub min_effector_diff: f32,
    /// Tolerance multiplier at frames where the guiding ancestor kept a key
    #[serde(default = "default_parent_key_scale")]
    pub parent_key_scale: f32,
    /// Nudge raw keys toward the original end effector positions before reducing
    #[serde(default = "default_true")]
    pub retarget: bool,
}

fn default_max_pos_diff() -> f32 {
    0.1
}
fn default_max_angle_diff() -> f32 {
    0.025
}
fn default_max_effector_diff() -> f32 {
    0.01
}
fn default_min_effector_diff() -> f32 {
    0.02
}
fn default_parent_key_scale() -> f32 {
    2.0
}
fn default_true() -> bool {
    true
}

impl Default for LinearKeySettings {
    fn default() -> Self {
        Self {
            max_pos_diff: 0.1,
            max_angle_diff: 0.025,
            max_effector_diff: 0.01,
            min_effector_diff: 0.02,
            parent_key_scale: 2.0,
            retarget: true,
        }
    }
}

impl LinearKeySettings {
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("max_pos_diff", self.max_pos_diff),
            ("max_angle_diff", self.max_angle_diff),
            ("max_effector_diff", self.max_effector_diff),
            ("min_effector_diff", self.min_effector_diff),
        ];
        for (name, value) in tolerances {
            if value.is_nan() || value < 0.0 {
                return Err(AnimError::InvalidSettings(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.parent_key_scale.is_nan() || self.parent_key_scale < 1.0 {
            return Err(AnimError::InvalidSettings(format!(
                "parent_key_scale must be at least 1.0, got {}",
                self.parent_key_scale
            )));
        }
        Ok(())
    }

    /// World tolerance for a bone `distance` hops above its closest end effector
    pub fn effector_tolerance(&self, distance: usize) -> f32 {
        if distance <= 1 {
            self.min_effector_diff
        } else {
            self.max_effector_diff
        }
    }
}

/// A key value that can be linearly interpolated and compared.
pub trait LinearKey: Copy {
    fn interpolate(from: Self, to: Self, alpha: f32) -> Self;

    /// Error between two key values in this channel's tolerance units
    fn delta(a: Self, b: Self) -> f32;
}

impl LinearKey for Vec3 {
    fn interpolate(from: Self, to: Self, alpha: f32) -> Self {
        from.lerp(to, alpha)
    }

    fn delta(a: Self, b: Self) -> f32 {
        a.distance(b)
    }
}

impl LinearKey for Quat {
    fn interpolate(from: Self, to: Self, alpha: f32) -> Self {
        blend_rotation(from, to, alpha)
    }

    fn delta(a: Self, b: Self) -> f32 {
        quat_error(a, b)
    }
}
