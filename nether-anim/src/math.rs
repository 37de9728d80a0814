//! Bone transforms and quaternion helpers
//!
//! Transforms follow glam's column-vector convention: a bone's world transform
//! is `parent_world * local`.

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Quaternions closer than this (1 - |dot|) are treated as identical
const QUAT_EQUAL_EPSILON: f32 = 1.0e-7;

/// A bone's local transform relative to its parent at one instant.
///
/// Scale is carried for completeness and is always 1.0 for sampled atoms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneAtom {
    pub translation: Vec3,
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for BoneAtom {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneAtom {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: 1.0,
        }
    }

    /// Rigid transform (scale is ignored)
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.translation)
    }

    /// Absolute transform when `self` is an additive delta over `base`
    pub fn apply_to(&self, base: &BoneAtom) -> BoneAtom {
        BoneAtom::new(
            self.translation + base.translation,
            (self.rotation * base.rotation).normalize(),
        )
    }

    /// Rigid part of an affine transform
    pub fn from_affine(transform: &Affine3A) -> Self {
        let (_, rotation, translation) = transform.to_scale_rotation_translation();
        Self::new(translation, rotation.normalize())
    }
}

/// Flip `q` onto the same hemisphere as `reference`.
pub fn enforce_shortest_arc(reference: Quat, q: Quat) -> Quat {
    if reference.dot(q) >= 0.0 { q } else { -q }
}

/// Canonical form used by the drop-W formats: unit length with `w >= 0`.
pub fn canonicalize(q: Quat) -> Quat {
    let q = q.normalize();
    if q.w < 0.0 { -q } else { q }
}

/// Shortest-arc linear blend, renormalized.
pub fn blend_rotation(q0: Quat, q1: Quat, alpha: f32) -> Quat {
    let bias = if q0.dot(q1) >= 0.0 { 1.0 } else { -1.0 };
    let blended = q0 * (1.0 - alpha) + q1 * (alpha * bias);
    blended.normalize()
}

/// Key-reduction rotation error: `acos(|q0 . q1|) / pi`.
///
/// Zero for identical rotations, 0.5 for rotations half a turn apart.
pub fn quat_error(q0: Quat, q1: Quat) -> f32 {
    let cosom = q0.dot(q1).abs();
    if cosom < 1.0 - QUAT_EQUAL_EPSILON {
        cosom.acos() / std::f32::consts::PI
    } else {
        0.0
    }
}

/// Rotation angle in radians between two orientations, ignoring hemisphere.
pub fn angular_distance(q0: Quat, q1: Quat) -> f32 {
    let a = q0.normalize();
    let b = enforce_shortest_arc(a, q1.normalize());
    // atan2 form stays accurate for nearly identical rotations, unlike acos(dot)
    4.0 * (a - b).length().atan2((a + b).length())
}

/// Origin of a world transform
pub fn origin(transform: &Affine3A) -> Vec3 {
    Vec3::from(transform.translation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_bone_atom_affine_roundtrip() {
        let atom = BoneAtom::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.7));
        let back = BoneAtom::from_affine(&atom.to_affine());
        assert!(back.translation.abs_diff_eq(atom.translation, 1e-5));
        assert!(angular_distance(back.rotation, atom.rotation) < 1e-3);
        assert_eq!(back.scale, 1.0);
    }

    #[test]
    fn test_canonicalize_positive_w() {
        let q = -Quat::from_rotation_x(0.3);
        assert!(q.w < 0.0);
        let c = canonicalize(q);
        assert!(c.w >= 0.0);
        assert!(angular_distance(c, q) < 1e-3);
    }

    #[test]
    fn test_blend_rotation_takes_short_way() {
        let q0 = Quat::IDENTITY;
        let q1 = -Quat::from_rotation_z(FRAC_PI_2);
        let mid = blend_rotation(q0, q1, 0.5);
        let expected = Quat::from_rotation_z(FRAC_PI_2 * 0.5);
        assert!(
            angular_distance(mid, expected) < 1e-3,
            "midpoint off by {}",
            angular_distance(mid, expected)
        );
    }

    #[test]
    fn test_quat_error_scale() {
        assert_eq!(quat_error(Quat::IDENTITY, Quat::IDENTITY), 0.0);
        assert_eq!(quat_error(Quat::IDENTITY, -Quat::IDENTITY), 0.0);
        // 180 degree turn: half angle is pi/2, error 0.5
        let half_turn = Quat::from_rotation_x(std::f32::consts::PI);
        assert!((quat_error(Quat::IDENTITY, half_turn) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_enforce_shortest_arc() {
        let a = Quat::from_rotation_y(0.2);
        let b = -Quat::from_rotation_y(0.3);
        assert!(enforce_shortest_arc(a, b).dot(a) > 0.0);
        assert_eq!(enforce_shortest_arc(a, a), a);
    }
}
