//! Skeleton description and the bone hierarchy metadata derived from it
//!
//! Bones are stored parent-first: a bone's parent index is always smaller
//! than its own, so ascending iteration visits parents before children.

use glam::Affine3A;
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::math::BoneAtom;

/// One bone of the skeleton consumed by the compressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonBone {
    pub name: String,
    /// `None` for root bones
    #[serde(default)]
    pub parent: Option<usize>,
    /// Local transform in the reference pose
    #[serde(default)]
    pub reference: BoneAtom,
}

/// Ordered bone list with reference pose
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub bones: Vec<SkeletonBone>,
}

impl Skeleton {
    pub fn new(bones: Vec<SkeletonBone>) -> Self {
        Self { bones }
    }

    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    pub fn parents(&self) -> Vec<Option<usize>> {
        self.bones.iter().map(|bone| bone.parent).collect()
    }

    pub fn reference_pose(&self) -> Vec<BoneAtom> {
        self.bones.iter().map(|bone| bone.reference).collect()
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    /// Derive the hierarchy metadata, validating the parent order.
    pub fn hierarchy(&self) -> Result<BoneHierarchy> {
        BoneHierarchy::from_parents(&self.parents())
    }
}

/// Read-only per-bone relationships, computed once per skeleton.
///
/// Everything is stored as plain bone indices into the flat bone array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneHierarchy {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    /// Ancestors of each bone, nearest first
    bones_to_root: Vec<Vec<usize>>,
    end_effectors: Vec<usize>,
    /// Hops from each bone down to its closest end effector
    effector_distance: Vec<usize>,
}

impl BoneHierarchy {
    pub fn from_parents(parents: &[Option<usize>]) -> Result<Self> {
        let num_bones = parents.len();
        let mut children = vec![Vec::new(); num_bones];
        let mut bones_to_root: Vec<Vec<usize>> = Vec::with_capacity(num_bones);

        for (bone, parent) in parents.iter().enumerate() {
            let chain = match *parent {
                Some(parent) if parent >= bone => {
                    return Err(AnimError::InvalidSkeleton {
                        bone,
                        reason: format!("parent {} does not precede the bone", parent),
                    });
                }
                Some(parent) => {
                    children[parent].push(bone);
                    let mut chain = Vec::with_capacity(bones_to_root[parent].len() + 1);
                    chain.push(parent);
                    chain.extend_from_slice(&bones_to_root[parent]);
                    chain
                }
                None => Vec::new(),
            };
            bones_to_root.push(chain);
        }

        let end_effectors: Vec<usize> = (0..num_bones)
            .filter(|&bone| children[bone].is_empty())
            .collect();

        // Children always follow their parent, so a reverse walk sees them first
        let mut effector_distance = vec![0; num_bones];
        for bone in (0..num_bones).rev() {
            if let Some(closest) = children[bone].iter().map(|&c| effector_distance[c]).min() {
                effector_distance[bone] = closest + 1;
            }
        }

        Ok(Self {
            parents: parents.to_vec(),
            children,
            bones_to_root,
            end_effectors,
            effector_distance,
        })
    }

    pub fn num_bones(&self) -> usize {
        self.parents.len()
    }

    pub fn parent(&self, bone: usize) -> Option<usize> {
        self.parents[bone]
    }

    pub fn children(&self, bone: usize) -> &[usize] {
        &self.children[bone]
    }

    pub fn bones_to_root(&self, bone: usize) -> &[usize] {
        &self.bones_to_root[bone]
    }

    pub fn end_effectors(&self) -> &[usize] {
        &self.end_effectors
    }

    pub fn is_end_effector(&self, bone: usize) -> bool {
        self.children[bone].is_empty()
    }

    pub fn is_ancestor(&self, ancestor: usize, bone: usize) -> bool {
        self.bones_to_root[bone].contains(&ancestor)
    }

    /// Number of hops to the closest end effector below `bone` (0 for an end effector)
    pub fn end_effector_distance(&self, bone: usize) -> usize {
        self.effector_distance[bone]
    }

    /// End effectors whose world position depends on `bone`, including itself.
    pub fn target_end_effectors(&self, bone: usize) -> Vec<usize> {
        self.end_effectors
            .iter()
            .copied()
            .filter(|&effector| effector == bone || self.is_ancestor(bone, effector))
            .collect()
    }

    /// Forward kinematics: world transform of every bone from local atoms.
    pub fn world_transforms(&self, locals: &[BoneAtom]) -> Vec<Affine3A> {
        let mut worlds: Vec<Affine3A> = Vec::with_capacity(locals.len());
        for (bone, local) in locals.iter().enumerate() {
            let local = local.to_affine();
            let world = match self.parents.get(bone).copied().flatten() {
                Some(parent) => worlds[parent] * local,
                None => local,
            };
            worlds.push(world);
        }
        worlds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::origin;
    use glam::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_2;

    //   0
    //   +-- 1 -- 2 -- 3
    //   +-- 4
    fn branching_parents() -> Vec<Option<usize>> {
        vec![None, Some(0), Some(1), Some(2), Some(0)]
    }

    #[test]
    fn test_hierarchy_relationships() {
        let hierarchy = BoneHierarchy::from_parents(&branching_parents()).unwrap();
        assert_eq!(hierarchy.num_bones(), 5);
        assert_eq!(hierarchy.children(0), &[1, 4]);
        assert_eq!(hierarchy.bones_to_root(3), &[2, 1, 0]);
        assert!(hierarchy.bones_to_root(0).is_empty());
        assert_eq!(hierarchy.end_effectors(), &[3, 4]);
        assert!(hierarchy.is_ancestor(1, 3));
        assert!(!hierarchy.is_ancestor(4, 3));
    }

    #[test]
    fn test_end_effector_targets_and_distance() {
        let hierarchy = BoneHierarchy::from_parents(&branching_parents()).unwrap();
        assert_eq!(hierarchy.target_end_effectors(0), vec![3, 4]);
        assert_eq!(hierarchy.target_end_effectors(2), vec![3]);
        assert_eq!(hierarchy.target_end_effectors(4), vec![4]);

        let distances: Vec<usize> = (0..5).map(|b| hierarchy.end_effector_distance(b)).collect();
        assert_eq!(distances, vec![1, 2, 1, 0, 0]);
    }

    #[test]
    fn test_parent_must_precede_child() {
        let result = BoneHierarchy::from_parents(&[None, Some(2), Some(0)]);
        assert!(
            matches!(result, Err(AnimError::InvalidSkeleton { bone: 1, .. })),
            "got {:?}",
            result
        );
        assert!(BoneHierarchy::from_parents(&[Some(0)]).is_err());
    }

    #[test]
    fn test_empty_skeleton() {
        let hierarchy = BoneHierarchy::from_parents(&[]).unwrap();
        assert_eq!(hierarchy.num_bones(), 0);
        assert!(hierarchy.end_effectors().is_empty());
        assert!(hierarchy.world_transforms(&[]).is_empty());
    }

    #[test]
    fn test_world_transforms_compose_parent_first() {
        let hierarchy = BoneHierarchy::from_parents(&[None, Some(0)]).unwrap();
        let locals = [
            BoneAtom::new(Vec3::new(0.0, 0.0, 5.0), Quat::from_rotation_z(FRAC_PI_2)),
            BoneAtom::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY),
        ];
        let worlds = hierarchy.world_transforms(&locals);
        let child = origin(&worlds[1]);
        // Parent turns +X into +Y
        assert!(
            child.abs_diff_eq(Vec3::new(0.0, 1.0, 5.0), 1e-5),
            "child at {:?}",
            child
        );
    }

    #[test]
    fn test_skeleton_lookup_and_serde() {
        let skeleton = Skeleton::new(vec![
            SkeletonBone {
                name: "root".into(),
                parent: None,
                reference: BoneAtom::IDENTITY,
            },
            SkeletonBone {
                name: "hand".into(),
                parent: Some(0),
                reference: BoneAtom::new(Vec3::X, Quat::IDENTITY),
            },
        ]);
        assert_eq!(skeleton.find_bone("hand"), Some(1));
        assert_eq!(skeleton.find_bone("foot"), None);
        assert_eq!(skeleton.parents(), vec![None, Some(0)]);

        let json = serde_json::to_string(&skeleton).unwrap();
        let parsed: Skeleton = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, skeleton);

        let minimal: Skeleton = serde_json::from_str(r#"{"bones":[{"name":"solo"}]}"#).unwrap();
        assert_eq!(minimal.bones[0].parent, None);
        assert_eq!(minimal.bones[0].reference, BoneAtom::IDENTITY);
    }
}
