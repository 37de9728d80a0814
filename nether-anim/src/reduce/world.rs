//! Per-frame world transforms for every bone

use glam::Affine3A;

use crate::skeleton::BoneHierarchy;

/// World transform of every bone at every raw frame.
///
/// Stored frame-major so one frame's pose is contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldBoneTable {
    num_bones: usize,
    num_frames: usize,
    transforms: Vec<Affine3A>,
}

impl WorldBoneTable {
    pub fn new(num_bones: usize, num_frames: usize) -> Self {
        Self {
            num_bones,
            num_frames,
            transforms: vec![Affine3A::IDENTITY; num_bones * num_frames],
        }
    }

    /// Forward kinematics over every frame; `local(bone, frame)` supplies local transforms.
    pub fn build(
        hierarchy: &BoneHierarchy,
        num_frames: usize,
        mut local: impl FnMut(usize, usize) -> Affine3A,
    ) -> Self {
        let mut table = Self::new(hierarchy.num_bones(), num_frames);
        for bone in 0..hierarchy.num_bones() {
            table.update_bone(hierarchy, bone, |frame| local(bone, frame));
        }
        table
    }

    pub fn num_bones(&self) -> usize {
        self.num_bones
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn get(&self, bone: usize, frame: usize) -> &Affine3A {
        &self.transforms[frame * self.num_bones + bone]
    }

    /// World transform of `bone`'s parent, identity for roots
    pub fn parent_world(&self, hierarchy: &BoneHierarchy, bone: usize, frame: usize) -> Affine3A {
        match hierarchy.parent(bone) {
            Some(parent) => *self.get(parent, frame),
            None => Affine3A::IDENTITY,
        }
    }

    /// Recompute one bone from its parent's current entries.
    ///
    /// The parent must already be up to date for every frame.
    pub fn update_bone(
        &mut self,
        hierarchy: &BoneHierarchy,
        bone: usize,
        mut local: impl FnMut(usize) -> Affine3A,
    ) {
        for frame in 0..self.num_frames {
            let world = self.parent_world(hierarchy, bone, frame) * local(frame);
            self.transforms[frame * self.num_bones + bone] = world;
        }
    }
}
