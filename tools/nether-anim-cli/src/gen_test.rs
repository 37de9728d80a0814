//! Generate a synthetic test project: skeleton, wave clips and anim.toml
//!
//! The wave is a chain of bones swinging about Z with a phase offset per bone,
//! sampled at a fixed frame rate.

use anyhow::{Context, Result};
use clap::Args;
use glam::{Quat, Vec3};
use nether_anim::{BoneAtom, RawAnimation, RawTrack, Skeleton, SkeletonBone};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use crate::clip::write_json;

/// Spacing between bones along Y
const BONE_LENGTH: f32 = 1.5;

/// Arguments for the gen-test command
#[derive(Args)]
pub struct GenTestArgs {
    /// Directory to write skeleton.json, clips/ and anim.toml into
    #[arg(default_value = "anim-test")]
    pub output: PathBuf,

    /// Number of bones in the chain
    #[arg(short, long, default_value_t = 3)]
    pub bones: usize,

    /// Frames per clip
    #[arg(short, long, default_value_t = 30)]
    pub frames: u32,
}

/// Execute the gen-test command
pub fn execute(args: GenTestArgs) -> Result<()> {
    let manifest = write_test_project(&args.output, args.bones, args.frames)?;
    println!("Generated test project: {}", manifest.display());
    println!("  Bones: {}", args.bones);
    println!("  Frames: {}", args.frames);
    Ok(())
}

/// Chain skeleton with every bone offset along Y from its parent
pub fn wave_skeleton(bones: usize) -> Skeleton {
    Skeleton::new(
        (0..bones)
            .map(|bone| SkeletonBone {
                name: format!("bone{}", bone),
                parent: bone.checked_sub(1),
                reference: BoneAtom::new(Vec3::new(0.0, BONE_LENGTH, 0.0), Quat::IDENTITY),
            })
            .collect(),
    )
}

/// One full wave cycle over `frames` frames at 30 fps.
///
/// `amplitude` is the swing in radians; the root also bobs along Y so the
/// translation channel carries keys.
pub fn wave_clip(name: &str, bones: usize, frames: u32, amplitude: f32) -> RawAnimation {
    let frames = frames.max(1);
    let last = (frames - 1).max(1) as f32;

    let tracks = (0..bones)
        .map(|bone| {
            let phase = bone as f32 * 0.5;
            let rotations = (0..frames)
                .map(|frame| {
                    let t = frame as f32 / last * TAU;
                    Quat::from_rotation_z((t + phase).sin() * amplitude)
                })
                .collect();
            let positions = if bone == 0 {
                (0..frames)
                    .map(|frame| {
                        let t = frame as f32 / last * TAU;
                        Vec3::new(0.0, BONE_LENGTH + t.cos() * 0.1, 0.0)
                    })
                    .collect()
            } else {
                vec![Vec3::new(0.0, BONE_LENGTH, 0.0)]
            };
            RawTrack {
                positions,
                rotations,
            }
        })
        .collect();

    RawAnimation {
        name: name.to_string(),
        num_frames: frames,
        sequence_length: (frames - 1) as f32 / 30.0,
        tracks,
        ..Default::default()
    }
}

/// Write the whole project and return the manifest path
pub fn write_test_project(dir: &Path, bones: usize, frames: u32) -> Result<PathBuf> {
    if bones == 0 {
        anyhow::bail!("Test skeleton needs at least one bone");
    }
    let clips_dir = dir.join("clips");
    std::fs::create_dir_all(&clips_dir)
        .with_context(|| format!("Failed to create directory: {}", clips_dir.display()))?;

    write_json(&dir.join("skeleton.json"), &wave_skeleton(bones))?;

    let clips = [("wave", 0.3), ("flail", 1.2)];
    let mut manifest = String::from("skeleton = \"skeleton.json\"\n\n[output]\ndir = \"build\"\n");
    for (name, amplitude) in clips {
        write_json(
            &clips_dir.join(format!("{}.json", name)),
            &wave_clip(name, bones, frames, amplitude),
        )?;
        manifest.push_str(&format!(
            "\n[[clips]]\nid = \"{}\"\npath = \"clips/{}.json\"\n",
            name, name
        ));
    }

    let manifest_path = dir.join("anim.toml");
    std::fs::write(&manifest_path, manifest)
        .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;
    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{load_clip, load_skeleton};
    use crate::manifest::AnimManifest;
    use tempfile::tempdir;

    #[test]
    fn test_wave_clip_shape() {
        let clip = wave_clip("wave", 3, 30, 0.3);
        assert!(clip.validate().is_ok());
        assert_eq!(clip.tracks.len(), 3);
        assert_eq!(clip.tracks[0].positions.len(), 30);
        assert_eq!(clip.tracks[1].positions.len(), 1);
        assert_eq!(clip.tracks[2].rotations.len(), 30);
        assert!((clip.sequence_length - 29.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_frame_clip() {
        let clip = wave_clip("still", 2, 1, 0.3);
        assert!(clip.validate().is_ok());
        assert_eq!(clip.sequence_length, 0.0);
    }

    #[test]
    fn test_write_test_project() {
        let dir = tempdir().unwrap();
        let manifest_path = write_test_project(dir.path(), 4, 20).unwrap();

        let manifest = AnimManifest::load(&manifest_path).unwrap();
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.clips.len(), 2);

        let skeleton = load_skeleton(&dir.path().join(&manifest.skeleton)).unwrap();
        assert_eq!(skeleton.num_bones(), 4);
        for entry in &manifest.clips {
            let clip = load_clip(&dir.path().join(&entry.path)).unwrap();
            assert_eq!(clip.name, entry.id);
            assert_eq!(clip.num_frames, 20);
        }
    }

    #[test]
    fn test_zero_bones_rejected() {
        let dir = tempdir().unwrap();
        assert!(write_test_project(dir.path(), 0, 10).is_err());
    }
}
