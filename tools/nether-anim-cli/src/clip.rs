//! File IO for skeletons, raw clips, settings and compressed sequences
//!
//! Skeletons and raw clips are JSON; compression settings are TOML; compressed
//! sequences use the binary container from `nether_anim::layout`.

use anyhow::{Context, Result};
use nether_anim::{CompressedSequence, CompressionSettings, RawAnimation, Skeleton};
use serde::Serialize;
use std::path::Path;

/// Extension of compressed sequence files
pub const SEQUENCE_EXT: &str = "nanim";

/// Load a skeleton JSON file and check its parent order
pub fn load_skeleton(path: &Path) -> Result<Skeleton> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read skeleton: {}", path.display()))?;
    let skeleton: Skeleton = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse skeleton: {}", path.display()))?;
    skeleton
        .hierarchy()
        .with_context(|| format!("Invalid skeleton: {}", path.display()))?;
    Ok(skeleton)
}

/// Load a raw clip JSON file.
///
/// A clip without a name is named after its file stem.
pub fn load_clip(path: &Path) -> Result<RawAnimation> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clip: {}", path.display()))?;
    let mut animation: RawAnimation = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse clip: {}", path.display()))?;
    if animation.name.is_empty()
        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
    {
        animation.name = stem.to_string();
    }
    animation
        .validate()
        .with_context(|| format!("Invalid clip: {}", path.display()))?;
    Ok(animation)
}

/// Load compression settings from a TOML file
pub fn load_settings(path: &Path) -> Result<CompressionSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse settings: {}", path.display()))
}

/// Pretty-print any serializable value to a JSON file
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Write a compressed sequence container
pub fn write_sequence(path: &Path, sequence: &CompressedSequence) -> Result<()> {
    std::fs::write(path, sequence.to_bytes())
        .with_context(|| format!("Failed to write sequence: {}", path.display()))
}

/// Read and validate a compressed sequence container
pub fn read_sequence(path: &Path) -> Result<CompressedSequence> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read sequence: {}", path.display()))?;
    CompressedSequence::from_bytes(&bytes)
        .with_context(|| format!("Invalid sequence file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use nether_anim::{BoneAtom, RawTrack, SkeletonBone};
    use tempfile::tempdir;

    #[test]
    fn test_clip_named_after_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jump.json");
        let animation = RawAnimation {
            num_frames: 2,
            sequence_length: 0.5,
            tracks: vec![RawTrack {
                positions: vec![Vec3::ZERO, Vec3::Y],
                rotations: vec![Quat::IDENTITY],
            }],
            ..Default::default()
        };
        write_json(&path, &animation).unwrap();

        let loaded = load_clip(&path).unwrap();
        assert_eq!(loaded.name, "jump");
        assert_eq!(loaded.tracks, animation.tracks);
    }

    #[test]
    fn test_invalid_clip_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let animation = RawAnimation {
            name: "bad".into(),
            num_frames: 4,
            sequence_length: 1.0,
            tracks: vec![RawTrack {
                positions: vec![Vec3::ZERO, Vec3::Y],
                rotations: vec![Quat::IDENTITY],
            }],
            ..Default::default()
        };
        write_json(&path, &animation).unwrap();

        let err = load_clip(&path).unwrap_err();
        assert!(
            format!("{:#}", err).contains("Invalid clip"),
            "unexpected error: {:#}",
            err
        );
    }

    #[test]
    fn test_skeleton_parent_order_checked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rig.json");
        let skeleton = Skeleton::new(vec![
            SkeletonBone {
                name: "child".into(),
                parent: Some(1),
                reference: BoneAtom::IDENTITY,
            },
            SkeletonBone {
                name: "root".into(),
                parent: None,
                reference: BoneAtom::IDENTITY,
            },
        ]);
        write_json(&path, &skeleton).unwrap();
        assert!(load_skeleton(&path).is_err());
    }

    #[test]
    fn test_missing_files_report_path() {
        let err = load_skeleton(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"), "{}", err);
        assert!(read_sequence(Path::new("missing.nanim")).is_err());
    }

    #[test]
    fn test_truncated_sequence_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.nanim");
        std::fs::write(&path, [0u8; 7]).unwrap();
        assert!(read_sequence(&path).is_err());
    }
}
