//! anim.toml manifest parsing
//!
//! One manifest describes a skeleton, the clips compressed against it and the
//! compression settings shared by every clip.

use anyhow::{Context, Result};
use nether_anim::CompressionSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// anim.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct AnimManifest {
    /// Skeleton JSON, relative to the manifest
    pub skeleton: String,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub compression: CompressionSettings,
    #[serde(default)]
    pub clips: Vec<ClipEntry>,
}

/// Output configuration section
#[derive(Debug, Deserialize)]
pub struct OutputSection {
    /// Directory for compressed `.nanim` files
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    "build".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Single clip entry
#[derive(Debug, Deserialize)]
pub struct ClipEntry {
    pub id: String,
    /// Raw clip JSON, relative to the manifest
    pub path: String,
}

impl AnimManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse anim.toml")
    }

    /// Validate manifest fields
    pub fn validate(&self) -> Result<()> {
        if self.clips.is_empty() {
            anyhow::bail!("anim.toml lists no clips");
        }

        let mut ids: Vec<&str> = self.clips.iter().map(|clip| clip.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            anyhow::bail!("Duplicate clip id '{}' in anim.toml", pair[0]);
        }

        self.compression
            .validate()
            .context("Invalid [compression] section in anim.toml")?;
        Ok(())
    }

    /// Output directory, with an override taking priority
    pub fn output_dir(&self, project_dir: &Path, override_dir: Option<&Path>) -> PathBuf {
        match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => project_dir.join(&self.output.dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_anim::{ReductionScheme, RotationFormat};

    #[test]
    fn test_manifest_minimal() {
        let manifest = AnimManifest::parse(
            r#"
skeleton = "rig.json"

[[clips]]
id = "walk"
path = "clips/walk.json"
"#,
        )
        .unwrap();

        assert_eq!(manifest.skeleton, "rig.json");
        assert_eq!(manifest.output.dir, "build");
        assert_eq!(manifest.compression, CompressionSettings::default());
        assert_eq!(manifest.clips.len(), 1);
        assert_eq!(manifest.clips[0].id, "walk");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_manifest_with_compression() {
        let manifest = AnimManifest::parse(
            r#"
skeleton = "rig.json"

[output]
dir = "out/anims"

[compression]
rotation_format = "Float32NoW"

[compression.scheme]
kind = "remove_every_other_key"
min_keys = 4

[compression.alternatives]
enabled = true
master_tolerance = 0.05

[[clips]]
id = "walk"
path = "walk.json"

[[clips]]
id = "run"
path = "run.json"
"#,
        )
        .unwrap();

        assert_eq!(manifest.output.dir, "out/anims");
        assert_eq!(manifest.compression.rotation_format, RotationFormat::Float32NoW);
        assert_eq!(
            manifest.compression.scheme,
            ReductionScheme::RemoveEveryOtherKey {
                min_keys: 4,
                start_index: 0
            }
        );
        assert!(manifest.compression.alternatives.enabled);
        assert_eq!(manifest.compression.alternatives.master_tolerance, 0.05);
        assert_eq!(manifest.clips[1].id, "run");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_manifest_validation() {
        let empty = AnimManifest::parse(r#"skeleton = "rig.json""#).unwrap();
        assert!(empty.validate().is_err());

        let duplicate = AnimManifest::parse(
            r#"
skeleton = "rig.json"

[[clips]]
id = "walk"
path = "a.json"

[[clips]]
id = "walk"
path = "b.json"
"#,
        )
        .unwrap();
        let err = duplicate.validate().unwrap_err();
        assert!(err.to_string().contains("walk"), "unexpected error: {}", err);

        let decode_only = AnimManifest::parse(
            r#"
skeleton = "rig.json"

[compression]
rotation_format = "Fixed48Max"

[[clips]]
id = "walk"
path = "walk.json"
"#,
        )
        .unwrap();
        assert!(decode_only.validate().is_err());
    }

    #[test]
    fn test_manifest_missing_skeleton() {
        assert!(AnimManifest::parse("[[clips]]\nid = \"a\"\npath = \"a.json\"\n").is_err());
    }

    #[test]
    fn test_output_dir_override() {
        let manifest = AnimManifest::parse(r#"skeleton = "rig.json""#).unwrap();
        let project = Path::new("project");
        assert_eq!(manifest.output_dir(project, None), project.join("build"));
        assert_eq!(
            manifest.output_dir(project, Some(Path::new("elsewhere"))),
            PathBuf::from("elsewhere")
        );
    }
}
