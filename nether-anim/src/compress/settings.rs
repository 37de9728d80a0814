//! Compression settings, loadable from any serde format

use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::formats::{KeyEncoding, RotationFormat, SequenceFormat, TranslationFormat};
use crate::reduce::LinearKeySettings;

/// How keys are removed before bitwise encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReductionScheme {
    /// Re-quantize every raw frame
    BitwiseOnly,
    /// Collapse channels that never leave their first key
    RemoveTrivialKeys,
    /// Keep every second key of channels longer than `min_keys`
    RemoveEveryOtherKey {
        #[serde(default = "default_min_keys")]
        min_keys: usize,
        #[serde(default)]
        start_index: usize,
    },
    /// Drop keys reproducible by interpolation within the tolerances
    RemoveLinearKeys(LinearKeySettings),
}

fn default_min_keys() -> usize {
    10
}

impl Default for ReductionScheme {
    fn default() -> Self {
        ReductionScheme::RemoveLinearKeys(LinearKeySettings::default())
    }
}

impl ReductionScheme {
    pub fn name(&self) -> &'static str {
        match self {
            ReductionScheme::BitwiseOnly => "bitwise-only",
            ReductionScheme::RemoveTrivialKeys => "remove-trivial-keys",
            ReductionScheme::RemoveEveryOtherKey { .. } => "remove-every-other-key",
            ReductionScheme::RemoveLinearKeys(_) => "remove-linear-keys",
        }
    }

    /// Encoding used when none is forced.
    ///
    /// Schemes that keep every surviving key on an even grid can use constant
    /// rate; the others leave uneven gaps and need frame tables.
    pub fn natural_encoding(&self) -> KeyEncoding {
        match self {
            ReductionScheme::BitwiseOnly | ReductionScheme::RemoveTrivialKeys => {
                KeyEncoding::ConstantRate
            }
            ReductionScheme::RemoveEveryOtherKey { .. } | ReductionScheme::RemoveLinearKeys(_) => {
                KeyEncoding::VariableRate
            }
        }
    }

    /// Pick the key encoding, rejecting constant rate for uneven schemes.
    pub fn resolve_encoding(&self, requested: Option<KeyEncoding>) -> Result<KeyEncoding> {
        let natural = self.natural_encoding();
        match requested {
            Some(KeyEncoding::ConstantRate) if natural == KeyEncoding::VariableRate => {
                Err(AnimError::IncompatibleKeyEncoding {
                    scheme: self.name(),
                    encoding: KeyEncoding::ConstantRate,
                })
            }
            Some(encoding) => Ok(encoding),
            None => Ok(natural),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ReductionScheme::RemoveLinearKeys(settings) => settings.validate(),
            _ => Ok(()),
        }
    }
}

/// One reduction and format combination to compress with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionCandidate {
    #[serde(default)]
    pub scheme: ReductionScheme,
    #[serde(default = "default_rotation_format")]
    pub rotation_format: RotationFormat,
    /// Forced key encoding; the scheme's natural encoding when absent
    #[serde(default)]
    pub key_encoding: Option<KeyEncoding>,
}

impl CompressionCandidate {
    pub fn new(scheme: ReductionScheme, rotation_format: RotationFormat) -> Self {
        Self {
            scheme,
            rotation_format,
            key_encoding: None,
        }
    }

    /// Short label, e.g. `remove-linear-keys/Fixed48NoW`
    pub fn label(&self) -> String {
        format!("{}/{:?}", self.scheme.name(), self.rotation_format)
    }

    pub fn sequence_format(&self, translation_format: TranslationFormat) -> Result<SequenceFormat> {
        if !self.rotation_format.can_encode() {
            return Err(AnimError::EncodeUnsupported(self.rotation_format));
        }
        Ok(SequenceFormat {
            translation_format,
            rotation_format: self.rotation_format,
            key_encoding: self.scheme.resolve_encoding(self.key_encoding)?,
        })
    }
}

/// Search over alternative candidates after the primary compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Largest end effector error an alternative may have and still win
    #[serde(default = "default_master_tolerance")]
    pub master_tolerance: f32,
    #[serde(default = "default_candidates")]
    pub candidates: Vec<CompressionCandidate>,
}

fn default_master_tolerance() -> f32 {
    0.1
}

fn default_candidates() -> Vec<CompressionCandidate> {
    [RotationFormat::Float96NoW, RotationFormat::Fixed48NoW]
        .into_iter()
        .map(|format| CompressionCandidate::new(ReductionScheme::default(), format))
        .collect()
}

impl Default for AlternativeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            master_tolerance: 0.1,
            candidates: default_candidates(),
        }
    }
}

/// Everything `compress` needs besides the animation and skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    #[serde(default)]
    pub scheme: ReductionScheme,
    #[serde(default)]
    pub translation_format: TranslationFormat,
    #[serde(default = "default_rotation_format")]
    pub rotation_format: RotationFormat,
    #[serde(default)]
    pub key_encoding: Option<KeyEncoding>,
    #[serde(default)]
    pub alternatives: AlternativeSettings,
}

fn default_rotation_format() -> RotationFormat {
    RotationFormat::Fixed48NoW
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            scheme: ReductionScheme::default(),
            translation_format: TranslationFormat::default(),
            rotation_format: RotationFormat::Fixed48NoW,
            key_encoding: None,
            alternatives: AlternativeSettings::default(),
        }
    }
}

impl CompressionSettings {
    /// The primary configuration as a candidate
    pub fn primary(&self) -> CompressionCandidate {
        CompressionCandidate {
            scheme: self.scheme.clone(),
            rotation_format: self.rotation_format,
            key_encoding: self.key_encoding,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.scheme.validate()?;
        self.primary().sequence_format(self.translation_format)?;

        let tolerance = self.alternatives.master_tolerance;
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(AnimError::InvalidSettings(format!(
                "master_tolerance must be non-negative, got {}",
                tolerance
            )));
        }
        for candidate in &self.alternatives.candidates {
            candidate.scheme.validate()?;
        }
        Ok(())
    }
}
