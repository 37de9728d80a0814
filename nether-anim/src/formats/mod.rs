//! Key formats: how a single translation or rotation key is stored
//!
//! Every rotation format except `Uncompressed` and `Fixed48Max` drops W and
//! rebuilds it from the unit-length constraint. Keys are canonicalized to
//! `w >= 0` before encoding so `q` and `-q` produce identical bytes.
//!
//! # Record sizes
//! ```text
//! Rotation
//!   Uncompressed        16 bytes  x, y, z, w as f32
//!   Float96NoW          12 bytes  x, y, z as f32
//!   Fixed48NoW           6 bytes  x, y, z as u16 (value * 32767 + 32767)
//!   IntervalFixed32NoW   4 bytes  [X:11][Y:11][Z:10] scaled into the track's min/range
//!   Fixed32NoW           4 bytes  [X:11][Y:11][Z:10] over [-1, 1]
//!   Float32NoW           4 bytes  [X:11][Y:11][Z:10] as tiny floats (1+3+7, 1+3+6)
//!   Fixed48Max           6 bytes  2-bit largest-component selector + 3 x 15 bits (decode only)
//!
//! Translation
//!   Uncompressed        12 bytes  x, y, z as f32
//! ```
//!
//! All multi-byte fields are little-endian. `swap_layout` gives the
//! `(stride, count)` pair used to flip each record's byte order in place.

mod float_packer;
mod rotation;
mod translation;


pub use float_packer::FloatPacker;
pub use rotation::{RotationRange, decode_rotation, encode_rotation};
pub use translation::{decode_translation, encode_translation};

use serde::{Deserialize, Serialize};

use crate::error::AnimError;

/// Size of the per-track min/range header written before rotation keys (6 x f32)
pub const ROTATION_RANGE_HEADER_SIZE: usize = 24;

/// Format used for a track's rotation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RotationFormat {
    Uncompressed = 0,
    Float96NoW = 1,
    Fixed48NoW = 2,
    IntervalFixed32NoW = 3,
    Fixed32NoW = 4,
    Float32NoW = 5,
    Fixed48Max = 6,
}

impl RotationFormat {
    pub const ALL: [RotationFormat; 7] = [
        RotationFormat::Uncompressed,
        RotationFormat::Float96NoW,
        RotationFormat::Fixed48NoW,
        RotationFormat::IntervalFixed32NoW,
        RotationFormat::Fixed32NoW,
        RotationFormat::Float32NoW,
        RotationFormat::Fixed48Max,
    ];

    /// Bytes per key record
    pub const fn record_size(self) -> usize {
        match self {
            RotationFormat::Uncompressed => 16,
            RotationFormat::Float96NoW => 12,
            RotationFormat::Fixed48NoW | RotationFormat::Fixed48Max => 6,
            RotationFormat::IntervalFixed32NoW
            | RotationFormat::Fixed32NoW
            | RotationFormat::Float32NoW => 4,
        }
    }

    /// `(stride, count)` of the fixed-width fields inside one record
    pub const fn swap_layout(self) -> (usize, usize) {
        match self {
            RotationFormat::Uncompressed => (4, 4),
            RotationFormat::Float96NoW => (4, 3),
            RotationFormat::Fixed48NoW | RotationFormat::Fixed48Max => (2, 3),
            RotationFormat::IntervalFixed32NoW
            | RotationFormat::Fixed32NoW
            | RotationFormat::Float32NoW => (4, 1),
        }
    }

    /// Whether the encoder can produce this format
    pub const fn can_encode(self) -> bool {
        !matches!(self, RotationFormat::Fixed48Max)
    }
}

impl TryFrom<u8> for RotationFormat {
    type Error = AnimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RotationFormat::ALL
            .into_iter()
            .find(|format| *format as u8 == value)
            .ok_or(AnimError::UnknownRotationFormat(value))
    }
}

/// Format used for a track's translation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TranslationFormat {
    #[default]
    Uncompressed = 0,
}

impl TranslationFormat {
    pub const fn record_size(self) -> usize {
        match self {
            TranslationFormat::Uncompressed => 12,
        }
    }

    pub const fn swap_layout(self) -> (usize, usize) {
        match self {
            TranslationFormat::Uncompressed => (4, 3),
        }
    }
}

impl TryFrom<u8> for TranslationFormat {
    type Error = AnimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TranslationFormat::Uncompressed),
            other => Err(AnimError::UnknownTranslationFormat(other)),
        }
    }
}

/// How key times are recovered when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyEncoding {
    /// Keys are evenly spaced over the sequence
    ConstantRate = 0,
    /// Each track carries a frame index per key
    VariableRate = 1,
}

impl TryFrom<u8> for KeyEncoding {
    type Error = AnimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyEncoding::ConstantRate),
            1 => Ok(KeyEncoding::VariableRate),
            other => Err(AnimError::UnknownKeyEncoding(other)),
        }
    }
}

/// The three per-sequence format choices, fixed at compression time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFormat {
    pub translation_format: TranslationFormat,
    pub rotation_format: RotationFormat,
    pub key_encoding: KeyEncoding,
}

impl SequenceFormat {
    pub const fn new(rotation_format: RotationFormat, key_encoding: KeyEncoding) -> Self {
        Self {
            translation_format: TranslationFormat::Uncompressed,
            rotation_format,
            key_encoding,
        }
    }
}

/// Width of one frame-table entry for a sequence of `num_frames` frames
pub const fn frame_table_entry_size(num_frames: u32) -> usize {
    if num_frames > 0xff { 2 } else { 1 }
}
