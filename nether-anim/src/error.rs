//! Error type shared by every fallible operation in the crate

use crate::formats::{KeyEncoding, RotationFormat};

/// Errors raised while building, compressing or loading animation data.
///
/// Format errors are never recovered from: a wrong format byte changes the
/// record width of every following track, so the whole sequence is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnimError {
    #[error("unknown rotation format: {0}")]
    UnknownRotationFormat(u8),

    #[error("unknown translation format: {0}")]
    UnknownTranslationFormat(u8),

    #[error("unknown key encoding: {0}")]
    UnknownKeyEncoding(u8),

    #[error("rotation format {0:?} can only be decoded")]
    EncodeUnsupported(RotationFormat),

    #[error("data truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid sequence header: {0}")]
    InvalidHeader(String),

    #[error("track {track}: {reason}")]
    InvalidTrackTable { track: usize, reason: String },

    #[error("raw track {track}: {reason}")]
    InvalidRawTrack { track: usize, reason: String },

    #[error("bone {bone}: {reason}")]
    InvalidSkeleton { bone: usize, reason: String },

    #[error("bone {bone} maps to track {track}, but the animation has {num_tracks} tracks")]
    TrackMapping {
        bone: usize,
        track: usize,
        num_tracks: usize,
    },

    #[error("additive reference pose has {got} entries, expected {expected}")]
    AdditivePoseMismatch { expected: usize, got: usize },

    #[error("{scheme} produces unevenly spaced keys and cannot use {encoding:?}")]
    IncompatibleKeyEncoding {
        scheme: &'static str,
        encoding: KeyEncoding,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AnimError>;
