//! Key bracketing: which two keys surround a playback position
//!
//! The rate codec is independent of the key format. A sequence picks one
//! `KeyEncoding` and both channels of every track are bracketed with it;
//! the format decoders in `formats` then turn the two indices into values.

mod constant;
mod variable;


pub use constant::{ConstantRate, constant_rate_span};
pub use variable::{VariableRate, find_low_key_index, variable_rate_span};

use crate::formats::KeyEncoding;
use crate::layout::FrameTable;

/// The two keys to blend and the blend weight of the second one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpan {
    pub index0: usize,
    pub index1: usize,
    pub alpha: f32,
}

impl KeySpan {
    /// First key, no blending
    pub const FIRST: Self = Self::single(0);

    pub const fn single(index: usize) -> Self {
        Self {
            index0: index,
            index1: index,
            alpha: 0.0,
        }
    }
}

/// Playback position shared by every track sampled at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePosition {
    /// `time / sequence_length`
    pub relative_pos: f32,
    pub looping: bool,
    pub num_frames: u32,
}

/// Locates the keys surrounding a playback position.
pub trait KeyCodec: Send + Sync {
    fn key_span(
        &self,
        position: &SamplePosition,
        num_keys: usize,
        frame_table: Option<FrameTable<'_>>,
    ) -> KeySpan;
}

/// Codec instance for a sequence's key encoding
pub fn codec_for(encoding: KeyEncoding) -> &'static dyn KeyCodec {
    match encoding {
        KeyEncoding::ConstantRate => &ConstantRate,
        KeyEncoding::VariableRate => &VariableRate,
    }
}
