//! Evenly spaced keys

use super::{KeyCodec, KeySpan, SamplePosition};
use crate::layout::FrameTable;

/// Keys spread evenly over the sequence; no per-key time data is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantRate;

impl KeyCodec for ConstantRate {
    fn key_span(
        &self,
        position: &SamplePosition,
        num_keys: usize,
        _frame_table: Option<FrameTable<'_>>,
    ) -> KeySpan {
        constant_rate_span(position.relative_pos, position.looping, num_keys)
    }
}

/// Bracket `relative_pos` among `num_keys` evenly spaced keys.
///
/// Non-looping tracks place the last key at the end of the sequence and clamp
/// to it. Looping tracks spread `num_keys` over the full cycle and blend the
/// last key back into key 0.
pub fn constant_rate_span(relative_pos: f32, looping: bool, num_keys: usize) -> KeySpan {
    if num_keys < 2 || relative_pos.is_nan() || relative_pos <= 0.0 {
        return KeySpan::FIRST;
    }

    if looping {
        if relative_pos >= 1.0 {
            return KeySpan::FIRST;
        }
        let key_pos = relative_pos * num_keys as f32;
        let index0 = (key_pos.floor() as usize).min(num_keys - 1);
        KeySpan {
            index0,
            index1: (index0 + 1) % num_keys,
            alpha: (key_pos - index0 as f32).clamp(0.0, 1.0),
        }
    } else {
        let last_key = num_keys - 1;
        if relative_pos >= 1.0 {
            return KeySpan::single(last_key);
        }
        let key_pos = relative_pos * last_key as f32;
        let index0 = (key_pos.floor() as usize).min(last_key);
        KeySpan {
            index0,
            index1: (index0 + 1).min(last_key),
            alpha: (key_pos - index0 as f32).clamp(0.0, 1.0),
        }
    }
}
