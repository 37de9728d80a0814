//! Keys placed by an explicit frame table

use super::{KeyCodec, KeySpan, SamplePosition, constant_rate_span};
use crate::layout::FrameTable;

/// Keys at arbitrary frames, looked up through the track's frame table.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableRate;

impl KeyCodec for VariableRate {
    fn key_span(
        &self,
        position: &SamplePosition,
        num_keys: usize,
        frame_table: Option<FrameTable<'_>>,
    ) -> KeySpan {
        match frame_table {
            Some(frames) => variable_rate_span(
                &frames,
                num_keys,
                position.num_frames,
                position.relative_pos,
                position.looping,
            ),
            // Single-key tracks carry no table
            None => constant_rate_span(position.relative_pos, position.looping, num_keys),
        }
    }
}

/// Index of the last key at or before `search_frame`.
///
/// `estimate` only decides where the scan starts; any value gives the same
/// answer for a strictly increasing table.
pub fn find_low_key_index(
    frames: &FrameTable<'_>,
    num_keys: usize,
    search_frame: u32,
    estimate: usize,
) -> usize {
    if num_keys == 0 {
        return 0;
    }
    let last_key = num_keys - 1;
    let mut index = estimate.min(last_key);

    if frames.get(index) <= search_frame {
        while index < last_key && frames.get(index + 1) <= search_frame {
            index += 1;
        }
        index
    } else {
        while index > 0 {
            index -= 1;
            if frames.get(index) <= search_frame {
                return index;
            }
        }
        0
    }
}

/// Bracket `relative_pos` using a track's frame table.
///
/// A looping sequence has `num_frames` frame intervals and its last key blends
/// into key 0 at the loop end. A non-looping sequence ends on its last frame.
pub fn variable_rate_span(
    frames: &FrameTable<'_>,
    num_keys: usize,
    num_frames: u32,
    relative_pos: f32,
    looping: bool,
) -> KeySpan {
    if num_keys < 2 || relative_pos.is_nan() || relative_pos <= 0.0 {
        return KeySpan::FIRST;
    }

    let last_key = num_keys - 1;
    let total_frames = if looping {
        num_frames
    } else {
        num_frames.saturating_sub(1)
    };
    let ending_key = if looping { 0 } else { last_key };

    if relative_pos >= 1.0 {
        return KeySpan::single(ending_key);
    }

    let frame_pos = relative_pos * total_frames as f32;
    let search_frame = (frame_pos as u32).min(total_frames.saturating_sub(1));
    let estimate = ((relative_pos * last_key as f32).round() as usize).min(last_key);
    let index0 = find_low_key_index(frames, num_keys, search_frame, estimate);
    let frame0 = frames.get(index0) as f32;

    let (index1, frame1) = if index0 < last_key {
        (index0 + 1, frames.get(index0 + 1) as f32)
    } else if looping {
        (ending_key, total_frames as f32)
    } else {
        (last_key, frame0)
    };

    let delta = (frame1 - frame0).max(1.0);
    KeySpan {
        index0,
        index1,
        alpha: ((frame_pos - frame0) / delta).clamp(0.0, 1.0),
    }
}
