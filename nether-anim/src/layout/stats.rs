//! Key statistics and pad diagnostics for compressed sequences

use std::ops::Range;

use super::{CompressedSequence, PAD_SENTINEL, Segment};

/// Summary of what a compressed sequence stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub num_tracks: usize,
    pub total_translation_keys: usize,
    pub total_rotation_keys: usize,
    /// Bytes per translation record
    pub translation_key_size: usize,
    /// Bytes per rotation record for tracks with more than one key
    pub rotation_key_size: usize,
    pub single_translation_key_tracks: usize,
    pub single_rotation_key_tracks: usize,
    pub stream_bytes: usize,
}

impl SequenceStats {
    pub fn from_sequence(sequence: &CompressedSequence) -> Self {
        let mut stats = Self {
            num_tracks: sequence.num_tracks(),
            translation_key_size: sequence.translation_format.record_size(),
            rotation_key_size: sequence.rotation_format.record_size(),
            stream_bytes: sequence.byte_stream.len(),
            ..Default::default()
        };
        for offsets in &sequence.track_offsets {
            let translation_keys = offsets.num_translation_keys as usize;
            let rotation_keys = offsets.num_rotation_keys as usize;
            stats.total_translation_keys += translation_keys;
            stats.total_rotation_keys += rotation_keys;
            if translation_keys == 1 {
                stats.single_translation_key_tracks += 1;
            }
            if rotation_keys == 1 {
                stats.single_rotation_key_tracks += 1;
            }
        }
        stats
    }

    pub fn total_keys(&self) -> usize {
        self.total_translation_keys + self.total_rotation_keys
    }
}

/// Stream positions of pad bytes that do not hold the 0x55 sentinel.
///
/// Diagnostic only: decoding never reads pad bytes.
pub fn find_pad_errors(sequence: &CompressedSequence) -> Vec<usize> {
    let mut errors = Vec::new();
    for offsets in &sequence.track_offsets {
        let segments = [
            (
                offsets.translation_offset as usize,
                sequence.translation_segment(offsets.num_translation_keys as usize),
            ),
            (
                offsets.rotation_offset as usize,
                sequence.rotation_segment(offsets.num_rotation_keys as usize),
            ),
        ];
        for (base, segment) in segments {
            for range in pad_ranges(&segment) {
                for position in range {
                    let at = base + position;
                    if sequence.byte_stream.get(at) != Some(&PAD_SENTINEL) {
                        errors.push(at);
                    }
                }
            }
        }
    }
    errors
}

/// Pad byte ranges inside a segment, relative to its start
fn pad_ranges(segment: &Segment) -> Vec<Range<usize>> {
    let keys_end = segment.key_offset(segment.num_keys);
    if segment.table_entry_size > 0 {
        let table_start = segment.table_offset();
        let table_end = table_start + segment.num_keys * segment.table_entry_size;
        vec![keys_end..table_start, table_end..segment.total_size()]
    } else {
        vec![keys_end..segment.total_size()]
    }
}
