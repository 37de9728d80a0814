//! Byte-order swapping of a compressed stream
//!
//! Each field is flipped using the `(stride, count)` pair declared by its
//! format, so the stream can move between little- and big-endian consumers
//! without re-deriving any offsets. Pad bytes are left as they are.

use super::{CompressedSequence, Segment};
use crate::formats::ROTATION_RANGE_HEADER_SIZE;

/// A run of `count` fields of `stride` bytes starting at `start`
#[derive(Debug, Clone, Copy)]
struct FieldRun {
    start: usize,
    stride: usize,
    count: usize,
}

/// Swap the byte order of every field in the sequence's stream, in place.
///
/// Applying it twice restores the original stream.
pub fn swap_byte_order(sequence: &mut CompressedSequence) {
    let runs = field_runs(sequence);
    for run in runs {
        for index in 0..run.count {
            let start = run.start + index * run.stride;
            sequence.byte_stream[start..start + run.stride].reverse();
        }
    }
}

fn field_runs(sequence: &CompressedSequence) -> Vec<FieldRun> {
    let mut runs = Vec::new();
    for offsets in &sequence.track_offsets {
        let num_keys = offsets.num_translation_keys as usize;
        let base = offsets.translation_offset as usize;
        let (stride, count) = sequence.translation_format.swap_layout();
        let segment = sequence.translation_segment(num_keys);
        runs.push(FieldRun {
            start: base,
            stride,
            count: count * num_keys,
        });
        push_table_run(&mut runs, base, &segment);

        let num_keys = offsets.num_rotation_keys as usize;
        let base = offsets.rotation_offset as usize;
        let (stride, count) = sequence.stored_rotation_format(num_keys).swap_layout();
        let segment = sequence.rotation_segment(num_keys);
        if segment.header_size > 0 {
            runs.push(FieldRun {
                start: base,
                stride: 4,
                count: ROTATION_RANGE_HEADER_SIZE / 4,
            });
        }
        runs.push(FieldRun {
            start: base + segment.key_offset(0),
            stride,
            count: count * num_keys,
        });
        push_table_run(&mut runs, base, &segment);
    }
    runs
}

fn push_table_run(runs: &mut Vec<FieldRun>, base: usize, segment: &Segment) {
    // One-byte entries have no byte order
    if segment.table_entry_size == 2 {
        runs.push(FieldRun {
            start: base + segment.table_offset(),
            stride: 2,
            count: segment.num_keys,
        });
    }
}
