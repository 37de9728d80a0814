//! Compressed sequence layout: track offset table plus one shared byte stream
//!
//! # Layout
//! ```text
//! Per track, in track order, every segment starting 4-byte aligned:
//!
//! Translation segment
//!   N x translation record
//!   [frame table: N x u8 (num_frames <= 255) or u16 LE]   variable rate and N > 1
//!   pad to 4 bytes (0x55)
//!
//! Rotation segment, N > 1
//!   mins[3] f32, ranges[3] f32                            24 bytes
//!   N x rotation record
//!   [pad to 4, frame table]                               variable rate
//!   pad to 4 bytes (0x55)
//!
//! Rotation segment, N == 1
//!   x, y, z as f32 (Float96NoW regardless of the sequence format)
//! ```
//!
//! Offsets in the track table are relative to the start of the stream.

mod encode;
mod header;
mod stats;
mod swap;


pub use encode::{encode_tracks, frame_index_for_time};
pub use header::SequenceHeader;
pub use stats::{SequenceStats, find_pad_errors};
pub use swap::swap_byte_order;

use bytemuck::{Pod, Zeroable};

use crate::formats::{
    KeyEncoding, ROTATION_RANGE_HEADER_SIZE, RotationFormat, RotationRange, TranslationFormat,
    decode_rotation, decode_translation, frame_table_entry_size,
};
use glam::{Quat, Vec3};

/// Fill value for alignment padding, checked only by diagnostics
pub const PAD_SENTINEL: u8 = 0x55;

/// Every track segment starts on this boundary
pub const SEGMENT_ALIGNMENT: usize = 4;

/// Where one track's keys live in the byte stream (16 bytes)
///
/// `#[repr(C)]` and `Pod` so the whole table can be viewed as the flat
/// `[i32; 4 * num_tracks]` array of the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TrackOffsets {
    pub translation_offset: i32,
    pub num_translation_keys: i32,
    pub rotation_offset: i32,
    pub num_rotation_keys: i32,
}

impl TrackOffsets {
    pub const SIZE: usize = 16;
}

/// One animation sequence after bitwise compression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedSequence {
    pub translation_format: TranslationFormat,
    pub rotation_format: RotationFormat,
    pub key_encoding: KeyEncoding,
    pub num_frames: u32,
    /// Seconds
    pub sequence_length: f32,
    pub track_offsets: Vec<TrackOffsets>,
    pub byte_stream: Vec<u8>,
}

impl CompressedSequence {
    pub fn num_tracks(&self) -> usize {
        self.track_offsets.len()
    }

    /// Track table as `{trans_offset, num_trans_keys, rot_offset, num_rot_keys}` quadruples
    pub fn flat_offsets(&self) -> &[i32] {
        bytemuck::cast_slice(&self.track_offsets)
    }

    /// Stream plus offset table, the part of the sequence that scales with content
    pub fn compressed_size(&self) -> usize {
        self.byte_stream.len() + self.track_offsets.len() * TrackOffsets::SIZE
    }

    /// Normalized playback position for `time`
    pub fn relative_position(&self, time: f32) -> f32 {
        if self.sequence_length > 0.0 {
            time / self.sequence_length
        } else {
            0.0
        }
    }

    pub(crate) fn translation_segment(&self, num_keys: usize) -> Segment {
        Segment {
            header_size: 0,
            record_size: self.translation_format.record_size(),
            num_keys,
            table_entry_size: self.table_entry_size(num_keys),
        }
    }

    pub(crate) fn rotation_segment(&self, num_keys: usize) -> Segment {
        if num_keys == 1 {
            return Segment {
                header_size: 0,
                record_size: RotationFormat::Float96NoW.record_size(),
                num_keys,
                table_entry_size: 0,
            };
        }
        Segment {
            header_size: ROTATION_RANGE_HEADER_SIZE,
            record_size: self.rotation_format.record_size(),
            num_keys,
            table_entry_size: self.table_entry_size(num_keys),
        }
    }

    /// Rotation format actually stored for a track with `num_keys` keys
    pub fn stored_rotation_format(&self, num_keys: usize) -> RotationFormat {
        if num_keys == 1 {
            RotationFormat::Float96NoW
        } else {
            self.rotation_format
        }
    }

    fn table_entry_size(&self, num_keys: usize) -> usize {
        if self.key_encoding == KeyEncoding::VariableRate && num_keys > 1 {
            frame_table_entry_size(self.num_frames)
        } else {
            0
        }
    }

    /// View of one track's translation keys.
    ///
    /// # Panics
    /// If `track` is out of range. Offsets are trusted once the sequence has been
    /// built by the encoder or validated by `from_bytes`.
    pub fn translation_track(&self, track: usize) -> TranslationTrackView<'_> {
        let offsets = &self.track_offsets[track];
        let num_keys = offsets.num_translation_keys as usize;
        TranslationTrackView {
            format: self.translation_format,
            data: &self.byte_stream[offsets.translation_offset as usize..],
            segment: self.translation_segment(num_keys),
        }
    }

    /// View of one track's rotation keys. Same trust rules as `translation_track`.
    pub fn rotation_track(&self, track: usize) -> RotationTrackView<'_> {
        let offsets = &self.track_offsets[track];
        let num_keys = offsets.num_rotation_keys as usize;
        let data = &self.byte_stream[offsets.rotation_offset as usize..];
        let segment = self.rotation_segment(num_keys);
        let range = if segment.header_size > 0 {
            RotationRange::from_bytes(data)
        } else {
            RotationRange::default()
        };
        RotationTrackView {
            format: self.stored_rotation_format(num_keys),
            data,
            segment,
            range,
        }
    }
}

/// Size bookkeeping for one track segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub header_size: usize,
    pub record_size: usize,
    pub num_keys: usize,
    /// 0 when the segment has no frame table
    pub table_entry_size: usize,
}

impl Segment {
    pub fn key_offset(&self, index: usize) -> usize {
        self.header_size + index * self.record_size
    }

    pub fn table_offset(&self) -> usize {
        align(self.key_offset(self.num_keys))
    }

    /// Total aligned length including padding
    pub fn total_size(&self) -> usize {
        if self.table_entry_size > 0 {
            align(self.table_offset() + self.num_keys * self.table_entry_size)
        } else {
            align(self.key_offset(self.num_keys))
        }
    }
}

/// Round `offset` up to the segment alignment
pub(crate) const fn align(offset: usize) -> usize {
    (offset + SEGMENT_ALIGNMENT - 1) & !(SEGMENT_ALIGNMENT - 1)
}

/// Frame-index table stored after a variable-rate track's keys
#[derive(Debug, Clone, Copy)]
pub enum FrameTable<'a> {
    Byte(&'a [u8]),
    Word(&'a [u8]),
}

impl FrameTable<'_> {
    pub fn get(&self, index: usize) -> u32 {
        match self {
            FrameTable::Byte(bytes) => bytes[index] as u32,
            FrameTable::Word(bytes) => {
                u16::from_le_bytes([bytes[index * 2], bytes[index * 2 + 1]]) as u32
            }
        }
    }
}

/// Borrowed view of one translation segment
#[derive(Debug, Clone, Copy)]
pub struct TranslationTrackView<'a> {
    format: TranslationFormat,
    data: &'a [u8],
    segment: Segment,
}

impl<'a> TranslationTrackView<'a> {
    pub fn num_keys(&self) -> usize {
        self.segment.num_keys
    }

    pub fn key(&self, index: usize) -> Vec3 {
        decode_translation(self.format, &self.data[self.segment.key_offset(index)..])
    }

    pub fn frame_table(&self) -> Option<FrameTable<'a>> {
        frame_table(self.data, &self.segment)
    }
}

/// Borrowed view of one rotation segment
#[derive(Debug, Clone, Copy)]
pub struct RotationTrackView<'a> {
    format: RotationFormat,
    data: &'a [u8],
    segment: Segment,
    range: RotationRange,
}

impl<'a> RotationTrackView<'a> {
    pub fn num_keys(&self) -> usize {
        self.segment.num_keys
    }

    pub fn format(&self) -> RotationFormat {
        self.format
    }

    pub fn range(&self) -> &RotationRange {
        &self.range
    }

    pub fn key(&self, index: usize) -> Quat {
        decode_rotation(
            self.format,
            &self.data[self.segment.key_offset(index)..],
            &self.range,
        )
    }

    pub fn frame_table(&self) -> Option<FrameTable<'a>> {
        frame_table(self.data, &self.segment)
    }
}

fn frame_table<'a>(data: &'a [u8], segment: &Segment) -> Option<FrameTable<'a>> {
    let start = segment.table_offset();
    match segment.table_entry_size {
        1 => Some(FrameTable::Byte(&data[start..start + segment.num_keys])),
        2 => Some(FrameTable::Word(&data[start..start + segment.num_keys * 2])),
        _ => None,
    }
}
