//! Container serialization for compressed sequences
//!
//! # Layout
//! ```text
//! Header (16 bytes):
//! 0x00: translation_format u8
//! 0x01: rotation_format u8
//! 0x02: key_encoding u8
//! 0x03: flags u8              - Reserved, must be 0
//! 0x04: num_frames u32 LE
//! 0x08: sequence_length f32 LE
//! 0x0C: num_tracks u32 LE
//!
//! Track table (num_tracks x 16 bytes):
//!   trans_offset i32, num_trans_keys i32, rot_offset i32, num_rot_keys i32
//!
//! Stream:
//!   stream_len u32 LE, then stream_len bytes
//! ```

use super::{CompressedSequence, SEGMENT_ALIGNMENT, TrackOffsets};
use crate::error::{AnimError, Result};
use crate::formats::{KeyEncoding, RotationFormat, TranslationFormat};

/// Fixed-size prefix of a serialized sequence
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct SequenceHeader {
    pub translation_format: u8,
    pub rotation_format: u8,
    pub key_encoding: u8,
    /// Reserved flags (must be 0)
    pub flags: u8,
    pub num_frames: u32,
    pub sequence_length: f32,
    pub num_tracks: u32,
}

impl SequenceHeader {
    pub const SIZE: usize = 16;

    pub fn for_sequence(sequence: &CompressedSequence) -> Self {
        Self {
            translation_format: sequence.translation_format as u8,
            rotation_format: sequence.rotation_format as u8,
            key_encoding: sequence.key_encoding as u8,
            flags: 0,
            num_frames: sequence.num_frames,
            sequence_length: sequence.sequence_length,
            num_tracks: sequence.track_offsets.len() as u32,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.translation_format;
        bytes[1] = self.rotation_format;
        bytes[2] = self.key_encoding;
        bytes[3] = self.flags;
        bytes[4..8].copy_from_slice(&self.num_frames.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.sequence_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.num_tracks.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Some(Self {
            translation_format: bytes[0],
            rotation_format: bytes[1],
            key_encoding: bytes[2],
            flags: bytes[3],
            num_frames: u32::from_le_bytes(word(4)),
            sequence_length: f32::from_le_bytes(word(8)),
            num_tracks: u32::from_le_bytes(word(12)),
        })
    }

    /// Total serialized size for this header's track count and `stream_len`
    pub fn file_size(&self, stream_len: usize) -> usize {
        Self::SIZE + self.num_tracks as usize * TrackOffsets::SIZE + 4 + stream_len
    }
}

impl CompressedSequence {
    /// Serialize header, track table and stream (little-endian).
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = SequenceHeader::for_sequence(self);
        let mut bytes = Vec::with_capacity(header.file_size(self.byte_stream.len()));
        bytes.extend_from_slice(&header.to_bytes());
        for value in self.flat_offsets() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&(self.byte_stream.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.byte_stream);
        bytes
    }

    /// Parse and validate a serialized sequence.
    ///
    /// After this succeeds every offset and key count is consistent with the
    /// stream, so sampling needs no further bounds checks.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = SequenceHeader::from_bytes(bytes).ok_or(AnimError::Truncated {
            needed: SequenceHeader::SIZE,
            available: bytes.len(),
        })?;
        if header.flags != 0 {
            return Err(AnimError::InvalidHeader(format!(
                "reserved flags set: {:#04x}",
                header.flags
            )));
        }
        let translation_format = TranslationFormat::try_from(header.translation_format)?;
        let rotation_format = RotationFormat::try_from(header.rotation_format)?;
        let key_encoding = KeyEncoding::try_from(header.key_encoding)?;

        let table_start = SequenceHeader::SIZE;
        let table_len = header.num_tracks as usize * TrackOffsets::SIZE;
        let stream_len_at = table_start + table_len;
        require(bytes, stream_len_at + 4)?;

        let read_i32 = |at: usize| {
            i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let track_offsets = (0..header.num_tracks as usize)
            .map(|track| {
                let at = table_start + track * TrackOffsets::SIZE;
                TrackOffsets {
                    translation_offset: read_i32(at),
                    num_translation_keys: read_i32(at + 4),
                    rotation_offset: read_i32(at + 8),
                    num_rotation_keys: read_i32(at + 12),
                }
            })
            .collect();

        let stream_len = read_i32(stream_len_at) as u32 as usize;
        let stream_start = stream_len_at + 4;
        require(bytes, stream_start + stream_len)?;

        let sequence = Self {
            translation_format,
            rotation_format,
            key_encoding,
            num_frames: header.num_frames,
            sequence_length: header.sequence_length,
            track_offsets,
            byte_stream: bytes[stream_start..stream_start + stream_len].to_vec(),
        };
        sequence.validate()?;
        Ok(sequence)
    }

    /// Check every track segment lies inside the stream on an aligned offset.
    pub fn validate(&self) -> Result<()> {
        let stream_len = self.byte_stream.len();
        for (track, offsets) in self.track_offsets.iter().enumerate() {
            let channels = [
                ("translation", offsets.translation_offset, offsets.num_translation_keys),
                ("rotation", offsets.rotation_offset, offsets.num_rotation_keys),
            ];
            for (channel, offset, num_keys) in channels {
                let invalid = |reason: String| AnimError::InvalidTrackTable { track, reason };
                if num_keys < 1 {
                    return Err(invalid(format!("{} has {} keys", channel, num_keys)));
                }
                if offset < 0 || offset as usize % SEGMENT_ALIGNMENT != 0 {
                    return Err(invalid(format!("{} offset {} is not aligned", channel, offset)));
                }
                let segment = if channel == "translation" {
                    self.translation_segment(num_keys as usize)
                } else {
                    self.rotation_segment(num_keys as usize)
                };
                let end = offset as usize + segment.total_size();
                if end > stream_len {
                    return Err(invalid(format!(
                        "{} segment ends at {} past the {}-byte stream",
                        channel, end, stream_len
                    )));
                }
            }
        }
        Ok(())
    }
}

fn require(bytes: &[u8], needed: usize) -> Result<()> {
    if bytes.len() < needed {
        return Err(AnimError::Truncated {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}
