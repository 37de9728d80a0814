//! Bitwise encoding of reduced tracks into a compressed sequence

use super::{CompressedSequence, PAD_SENTINEL, SEGMENT_ALIGNMENT, TrackOffsets};
use crate::error::{AnimError, Result};
use crate::formats::{
    KeyEncoding, RotationFormat, RotationRange, SequenceFormat, encode_rotation,
    encode_translation, frame_table_entry_size,
};
use crate::tracks::BoneTrack;

/// Two-byte table entries address frames 0..=65535
const MAX_TABLE_FRAMES: u32 = 0x1_0000;

/// Frame index stored in a frame table for a key at `time` seconds.
///
/// Keys produced from raw data sit at `i * length / (num_frames - 1)`, so key
/// `i` maps back onto frame `i`.
pub fn frame_index_for_time(time: f32, num_frames: u32, sequence_length: f32) -> u32 {
    if num_frames <= 1 || sequence_length <= 0.0 {
        return 0;
    }
    let last_frame = num_frames - 1;
    let frame = (time * last_frame as f32 / sequence_length).round();
    frame.clamp(0.0, last_frame as f32) as u32
}

/// Encode every track into one byte stream plus its offset table.
pub fn encode_tracks(
    tracks: &[BoneTrack],
    format: SequenceFormat,
    num_frames: u32,
    sequence_length: f32,
) -> Result<CompressedSequence> {
    if !format.rotation_format.can_encode() {
        return Err(AnimError::EncodeUnsupported(format.rotation_format));
    }

    let mut sequence = CompressedSequence {
        translation_format: format.translation_format,
        rotation_format: format.rotation_format,
        key_encoding: format.key_encoding,
        num_frames,
        sequence_length,
        track_offsets: Vec::with_capacity(tracks.len()),
        byte_stream: Vec::new(),
    };
    let with_table = format.key_encoding == KeyEncoding::VariableRate;
    if with_table && num_frames > MAX_TABLE_FRAMES {
        return Err(AnimError::InvalidSettings(format!(
            "{} frames exceed the {} a frame table can address",
            num_frames, MAX_TABLE_FRAMES
        )));
    }
    let mut stream = Vec::new();

    for (index, track) in tracks.iter().enumerate() {
        let translation = &track.translation;
        let rotation = &track.rotation;
        check_channel(
            index,
            "translation",
            translation.keys.len(),
            translation.times.len(),
            with_table,
        )?;
        check_channel(
            index,
            "rotation",
            rotation.keys.len(),
            rotation.times.len(),
            with_table,
        )?;

        // Translation segment
        let translation_offset = stream.len();
        for key in &translation.keys {
            encode_translation(format.translation_format, *key, &mut stream);
        }
        if with_table && translation.keys.len() > 1 {
            pad_stream(&mut stream);
            write_frame_table(&mut stream, &translation.times, num_frames, sequence_length);
        }
        pad_stream(&mut stream);

        // Rotation segment
        let rotation_offset = stream.len();
        if let [key] = rotation.keys.as_slice() {
            encode_rotation(
                RotationFormat::Float96NoW,
                *key,
                &RotationRange::default(),
                &mut stream,
            )?;
        } else {
            let range = RotationRange::from_keys(&rotation.keys);
            stream.extend_from_slice(&range.to_bytes());
            for key in &rotation.keys {
                encode_rotation(format.rotation_format, *key, &range, &mut stream)?;
            }
            if with_table {
                pad_stream(&mut stream);
                write_frame_table(&mut stream, &rotation.times, num_frames, sequence_length);
            }
        }
        pad_stream(&mut stream);

        sequence.track_offsets.push(TrackOffsets {
            translation_offset: to_i32(index, translation_offset)?,
            num_translation_keys: to_i32(index, translation.keys.len())?,
            rotation_offset: to_i32(index, rotation_offset)?,
            num_rotation_keys: to_i32(index, rotation.keys.len())?,
        });
    }

    tracing::debug!(
        "Encoded {} tracks as {:?}/{:?} ({:?}): {} bytes",
        tracks.len(),
        format.translation_format,
        format.rotation_format,
        format.key_encoding,
        stream.len()
    );
    sequence.byte_stream = stream;
    Ok(sequence)
}

fn check_channel(
    track: usize,
    channel: &str,
    num_keys: usize,
    num_times: usize,
    with_table: bool,
) -> Result<()> {
    if num_keys == 0 {
        return Err(AnimError::InvalidTrackTable {
            track,
            reason: format!("{} channel has no keys", channel),
        });
    }
    if with_table && num_keys > 1 && num_times != num_keys {
        return Err(AnimError::InvalidTrackTable {
            track,
            reason: format!("{} {} keys but {} times", num_keys, channel, num_times),
        });
    }
    Ok(())
}

fn to_i32(track: usize, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| AnimError::InvalidTrackTable {
        track,
        reason: format!("value {} does not fit the track table", value),
    })
}

/// Append sentinel bytes up to the next segment boundary
fn pad_stream(stream: &mut Vec<u8>) {
    while stream.len() % SEGMENT_ALIGNMENT != 0 {
        stream.push(PAD_SENTINEL);
    }
}

fn write_frame_table(stream: &mut Vec<u8>, times: &[f32], num_frames: u32, sequence_length: f32) {
    let entry_size = frame_table_entry_size(num_frames);
    for &time in times {
        let frame = frame_index_for_time(time, num_frames, sequence_length);
        if entry_size == 1 {
            stream.push(frame as u8);
        } else {
            stream.extend_from_slice(&(frame as u16).to_le_bytes());
        }
    }
}
