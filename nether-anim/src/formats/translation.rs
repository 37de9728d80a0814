//! Translation key formats

use glam::Vec3;

use super::TranslationFormat;
use super::rotation::read_f32;

/// Append one encoded translation key to `out`.
pub fn encode_translation(format: TranslationFormat, translation: Vec3, out: &mut Vec<u8>) {
    match format {
        TranslationFormat::Uncompressed => {
            for value in translation.to_array() {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
}

/// Decode one translation key from the start of `bytes`.
pub fn decode_translation(format: TranslationFormat, bytes: &[u8]) -> Vec3 {
    match format {
        TranslationFormat::Uncompressed => {
            Vec3::new(read_f32(bytes, 0), read_f32(bytes, 4), read_f32(bytes, 8))
        }
    }
}
