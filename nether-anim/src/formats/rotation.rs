//! Rotation key quantization

use glam::{Quat, Vec3};

use super::{FloatPacker, ROTATION_RANGE_HEADER_SIZE, RotationFormat};
use crate::error::{AnimError, Result};
use crate::math::canonicalize;

// =============================================================================
// Fixed-point constants
// =============================================================================

/// 16-bit components map [-1, 1] onto [0, 65534]
const QUANT_16BIT_FACTOR: f32 = 32767.0;
const QUANT_16BIT_OFFSET: i32 = 32767;

/// 11-bit components map [-1, 1] onto [0, 2046]
const QUANT_11BIT_FACTOR: f32 = 1023.0;
const QUANT_11BIT_OFFSET: i32 = 1023;

/// 10-bit components map [-1, 1] onto [0, 1022]
const QUANT_10BIT_FACTOR: f32 = 511.0;
const QUANT_10BIT_OFFSET: i32 = 511;

/// Fixed48Max stores the three smaller components in [-sqrt(0.5), sqrt(0.5)]
const FIXED48_MAX_SCALE: f32 = std::f32::consts::SQRT_2;
const FIXED48_MAX_SHIFT: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Per-track bounds of the canonical X, Y and Z components.
///
/// Written as a 24-byte header (3 mins then 3 ranges, f32 LE) in front of every
/// rotation track with more than one key. Only IntervalFixed32NoW reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationRange {
    pub mins: Vec3,
    pub ranges: Vec3,
}

impl Default for RotationRange {
    fn default() -> Self {
        Self {
            mins: Vec3::splat(-1.0),
            ranges: Vec3::splat(2.0),
        }
    }
}

impl RotationRange {
    /// Bounds over the canonicalized keys. Zero-width ranges become 1.0.
    pub fn from_keys(keys: &[Quat]) -> Self {
        if keys.is_empty() {
            return Self::default();
        }
        let mut mins = Vec3::splat(1.0);
        let mut maxs = Vec3::splat(-1.0);
        for key in keys {
            let q = canonicalize(*key);
            let v = Vec3::new(q.x, q.y, q.z);
            mins = mins.min(v);
            maxs = maxs.max(v);
        }
        let ranges = (maxs - mins).to_array().map(|r| if r == 0.0 { 1.0 } else { r });
        Self {
            mins,
            ranges: Vec3::from_array(ranges),
        }
    }

    pub fn to_bytes(&self) -> [u8; ROTATION_RANGE_HEADER_SIZE] {
        let mut bytes = [0u8; ROTATION_RANGE_HEADER_SIZE];
        let values = [
            self.mins.x,
            self.mins.y,
            self.mins.z,
            self.ranges.x,
            self.ranges.y,
            self.ranges.z,
        ];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Caller guarantees at least 24 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let f = |i: usize| read_f32(bytes, i * 4);
        Self {
            mins: Vec3::new(f(0), f(1), f(2)),
            ranges: Vec3::new(f(3), f(4), f(5)),
        }
    }

    /// Map a component into [-1, 1] relative to this interval
    fn component_to_unit(&self, v: Vec3) -> Vec3 {
        (v - self.mins) / self.ranges * 2.0 - Vec3::ONE
    }

    fn unit_to_component(&self, v: Vec3) -> Vec3 {
        (v + Vec3::ONE) * 0.5 * self.ranges + self.mins
    }
}

// =============================================================================
// Encode / decode
// =============================================================================

/// Append one encoded key to `out`.
///
/// `range` is only consulted by IntervalFixed32NoW. Fixed48Max is decode-only.
pub fn encode_rotation(
    format: RotationFormat,
    rotation: Quat,
    range: &RotationRange,
    out: &mut Vec<u8>,
) -> Result<()> {
    let q = canonicalize(rotation);
    match format {
        RotationFormat::Uncompressed => {
            for value in [q.x, q.y, q.z, q.w] {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        RotationFormat::Float96NoW => {
            for value in [q.x, q.y, q.z] {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        RotationFormat::Fixed48NoW => {
            for value in [q.x, q.y, q.z] {
                let quantized = quantize(value, QUANT_16BIT_FACTOR, QUANT_16BIT_OFFSET, 0xffff);
                out.extend_from_slice(&(quantized as u16).to_le_bytes());
            }
        }
        RotationFormat::Fixed32NoW => {
            out.extend_from_slice(&pack_fixed32(Vec3::new(q.x, q.y, q.z)).to_le_bytes());
        }
        RotationFormat::IntervalFixed32NoW => {
            let unit = range.component_to_unit(Vec3::new(q.x, q.y, q.z));
            out.extend_from_slice(&pack_fixed32(unit).to_le_bytes());
        }
        RotationFormat::Float32NoW => {
            let packed = (FloatPacker::XY.encode(q.x) << 21)
                | (FloatPacker::XY.encode(q.y) << 10)
                | FloatPacker::Z.encode(q.z);
            out.extend_from_slice(&packed.to_le_bytes());
        }
        RotationFormat::Fixed48Max => return Err(AnimError::EncodeUnsupported(format)),
    }
    Ok(())
}

/// Decode one key from the start of `bytes`.
///
/// The caller guarantees `bytes` holds at least `format.record_size()` bytes.
pub fn decode_rotation(format: RotationFormat, bytes: &[u8], range: &RotationRange) -> Quat {
    match format {
        RotationFormat::Uncompressed => Quat::from_xyzw(
            read_f32(bytes, 0),
            read_f32(bytes, 4),
            read_f32(bytes, 8),
            read_f32(bytes, 12),
        )
        .normalize(),
        RotationFormat::Float96NoW => {
            rebuild_w(Vec3::new(read_f32(bytes, 0), read_f32(bytes, 4), read_f32(bytes, 8)))
        }
        RotationFormat::Fixed48NoW => {
            let component = |i: usize| {
                (read_u16(bytes, i * 2) as i32 - QUANT_16BIT_OFFSET) as f32 / QUANT_16BIT_FACTOR
            };
            rebuild_w(Vec3::new(component(0), component(1), component(2)))
        }
        RotationFormat::Fixed32NoW => rebuild_w(unpack_fixed32(read_u32(bytes, 0))),
        RotationFormat::IntervalFixed32NoW => {
            rebuild_w(range.unit_to_component(unpack_fixed32(read_u32(bytes, 0))))
        }
        RotationFormat::Float32NoW => {
            let packed = read_u32(bytes, 0);
            rebuild_w(Vec3::new(
                FloatPacker::XY.decode(packed >> 21),
                FloatPacker::XY.decode((packed >> 10) & 0x7ff),
                FloatPacker::Z.decode(packed & 0x3ff),
            ))
        }
        RotationFormat::Fixed48Max => decode_fixed48_max(bytes),
    }
}

fn quantize(value: f32, factor: f32, offset: i32, mask: u32) -> u32 {
    ((value * factor).round() as i32 + offset).clamp(0, mask as i32) as u32
}

fn pack_fixed32(v: Vec3) -> u32 {
    let x = quantize(v.x, QUANT_11BIT_FACTOR, QUANT_11BIT_OFFSET, 0x7ff);
    let y = quantize(v.y, QUANT_11BIT_FACTOR, QUANT_11BIT_OFFSET, 0x7ff);
    let z = quantize(v.z, QUANT_10BIT_FACTOR, QUANT_10BIT_OFFSET, 0x3ff);
    (x << 21) | (y << 10) | z
}

fn unpack_fixed32(packed: u32) -> Vec3 {
    let x = (packed >> 21) as i32;
    let y = ((packed >> 10) & 0x7ff) as i32;
    let z = (packed & 0x3ff) as i32;
    Vec3::new(
        (x - QUANT_11BIT_OFFSET) as f32 / QUANT_11BIT_FACTOR,
        (y - QUANT_11BIT_OFFSET) as f32 / QUANT_11BIT_FACTOR,
        (z - QUANT_10BIT_OFFSET) as f32 / QUANT_10BIT_FACTOR,
    )
}

/// Three little-endian u16 words:
/// word0/word1 hold the selector in bits 0-1 and the first value above it,
/// the second value straddles word1, the third sits in the top of word2.
fn decode_fixed48_max(bytes: &[u8]) -> Quat {
    let d0 = read_u16(bytes, 0) as u32;
    let d1 = read_u16(bytes, 2) as u32;
    let d2 = read_u16(bytes, 4) as u32;

    let low = (d1 << 16) | d0;
    let selector = low & 0x3;
    let l = (low >> 2) & 0x7fff;
    let high = (d2 << 16) | d1;
    let m = (high >> 1) & 0x7fff;
    let h = (high >> 16) & 0x7fff;

    let unpack = |raw: u32| (raw as f32 - 0.5) / 32767.0 * FIXED48_MAX_SCALE - FIXED48_MAX_SHIFT;
    let (l, m, h) = (unpack(l), unpack(m), unpack(h));
    let a = (1.0 - (l * l + m * m + h * h)).max(0.0).sqrt();

    let q = match selector {
        0 => Quat::from_xyzw(a, l, m, h),
        1 => Quat::from_xyzw(l, a, m, h),
        2 => Quat::from_xyzw(l, m, a, h),
        _ => Quat::from_xyzw(l, m, h, a),
    };
    q.normalize()
}

fn rebuild_w(xyz: Vec3) -> Quat {
    let w = (1.0 - xyz.length_squared()).max(0.0).sqrt();
    Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize()
}

pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
