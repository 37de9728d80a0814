//! Tiny sign + exponent + mantissa floats for the Float32NoW rotation format
//!
//! ```text
//! [sign:1][exponent:E][mantissa:M]
//! exponent bias = 2^E - 1   (largest exponent code maps to 2^0)
//! exponent code 0 = subnormal: mantissa / 2^M * 2^(1 - bias)
//! ```
//!
//! Quaternion components never exceed 1.0 in magnitude, so the range tops out
//! just below 2.0 and every spare code goes to precision near zero.

/// Packs `f32` values into `1 + exponent_bits + mantissa_bits` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatPacker {
    exponent_bits: u32,
    mantissa_bits: u32,
}

impl FloatPacker {
    /// X and Y of a Float32NoW key (11 bits)
    pub const XY: Self = Self::new(3, 7);
    /// Z of a Float32NoW key (10 bits)
    pub const Z: Self = Self::new(3, 6);

    pub const fn new(exponent_bits: u32, mantissa_bits: u32) -> Self {
        Self {
            exponent_bits,
            mantissa_bits,
        }
    }

    /// Total packed width including the sign bit
    pub const fn bits(&self) -> u32 {
        1 + self.exponent_bits + self.mantissa_bits
    }

    const fn bias(&self) -> i32 {
        (1 << self.exponent_bits) - 1
    }

    const fn magnitude_mask(&self) -> u32 {
        (1 << (self.exponent_bits + self.mantissa_bits)) - 1
    }

    fn min_normal(&self) -> f32 {
        2.0f32.powi(1 - self.bias())
    }

    /// Largest representable magnitude
    pub fn max_value(&self) -> f32 {
        let max_code = (1i32 << self.exponent_bits) - 1;
        let mantissa_scale = (1u32 << self.mantissa_bits) as f32;
        (2.0 - 1.0 / mantissa_scale) * 2.0f32.powi(max_code - self.bias())
    }

    /// Pack `value`, rounding to nearest and saturating at `max_value`.
    pub fn encode(&self, value: f32) -> u32 {
        let magnitude = value.abs();
        if magnitude.is_nan() || magnitude == 0.0 {
            return 0;
        }

        let magnitude_bits = if magnitude >= self.max_value() {
            self.magnitude_mask()
        } else if magnitude < self.min_normal() {
            // Rounding up to 2^M carries into exponent code 1, which is exactly min_normal
            let scaled = magnitude / self.min_normal() * (1u32 << self.mantissa_bits) as f32;
            scaled.round() as u32
        } else {
            let bits = magnitude.to_bits();
            let exponent = ((bits >> 23) & 0xff) as i32 - 127;
            let fraction = bits & 0x007f_ffff;
            let shift = 23 - self.mantissa_bits;
            // A mantissa that rounds up to 2^M carries into the exponent field
            let mantissa = (fraction + (1 << (shift - 1))) >> shift;
            let code = (exponent + self.bias()) as u32;
            ((code << self.mantissa_bits) + mantissa).min(self.magnitude_mask())
        };

        if magnitude_bits == 0 {
            return 0;
        }
        let sign = u32::from(value < 0.0);
        (sign << (self.exponent_bits + self.mantissa_bits)) | magnitude_bits
    }

    /// Unpack the low `bits()` bits of `packed`.
    pub fn decode(&self, packed: u32) -> f32 {
        let magnitude_bits = packed & self.magnitude_mask();
        let negative = (packed >> (self.exponent_bits + self.mantissa_bits)) & 1 == 1;
        let code = magnitude_bits >> self.mantissa_bits;
        let mantissa_scale = (1u32 << self.mantissa_bits) as f32;
        let mantissa = (magnitude_bits & ((1 << self.mantissa_bits) - 1)) as f32 / mantissa_scale;

        let magnitude = if code == 0 {
            mantissa * self.min_normal()
        } else {
            (1.0 + mantissa) * 2.0f32.powi(code as i32 - self.bias())
        };
        if negative { -magnitude } else { magnitude }
    }
}
