//! Sign-padded fixed-width integer
//!
//! Layout, most significant first: `P` padding bits, then `W` value bits, as
//! a two's-complement number `W + P` bits wide. A healthy value has its
//! padding uniformly 0 (non-negative) or uniformly 1 (negative). Arithmetic
//! runs over the whole pattern, so a carry out of the value bits lands in the
//! padding and shows up as a mixed pattern on decode.

use std::cmp::Ordering;

use num_bigint::BigUint;

use crate::error::{BatchCryptError, Result};

/// Default number of sign padding bits
pub const SIGN_PADDING_BITS: u32 = 2;

/// Maximum value bits (decoded values must fit an i64)
pub const MAX_VALUE_BITS: u32 = 63;

/// Maximum sign padding bits
pub const MAX_PADDING_BITS: u32 = 16;

/// A `W`-bit signed value with `P` redundant sign bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedFixedWidthInteger {
    /// The raw `W + P` bit pattern
    raw: u128,
    /// Value bits (W)
    value_bits: u32,
    /// Sign padding bits (P)
    padding_bits: u32,
}

fn mask(bits: u32) -> u128 {
    if bits >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

fn check_widths(value_bits: u32, padding_bits: u32) -> Result<()> {
    if value_bits == 0 || value_bits > MAX_VALUE_BITS {
        return Err(BatchCryptError::config(format!(
            "value width must be in 1..={MAX_VALUE_BITS} bits (got {value_bits})"
        )));
    }
    if !(2..=MAX_PADDING_BITS).contains(&padding_bits) {
        return Err(BatchCryptError::config(format!(
            "sign padding must be in 2..={MAX_PADDING_BITS} bits (got {padding_bits})"
        )));
    }
    Ok(())
}

impl SignedFixedWidthInteger {
    /// Largest magnitude representable with `value_bits` value bits
    pub fn max_magnitude(value_bits: u32) -> i64 {
        ((1u64 << value_bits) - 1) as i64
    }

    /// Encode `value` as a signed integer of `original_width` bits.
    ///
    /// One bit of the original width is the sign, which becomes the `P`
    /// padding bits, leaving `original_width - 1` value bits.
    pub fn from_signed(value: i64, original_width: u32, padding_bits: u32) -> Result<Self> {
        let value_bits = original_width.saturating_sub(1);
        check_widths(value_bits, padding_bits)?;

        if value.unsigned_abs() > Self::max_magnitude(value_bits) as u64 {
            return Err(BatchCryptError::MagnitudeOutOfRange { value, value_bits });
        }

        let total = value_bits + padding_bits;
        Ok(Self {
            raw: (value as i128 as u128) & mask(total),
            value_bits,
            padding_bits,
        })
    }

    /// Wrap a raw bit pattern (e.g. an unpacked slot) without validating it.
    ///
    /// Bits above `value_bits + padding_bits` are discarded.
    pub fn from_raw(raw: u128, value_bits: u32, padding_bits: u32) -> Result<Self> {
        check_widths(value_bits, padding_bits)?;
        Ok(Self {
            raw: raw & mask(value_bits + padding_bits),
            value_bits,
            padding_bits,
        })
    }

    pub fn raw(&self) -> u128 {
        self.raw
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from(self.raw)
    }

    pub fn value_bits(&self) -> u32 {
        self.value_bits
    }

    pub fn padding_bits(&self) -> u32 {
        self.padding_bits
    }

    /// Total width `W + P`
    pub fn total_bits(&self) -> u32 {
        self.value_bits + self.padding_bits
    }

    /// The top `P` bits
    pub fn padding(&self) -> u64 {
        ((self.raw >> self.value_bits) & mask(self.padding_bits)) as u64
    }

    fn value_field(&self) -> u128 {
        self.raw & mask(self.value_bits)
    }

    fn padding_all_ones(&self) -> u64 {
        mask(self.padding_bits) as u64
    }

    /// Whether the padding no longer encodes a valid sign
    pub fn is_overflowed(&self) -> bool {
        self.decode_value().is_err()
    }

    /// Decode the signed value.
    ///
    /// Fails if the padding is mixed, or if it is all ones over an all-zero
    /// value field (the pattern of `-2^W`, outside the representable range).
    pub fn decode_value(&self) -> Result<i64> {
        let padding = self.padding();
        let value = self.value_field();

        if padding == 0 {
            return Ok(value as i64);
        }
        if padding == self.padding_all_ones() && value != 0 {
            return Ok((value as i128 - (1i128 << self.value_bits)) as i64);
        }
        Err(BatchCryptError::Overflow { padding })
    }

    fn check_width(&self, other: &Self) -> Result<()> {
        if self.total_bits() != other.total_bits() {
            return Err(BatchCryptError::WidthMismatch {
                expected: self.total_bits(),
                got: other.total_bits(),
            });
        }
        Ok(())
    }

    fn with_raw(&self, raw: u128) -> Self {
        Self {
            raw: raw & mask(self.total_bits()),
            value_bits: self.value_bits,
            padding_bits: self.padding_bits,
        }
    }

    /// Add across the whole bit pattern. Overflow surfaces on decode.
    pub fn add(self, other: Self) -> Result<Self> {
        self.check_width(&other)?;
        Ok(self.with_raw(self.raw.wrapping_add(other.raw)))
    }

    /// Subtract across the whole bit pattern
    pub fn sub(self, other: Self) -> Result<Self> {
        self.check_width(&other)?;
        Ok(self.with_raw(self.raw.wrapping_sub(other.raw)))
    }

    /// Multiply across the whole bit pattern (modulo `2^(W+P)`)
    pub fn mul(self, other: Self) -> Result<Self> {
        self.check_width(&other)?;
        Ok(self.with_raw(self.raw.wrapping_mul(other.raw)))
    }

    /// Decode both operands and compare their values
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        Ok(self.decode_value()?.cmp(&other.decode_value()?))
    }

    /// Decode and compare against a plain integer
    pub fn eq_value(&self, value: i64) -> Result<bool> {
        Ok(self.decode_value()? == value)
    }
}

impl std::fmt::Display for SignedFixedWidthInteger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.decode_value() {
            Ok(v) => write!(f, "{v}"),
            Err(_) => write!(f, "<overflow {:#b}>", self.raw),
        }
    }
}
