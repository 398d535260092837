//! Bit packing of equal-width slots into one big integer
//!
//! Slots are concatenated most-significant-slot-first: slot 0 occupies the
//! highest `slot_width` bits of a batch, slot `n - 1` the lowest.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{BatchCryptError, Result};
use crate::quantizer::Signedness;

/// Shape of a packed batch, compared structurally before any cross-batch
/// arithmetic. No part of it is embedded in the packed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchLayout {
    /// Bits per slot, carry bits included
    pub slot_width: u32,
    /// Number of slots
    pub slot_count: usize,
    /// Slot encoding
    pub signedness: Signedness,
    /// Redundant sign bits per slot, 0 for unsigned slots
    pub sign_padding_bits: u32,
    /// Zero bits reserved at the top of every slot to absorb carries
    pub carry_bits: u32,
}

impl BatchLayout {
    /// Bits used by the slots themselves
    pub fn total_bits(&self) -> u64 {
        self.slot_width as u64 * self.slot_count as u64
    }

    /// Number of freshly bound batches that can be summed and still decode
    /// correctly or fail loudly.
    ///
    /// Carry bits allow `2^C` terms before a carry leaves its slot. Signed
    /// slots are further limited by the sign padding: `k` terms of magnitude
    /// below `2^W` sum to below `k * 2^W`, and only sums up to
    /// `(2^P - 1) * 2^W` are guaranteed to corrupt the padding when they
    /// overflow. Past that a sum can wrap back into a valid-looking pattern.
    pub fn carry_budget(&self) -> u64 {
        let carry = 1u64.checked_shl(self.carry_bits).unwrap_or(u64::MAX);
        match self.signedness {
            Signedness::Signed => {
                let padding = 1u64
                    .checked_shl(self.sign_padding_bits)
                    .map_or(u64::MAX, |p| p - 1);
                carry.min(padding)
            }
            Signedness::Unsigned => carry,
        }
    }

    pub(crate) fn check_matches(&self, other: &Self) -> Result<()> {
        if self != other {
            return Err(BatchCryptError::LayoutMismatch {
                expected: *self,
                got: *other,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for BatchLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.signedness {
            Signedness::Signed => write!(
                f,
                "{} x {}-bit signed slots ({} padding bits, {} carry bits)",
                self.slot_count, self.slot_width, self.sign_padding_bits, self.carry_bits
            ),
            Signedness::Unsigned => write!(
                f,
                "{} x {}-bit unsigned slots ({} carry bits)",
                self.slot_count, self.slot_width, self.carry_bits
            ),
        }
    }
}

fn slot_mask(slot_width: u32) -> BigUint {
    (BigUint::one() << slot_width) - BigUint::one()
}

/// Concatenate `values` into one integer, first value in the highest slot
pub fn pack(slot_width: u32, values: &[BigUint]) -> Result<BigUint> {
    if slot_width == 0 {
        return Err(BatchCryptError::config("slot width must be positive"));
    }
    let mut batch = BigUint::zero();
    for value in values {
        if value.bits() > slot_width as u64 {
            return Err(BatchCryptError::ValueTooWide {
                bits: value.bits(),
                width: slot_width,
            });
        }
        batch <<= slot_width;
        batch |= value;
    }
    Ok(batch)
}

/// Extract slot `index` of a batch of `slot_count` slots
pub fn unpack(raw: &BigUint, slot_width: u32, slot_count: usize, index: usize) -> Result<BigUint> {
    if index >= slot_count {
        return Err(BatchCryptError::IndexOutOfBounds { index, slot_count });
    }
    let shift = (slot_count - 1 - index) as u64 * slot_width as u64;
    Ok((raw >> shift) & slot_mask(slot_width))
}
