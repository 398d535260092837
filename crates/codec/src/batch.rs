//! Packed batch with its cumulative addition count

use num_bigint::BigUint;
use tracing::warn;

use crate::error::{BatchCryptError, Result};
use crate::packing::{unpack, BatchLayout};

/// A packed batch of slots.
///
/// `cumulative_count` is the number of quantized scalars summed into each
/// slot; read-back needs it to invert the quantization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBatch {
    raw: BigUint,
    layout: BatchLayout,
    cumulative_count: u64,
}

impl PackedBatch {
    /// Wrap a packed integer
    pub fn new(raw: BigUint, layout: BatchLayout, cumulative_count: u64) -> Result<Self> {
        if cumulative_count == 0 {
            return Err(BatchCryptError::config("cumulative count must be at least 1"));
        }
        Ok(Self {
            raw,
            layout,
            cumulative_count,
        })
    }

    pub fn raw(&self) -> &BigUint {
        &self.raw
    }

    pub fn into_raw(self) -> BigUint {
        self.raw
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    pub fn cumulative_count(&self) -> u64 {
        self.cumulative_count
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.layout.slot_count
    }

    pub fn is_empty(&self) -> bool {
        self.layout.slot_count == 0
    }

    /// Raw bits of one slot, carry bits included
    pub fn slot(&self, index: usize) -> Result<BigUint> {
        unpack(
            &self.raw,
            self.layout.slot_width,
            self.layout.slot_count,
            index,
        )
    }

    /// Big-endian bytes of the packed integer
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.to_bytes_be()
    }

    /// Slot-wise sum of two batches with the same layout
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.layout.check_matches(&other.layout)?;
        let cumulative_count = self.cumulative_count + other.cumulative_count;
        self.warn_if_over_budget(cumulative_count);
        Ok(Self {
            raw: &self.raw + &other.raw,
            layout: self.layout,
            cumulative_count,
        })
    }

    /// In-place variant of [`add`](Self::add)
    pub fn accumulate(&mut self, other: &Self) -> Result<()> {
        self.layout.check_matches(&other.layout)?;
        self.cumulative_count += other.cumulative_count;
        self.warn_if_over_budget(self.cumulative_count);
        self.raw += &other.raw;
        Ok(())
    }

    fn warn_if_over_budget(&self, cumulative_count: u64) {
        let budget = self.layout.carry_budget();
        if cumulative_count > budget {
            warn!(
                cumulative_count,
                budget,
                layout = %self.layout,
                "batch sum exceeds carry budget, its slots can no longer be read back"
            );
        }
    }
}

impl std::fmt::Display for PackedBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PackedBatch[{}, count {}]: {:#x}",
            self.layout, self.cumulative_count, self.raw
        )
    }
}
