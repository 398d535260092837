//! Batch bind / read-back orchestration
//!
//! Bind: quantize → encode slot → pack. Read-back: unpack → decode slot →
//! dequantize with the batch's cumulative count.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use tracing::debug;

use crate::batch::PackedBatch;
use crate::cipher::{AdditiveCipher, EncryptedBatch};
use crate::config::CodecConfig;
use crate::error::{BatchCryptError, Result};
use crate::integer::SignedFixedWidthInteger;
use crate::packing::{pack, BatchLayout};
use crate::quantizer::{Quantizer, Signedness};

/// Binds float arrays into packed batches and reads them back.
///
/// Holds a compiled quantizer and the agreed layout. Every party of an
/// aggregation builds its codec from the same [`CodecConfig`].
#[derive(Debug, Clone)]
pub struct BatchCodec {
    config: CodecConfig,
    quantizer: Quantizer,
    layout: BatchLayout,
}

impl BatchCodec {
    /// Validate the config and compile its quantizer
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        let quantizer = Quantizer::compiled(
            config.float_min,
            config.float_max,
            config.int_bits,
            config.signedness,
        )?;
        let layout = config.layout();

        debug!(
            layout = %layout,
            float_min = config.float_min,
            float_max = config.float_max,
            int_bits = config.int_bits,
            "codec ready"
        );

        Ok(Self {
            config,
            quantizer,
            layout,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// Quantize, encode and pack one value per slot
    pub fn bind(&self, values: &[f64]) -> Result<PackedBatch> {
        self.bind_with(values, false)
    }

    /// [`bind`](Self::bind) without the float range check.
    ///
    /// Values must still fit the slot encoding.
    pub fn bind_forced(&self, values: &[f64]) -> Result<PackedBatch> {
        self.bind_with(values, true)
    }

    fn bind_with(&self, values: &[f64], force: bool) -> Result<PackedBatch> {
        if values.len() != self.layout.slot_count {
            return Err(BatchCryptError::LengthMismatch {
                expected: self.layout.slot_count,
                got: values.len(),
            });
        }

        let slots = values
            .iter()
            .map(|&v| self.encode_slot(v, force))
            .collect::<Result<Vec<_>>>()?;
        let raw = pack(self.layout.slot_width, &slots)?;

        debug!(slots = slots.len(), bits = raw.bits(), "bound batch");
        PackedBatch::new(raw, self.layout, 1)
    }

    fn encode_slot(&self, value: f64, force: bool) -> Result<BigUint> {
        let code = self.quantizer.quantize(value, force)?;
        match self.layout.signedness {
            Signedness::Signed => Ok(SignedFixedWidthInteger::from_signed(
                code,
                self.config.int_bits,
                self.config.sign_padding_bits,
            )?
            .to_biguint()),
            Signedness::Unsigned => {
                let unsigned = u64::try_from(code).map_err(|_| BatchCryptError::IntOutOfRange {
                    value: code as f64,
                    min: 0,
                    max: (1i64 << self.config.int_bits) - 1,
                })?;
                let slot = BigUint::from(unsigned);
                if slot.bits() > self.config.int_bits as u64 {
                    return Err(BatchCryptError::ValueTooWide {
                        bits: slot.bits(),
                        width: self.config.int_bits,
                    });
                }
                Ok(slot)
            }
        }
    }

    fn decode_slot(&self, slot: &BigUint) -> Result<i64> {
        match self.layout.signedness {
            Signedness::Signed => {
                // carry bits above the sign padding are dropped by from_raw
                let raw = slot.to_u128().ok_or(BatchCryptError::ValueTooWide {
                    bits: slot.bits(),
                    width: u128::BITS,
                })?;
                SignedFixedWidthInteger::from_raw(
                    raw,
                    self.config.int_bits - 1,
                    self.config.sign_padding_bits,
                )?
                .decode_value()
            }
            Signedness::Unsigned => slot.to_i64().ok_or(BatchCryptError::ValueTooWide {
                bits: slot.bits(),
                width: i64::BITS - 1,
            }),
        }
    }

    /// Read back slot `index`.
    ///
    /// Fails with `Overflow` if the slot's sign padding is corrupted, with
    /// `CarryBudgetExceeded` if the batch sums more terms than its layout can
    /// guard, and with an out-of-range error if the recovered value leaves
    /// the float range.
    pub fn get(&self, batch: &PackedBatch, index: usize) -> Result<f64> {
        self.get_with(batch, index, false)
    }

    /// [`get`](Self::get) without the range check on the recovered value
    pub fn get_forced(&self, batch: &PackedBatch, index: usize) -> Result<f64> {
        self.get_with(batch, index, true)
    }

    fn get_with(&self, batch: &PackedBatch, index: usize, force: bool) -> Result<f64> {
        self.layout.check_matches(batch.layout())?;
        let budget = self.layout.carry_budget();
        if batch.cumulative_count() > budget {
            return Err(BatchCryptError::CarryBudgetExceeded {
                cumulative_count: batch.cumulative_count(),
                budget,
            });
        }
        let slot = batch.slot(index)?;
        let code = self.decode_slot(&slot)?;
        self.quantizer
            .dequantize(code, batch.cumulative_count(), force)
    }

    /// Read back every slot in order, stopping at the first failure
    pub fn get_all(&self, batch: &PackedBatch) -> Result<Vec<f64>> {
        (0..batch.len()).map(|i| self.get(batch, i)).collect()
    }

    /// Slot-wise sum; the result's cumulative count is the sum of both
    pub fn add(&self, a: &PackedBatch, b: &PackedBatch) -> Result<PackedBatch> {
        let sum = a.add(b)?;
        debug!(cumulative_count = sum.cumulative_count(), "added batches");
        Ok(sum)
    }

    /// Add `other` into `acc` in place
    pub fn accumulate(&self, acc: &mut PackedBatch, other: &PackedBatch) -> Result<()> {
        acc.accumulate(other)?;
        debug!(cumulative_count = acc.cumulative_count(), "accumulated batch");
        Ok(())
    }

    /// Rebuild a batch from a packed integer under this codec's layout
    pub fn from_raw(&self, raw: BigUint, cumulative_count: u64) -> Result<PackedBatch> {
        PackedBatch::new(raw, self.layout, cumulative_count)
    }

    /// Rebuild a batch from big-endian bytes
    pub fn from_bytes(&self, bytes: &[u8], cumulative_count: u64) -> Result<PackedBatch> {
        self.from_raw(BigUint::from_bytes_be(bytes), cumulative_count)
    }

    /// Encrypt a batch, keeping its layout and count alongside the ciphertext
    pub fn encrypt<C: AdditiveCipher>(
        &self,
        cipher: &C,
        batch: &PackedBatch,
    ) -> Result<EncryptedBatch<C::Ciphertext>> {
        self.layout.check_matches(batch.layout())?;
        let ciphertext = cipher.encrypt(&batch.to_bytes())?;
        Ok(EncryptedBatch::new(
            ciphertext,
            *batch.layout(),
            batch.cumulative_count(),
        ))
    }

    /// Homomorphic slot-wise sum of two encrypted batches
    pub fn add_encrypted<C: AdditiveCipher>(
        &self,
        cipher: &C,
        a: &EncryptedBatch<C::Ciphertext>,
        b: &EncryptedBatch<C::Ciphertext>,
    ) -> Result<EncryptedBatch<C::Ciphertext>> {
        self.layout.check_matches(a.layout())?;
        a.layout().check_matches(b.layout())?;

        let cumulative_count = a.cumulative_count() + b.cumulative_count();
        let ciphertext = cipher.add(a.ciphertext(), b.ciphertext())?;
        debug!(cumulative_count, "added encrypted batches");
        Ok(EncryptedBatch::new(ciphertext, *a.layout(), cumulative_count))
    }

    /// Decrypt back into a packed batch
    pub fn decrypt<C: AdditiveCipher>(
        &self,
        cipher: &C,
        encrypted: &EncryptedBatch<C::Ciphertext>,
    ) -> Result<PackedBatch> {
        self.layout.check_matches(encrypted.layout())?;
        let bytes = cipher.decrypt(encrypted.ciphertext())?;
        self.from_bytes(&bytes, encrypted.cumulative_count())
    }
}
