//! Codec configuration
//!
//! Producers and consumers of a packed batch must agree on every field here
//! out-of-band: nothing about the layout is stored in the packed integer.

use serde::{Deserialize, Serialize};

use crate::error::{BatchCryptError, Result};
use crate::integer::{MAX_PADDING_BITS, SIGN_PADDING_BITS};
use crate::packing::BatchLayout;
use crate::quantizer::{Signedness, MAX_INT_BITS};

/// Default carry bits reserved per slot (4 summed batches before a carry
/// leaves its slot)
pub const DEFAULT_CARRY_BITS: u32 = 2;

/// Maximum carry bits per slot
pub const MAX_CARRY_BITS: u32 = 8;

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Lower bound of the float range
    #[serde(default = "default_float_min")]
    pub float_min: f64,

    /// Upper bound of the float range
    #[serde(default = "default_float_max")]
    pub float_max: f64,

    /// Quantization width in bits (sign bit included for signed codecs)
    #[serde(default = "default_int_bits")]
    pub int_bits: u32,

    /// Redundant sign bits per signed slot
    #[serde(default = "default_sign_padding_bits")]
    pub sign_padding_bits: u32,

    /// Zero bits above each slot that absorb carries
    #[serde(default = "default_carry_bits")]
    pub carry_bits: u32,

    /// Values per batch
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    /// Slot encoding
    #[serde(default = "default_signedness")]
    pub signedness: Signedness,
}

fn default_float_min() -> f64 { -20.0 }
fn default_float_max() -> f64 { 20.0 }
fn default_int_bits() -> u32 { 32 }
fn default_sign_padding_bits() -> u32 { SIGN_PADDING_BITS }
fn default_carry_bits() -> u32 { DEFAULT_CARRY_BITS }
fn default_slot_count() -> usize { 10 }
fn default_signedness() -> Signedness { Signedness::Signed }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            float_min: default_float_min(),
            float_max: default_float_max(),
            int_bits: default_int_bits(),
            sign_padding_bits: default_sign_padding_bits(),
            carry_bits: default_carry_bits(),
            slot_count: default_slot_count(),
            signedness: default_signedness(),
        }
    }
}

impl CodecConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(min) = std::env::var("BATCHCRYPT_FLOAT_MIN") {
            if let Ok(m) = min.parse() {
                config.float_min = m;
            }
        }

        if let Ok(max) = std::env::var("BATCHCRYPT_FLOAT_MAX") {
            if let Ok(m) = max.parse() {
                config.float_max = m;
            }
        }

        if let Ok(bits) = std::env::var("BATCHCRYPT_INT_BITS") {
            if let Ok(b) = bits.parse() {
                config.int_bits = b;
            }
        }

        if let Ok(bits) = std::env::var("BATCHCRYPT_SIGN_PADDING_BITS") {
            if let Ok(b) = bits.parse() {
                config.sign_padding_bits = b;
            }
        }

        if let Ok(bits) = std::env::var("BATCHCRYPT_CARRY_BITS") {
            if let Ok(b) = bits.parse() {
                config.carry_bits = b;
            }
        }

        if let Ok(count) = std::env::var("BATCHCRYPT_SLOT_COUNT") {
            if let Ok(c) = count.parse() {
                config.slot_count = c;
            }
        }

        if let Ok(signed) = std::env::var("BATCHCRYPT_SIGNED") {
            if let Ok(s) = signed.parse::<bool>() {
                config.signedness = if s {
                    Signedness::Signed
                } else {
                    Signedness::Unsigned
                };
            }
        }

        config
    }

    /// Check every field that shapes the layout, so a bad config fails
    /// before the first bind
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(BatchCryptError::config("slot count must be positive"));
        }
        let min_bits = match self.signedness {
            Signedness::Signed => 2,
            Signedness::Unsigned => 1,
        };
        if self.int_bits < min_bits || self.int_bits > MAX_INT_BITS {
            return Err(BatchCryptError::config(format!(
                "{} integer width must be in {min_bits}..={MAX_INT_BITS} (got {})",
                self.signedness, self.int_bits
            )));
        }
        if self.signedness == Signedness::Signed
            && !(2..=MAX_PADDING_BITS).contains(&self.sign_padding_bits)
        {
            return Err(BatchCryptError::config(format!(
                "sign padding bits must be in 2..={MAX_PADDING_BITS} (got {})",
                self.sign_padding_bits
            )));
        }
        if self.carry_bits == 0 || self.carry_bits > MAX_CARRY_BITS {
            return Err(BatchCryptError::config(format!(
                "carry bits must be in 1..={MAX_CARRY_BITS} (got {})",
                self.carry_bits
            )));
        }
        Ok(())
    }

    /// Bits of one encoded value, carry bits excluded
    pub fn slot_value_width(&self) -> u32 {
        match self.signedness {
            Signedness::Signed => self.int_bits.saturating_sub(1) + self.sign_padding_bits,
            Signedness::Unsigned => self.int_bits,
        }
    }

    /// Layout of every batch produced under this config
    pub fn layout(&self) -> BatchLayout {
        BatchLayout {
            slot_width: self.slot_value_width() + self.carry_bits,
            slot_count: self.slot_count,
            signedness: self.signedness,
            sign_padding_bits: match self.signedness {
                Signedness::Signed => self.sign_padding_bits,
                Signedness::Unsigned => 0,
            },
            carry_bits: self.carry_bits,
        }
    }
}
