//! BatchCrypt Codec
//!
//! Quantization and bit packing that let an additively homomorphic cipher
//! sum whole arrays of bounded floats in one ciphertext addition.
//! Values are quantized to integers, encoded with redundant sign padding and
//! packed into slots of one big integer; adding two packed integers adds
//! every slot independently.

mod batch;
mod cipher;
mod codec;
mod config;
mod error;
mod integer;
mod packing;
mod quantizer;

pub use batch::PackedBatch;
pub use cipher::{AdditiveCipher, CipherError, EncryptedBatch, IdentityCipher};
pub use codec::BatchCodec;
pub use config::{CodecConfig, DEFAULT_CARRY_BITS, MAX_CARRY_BITS};
pub use error::{BatchCryptError, Result};
pub use integer::{SignedFixedWidthInteger, MAX_PADDING_BITS, MAX_VALUE_BITS, SIGN_PADDING_BITS};
pub use packing::{pack, unpack, BatchLayout};
pub use quantizer::{QuantizationRange, Quantizer, Signedness, MAX_INT_BITS};
