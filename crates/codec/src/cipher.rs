//! Additively homomorphic cipher capability
//!
//! The codec never encrypts anything itself. A cipher is injected through
//! [`AdditiveCipher`]; its `add` on ciphertexts must equal integer addition
//! of the packed plaintexts.

use num_bigint::BigUint;
use thiserror::Error;

use crate::error::{BatchCryptError, Result};
use crate::packing::BatchLayout;

/// An additively homomorphic cipher over big-endian packed integers
pub trait AdditiveCipher {
    type Ciphertext: Clone;

    /// Encrypt the big-endian bytes of a packed batch
    fn encrypt(&self, plaintext: &[u8]) -> Result<Self::Ciphertext>;

    /// Recover the big-endian bytes of a packed batch
    fn decrypt(&self, ciphertext: &Self::Ciphertext) -> Result<Vec<u8>>;

    /// Ciphertext whose plaintext is the sum of both plaintexts
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;
}

#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Plaintext of {bits} bits exceeds the {limit}-bit message space")]
    PlaintextTooLarge { bits: u64, limit: u64 },
}

impl From<CipherError> for BatchCryptError {
    fn from(e: CipherError) -> Self {
        BatchCryptError::Cipher(Box::new(e))
    }
}

/// Test double: ciphertext is the plaintext integer, `add` is integer
/// addition. An optional message-space width mimics a real modulus.
#[derive(Debug, Clone, Default)]
pub struct IdentityCipher {
    max_plaintext_bits: Option<u64>,
}

impl IdentityCipher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject plaintexts (and sums) wider than `bits`
    pub fn with_plaintext_bits(bits: u64) -> Self {
        Self {
            max_plaintext_bits: Some(bits),
        }
    }

    fn check(&self, value: &BigUint) -> Result<()> {
        if let Some(limit) = self.max_plaintext_bits {
            if value.bits() > limit {
                return Err(CipherError::PlaintextTooLarge {
                    bits: value.bits(),
                    limit,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl AdditiveCipher for IdentityCipher {
    type Ciphertext = BigUint;

    fn encrypt(&self, plaintext: &[u8]) -> Result<BigUint> {
        let value = BigUint::from_bytes_be(plaintext);
        self.check(&value)?;
        Ok(value)
    }

    fn decrypt(&self, ciphertext: &BigUint) -> Result<Vec<u8>> {
        Ok(ciphertext.to_bytes_be())
    }

    fn add(&self, a: &BigUint, b: &BigUint) -> Result<BigUint> {
        let sum = a + b;
        self.check(&sum)?;
        Ok(sum)
    }
}

/// A ciphertext together with the layout and cumulative count of the batch
/// it encrypts. The count has to travel with the ciphertext: the decrypting
/// party needs it to dequantize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBatch<T> {
    ciphertext: T,
    layout: BatchLayout,
    cumulative_count: u64,
}

impl<T> EncryptedBatch<T> {
    pub fn new(ciphertext: T, layout: BatchLayout, cumulative_count: u64) -> Self {
        Self {
            ciphertext,
            layout,
            cumulative_count,
        }
    }

    pub fn ciphertext(&self) -> &T {
        &self.ciphertext
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    pub fn cumulative_count(&self) -> u64 {
        self.cumulative_count
    }
}
