//! The three parties of an encrypted aggregation round
//!
//! Clients bind and encrypt, the aggregator only ever handles ciphertexts,
//! and the host client (key holder) decrypts the sum.

use batchcrypt_codec::{AdditiveCipher, BatchCodec, BatchCryptError, EncryptedBatch};
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// Read-back of one slot: the summed value, or why it could not be recovered
pub type SlotOutcome = std::result::Result<f64, BatchCryptError>;

/// A data owner contributing one array per round
pub struct Client<'a, C: AdditiveCipher> {
    name: String,
    codec: &'a BatchCodec,
    cipher: &'a C,
}

impl<'a, C: AdditiveCipher> Client<'a, C> {
    pub fn new(name: impl Into<String>, codec: &'a BatchCodec, cipher: &'a C) -> Self {
        Self {
            name: name.into(),
            codec,
            cipher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind and encrypt an array
    pub fn submit(&self, values: &[f64]) -> Result<EncryptedBatch<C::Ciphertext>> {
        let batch = self.codec.bind(values)?;
        debug!(client = %self.name, batch = %batch, "bound array");

        let encrypted = self.codec.encrypt(self.cipher, &batch)?;
        info!(client = %self.name, slots = values.len(), "submitted encrypted batch");
        Ok(encrypted)
    }
}

/// The aggregating server. Sees ciphertexts only.
pub struct Aggregator<'a, C: AdditiveCipher> {
    codec: &'a BatchCodec,
    cipher: &'a C,
}

impl<'a, C: AdditiveCipher> Aggregator<'a, C> {
    pub fn new(codec: &'a BatchCodec, cipher: &'a C) -> Self {
        Self { codec, cipher }
    }

    /// Homomorphically sum all submitted batches
    pub fn aggregate(
        &self,
        submissions: &[EncryptedBatch<C::Ciphertext>],
    ) -> Result<EncryptedBatch<C::Ciphertext>> {
        let (first, rest) = submissions
            .split_first()
            .ok_or_else(|| HarnessError::InvalidInput("no submissions to aggregate".to_string()))?;

        let mut total = first.clone();
        for submission in rest {
            total = self.codec.add_encrypted(self.cipher, &total, submission)?;
        }

        info!(
            submissions = submissions.len(),
            cumulative_count = total.cumulative_count(),
            "aggregated encrypted batches"
        );
        Ok(total)
    }
}

/// The key-holding client that decrypts the aggregate
pub struct HostClient<'a, C: AdditiveCipher> {
    codec: &'a BatchCodec,
    cipher: &'a C,
}

impl<'a, C: AdditiveCipher> HostClient<'a, C> {
    pub fn new(codec: &'a BatchCodec, cipher: &'a C) -> Self {
        Self { codec, cipher }
    }

    /// Decrypt and read back every slot. Per-slot failures (overflow, out of
    /// range) are reported per slot; a failed decryption fails the whole call.
    pub fn recover(&self, aggregate: &EncryptedBatch<C::Ciphertext>) -> Result<Vec<SlotOutcome>> {
        let batch = self.codec.decrypt(self.cipher, aggregate)?;
        debug!(batch = %batch, "decrypted aggregate");

        let outcomes: Vec<SlotOutcome> = (0..batch.len())
            .map(|i| self.codec.get(&batch, i))
            .collect();

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        info!(slots = outcomes.len(), failed, "recovered aggregate");
        Ok(outcomes)
    }
}
