//! End-to-end aggregation pipeline

use batchcrypt_codec::{AdditiveCipher, BatchCodec, CodecConfig};
use rand::Rng;
use tracing::{info, warn};

use crate::error::{HarnessError, Result};
use crate::plaintext::PlaintextAggregation;
use crate::secure::{Aggregator, Client, HostClient, SlotOutcome};

/// Result of an aggregation round
#[derive(Debug)]
pub struct AggregationResult {
    /// Per-slot read-back of the encrypted aggregate
    pub slots: Vec<SlotOutcome>,
    /// Plaintext element-wise sums
    pub reference: Vec<f64>,
}

impl AggregationResult {
    /// Largest error over the slots that decoded
    pub fn max_error(&self) -> f64 {
        self.slots
            .iter()
            .zip(&self.reference)
            .filter_map(|(slot, r)| slot.as_ref().ok().map(|v| (v - r).abs()))
            .fold(0.0, f64::max)
    }

    /// Indices of the slots that could not be recovered
    pub fn failed_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_err())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Runs clients, aggregator and host client over a shared codec and cipher
pub struct AggregationPipeline<C: AdditiveCipher> {
    codec: BatchCodec,
    cipher: C,
    plaintext: PlaintextAggregation,
}

impl<C: AdditiveCipher> AggregationPipeline<C> {
    pub fn new(config: CodecConfig, cipher: C) -> Result<Self> {
        let plaintext = PlaintextAggregation::new(&config);
        let codec = BatchCodec::new(config)?;
        Ok(Self {
            codec,
            cipher,
            plaintext,
        })
    }

    pub fn codec(&self) -> &BatchCodec {
        &self.codec
    }

    /// One round: every array comes from its own client
    pub fn run(&self, arrays: &[Vec<f64>]) -> Result<AggregationResult> {
        let reference = self.plaintext.sum(arrays)?;

        let submissions = arrays
            .iter()
            .enumerate()
            .map(|(i, values)| {
                Client::new(format!("client-{}", i + 1), &self.codec, &self.cipher).submit(values)
            })
            .collect::<Result<Vec<_>>>()?;

        let aggregate = Aggregator::new(&self.codec, &self.cipher).aggregate(&submissions)?;
        let slots = HostClient::new(&self.codec, &self.cipher).recover(&aggregate)?;

        let result = AggregationResult { slots, reference };
        info!(
            clients = arrays.len(),
            max_error = result.max_error(),
            failed = result.failed_slots().len(),
            "aggregation round complete"
        );
        Ok(result)
    }

    /// Run a round and check it against the plaintext sums.
    ///
    /// A decoded slot must be within `tolerance` of its reference. A failed
    /// slot is only acceptable if it failed with an overflow or out-of-range
    /// error and its reference really lies outside the float range (or within
    /// `tolerance` of a bound).
    pub fn verify(&self, arrays: &[Vec<f64>], tolerance: f64) -> Result<AggregationResult> {
        let result = self.run(arrays)?;

        for (i, (slot, &expected)) in result.slots.iter().zip(&result.reference).enumerate() {
            match slot {
                Ok(got) if (got - expected).abs() <= tolerance => {}
                Ok(got) => {
                    return Err(HarnessError::VerificationFailed {
                        message: format!("slot {i}: expected {expected}, got {got}"),
                    });
                }
                Err(e) if e.is_overflow() || e.is_out_of_range() => {
                    let near_bound = self.plaintext.distance_to_bound(expected) <= tolerance;
                    if self.plaintext.in_range(expected) && !near_bound {
                        return Err(HarnessError::VerificationFailed {
                            message: format!("slot {i}: in-range sum {expected} failed: {e}"),
                        });
                    }
                    warn!(slot = i, expected, error = %e, "sum left the float range");
                }
                Err(e) => {
                    return Err(HarnessError::VerificationFailed {
                        message: format!("slot {i}: unexpected error: {e}"),
                    });
                }
            }
        }
        Ok(result)
    }
}

/// Random array with three decimals, uniform in `[low, high]`
pub fn random_array<R: Rng>(rng: &mut R, low: f64, high: f64, len: usize) -> Result<Vec<f64>> {
    let (lo, hi) = ((low * 1000.0).ceil() as i64, (high * 1000.0).floor() as i64);
    if !low.is_finite() || !high.is_finite() || lo > hi {
        return Err(HarnessError::InvalidInput(format!(
            "no three-decimal value lies in [{low}, {high}]"
        )));
    }
    Ok((0..len)
        .map(|_| rng.gen_range(lo..=hi) as f64 / 1000.0)
        .collect())
}
