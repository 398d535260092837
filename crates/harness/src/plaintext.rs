//! Plaintext reference aggregation
//!
//! Sums the arrays directly, with no quantization, so the secure path can be
//! checked against it.

use batchcrypt_codec::CodecConfig;

use crate::error::{HarnessError, Result};

/// Plaintext element-wise summation for reference/verification
#[derive(Debug, Clone)]
pub struct PlaintextAggregation {
    float_min: f64,
    float_max: f64,
}

impl PlaintextAggregation {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            float_min: config.float_min,
            float_max: config.float_max,
        }
    }

    /// Whether a (summed) value can be represented by the codec
    pub fn in_range(&self, value: f64) -> bool {
        value >= self.float_min && value <= self.float_max
    }

    /// Distance from `value` to the nearest bound of the float range
    pub fn distance_to_bound(&self, value: f64) -> f64 {
        (value - self.float_min).abs().min((value - self.float_max).abs())
    }

    /// Element-wise sum of equally long arrays
    pub fn sum(&self, arrays: &[Vec<f64>]) -> Result<Vec<f64>> {
        let first = arrays
            .first()
            .ok_or_else(|| HarnessError::InvalidInput("no arrays to aggregate".to_string()))?;

        let mut sums = vec![0.0; first.len()];
        for array in arrays {
            if array.len() != sums.len() {
                return Err(HarnessError::InvalidInput(format!(
                    "array length {} differs from {}",
                    array.len(),
                    sums.len()
                )));
            }
            for (acc, &v) in sums.iter_mut().zip(array) {
                *acc += v;
            }
        }
        Ok(sums)
    }
}
