//! Affine quantization between a float interval and an integer interval
//!
//! A value `f` in `[float_min, float_max]` maps to `floor(scale * f + offset)`
//! in `[int_min, int_max]`. Summing `n` quantized values adds `n * offset`
//! instead of one, so [`Quantizer::dequantize`] takes the cumulative count and
//! removes the `n - 1` surplus offsets before inverting the map.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BatchCryptError, Result};

/// Widest integer range a quantizer accepts (f64 mantissa width)
pub const MAX_INT_BITS: u32 = 53;

/// Slot encoding selected by a quantizer and carried by every batch layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    /// Symmetric float range, two's-complement slots with sign padding
    Signed,
    /// Arbitrary float range, plain unsigned slots
    Unsigned,
}

impl std::fmt::Display for Signedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signed => write!(f, "signed"),
            Self::Unsigned => write!(f, "unsigned"),
        }
    }
}

/// The float and integer intervals of a compiled quantizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationRange {
    pub float_min: f64,
    pub float_max: f64,
    pub int_min: i64,
    pub int_max: i64,
}

#[derive(Debug, Clone, Copy)]
struct Compiled {
    range: QuantizationRange,
    scale: f64,
    offset: f64,
}

/// Affine float/integer quantizer.
///
/// Configure both ranges, then [`compile`](Self::compile). Configuration takes
/// `&mut self`, so once the quantizer is shared by reference it is read-only.
#[derive(Debug, Clone)]
pub struct Quantizer {
    signedness: Signedness,
    float_range: Option<(f64, f64)>,
    int_range: Option<(i64, i64)>,
    compiled: Option<Compiled>,
}

impl Quantizer {
    /// Create an unconfigured quantizer
    pub fn new(signedness: Signedness) -> Self {
        Self {
            signedness,
            float_range: None,
            int_range: None,
            compiled: None,
        }
    }

    /// Build and compile a quantizer in one step
    pub fn compiled(
        float_min: f64,
        float_max: f64,
        int_bits: u32,
        signedness: Signedness,
    ) -> Result<Self> {
        let mut quantizer = Self::new(signedness);
        quantizer.configure_float_range(float_min, float_max)?;
        quantizer.configure_int_width(int_bits, signedness)?;
        quantizer.compile()?;
        Ok(quantizer)
    }

    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Set the float interval. Signed quantizers require `min == -max`.
    pub fn configure_float_range(&mut self, min: f64, max: f64) -> Result<()> {
        if !min.is_finite() || !max.is_finite() {
            return Err(BatchCryptError::config(format!(
                "float range bounds must be finite (got {min}, {max})"
            )));
        }
        if min >= max {
            return Err(BatchCryptError::config(format!(
                "float range min {min} must be less than max {max}"
            )));
        }
        if self.signedness == Signedness::Signed && min != -max {
            return Err(BatchCryptError::config(format!(
                "signed float range must be symmetric around zero (got {min}, {max})"
            )));
        }
        self.float_range = Some((min, max));
        self.compiled = None;
        Ok(())
    }

    /// Derive the integer interval from a bit width.
    ///
    /// Signed widths yield `[-(2^(bits-1) - 1), 2^(bits-1) - 1]`, the exact
    /// range a [`SignedFixedWidthInteger`](crate::SignedFixedWidthInteger) of
    /// the same original width can represent. Unsigned widths yield
    /// `[0, 2^bits - 1]`.
    pub fn configure_int_width(&mut self, bits: u32, signedness: Signedness) -> Result<()> {
        if bits == 0 || bits > MAX_INT_BITS {
            return Err(BatchCryptError::config(format!(
                "integer width must be in 1..={MAX_INT_BITS} bits (got {bits})"
            )));
        }
        let range = match signedness {
            Signedness::Signed => {
                if bits < 2 {
                    return Err(BatchCryptError::config(
                        "signed integer width needs at least 2 bits",
                    ));
                }
                let max = (1i64 << (bits - 1)) - 1;
                (-max, max)
            }
            Signedness::Unsigned => (0, (1i64 << bits) - 1),
        };
        self.signedness = signedness;
        self.int_range = Some(range);
        self.compiled = None;
        Ok(())
    }

    /// Set the integer interval explicitly. The span is limited to
    /// [`MAX_INT_BITS`] bits like any derived width.
    pub fn configure_int_range(&mut self, min: i64, max: i64) -> Result<()> {
        if min >= max {
            return Err(BatchCryptError::config(format!(
                "integer range min {min} must be less than max {max}"
            )));
        }
        if max as i128 - min as i128 >= 1i128 << MAX_INT_BITS {
            return Err(BatchCryptError::config(format!(
                "integer range [{min}, {max}] is wider than {MAX_INT_BITS} bits"
            )));
        }
        self.int_range = Some((min, max));
        self.compiled = None;
        Ok(())
    }

    /// Compute scale and offset from the configured ranges
    pub fn compile(&mut self) -> Result<()> {
        let (float_min, float_max) = self
            .float_range
            .ok_or_else(|| BatchCryptError::config("float range not set before compile()"))?;
        let (int_min, int_max) = self.int_range.ok_or_else(|| {
            BatchCryptError::config("integer range or width not set before compile()")
        })?;
        // configure_int_width may have switched signedness after the float range was set
        if self.signedness == Signedness::Signed && float_min != -float_max {
            return Err(BatchCryptError::config(format!(
                "signed float range must be symmetric around zero (got {float_min}, {float_max})"
            )));
        }

        let float_span = float_max - float_min;
        let scale = (int_max as i128 - int_min as i128) as f64 / float_span;
        let offset = (float_max * int_min as f64 - int_max as f64 * float_min) / float_span;

        self.compiled = Some(Compiled {
            range: QuantizationRange {
                float_min,
                float_max,
                int_min,
                int_max,
            },
            scale,
            offset,
        });
        debug!(scale, offset, int_min, int_max, "quantizer compiled");
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    fn state(&self) -> Result<&Compiled> {
        self.compiled.as_ref().ok_or(BatchCryptError::NotCompiled)
    }

    pub fn range(&self) -> Result<QuantizationRange> {
        Ok(self.state()?.range)
    }

    pub fn scale(&self) -> Result<f64> {
        Ok(self.state()?.scale)
    }

    pub fn offset(&self) -> Result<f64> {
        Ok(self.state()?.offset)
    }

    /// Map a float to its integer code.
    ///
    /// With `force`, finite out-of-range inputs pass through unclamped. NaN
    /// and infinities are always rejected.
    pub fn quantize(&self, value: f64, force: bool) -> Result<i64> {
        let state = self.state()?;
        let range = &state.range;
        let in_range = value >= range.float_min && value <= range.float_max;
        if !value.is_finite() || (!force && !in_range) {
            return Err(BatchCryptError::FloatOutOfRange {
                value,
                min: range.float_min,
                max: range.float_max,
            });
        }
        let code = (state.scale * value + state.offset).floor() as i64;
        if force {
            return Ok(code);
        }
        // rounding at the bounds must not push an in-range input outside
        Ok(code.clamp(range.int_min, range.int_max))
    }

    /// Map an integer code, possibly the sum of `cumulative_count` codes,
    /// back to a float.
    ///
    /// The range check runs on the offset-corrected value, so it rejects sums
    /// whose float value leaves the configured float range.
    pub fn dequantize(&self, value: i64, cumulative_count: u64, force: bool) -> Result<f64> {
        let state = self.state()?;
        if cumulative_count == 0 {
            return Err(BatchCryptError::config("cumulative count must be at least 1"));
        }
        let range = &state.range;
        let adjusted = value as f64 - (cumulative_count - 1) as f64 * state.offset;

        if !force && (adjusted < range.int_min as f64 || adjusted > range.int_max as f64) {
            return Err(BatchCryptError::IntOutOfRange {
                value: adjusted,
                min: range.int_min,
                max: range.int_max,
            });
        }
        Ok((adjusted - state.offset) / state.scale)
    }
}
