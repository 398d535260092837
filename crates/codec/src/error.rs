//! Codec error types

use thiserror::Error;

use crate::packing::BatchLayout;

#[derive(Error, Debug)]
pub enum BatchCryptError {
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Quantizer used before compile()")]
    NotCompiled,

    #[error("Float {value} is out of range (expected {min} <= f <= {max})")]
    FloatOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Integer {value} is out of range (expected {min} <= i <= {max})")]
    IntOutOfRange { value: f64, min: i64, max: i64 },

    #[error("Magnitude of {value} exceeds the signed {value_bits}-bit range")]
    MagnitudeOutOfRange { value: i64, value_bits: u32 },

    #[error("Value needs {bits} bits but the slot is {width} bits wide")]
    ValueTooWide { bits: u64, width: u32 },

    #[error("Sign padding {padding:#b} is corrupted: accumulated additions overflowed the slot")]
    Overflow { padding: u64 },

    #[error("Batch sums {cumulative_count} terms but its layout only guarantees {budget}")]
    CarryBudgetExceeded { cumulative_count: u64, budget: u64 },

    #[error("Slot index {index} out of bounds (slot count {slot_count})")]
    IndexOutOfBounds { index: usize, slot_count: usize },

    #[error("Layout mismatch: expected {expected}, got {got}")]
    LayoutMismatch { expected: BatchLayout, got: BatchLayout },

    #[error("Width mismatch: expected {expected} bits, got {got}")]
    WidthMismatch { expected: u32, got: u32 },

    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Cipher error: {0}")]
    Cipher(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BatchCryptError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// True for the range failures (suppressible or not).
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            Self::FloatOutOfRange { .. }
                | Self::IntOutOfRange { .. }
                | Self::MagnitudeOutOfRange { .. }
                | Self::ValueTooWide { .. }
        )
    }

    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            Self::Overflow { .. } | Self::CarryBudgetExceeded { .. }
        )
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::LayoutMismatch { .. } | Self::WidthMismatch { .. } | Self::LengthMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BatchCryptError>;
