//! Harness error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Codec error: {0}")]
    Codec(#[from] batchcrypt_codec::BatchCryptError),

    #[error("Verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
