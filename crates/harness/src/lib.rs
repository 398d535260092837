//! BatchCrypt Test Harness
//!
//! Simulates an aggregation round: clients bind and encrypt their arrays, an
//! aggregator sums the ciphertexts without seeing any value, and the host
//! client decrypts the sum. A plaintext reference checks the result.

mod error;
mod pipeline;
mod plaintext;
mod secure;

pub use error::{HarnessError, Result};
pub use pipeline::{random_array, AggregationPipeline, AggregationResult};
pub use plaintext::PlaintextAggregation;
pub use secure::{Aggregator, Client, HostClient, SlotOutcome};
