//! Encrypted aggregation round simulator
//!
//! Two clients sum random arrays through an aggregating server that only
//! sees ciphertexts. The identity cipher stands in for a real additively
//! homomorphic scheme.
//!
//! Run with: cargo run -p batchcrypt-harness --bin simulate
//! Codec settings come from BATCHCRYPT_* variables, the RNG seed from
//! BATCHCRYPT_SEED.

use batchcrypt_codec::{CodecConfig, IdentityCipher};
use batchcrypt_harness::{random_array, AggregationPipeline};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Share of the float span kept clear at each end when sampling client
/// values. A quarter keeps the sum of two symmetric samples in range.
const RANGE_MARGIN: f64 = 0.25;

/// Expected quantization error of a 32-bit codec over [-20, 20]
const TOLERANCE: f64 = 1e-5;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchcrypt_harness=info,batchcrypt_codec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CodecConfig::from_env();
    let seed = std::env::var("BATCHCRYPT_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0u64);

    tracing::info!("Starting aggregation simulator v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Float range [{}, {}], {} bits, {} slots ({})",
        config.float_min,
        config.float_max,
        config.int_bits,
        config.slot_count,
        config.signedness
    );

    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let margin = (config.float_max - config.float_min) * RANGE_MARGIN;
    let (low, high) = (config.float_min + margin, config.float_max - margin);
    let arrays = vec![
        random_array(&mut rng, low, high, config.slot_count)?,
        random_array(&mut rng, low, high, config.slot_count)?,
    ];

    let pipeline = AggregationPipeline::new(config, IdentityCipher::new())?;
    tracing::info!("Batch layout: {}", pipeline.codec().layout());

    let result = pipeline.verify(&arrays, TOLERANCE)?;

    println!("\n{:>5} {:>10} {:>10} {:>12} {:>12}", "slot", "a", "b", "a + b", "recovered");
    for (i, slot) in result.slots.iter().enumerate() {
        let recovered = match slot {
            Ok(v) => format!("{v:.6}"),
            Err(e) => format!("error: {e}"),
        };
        println!(
            "{:>5} {:>10.3} {:>10.3} {:>12.3} {:>12}",
            i, arrays[0][i], arrays[1][i], result.reference[i], recovered
        );
    }
    println!("\nMax error: {:.3e}", result.max_error());

    Ok(())
}
