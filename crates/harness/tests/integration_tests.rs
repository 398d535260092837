//! BatchCrypt Integration Tests
//!
//! End-to-end checks of the codec through the aggregation harness.

use batchcrypt_codec::{
    BatchCodec, BatchCryptError, CodecConfig, IdentityCipher, Quantizer, SignedFixedWidthInteger,
    Signedness,
};
use batchcrypt_harness::{random_array, AggregationPipeline, HarnessError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const A: [f64; 10] = [3.832, 8.59, -3.483, -6.702, 8.706, -7.674, -8.124, 9.186, -0.067, 3.017];
const B: [f64; 10] = [-5.032, 3.183, -4.383, 5.589, 6.519, -9.281, 3.996, -3.245, -8.343, -8.723];

fn default_codec() -> BatchCodec {
    BatchCodec::new(CodecConfig::default()).unwrap()
}

// =============================================================================
// Section 1: Quantization
// =============================================================================

mod quantization_tests {
    use super::*;

    #[test]
    fn test_roundtrip_error_bounded_by_one_step() {
        let mut rng = ChaCha20Rng::seed_from_u64(100);
        for (bits, signedness) in [(8, Signedness::Signed), (16, Signedness::Unsigned), (32, Signedness::Signed)] {
            let q = Quantizer::compiled(-20.0, 20.0, bits, signedness).unwrap();
            let step = 1.0 / q.scale().unwrap();
            for _ in 0..500 {
                let f: f64 = rng.gen_range(-20.0..=20.0);
                let back = q.dequantize(q.quantize(f, false).unwrap(), 1, false).unwrap();
                assert!((back - f).abs() <= step, "{bits}-bit {signedness}: {f} -> {back}");
            }
        }
    }

    #[test]
    fn test_k_fold_sum_needs_exact_count() {
        let q = Quantizer::compiled(-20.0, 20.0, 32, Signedness::Unsigned).unwrap();
        let values = [2.5, -1.25, 4.0, -3.5];

        for k in 2..=values.len() {
            let code: i64 = values[..k].iter().map(|&f| q.quantize(f, false).unwrap()).sum();
            let expected: f64 = values[..k].iter().sum();

            let right = q.dequantize(code, k as u64, false).unwrap();
            assert!((right - expected).abs() < 1e-5);

            let wrong = q.dequantize(code, k as u64 - 1, true).unwrap();
            assert!((wrong - expected).abs() > 1.0);
        }
    }
}

// =============================================================================
// Section 2: Sign-Padded Integers
// =============================================================================

mod signed_integer_tests {
    use super::*;

    #[test]
    fn test_sum_decodes_or_reports_overflow() {
        let mut rng = ChaCha20Rng::seed_from_u64(200);
        let max = SignedFixedWidthInteger::max_magnitude(15);
        for _ in 0..1000 {
            let (x, y) = (rng.gen_range(-max..=max), rng.gen_range(-max..=max));
            let a = SignedFixedWidthInteger::from_signed(x, 16, 2).unwrap();
            let b = SignedFixedWidthInteger::from_signed(y, 16, 2).unwrap();
            match a.add(b).unwrap().decode_value() {
                Ok(v) => assert_eq!(v, x + y),
                Err(e) => {
                    assert!(matches!(e, BatchCryptError::Overflow { .. }));
                    assert!((x + y).abs() > max);
                }
            }
        }
    }
}

// =============================================================================
// Section 3: Wire Layout
// =============================================================================

mod wire_layout_tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_first_value_in_highest_slot() {
        let codec = BatchCodec::new(CodecConfig {
            slot_count: 2,
            ..Default::default()
        })
        .unwrap();
        let width = codec.layout().slot_width;

        // slot 1 encodes 0.0, so the whole integer is slot 0 shifted up
        let batch = codec.bind(&[1.0, 0.0]).unwrap();
        let low_mask = (BigUint::from(1u8) << width) - BigUint::from(1u8);
        assert_eq!(batch.raw() & &low_mask, BigUint::from(0u8));

        let code = codec.quantizer().quantize(1.0, false).unwrap();
        assert_eq!(batch.raw() >> width, BigUint::from(code as u64));
    }

    #[test]
    fn test_packed_width_within_layout() {
        let codec = default_codec();
        let batch = codec.bind(&A).unwrap();
        let layout = codec.layout();
        // the top slot's carry bits start out clear
        assert!(batch.raw().bits() <= layout.total_bits() - layout.carry_bits as u64);
        assert_eq!(batch.to_bytes().len() as u64, batch.raw().bits().div_ceil(8));
    }
}

// =============================================================================
// Section 4: Reference Scenario
// =============================================================================

mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_batch_read_back() {
        let codec = default_codec();
        let batch = codec.bind(&A).unwrap();
        assert!((codec.get(&batch, 3).unwrap() - A[3]).abs() < 1e-5);
        for (i, got) in codec.get_all(&batch).unwrap().into_iter().enumerate() {
            assert!((got - A[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_two_batch_sum() {
        let codec = default_codec();
        let sum = codec
            .add(&codec.bind(&A).unwrap(), &codec.bind(&B).unwrap())
            .unwrap();
        for i in 0..10 {
            let got = codec.get(&sum, i).unwrap();
            assert!(
                (got - (A[i] + B[i])).abs() < 1e-5,
                "slot {i}: expected {}, got {got}",
                A[i] + B[i]
            );
        }
    }

    #[test]
    fn test_two_batch_sum_through_cipher() {
        let pipeline = AggregationPipeline::new(CodecConfig::default(), IdentityCipher::new()).unwrap();
        let result = pipeline.verify(&[A.to_vec(), B.to_vec()], 1e-5).unwrap();
        assert!(result.failed_slots().is_empty());
        assert!(result.max_error() < 1e-5);
    }
}

// =============================================================================
// Section 5: Homomorphic Addition Without Cross-Slot Corruption
// =============================================================================

mod homomorphic_tests {
    use super::*;

    #[test]
    fn test_random_sums_never_corrupt_silently() {
        let codec = default_codec();
        let mut rng = ChaCha20Rng::seed_from_u64(500);
        let mut overflowed = 0;

        for _ in 0..200 {
            let a = random_array(&mut rng, -20.0, 20.0, 10).unwrap();
            let b = random_array(&mut rng, -20.0, 20.0, 10).unwrap();
            let sum = codec
                .add(&codec.bind(&a).unwrap(), &codec.bind(&b).unwrap())
                .unwrap();

            for i in 0..10 {
                let expected = a[i] + b[i];
                match codec.get(&sum, i) {
                    Ok(got) => assert!((got - expected).abs() < 1e-5),
                    Err(e) => {
                        assert!(e.is_overflow() || e.is_out_of_range());
                        assert!(expected.abs() > 20.0 - 1e-5, "in-range sum {expected} failed");
                        overflowed += 1;
                    }
                }
            }
        }
        // about a quarter of the sums leave the range
        assert!(overflowed > 0);
    }

    #[test]
    fn test_single_overflow_is_isolated() {
        let codec = default_codec();
        let mut a = A;
        let mut b = B;
        a[4] = 18.0;
        b[4] = 17.5;

        let sum = codec
            .add(&codec.bind(&a).unwrap(), &codec.bind(&b).unwrap())
            .unwrap();
        for i in 0..10 {
            let outcome = codec.get(&sum, i);
            if i == 4 {
                assert!(matches!(outcome, Err(BatchCryptError::Overflow { .. })));
            } else {
                assert!((outcome.unwrap() - (a[i] + b[i])).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_accumulate_up_to_carry_budget() {
        let codec = default_codec();
        let budget = codec.layout().carry_budget();
        let part: Vec<f64> = A.iter().map(|v| v / budget as f64).collect();
        let batch = codec.bind(&part).unwrap();

        let mut acc = batch.clone();
        for _ in 1..budget {
            codec.accumulate(&mut acc, &batch).unwrap();
        }
        assert_eq!(acc.cumulative_count(), budget);
        for (i, got) in codec.get_all(&acc).unwrap().into_iter().enumerate() {
            assert!((got - A[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_large_signed_sums_never_wrap_silently() {
        let codec = default_codec();
        let mut rng = ChaCha20Rng::seed_from_u64(501);

        for terms in 2..=6u64 {
            let parts: Vec<Vec<f64>> = (0..terms)
                .map(|_| random_array(&mut rng, 12.0, 20.0, 10).unwrap())
                .collect();
            let mut acc = codec.bind(&parts[0]).unwrap();
            for part in &parts[1..] {
                codec.accumulate(&mut acc, &codec.bind(part).unwrap()).unwrap();
            }

            // every sum exceeds the float range, so no slot may decode
            for i in 0..10 {
                let err = codec.get(&acc, i).unwrap_err();
                assert!(err.is_overflow() || err.is_out_of_range(), "{terms} terms: {err}");
                if terms > codec.layout().carry_budget() {
                    assert!(matches!(err, BatchCryptError::CarryBudgetExceeded { .. }));
                }
            }
        }
    }

    #[test]
    fn test_pipeline_refuses_rounds_past_budget() {
        let pipeline = AggregationPipeline::new(CodecConfig::default(), IdentityCipher::new()).unwrap();
        let arrays = vec![vec![1.0; 10]; 4];
        let result = pipeline.run(&arrays).unwrap();
        assert_eq!(result.failed_slots().len(), 10);
        assert!(pipeline.verify(&arrays, 1e-5).is_err());
    }
}

// =============================================================================
// Section 6: Aggregation Rounds
// =============================================================================

mod aggregation_tests {
    use super::*;

    #[test]
    fn test_four_clients() {
        // two padding bits only guard three signed terms
        let config = CodecConfig {
            sign_padding_bits: 3,
            ..Default::default()
        };
        let pipeline = AggregationPipeline::new(config, IdentityCipher::new()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(600);
        let arrays: Vec<Vec<f64>> = (0..4)
            .map(|_| random_array(&mut rng, -5.0, 5.0, 10).unwrap())
            .collect();
        let result = pipeline.verify(&arrays, 1e-5).unwrap();
        assert!(result.failed_slots().is_empty());
    }

    #[test]
    fn test_eight_clients_with_wider_carry() {
        let config = CodecConfig {
            carry_bits: 3,
            sign_padding_bits: 4,
            ..Default::default()
        };
        let pipeline = AggregationPipeline::new(config, IdentityCipher::new()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(601);
        let arrays: Vec<Vec<f64>> = (0..8)
            .map(|_| random_array(&mut rng, -2.5, 2.5, 10).unwrap())
            .collect();
        assert!(pipeline.verify(&arrays, 1e-5).unwrap().failed_slots().is_empty());
    }

    #[test]
    fn test_unsigned_codec_round() {
        let config = CodecConfig {
            signedness: Signedness::Unsigned,
            slot_count: 6,
            ..Default::default()
        };
        let pipeline = AggregationPipeline::new(config, IdentityCipher::new()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(602);
        let arrays: Vec<Vec<f64>> = (0..3)
            .map(|_| random_array(&mut rng, -6.0, 6.0, 6).unwrap())
            .collect();
        assert!(pipeline.verify(&arrays, 1e-5).unwrap().failed_slots().is_empty());
    }

    #[test]
    fn test_cipher_message_space_too_small() {
        let layout = CodecConfig::default().layout();
        let cipher = IdentityCipher::with_plaintext_bits(layout.total_bits() / 2);
        let pipeline = AggregationPipeline::new(CodecConfig::default(), cipher).unwrap();
        assert!(matches!(
            pipeline.run(&[A.to_vec(), B.to_vec()]),
            Err(HarnessError::Codec(BatchCryptError::Cipher(_)))
        ));
    }

    #[test]
    fn test_ragged_arrays_rejected() {
        let pipeline = AggregationPipeline::new(CodecConfig::default(), IdentityCipher::new()).unwrap();
        assert!(matches!(
            pipeline.run(&[A.to_vec(), B[..5].to_vec()]),
            Err(HarnessError::InvalidInput(_))
        ));
    }
}

// =============================================================================
// Section 7: Determinism & Reproducibility
// =============================================================================

mod determinism_tests {
    use super::*;

    #[test]
    fn test_same_seed_same_batch() {
        let codec = default_codec();
        let mut rng1 = ChaCha20Rng::seed_from_u64(700);
        let mut rng2 = ChaCha20Rng::seed_from_u64(700);
        let a = codec.bind(&random_array(&mut rng1, -20.0, 20.0, 10).unwrap()).unwrap();
        let b = codec.bind(&random_array(&mut rng2, -20.0, 20.0, 10).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_independent_codecs_agree() {
        // every party builds its own codec from the shared config
        let sender = default_codec();
        let receiver = default_codec();
        let bytes = sender.bind(&A).unwrap().to_bytes();
        let batch = receiver.from_bytes(&bytes, 1).unwrap();
        for (i, got) in receiver.get_all(&batch).unwrap().into_iter().enumerate() {
            assert!((got - A[i]).abs() < 1e-5);
        }
    }
}
