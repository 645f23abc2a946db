//! Property-based tests using proptest.
//!
//! These tests verify mathematical invariants hold across random inputs.
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

use izprime::bitmap::Bitmap;
use izprime::iz::{
    iz, matrix_of, modular_inverse, normalized_xp, solve_for_x, solve_for_y, x_of, S_PRIMES,
};
use izprime::sieve::sieve_eratosthenes;
use izprime::sieve_iz::{sieve_iz, sieve_izm};

// --- iZ algebra properties ---

proptest! {
    /// Every iZ value decomposes back into its (matrix, x) pair:
    /// x_of(iz(x, m)) == x and matrix_of(iz(x, m)) == m for all x >= 1.
    #[test]
    fn prop_iz_decomposition_round_trips(x in 1u64..1_000_000_000, plus in any::<bool>()) {
        let m = if plus { 1 } else { -1 };
        let z = iz(x, m);
        prop_assert_eq!(x_of(z), x);
        prop_assert_eq!(matrix_of(z), m);
    }

    /// solve_for_x returns the unique column in (0, p] meeting the marking
    /// congruence (x + vx·y) ≡ x_p (mod p).
    #[test]
    fn prop_solve_for_x_congruence(
        p_idx in 0usize..S_PRIMES.len(),
        vx_idx in 0usize..4,
        y in 1u64..100_000,
        plus in any::<bool>(),
    ) {
        let p = S_PRIMES[p_idx];
        let vx = [35u64, 385, 5_005, 1_616_615][vx_idx];
        let m = if plus { 1 } else { -1 };
        let x = solve_for_x(m, p, vx, y);
        prop_assert!(x >= 1 && x <= p, "x = {} outside (0, {}]", x, p);
        let lhs = ((x as u128 + vx as u128 * y as u128) % p as u128) as u64;
        prop_assert_eq!(lhs, normalized_xp(m, p) % p);
    }

    /// solve_for_y inverts solve_for_x: when p does not divide vx, the row
    /// it returns meets the same congruence, and rows are below p.
    #[test]
    fn prop_solve_for_y_congruence(
        p_idx in 0usize..S_PRIMES.len(),
        x in 0u64..100_000,
        plus in any::<bool>(),
    ) {
        let p = S_PRIMES[p_idx];
        let vx = 221u64; // 13·17, shares factors with only part of the table
        let m = if plus { 1 } else { -1 };
        match solve_for_y(m, p, vx, x) {
            None => prop_assert_eq!(vx % p, 0),
            Some(y) => {
                prop_assert!(y < p);
                let lhs = ((x as u128 + vx as u128 * y as u128) % p as u128) as u64;
                prop_assert_eq!(lhs, normalized_xp(m, p) % p);
            }
        }
    }

    /// a · a⁻¹ ≡ 1 (mod p) for prime p and a not divisible by p.
    #[test]
    fn prop_modular_inverse_product_is_one(
        p_idx in 0usize..S_PRIMES.len(),
        a in 1u64..1_000_000,
    ) {
        let p = S_PRIMES[p_idx];
        if a % p == 0 {
            prop_assert_eq!(modular_inverse(a, p), None);
        } else {
            let inv = modular_inverse(a, p).expect("prime modulus, a coprime");
            prop_assert_eq!((a as u128 * inv as u128 % p as u128) as u64, 1);
        }
    }
}

// --- Bitmap properties ---

proptest! {
    /// Bitmap → bit string → Bitmap is the identity.
    #[test]
    fn prop_bit_string_round_trip(bits in proptest::collection::vec(any::<bool>(), 1..512)) {
        let mut bitmap = Bitmap::new(bits.len() as u64).unwrap();
        for (i, &b) in bits.iter().enumerate() {
            if b {
                bitmap.set(i as u64);
            }
        }
        let s = bitmap.to_bit_string();
        let back = Bitmap::from_bit_string(&s).unwrap();
        prop_assert_eq!(back, bitmap);
    }

    /// clear_mod_p clears exactly the arithmetic progression, bounded by
    /// the inclusive limit.
    #[test]
    fn prop_clear_mod_p_strikes_exactly_the_progression(
        size in 64u64..2048,
        p in 1u64..97,
        start in 0u64..64,
    ) {
        let mut bitmap = Bitmap::new(size).unwrap();
        bitmap.set_all();
        let limit = size - 1;
        bitmap.clear_mod_p(p, start, limit);
        for i in 0..size {
            let struck = i >= start && (i - start) % p == 0;
            prop_assert_eq!(bitmap.get(i), !struck, "index {}", i);
        }
    }

    /// Tiling a pattern makes every copy identical to the original.
    #[test]
    fn prop_duplicate_segment_tiles(
        seg in proptest::collection::vec(any::<bool>(), 4..64),
        copies in 2u64..6,
    ) {
        let seg_len = seg.len() as u64;
        let mut bitmap = Bitmap::new(1 + seg_len * copies).unwrap();
        for (i, &b) in seg.iter().enumerate() {
            if b {
                bitmap.set(1 + i as u64);
            }
        }
        bitmap.duplicate_segment(1, seg_len, copies);
        for c in 0..copies {
            for i in 0..seg_len {
                prop_assert_eq!(
                    bitmap.get(1 + c * seg_len + i),
                    seg[i as usize],
                    "copy {} index {}",
                    c,
                    i
                );
            }
        }
    }
}

// --- Sieve agreement ---

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The iZ sieves agree with Eratosthenes at arbitrary bounds.
    #[test]
    fn prop_iz_sieves_match_eratosthenes(n in 2u64..3_000) {
        let reference = sieve_eratosthenes(n).unwrap();
        let a = sieve_iz(n).unwrap();
        let b = sieve_izm(n).unwrap();
        prop_assert_eq!(a.as_slice(), reference.as_slice());
        prop_assert_eq!(b.as_slice(), reference.as_slice());
    }

    /// Hash equality is sequence equality: two sieves at the same bound
    /// produce identical digests.
    #[test]
    fn prop_sieve_hashes_agree(n in 2u64..2_000) {
        let a = sieve_iz(n).unwrap();
        let b = sieve_izm(n).unwrap();
        prop_assert_eq!(a.sha256(), b.sha256());
    }
}
