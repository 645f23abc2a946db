//! # izprime — Core Library
//!
//! Prime sieves and random large-prime generation built on the iZ set: every
//! prime p > 3 has the form 6x ± 1, so two bitmaps indexed by x (one per
//! sign, called the iZ− and iZ+ matrices) cover the whole candidate space
//! with n/3 bits.
//!
//! ## Module Organization
//!
//! **Sieve modules** (prime enumeration up to a bound):
//! - [`sieve`] — classical baselines (Eratosthenes, segmented, wheel, Euler,
//!   Atkin), the [`sieve::SieveAlgorithm`] registry, and the integrity driver
//!   that cross-checks every algorithm's output hash.
//! - [`sieve_iz`] — the classic Sieve-iZ (single pass over both matrices) and
//!   the segmented Sieve-iZm whose working memory is independent of n.
//! - [`wheel`] — pre-sieved iZm segment construction by successive primorial
//!   duplication, plus the process-wide caches shared by the segmented
//!   consumers.
//! - [`vx6`] — the fixed-primorial micro-sieve that emits prime gaps for an
//!   arbitrary-precision segment index, with a sealed binary file format.
//!
//! **Infrastructure modules**:
//! - [`bitmap`] — packed bit array with the mark-composites primitive.
//! - [`primes`] — append-only ascending prime list with content hashing.
//! - [`iz`] — the pure arithmetic of the 6x ± 1 lattice: coordinate
//!   normalisation, first-multiple location, primorial sizing.
//! - [`random_prime`] — multi-worker probabilistic search for large primes in
//!   a random iZm column.
//!
//! ## Shared Utilities
//!
//! - `mr_screened_test`: two-round Miller–Rabin pre-screen before full rounds.
//! - `estimate_prime_count`: capacity estimate from n / ln n.
//! - `isqrt`: exact integer square root for sieve bounds.
//!
//! ## Design Philosophy
//!
//! The sieves are single-threaded and allocation-honest: the two big buffers
//! (bitmap words, prime list) reserve through `try_reserve` so an allocation
//! failure surfaces as an `Err` instead of an abort. Structural invariants
//! (matrix ∈ {−1,+1}, x > 0, in-bounds duplication) are assertions. The only
//! parallel component is the random-prime generator, whose workers share
//! nothing but a result channel and a stop flag.

pub mod bitmap;
pub mod iz;
pub mod primes;
pub mod random_prime;
pub mod sieve;
pub mod sieve_iz;
pub mod vx6;
pub mod wheel;

use anyhow::{Context, Result};
use rug::integer::IsPrime;
use rug::Integer;
use std::path::Path;

pub use bitmap::Bitmap;
pub use primes::PrimeList;

/// Two-round Miller–Rabin pre-screening: run 2 fast rounds first, full rounds
/// only for survivors. Composites are rejected far faster since almost all
/// fail within 2 rounds.
#[inline]
pub fn mr_screened_test(candidate: &Integer, mr_rounds: u32) -> IsPrime {
    if mr_rounds > 2 && candidate.is_probably_prime(2) == IsPrime::No {
        return IsPrime::No;
    }
    candidate.is_probably_prime(mr_rounds)
}

/// Capacity estimate for a prime list up to `n`: 1.5 · n / ln n.
///
/// The prime counting function π(n) ~ n / ln n undercounts for small n, so
/// the 1.5 factor keeps appends from reallocating mid-sieve.
#[inline]
pub fn estimate_prime_count(n: u64) -> usize {
    if n < 10 {
        return 8;
    }
    let nf = n as f64;
    (1.5 * nf / nf.ln()) as usize + 1
}

/// Integer square root, exact for all u64 values.
///
/// Starts from the f64 approximation and corrects with checked
/// multiplication, which stays accurate where the float mantissa runs out.
#[inline]
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

/// Create an output directory on demand, mode 0700 on unix.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(path)
        .with_context(|| format!("failed to create output directory {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mr_screened_test_known_primes_pass() {
        let primes: &[u32] = &[2, 3, 5, 7, 11, 13, 101, 1009, 10007];
        for &p in primes {
            let n = Integer::from(p);
            assert_ne!(
                mr_screened_test(&n, 25),
                IsPrime::No,
                "MR rejected known prime {}",
                p
            );
        }
    }

    #[test]
    fn mr_screened_test_known_composites_fail() {
        let composites: &[u32] = &[4, 6, 8, 9, 15, 21, 25, 100, 1001, 10000];
        for &c in composites {
            let n = Integer::from(c);
            assert_eq!(
                mr_screened_test(&n, 25),
                IsPrime::No,
                "MR accepted composite {}",
                c
            );
        }
    }

    #[test]
    fn mr_screened_test_two_rounds_still_rejects_composites() {
        // With mr_rounds <= 2 the pre-screen is skipped (straight to full test)
        for &c in &[9u32, 15, 21, 25, 1001] {
            assert_eq!(mr_screened_test(&Integer::from(c), 2), IsPrime::No);
        }
    }

    #[test]
    fn isqrt_exact_values() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(10_000_000_000), 100_000);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn isqrt_is_floor_sqrt() {
        for n in 0..10_000u64 {
            let r = isqrt(n);
            assert!(r * r <= n, "isqrt({}) = {} overshoots", n, r);
            assert!((r + 1) * (r + 1) > n, "isqrt({}) = {} undershoots", n, r);
        }
    }

    #[test]
    fn estimate_prime_count_covers_pi_n() {
        // The estimate must stay above the true π(n) so sieves never realloc
        let known: &[(u64, usize)] = &[(100, 25), (1_000, 168), (10_000, 1_229), (100_000, 9_592)];
        for &(n, pi) in known {
            assert!(
                estimate_prime_count(n) >= pi,
                "estimate for {} below π(n)",
                n
            );
        }
    }

    #[test]
    fn ensure_output_dir_creates_and_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("output").join("izm");
        ensure_output_dir(&target).unwrap();
        assert!(target.is_dir());
        ensure_output_dir(&target).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }
}
