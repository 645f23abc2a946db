//! # Sieve — Classical Baselines and the Integrity Driver
//!
//! The iZ sieves earn trust by agreeing bit-for-bit with the classical
//! algorithms. This module carries those baselines:
//!
//! - **Eratosthenes** (odd-skipping, 2p stride from p²),
//! - **Segmented Eratosthenes** (√n-sized windows, O(√n) memory),
//! - **Wheel** ({2, 3, 5} base, strikes from p² with a 2p stride),
//! - **Euler** (linear sieve: every composite struck exactly once by its
//!   smallest prime factor),
//! - **Atkin** (quadratic-form parity toggling, then square-multiple
//!   removal).
//!
//! Every sieve honours the same contract: ascending primes ≤ n, empty list
//! below 2, `Err` only on allocation failure.
//!
//! [`test_sieve_integrity`] runs a set of algorithms at one bound and
//! compares SHA-256 digests of the emitted sequences. The prime set is
//! canonical, so the digests must be identical; the first disagreeing
//! algorithm is reported by name. No tolerance.

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, info};

use crate::bitmap::Bitmap;
use crate::primes::PrimeList;
use crate::sieve_iz::{sieve_iz, sieve_izm};
use crate::{estimate_prime_count, isqrt};

/// All primes up to `n` by the sieve of Eratosthenes, skipping evens.
pub fn sieve_eratosthenes(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    let mut bits = Bitmap::new(n + 1)?;
    bits.set_all();
    let n_sqrt = isqrt(n);

    primes.push(2);
    let mut p = 3u64;
    while p <= n {
        if bits.get(p) {
            primes.push(p);
            if p <= n_sqrt {
                bits.clear_mod_p(2 * p, p * p, n);
            }
        }
        p += 2;
    }

    primes.shrink_to_fit();
    Ok(primes)
}

/// All primes up to `n` by a segmented Eratosthenes with √n-sized windows.
pub fn segmented_sieve(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    let segment_size = isqrt(n).max(2);

    // Root primes up to √n with a flat sieve.
    let mut bits = Bitmap::new(segment_size + 1)?;
    bits.set_all();
    primes.push(2);
    let mut p = 3u64;
    while p <= segment_size {
        if bits.get(p) {
            primes.push(p);
            let mut multiple = p * p;
            while multiple <= segment_size {
                bits.clear(multiple);
                multiple += 2 * p;
            }
        }
        p += 2;
    }

    // Walk the remaining range one window at a time.
    let mut low = segment_size + 1;
    while low <= n {
        let high = (low + segment_size - 1).min(n);
        bits.set_all();

        for i in 0..primes.len() {
            let p = primes.as_slice()[i];
            if p as u128 * p as u128 > high as u128 {
                break;
            }
            // first multiple of p inside [low, high], but never p itself
            let mut start = (low / p) * p;
            if start < low {
                start += p;
            }
            if start < p * p {
                start = p * p;
            }
            let mut j = start;
            while j <= high {
                if j % 2 != 0 {
                    bits.clear(j - low);
                }
                j += p;
            }
        }

        for i in low..=high {
            if i % 2 != 0 && bits.get(i - low) {
                primes.push(i);
            }
        }

        low = high + 1;
    }

    primes.shrink_to_fit();
    Ok(primes)
}

/// All primes up to `n` with a {2, 3, 5} wheel base.
pub fn sieve_wheel(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }
    if n < 7 {
        for p in [2u64, 3, 5] {
            if p <= n {
                primes.push(p);
            }
        }
        return Ok(primes);
    }

    primes.push(2);
    primes.push(3);
    primes.push(5);

    let mut bits = Bitmap::new(n + 1)?;
    bits.set_all();

    // base primes strike with their own stride
    for p in [2u64, 3, 5] {
        if p * p <= n {
            bits.clear_mod_p(p, p * p, n);
        }
    }

    let n_sqrt = isqrt(n);
    let mut p = 7u64;
    while p <= n_sqrt {
        if bits.get(p) {
            bits.clear_mod_p(2 * p, p * p, n);
        }
        p += 2;
    }

    let mut q = 7u64;
    while q <= n {
        if bits.get(q) {
            primes.push(q);
        }
        q += 2;
    }

    primes.shrink_to_fit();
    Ok(primes)
}

/// All primes up to `n` by the Euler (linear) sieve: each composite is
/// struck exactly once, by its smallest prime factor.
pub fn sieve_euler(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    let mut bits = Bitmap::new(n + 1)?;
    bits.set_all();

    primes.push(2);
    let mut i = 3u64;
    while i <= n {
        if bits.get(i) {
            primes.push(i);
        }
        // strike i·p for primes p ≤ smallest factor of i; evens are never
        // read, so index 0 (the prime 2) is skipped
        for j in 1..primes.len() {
            let p = primes.as_slice()[j];
            if p as u128 * i as u128 > n as u128 {
                break;
            }
            bits.clear(p * i);
            if i % p == 0 {
                break;
            }
        }
        i += 2;
    }

    primes.shrink_to_fit();
    Ok(primes)
}

/// All primes up to `n` by the sieve of Atkin.
///
/// Quadratic-form solution counts are accumulated modulo 2 (`flip`), then
/// multiples of surviving candidates ≥ 5 are removed from their squares.
pub fn sieve_atkin(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    primes.push(2);
    if n >= 3 {
        primes.push(3);
    }
    if n < 5 {
        return Ok(primes);
    }

    let mut bits = Bitmap::new(n + 1)?;
    let n_sqrt = isqrt(n) + 1;

    for x in 1..=n_sqrt {
        for y in 1..=n_sqrt {
            let num = 4 * x * x + y * y;
            if num <= n && (num % 12 == 1 || num % 12 == 5) {
                bits.flip(num);
            }
            let num = 3 * x * x + y * y;
            if num <= n && num % 12 == 7 {
                bits.flip(num);
            }
            if x > y {
                let num = 3 * x * x - y * y;
                if num <= n && num % 12 == 11 {
                    bits.flip(num);
                }
            }
        }
    }

    for i in 5..=n_sqrt {
        if bits.get(i) {
            bits.clear_mod_p(i, i * i, n);
        }
    }

    let mut i = 5u64;
    while i <= n {
        if bits.get(i) {
            primes.push(i);
        }
        i += 2;
    }

    primes.shrink_to_fit();
    Ok(primes)
}

/// A named sieve for the registry and the integrity driver.
#[derive(Clone, Copy)]
pub struct SieveAlgorithm {
    pub name: &'static str,
    pub run: fn(u64) -> Result<PrimeList>,
}

/// Every sieve in the crate, baselines first.
pub fn all_sieves() -> [SieveAlgorithm; 7] {
    [
        SieveAlgorithm {
            name: "Sieve of Eratosthenes",
            run: sieve_eratosthenes,
        },
        SieveAlgorithm {
            name: "Segmented Sieve",
            run: segmented_sieve,
        },
        SieveAlgorithm {
            name: "Wheel Sieve",
            run: sieve_wheel,
        },
        SieveAlgorithm {
            name: "Sieve of Euler",
            run: sieve_euler,
        },
        SieveAlgorithm {
            name: "Sieve of Atkin",
            run: sieve_atkin,
        },
        SieveAlgorithm {
            name: "Sieve-iZ",
            run: sieve_iz,
        },
        SieveAlgorithm {
            name: "Sieve-iZm",
            run: sieve_izm,
        },
    ]
}

/// Run every algorithm at bound `n` and compare the SHA-256 digests of the
/// emitted sequences. The prime set is canonical, so all digests must be
/// bit-identical; the first disagreeing algorithm is named in the error.
pub fn test_sieve_integrity(models: &[SieveAlgorithm], n: u64) -> Result<()> {
    ensure!(!models.is_empty(), "no sieve algorithms given");

    let mut reference: Option<(&'static str, [u8; 32])> = None;
    for model in models {
        let primes = (model.run)(n).with_context(|| format!("{} failed", model.name))?;
        let hash = primes.sha256();
        debug!(
            algorithm = model.name,
            count = primes.len(),
            last = primes.last(),
            "sieve completed"
        );
        match &reference {
            None => reference = Some((model.name, hash)),
            Some((first_name, first_hash)) => {
                if hash != *first_hash {
                    bail!(
                        "hash mismatch: {} disagrees with {} at n = {}",
                        model.name,
                        first_name,
                        n
                    );
                }
            }
        }
    }
    info!(n, models = models.len(), "all sieve hashes match");
    Ok(())
}
