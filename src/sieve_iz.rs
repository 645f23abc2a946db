//! # Sieve-iZ and Sieve-iZm — Prime Enumeration on the iZ Lattice
//!
//! Both sieves work in x-coordinates rather than natural numbers: two
//! bitmaps `x5` and `x7` track the candidacy of 6x − 1 and 6x + 1, so a
//! bound n costs n/3 bits instead of n.
//!
//! ## Sieve-iZ (classic)
//!
//! Single pass over x = 1 .. x_n with x_n = (n + 1)/6 + 1. A surviving bit
//! is a prime; if it is also a root prime (z < ⌈√n⌉) its composites are
//! struck immediately in both matrices. A prime z = 6x ∓ 1 marks its own
//! matrix from index z·x ± x and the opposite matrix from z·x ∓ x, stepping
//! by z. Emission order is ascending because 6x − 1 < 6x + 1 and all
//! smaller x are already settled.
//!
//! ## Sieve-iZm (segmented)
//!
//! The x-axis is cut into segments of primorial width vx. A pre-sieved
//! wheel segment (see [`crate::wheel`]) already excludes every multiple of
//! vx's factors, and because the pattern is periodic it is reused for every
//! segment: the scratch pair is reset by cloning, remaining root primes are
//! relocated with [`solve_for_x`], and survivors are emitted. Working
//! memory is two segment pairs (~2·vx bits) regardless of n.
//!
//! Products near the bound (`p²`, `y·vx`) are widened to u128; a 64-bit n
//! stays safe throughout.

use anyhow::Result;
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::iz::{compute_limited_vx, solve_for_x, S_PRIMES};
use crate::primes::PrimeList;
use crate::wheel::construct_izm_segment;
use crate::{estimate_prime_count, isqrt};

/// All primes up to `n` via the classic iZ sieve, ascending.
pub fn sieve_iz(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    // 2 and 3 are the only primes outside the iZ set
    primes.push(2);
    primes.push(3);

    let x_n = (n + 1) / 6 + 1;
    let mut x5 = Bitmap::new(x_n + 1)?;
    let mut x7 = Bitmap::new(x_n + 1)?;
    x5.set_all();
    x7.set_all();

    // upper bound for root primes
    let n_sqrt = isqrt(n) + 1;

    for x in 1..x_n {
        if x5.get(x) {
            let z = 6 * x - 1;
            primes.push(z);
            if z < n_sqrt {
                x5.clear_mod_p(z, z * x + x, x_n);
                x7.clear_mod_p(z, z * x - x, x_n);
            }
        }
        if x7.get(x) {
            let z = 6 * x + 1;
            primes.push(z);
            if z < n_sqrt {
                x5.clear_mod_p(z, z * x - x, x_n);
                x7.clear_mod_p(z, z * x + x, x_n);
            }
        }
    }

    // the last x column may overshoot the bound
    primes.pop_trailing_above(n);
    primes.shrink_to_fit();
    Ok(primes)
}

/// All primes up to `n` via the segmented iZm sieve, ascending. Working
/// memory is two primorial-sized segment pairs, independent of `n`.
pub fn sieve_izm(n: u64) -> Result<PrimeList> {
    let mut primes = PrimeList::with_estimate(estimate_prime_count(n))?;
    if n < 2 {
        return Ok(primes);
    }

    primes.push(2);
    primes.push(3);

    let x_n = (n + 1) / 6 + 1;
    let vx = compute_limited_vx(x_n, 6);
    debug!(n, vx, "segmented iZm sieve");

    // The wheel factors are prime and pre-excluded from every segment;
    // emit them here and remember where the remaining root primes start.
    let mut root_start = 2;
    for &q in S_PRIMES.iter() {
        if vx % q != 0 {
            break;
        }
        primes.push(q);
        root_start += 1;
    }

    let mut x5 = Bitmap::new(vx + 10)?;
    let mut x7 = Bitmap::new(vx + 10)?;
    construct_izm_segment(vx, &mut x5, &mut x7);

    let mut t5 = x5.clone();
    let mut t7 = x7.clone();

    // First segment: collects the root primes for all later segments, so
    // in-segment composites of fresh primes are struck as they appear.
    for x in 2..=vx {
        if t5.get(x) {
            let p = 6 * x - 1;
            primes.push(p);
            if (p as u128 * p as u128) / 6 < vx as u128 {
                t5.clear_mod_p(p, p * x + x, vx);
                t7.clear_mod_p(p, p * x - x, vx);
            }
        }
        if t7.get(x) {
            let p = 6 * x + 1;
            primes.push(p);
            if (p as u128 * p as u128) / 6 < vx as u128 {
                t5.clear_mod_p(p, p * x - x, vx);
                t7.clear_mod_p(p, p * x + x, vx);
            }
        }
    }

    // Remaining segments: reset scratch from the canonical pair, relocate
    // each live root prime, strike, emit.
    let max_y = x_n / vx;
    let mut limit = vx;
    for y in 1..=max_y {
        t5.copy_from(&x5);
        t7.copy_from(&x7);

        if y == max_y {
            limit = x_n % vx;
        }

        for i in root_start..primes.len() {
            let p = primes.as_slice()[i];
            // p has no composites in this segment once p² passes its end
            if (p as u128 * p as u128) / 6 > y as u128 * vx as u128 + limit as u128 {
                break;
            }
            let xp5 = solve_for_x(-1, p, vx, y);
            let xp7 = solve_for_x(1, p, vx, y);
            t5.clear_mod_p(p, xp5, limit);
            t7.clear_mod_p(p, xp7, limit);
        }

        let yvx = y * vx;
        for x in 1..=limit {
            if t5.get(x) {
                primes.push(6 * (x + yvx) - 1);
            }
            if t7.get(x) {
                primes.push(6 * (x + yvx) + 1);
            }
        }
    }

    primes.pop_trailing_above(n);
    primes.shrink_to_fit();
    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST_25: [u64; 25] = [
        2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83,
        89, 97,
    ];

    #[test]
    fn sieve_iz_first_25_primes() {
        let primes = sieve_iz(100).unwrap();
        assert_eq!(primes.as_slice(), &FIRST_25);
    }

    #[test]
    fn sieve_izm_first_25_primes() {
        let primes = sieve_izm(100).unwrap();
        assert_eq!(primes.as_slice(), &FIRST_25);
    }

    /// Boundary grid: the bound is inclusive and sub-iZ bounds must not
    /// leak the 2, 3 seeds or the wheel factors past n.
    #[test]
    fn sieve_iz_boundaries() {
        assert!(sieve_iz(0).unwrap().is_empty());
        assert!(sieve_iz(1).unwrap().is_empty());
        assert_eq!(sieve_iz(2).unwrap().as_slice(), &[2]);
        assert_eq!(sieve_iz(3).unwrap().as_slice(), &[2, 3]);
        assert_eq!(sieve_iz(4).unwrap().as_slice(), &[2, 3]);
        assert_eq!(sieve_iz(5).unwrap().as_slice(), &[2, 3, 5]);
        assert_eq!(sieve_iz(6).unwrap().as_slice(), &[2, 3, 5]);
        assert_eq!(sieve_iz(7).unwrap().as_slice(), &[2, 3, 5, 7]);
    }

    #[test]
    fn sieve_izm_boundaries() {
        assert!(sieve_izm(0).unwrap().is_empty());
        assert!(sieve_izm(1).unwrap().is_empty());
        assert_eq!(sieve_izm(2).unwrap().as_slice(), &[2]);
        assert_eq!(sieve_izm(3).unwrap().as_slice(), &[2, 3]);
        assert_eq!(sieve_izm(4).unwrap().as_slice(), &[2, 3]);
        assert_eq!(sieve_izm(5).unwrap().as_slice(), &[2, 3, 5]);
        assert_eq!(sieve_izm(10).unwrap().as_slice(), &[2, 3, 5, 7]);
    }

    /// π(n) values from the standard tables.
    #[test]
    fn sieve_iz_known_counts() {
        assert_eq!(sieve_iz(100).unwrap().len(), 25);
        assert_eq!(sieve_iz(1_000).unwrap().len(), 168);
        assert_eq!(sieve_iz(10_000).unwrap().len(), 1_229);
        assert_eq!(sieve_iz(100_000).unwrap().len(), 9_592);
    }

    #[test]
    fn sieve_izm_known_counts() {
        assert_eq!(sieve_izm(1_000).unwrap().len(), 168);
        assert_eq!(sieve_izm(10_000).unwrap().len(), 1_229);
        assert_eq!(sieve_izm(100_000).unwrap().len(), 9_592);
    }

    #[test]
    fn sieve_izm_at_a_million() {
        let primes = sieve_izm(1_000_000).unwrap();
        assert_eq!(primes.len(), 78_498);
        assert_eq!(primes.last(), Some(999_983));
    }

    /// A bound below 6·vx exercises the first-segment-only path.
    #[test]
    fn sieve_izm_below_one_segment() {
        let a = sieve_izm(200).unwrap();
        let b = sieve_iz(200).unwrap();
        assert_eq!(a, b);
    }

    /// The two iZ variants must agree exactly, including at bounds sitting
    /// on iZ values and segment edges.
    #[test]
    fn variants_agree_across_awkward_bounds() {
        for n in [
            5u64, 6, 7, 25, 35, 36, 209, 210, 211, 2_309, 2_310, 2_311, 30_029, 30_030, 30_031,
            65_536,
        ] {
            let a = sieve_iz(n).unwrap();
            let b = sieve_izm(n).unwrap();
            assert_eq!(a, b, "disagreement at n = {}", n);
        }
    }

    #[test]
    fn variants_agree_on_hashes() {
        let a = sieve_iz(250_000).unwrap();
        let b = sieve_izm(250_000).unwrap();
        assert_eq!(a.sha256(), b.sha256());
    }

    #[test]
    fn emission_is_strictly_ascending() {
        let primes = sieve_izm(50_000).unwrap();
        for w in primes.as_slice().windows(2) {
            assert!(w[0] < w[1], "order violated: {} then {}", w[0], w[1]);
        }
    }
}
