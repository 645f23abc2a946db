//! # Wheel — Pre-Sieved iZm Segment Construction
//!
//! Builds the periodic bit pattern both segmented consumers start from: a
//! segment of primorial length vx in which a bit survives iff its 6x ± 1
//! value is coprime to every prime dividing vx. Construction is by
//! successive duplication — seed the 35 = 5·7 pattern directly from the
//! residue definition, then for each further factor q tile the current
//! pattern q times and strike q's two progressions in the extended range.
//!
//! The segment tiles the whole x-axis: segment y of the iZm sieve and the
//! vx6 micro-sieve both clone it instead of re-marking the wheel primes.
//!
//! Process-wide holders cache the vx6-sized artefacts (the prime list below
//! vx6 and the pre-sieved segment pair). They initialise once behind a
//! `OnceLock` and are never mutated after publication, so concurrent readers
//! need no locking.

use anyhow::Result;
use std::sync::OnceLock;
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::iz::S_PRIMES;
use crate::primes::PrimeList;
use crate::sieve_iz::sieve_iz;
use crate::vx6::VX6;

/// Seed the primorial-35 pattern. For i in [1, 35]: `x5[i]` survives iff
/// 6i − 1 is coprime to 35, which in residue form is (i−1) mod 5 ≠ 0 and
/// (i+1) mod 7 ≠ 0; `x7` is the mirror for 6i + 1.
pub fn construct_vx2(x5: &mut Bitmap, x7: &mut Bitmap) {
    for i in 1..=35u64 {
        if (i - 1) % 5 != 0 && (i + 1) % 7 != 0 {
            x5.set(i);
        }
        if (i + 1) % 5 != 0 && (i - 1) % 7 != 0 {
            x7.set(i);
        }
    }
}

/// Construct the pre-sieved segment of length `vx` in both bitmaps.
///
/// `vx` must be a primorial drawn from [`S_PRIMES`] starting at 35 = 5·7,
/// and the bitmaps must hold at least vx + 2 bits. Afterwards every set bit
/// x in [1, vx] corresponds to a 6x ± 1 value coprime to all of vx's
/// factors.
pub fn construct_izm_segment(vx: u64, x5: &mut Bitmap, x7: &mut Bitmap) {
    let mut cur = 35u64;
    construct_vx2(x5, x7);

    let mut idx = 2; // 5 and 7 are in the seed
    while idx < S_PRIMES.len() && vx % S_PRIMES[idx] == 0 {
        let q = S_PRIMES[idx];
        idx += 1;

        let x_q = (q + 1) / 6;

        // Tile the current pattern q times, then extend by factor q.
        x5.duplicate_segment(1, cur, q);
        x7.duplicate_segment(1, cur, q);
        cur *= q;

        // Strike q's progressions over the new length. q marks its own
        // matrix from x_q and the opposite matrix from q·x_q − x_q.
        if q % 6 == 1 {
            x5.clear_mod_p(q, q * x_q - x_q, cur + 1);
            x7.clear_mod_p(q, x_q, cur + 1);
        } else {
            x5.clear_mod_p(q, x_q, cur + 1);
            x7.clear_mod_p(q, q * x_q - x_q, cur + 1);
        }
    }
    debug!(vx, "constructed pre-sieved iZm segment");
}

/// Survivor and pair statistics for a pre-sieved or fully sieved segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VxStats {
    /// Survivors in the iZ− matrix.
    pub iz5: u64,
    /// Survivors in the iZ+ matrix.
    pub iz7: u64,
    /// Total survivors.
    pub total: u64,
    /// Twin pairs: both matrices survive at the same x.
    pub twins: u64,
    /// Cousin pairs: iZ− at x with iZ+ at x − 1.
    pub cousins: u64,
    /// Sexy pairs: same matrix surviving at x and x − 1.
    pub sexy: u64,
}

/// Count survivors and prime-pair shapes over x in [1, vx].
pub fn vx_stats(vx: u64, x5: &Bitmap, x7: &Bitmap) -> VxStats {
    let mut stats = VxStats::default();
    for x in 1..=vx {
        let in5 = x5.get(x);
        let in7 = x7.get(x);
        if in5 {
            stats.iz5 += 1;
        }
        if in7 {
            stats.iz7 += 1;
        }
        if in5 && in7 {
            stats.twins += 1;
        }
        if in5 && x7.get(x - 1) {
            stats.cousins += 1;
        }
        if in5 && x5.get(x - 1) {
            stats.sexy += 1;
        }
        if in7 && x7.get(x - 1) {
            stats.sexy += 1;
        }
    }
    stats.total = stats.iz5 + stats.iz7;
    stats
}

static VX6_PRIMES: OnceLock<PrimeList> = OnceLock::new();
static VX6_WHEEL: OnceLock<(Bitmap, Bitmap)> = OnceLock::new();

/// All primes up to vx6, sieved once per process and shared read-only.
pub fn cached_vx6_primes() -> Result<&'static PrimeList> {
    if let Some(list) = VX6_PRIMES.get() {
        return Ok(list);
    }
    let list = sieve_iz(VX6)?;
    debug!(count = list.len(), "cached prime list up to vx6");
    Ok(VX6_PRIMES.get_or_init(|| list))
}

/// The pre-sieved vx6 segment pair, constructed once per process and shared
/// read-only. Consumers clone it into scratch instead of mutating it.
pub fn cached_vx6_wheel() -> Result<&'static (Bitmap, Bitmap)> {
    if let Some(pair) = VX6_WHEEL.get() {
        return Ok(pair);
    }
    let mut x5 = Bitmap::new(VX6 + 100)?;
    let mut x7 = Bitmap::new(VX6 + 100)?;
    construct_izm_segment(VX6, &mut x5, &mut x7);
    Ok(VX6_WHEEL.get_or_init(|| (x5, x7)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }

    /// The seed pattern must equal the residue definition directly: bit x of
    /// x5 set iff gcd(6x − 1, 35) = 1, bit x of x7 iff gcd(6x + 1, 35) = 1.
    #[test]
    fn seed_matches_the_coprimality_definition() {
        let mut x5 = Bitmap::new(40).unwrap();
        let mut x7 = Bitmap::new(40).unwrap();
        construct_vx2(&mut x5, &mut x7);
        for x in 1..=35u64 {
            assert_eq!(
                x5.get(x),
                gcd(6 * x - 1, 35) == 1,
                "x5 wrong at x = {}",
                x
            );
            assert_eq!(x7.get(x), gcd(6 * x + 1, 35) == 1, "x7 wrong at x = {}", x);
        }
        assert!(!x5.get(0));
        assert!(!x7.get(0));
    }

    /// The 6x ± 1 survivors of the 35-wheel are exactly the residues
    /// coprime to 30·35 in classic wheel-30 terms; counting them: 24 per
    /// matrix, 48 in total.
    #[test]
    fn seed_survivor_counts() {
        let mut x5 = Bitmap::new(40).unwrap();
        let mut x7 = Bitmap::new(40).unwrap();
        construct_vx2(&mut x5, &mut x7);
        let stats = vx_stats(35, &x5, &x7);
        assert_eq!(stats.iz5, 24);
        assert_eq!(stats.iz7, 24);
        assert_eq!(stats.total, 48);
    }

    /// Extending to vx = 385 = 5·7·11 must preserve the defining property
    /// at every position of the longer pattern.
    #[test]
    fn extended_wheel_matches_the_coprimality_definition() {
        let vx = 385u64;
        let mut x5 = Bitmap::new(vx + 10).unwrap();
        let mut x7 = Bitmap::new(vx + 10).unwrap();
        construct_izm_segment(vx, &mut x5, &mut x7);
        for x in 1..=vx {
            assert_eq!(
                x5.get(x),
                gcd(6 * x - 1, vx) == 1,
                "x5 wrong at x = {}",
                x
            );
            assert_eq!(x7.get(x), gcd(6 * x + 1, vx) == 1, "x7 wrong at x = {}", x);
        }
    }

    #[test]
    fn full_budget_wheel_matches_on_a_sample() {
        let vx = VX6;
        let mut x5 = Bitmap::new(vx + 10).unwrap();
        let mut x7 = Bitmap::new(vx + 10).unwrap();
        construct_izm_segment(vx, &mut x5, &mut x7);
        // exhaustive over the head plus a stride through the body
        for x in (1..=1000u64).chain((1001..=vx).step_by(997)) {
            assert_eq!(x5.get(x), gcd(6 * x - 1, vx) == 1, "x5 wrong at {}", x);
            assert_eq!(x7.get(x), gcd(6 * x + 1, vx) == 1, "x7 wrong at {}", x);
        }
    }

    /// x = 1, 2, 3 always fall to the wheel: 5, 11, 17 divide the iZ−
    /// values and 7, 13, 19 the iZ+ values.
    #[test]
    fn low_columns_never_survive_the_vx6_wheel() {
        let (x5, x7) = cached_vx6_wheel().unwrap();
        for x in 1..=3u64 {
            assert!(!x5.get(x), "x5 survived at {}", x);
            assert!(!x7.get(x), "x7 survived at {}", x);
        }
        assert!(x5.get(4)); // 23 is coprime to vx6
    }

    #[test]
    fn cached_primes_start_canonically() {
        let primes = cached_vx6_primes().unwrap();
        assert_eq!(&primes.as_slice()[..9], &[2, 3, 5, 7, 11, 13, 17, 19, 23]);
        assert_eq!(primes.len(), 122_300); // π(vx6)
        assert_eq!(primes.last(), Some(1_616_611));
        // the holder hands out the same allocation every time
        let again = cached_vx6_primes().unwrap();
        assert!(std::ptr::eq(primes, again));
    }
}
