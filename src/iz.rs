//! # iZ Algebra — Arithmetic of the 6x ± 1 Lattice
//!
//! Pure functions mapping between natural numbers and (matrix, x) pairs with
//! matrix ∈ {−1, +1} and `iZ(x, matrix) = 6x + matrix`. Every marking
//! decision in the iZ sieves reduces to one of four operations:
//!
//! 1. `normalized_xp` — the x-coordinate in a target matrix at which a prime
//!    p begins marking. A prime p = 6x₀ ± 1 strikes its own matrix starting
//!    at x₀ and the opposite matrix starting at p·x₀ − x₀ ≡ p − x₀ (mod p).
//! 2. `solve_for_x` — the first in-segment multiple: the smallest x in
//!    (0, p] with (x + vx·y) ≡ x_p (mod p), closed form
//!    p − ((vx·y − x_p) mod p).
//! 3. `solve_for_y` — the dual: which segment row first contains a multiple
//!    at column x. Needs the modular inverse of vx, so it only exists when
//!    p ∤ vx; the absent case is an explicit `None`.
//! 4. `compute_limited_vx` / `compute_max_vx` — primorial sizing for segment
//!    widths and for the random-prime lattice.
//!
//! Isolating these keeps the bit-manipulation loops free of number theory.
//! The `_big` variants mirror the u64 forms for arbitrary-precision segment
//! indices (the vx6 micro-sieve addresses segments far beyond 2^64).

use anyhow::{ensure, Result};
use rug::Integer;

use crate::wheel::cached_vx6_primes;

/// The iZ primes below 100, the factor pool for every primorial in the
/// library (5 and 7 seed the minimum wheel, the rest extend it).
pub const S_PRIMES: [u64; 23] = [
    5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Compute 6x + matrix for matrix ∈ {−1, +1} and x ≥ 1.
#[inline]
pub fn iz(x: u64, matrix: i32) -> u64 {
    debug_assert!(matrix == -1 || matrix == 1, "matrix must be -1 or 1");
    debug_assert!(x > 0, "x must be greater than 0");
    if matrix > 0 {
        6 * x + 1
    } else {
        6 * x - 1
    }
}

/// Arbitrary-precision form of [`iz`].
#[inline]
pub fn iz_big(x: &Integer, matrix: i32) -> Integer {
    debug_assert!(matrix == -1 || matrix == 1, "matrix must be -1 or 1");
    debug_assert!(x.cmp0() == std::cmp::Ordering::Greater, "x must be positive");
    let mut z = Integer::from(x * 6u32);
    if matrix > 0 {
        z += 1;
    } else {
        z -= 1;
    }
    z
}

/// The matrix a prime p > 3 lives in: +1 if p ≡ 1 (mod 6), else −1.
#[inline]
pub fn matrix_of(p: u64) -> i32 {
    if p % 6 == 1 {
        1
    } else {
        -1
    }
}

/// A prime's x-coordinate, (p + 1) / 6. Exact for both matrices since
/// (6x − 1 + 1)/6 = x and (6x + 1 + 1)/6 = x under floor division.
#[inline]
pub fn x_of(p: u64) -> u64 {
    (p + 1) / 6
}

/// The x-coordinate in `matrix_id` at which prime p begins marking: x₀ when
/// the target matrix is p's own, p − x₀ for the opposite matrix.
#[inline]
pub fn normalized_xp(matrix_id: i32, p: u64) -> u64 {
    debug_assert!(matrix_id == -1 || matrix_id == 1);
    let x_p = x_of(p);
    let p_id = matrix_of(p);
    if matrix_id < 0 {
        if p_id < 0 {
            x_p
        } else {
            p - x_p
        }
    } else if p_id < 0 {
        p - x_p
    } else {
        x_p
    }
}

/// Smallest x in (0, p] such that (x + vx·y) ≡ x_p (mod p), i.e. the first
/// column of segment y holding a multiple of p in `matrix_id`.
#[inline]
pub fn solve_for_x(matrix_id: i32, p: u64, vx: u64, y: u64) -> u64 {
    let x_p = normalized_xp(matrix_id, p);
    let vxy_mod = ((vx as u128 * y as u128) % p as u128) as u64;
    let r = (vxy_mod + p - x_p % p) % p;
    p - r
}

/// [`solve_for_x`] for segment rows beyond 2^64.
pub fn solve_for_x_big(matrix_id: i32, p: u64, vx: u64, y: &Integer) -> u64 {
    let x_p = normalized_xp(matrix_id, p);
    let mut t = Integer::from(y * vx);
    t -= x_p;
    t %= p;
    if t.cmp0() == std::cmp::Ordering::Less {
        t += p;
    }
    let r = t.to_u64().expect("residue fits u64");
    p - r
}

/// Smallest y such that (x + vx·y) ≡ x_p (mod p), or `None` when p | vx
/// (the column never meets a multiple of p).
pub fn solve_for_y(matrix_id: i32, p: u64, vx: u64, x: u64) -> Option<u64> {
    if vx % p == 0 {
        return None;
    }
    let x_p = normalized_xp(matrix_id, p);
    if x % p == x_p % p {
        return Some(0);
    }
    let delta = (x_p % p + p - x % p) % p;
    let inv = modular_inverse(vx % p, p)?;
    Some(((delta as u128 * inv as u128) % p as u128) as u64)
}

/// Multiplicative inverse of a modulo m via the extended Euclidean
/// algorithm. `None` when gcd(a, m) ≠ 1.
pub fn modular_inverse(a: u64, m: u64) -> Option<u64> {
    if m == 0 {
        return None;
    }
    if m == 1 {
        return Some(0);
    }
    let (mut r0, mut r1) = (m as i128, (a % m) as i128);
    let (mut t0, mut t1) = (0i128, 1i128);
    while r1 != 0 {
        let q = r0 / r1;
        (r0, r1) = (r1, r0 - q * r1);
        (t0, t1) = (t1, t0 - q * t1);
    }
    if r0 != 1 {
        return None;
    }
    Some(t0.rem_euclid(m as i128) as u64)
}

/// Segment width for a sieve over x ∈ [0, x_n): grow the primorial from
/// 35 = 5·7 by successive iZ primes while the next step stays below x_n / 2,
/// consuming at most `limit` factor slots.
pub fn compute_limited_vx(x_n: u64, limit: usize) -> u64 {
    let mut vx = 35u64;
    let mut i = 2; // 5 and 7 already consumed
    while i < limit && vx * S_PRIMES[i] < x_n / 2 {
        vx *= S_PRIMES[i];
        i += 1;
    }
    vx
}

/// The largest primorial 5·7·11·… whose bit length stays below `bit_size`:
/// grow until the size is reached, then back off the last factor.
pub fn compute_max_vx(bit_size: u32) -> Result<Integer> {
    let primes = cached_vx6_primes()?;
    let ps = primes.as_slice();
    let mut i = 2; // skip 2 and 3
    let mut vx = Integer::from(ps[i]);
    while vx.significant_bits() < bit_size {
        i += 1;
        ensure!(
            i < ps.len(),
            "primorial of the cached prime table has fewer than {} bits",
            bit_size
        );
        vx *= ps[i];
    }
    vx /= ps[i];
    Ok(vx)
}
