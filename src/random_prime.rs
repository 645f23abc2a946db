//! # Random iZ-Prime — Parallel Search for Large Probable Primes
//!
//! Generates a random probable prime of an exact bit size inside a chosen
//! iZ matrix. The search space is an iZm column: fix a primorial vx and a
//! random column x coprime to vx, then walk the rows
//! `iZ(x + vx·y, matrix) = 6x + matrix + 6·vx·y`. Every prime dividing vx
//! is pre-excluded from the whole column, so the prime density along it is
//! several times that of random odd integers — the same effect the wheel
//! gives the sieves, transplanted to cryptographic sizes.
//!
//! The primorial is sized a few bits under the target so that an entire
//! run of rows carries exactly `bit_size` bits; a worker lifts its random
//! base into that window and steps one row at a time, restarting from a
//! fresh base if the window is exhausted. Candidates keep their residue
//! class: the result always satisfies z ≡ matrix (mod 6).
//!
//! ## Concurrency
//!
//! Workers share nothing but a result channel and a stop flag. Each owns a
//! private urandom-seeded RNG, searches independently, and publishes at
//! most one candidate. The coordinator consumes the first value, raises
//! the flag, and joins every worker before returning — cancellation is
//! cooperative (the flag is polled once per attempt) and idempotent, since
//! extra published values are simply dropped with the channel.
//!
//! This is a throughput tool, not a hardened key generator: candidates are
//! confirmed by Miller–Rabin only and no side-channel hygiene is attempted.

use anyhow::{anyhow, ensure, Result};
use rug::integer::{IsPrime, Order};
use rug::rand::RandState;
use rug::Integer;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::debug;

use crate::iz::compute_max_vx;
use crate::mr_screened_test;

/// How many +6 increments may be needed to make the column coprime to vx.
const COPRIME_PROBES: u32 = 10_000;

/// Per-worker Miller–Rabin attempt budget.
const SEARCH_ATTEMPTS: u64 = 1_000_000;

/// The primorial stays this many bits under the target so the window of
/// exact-bit-size rows spans at least 2^(margin−3) steps.
const WINDOW_MARGIN_BITS: u32 = 11;

/// Seed a GMP random state from /dev/urandom, falling back to the clock
/// when the device is unavailable.
fn seed_rand_state(state: &mut RandState) {
    let mut buf = [0u8; 32];
    let seeded = std::fs::File::open("/dev/urandom")
        .and_then(|mut f| f.read_exact(&mut buf))
        .is_ok();
    if !seeded {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        buf[..16].copy_from_slice(&nanos.to_le_bytes());
    }
    state.seed(&Integer::from_digits(&buf, Order::Lsf));
}

/// Pick a random column: candidate = iZ(x, matrix) for a random x below
/// vx, nudged forward until gcd(vx, candidate) = 1 so the column's rows
/// form a progression that actually contains primes.
fn random_base(matrix_id: i32, vx: &Integer, rng: &mut RandState) -> Integer {
    let x = vx.clone().random_below(rng);
    let mut candidate = Integer::from(&x * 6u32);
    candidate += matrix_id;
    for _ in 0..COPRIME_PROBES {
        candidate += 6u32;
        let g = Integer::from(candidate.gcd_ref(vx));
        if g == 1 {
            break;
        }
    }
    candidate
}

/// Walk rows of a random column inside [2^(bit_size−1), 2^bit_size),
/// Miller–Rabin-testing each candidate, until a prime appears, the stop
/// flag is raised, or the attempt budget runs out.
fn search_bit_window(
    matrix_id: i32,
    vx: &Integer,
    bit_size: u32,
    rounds: u32,
    stop: &AtomicBool,
    rng: &mut RandState,
) -> Option<Integer> {
    let step = Integer::from(vx * 6u32); // one iZm row
    let mut floor = Integer::from(1u32);
    floor <<= bit_size - 1;
    let ceiling = Integer::from(&floor * 2u32);

    let mut attempts: u64 = 0;
    while attempts < SEARCH_ATTEMPTS {
        let mut candidate = random_base(matrix_id, vx, rng);

        // lift to the first row whose value carries bit_size bits
        let deficit = Integer::from(&floor - &candidate);
        let (mut rows, rem) = deficit.div_rem(step.clone());
        if rem != 0 {
            rows += 1;
        }
        candidate += rows * &step;

        while candidate < ceiling {
            if stop.load(Ordering::Relaxed) {
                return None;
            }
            attempts += 1;
            if mr_screened_test(&candidate, rounds) != IsPrime::No {
                return Some(candidate);
            }
            if attempts >= SEARCH_ATTEMPTS {
                return None;
            }
            candidate += &step;
        }
        debug!("bit window exhausted without a prime, redrawing the base");
    }
    None
}

/// Generate a random probable prime with exactly `bit_size` bits in matrix
/// `p_id` ∈ {−1, +1}, confirmed by `rounds` Miller–Rabin rounds (0 selects
/// the default of 25), searching with `workers` parallel workers.
///
/// The result satisfies z ≡ p_id (mod 6). With fewer than two workers the
/// search runs in-process. An error is returned only if every worker
/// exhausts its attempt budget, which for realistic sizes does not happen.
pub fn random_izprime(p_id: i32, bit_size: u32, rounds: u32, workers: u32) -> Result<Integer> {
    ensure!(p_id == 1 || p_id == -1, "matrix id must be -1 or +1, got {}", p_id);
    ensure!(
        bit_size >= 64,
        "bit size {} is below the supported minimum of 64",
        bit_size
    );
    let rounds = if rounds == 0 { 25 } else { rounds };

    let vx = compute_max_vx(bit_size - WINDOW_MARGIN_BITS)?;
    debug!(
        bit_size,
        vx_bits = vx.significant_bits(),
        workers,
        "random iZ-prime search"
    );

    if workers < 2 {
        let stop = AtomicBool::new(false);
        let mut rng = RandState::new();
        seed_rand_state(&mut rng);
        return search_bit_window(p_id, &vx, bit_size, rounds, &stop, &mut rng)
            .ok_or_else(|| anyhow!("search budget exhausted without finding a prime"));
    }

    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<Integer>();

    let result = thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let stop = &stop;
            let vx = &vx;
            scope.spawn(move || {
                let mut rng = RandState::new();
                seed_rand_state(&mut rng);
                if let Some(prime) = search_bit_window(p_id, vx, bit_size, rounds, stop, &mut rng)
                {
                    if tx.send(prime).is_ok() {
                        debug!(worker, "worker published a prime");
                    }
                }
            });
        }
        drop(tx);

        // First value wins; the flag tells the rest to stand down, and the
        // scope joins every worker before we leave.
        let result = rx.recv();
        stop.store(true, Ordering::Relaxed);
        result
    });

    result.map_err(|_| anyhow!("all workers exhausted their search budgets"))
}
