//! # PrimeList — Append-Only Ascending Prime Sequence
//!
//! Every sieve produces one of these: distinct 64-bit primes in strictly
//! ascending insertion order. The only retraction allowed is dropping a
//! trailing overshoot past the sieve bound (segmented sieves collect whole
//! segments and trim afterwards).
//!
//! The content hash is a SHA-256 over the packed little-endian u64 values;
//! two sieves agree exactly when their hashes agree, which is what the
//! integrity driver compares. The file format is
//! `{u32 count, u64[count], 32-byte SHA-256}` and reads reject payloads
//! whose recomputed digest differs.

use anyhow::{bail, ensure, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Ascending list of primes as emitted by a sieve.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PrimeList {
    items: Vec<u64>,
}

impl PrimeList {
    /// Create with a capacity estimate (≈ 1.5 · n / ln n for a bound n).
    /// Allocation failure is an `Err`, not an abort.
    pub fn with_estimate(estimate: usize) -> Result<Self> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(estimate.max(8))
            .context("allocation failed for prime list")?;
        Ok(PrimeList { items })
    }

    /// Append a prime. Callers rely on insertion order being ascending.
    #[inline]
    pub fn push(&mut self, p: u64) {
        self.items.push(p);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<u64> {
        self.items.last().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.items
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Drop trailing primes greater than `n`. Segment-granular sieves
    /// over-collect past the bound; this is the only permitted retraction.
    pub fn pop_trailing_above(&mut self, n: u64) {
        while self.items.last().is_some_and(|&p| p > n) {
            self.items.pop();
        }
    }

    /// Tighten capacity to the final count.
    pub fn shrink_to_fit(&mut self) {
        self.items.shrink_to_fit();
    }

    /// SHA-256 over the packed little-endian u64 values.
    pub fn sha256(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for &p in &self.items {
            hasher.update(p.to_le_bytes());
        }
        hasher.finalize().into()
    }

    /// Write `{u32 count, u64[count], 32-byte SHA-256}` to `path`.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let count = u32::try_from(self.items.len()).context("prime count exceeds u32")?;
        let mut out = Vec::with_capacity(4 + self.items.len() * 8 + 32);
        out.extend_from_slice(&count.to_le_bytes());
        for &p in &self.items {
            out.extend_from_slice(&p.to_le_bytes());
        }
        out.extend_from_slice(&self.sha256());
        fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Read a list written by [`PrimeList::write_file`], validating the
    /// embedded digest.
    pub fn read_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        ensure!(data.len() >= 4 + 32, "prime list file too short");
        let count = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
        ensure!(
            data.len() == 4 + count * 8 + 32,
            "prime list file length mismatch for count {}",
            count
        );
        let mut list = PrimeList::with_estimate(count)?;
        for chunk in data[4..4 + count * 8].chunks_exact(8) {
            list.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }
        let stored: [u8; 32] = data[4 + count * 8..].try_into().unwrap();
        if list.sha256() != stored {
            bail!("corrupted data: SHA-256 mismatch in {}", path.display());
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a PrimeList {
    type Item = &'a u64;
    type IntoIter = std::slice::Iter<'a, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
