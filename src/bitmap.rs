//! # Bitmap — Packed Bit Array for Sieve Segments
//!
//! 8× memory reduction over `Vec<bool>`: bit `i` is stored in word `i / 64`
//! at position `i % 64`, which in byte terms puts bit `i` in byte `i / 8` at
//! position `i % 8` (words serialise little-endian). A set bit means the
//! index is still a prime candidate; a clear bit means it was eliminated.
//!
//! The module knows nothing about primes. It provides exactly the primitives
//! the sieves are written in:
//!
//! - `clear_mod_p` — clear an arithmetic progression of indices, the
//!   mark-composites operation every sieve reduces to;
//! - `copy_bits` / `duplicate_segment` — bit-exact range copy and rightward
//!   tiling, used to grow a wheel pattern by one primorial factor;
//! - bit-string and checksummed-file round trips for persistence and
//!   cross-validation.
//!
//! The single-bit accessors carry `debug_assert!` bounds guards only; they
//! sit in the innermost sieve loops and callers own the bounds. The file
//! format is `{u64 size, packed bytes, 32-byte SHA-256}` and reads reject
//! any payload whose recomputed digest differs.

use anyhow::{bail, ensure, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Fixed-size packed bit array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<u64>,
    size: u64,
}

impl Bitmap {
    /// Create a bitmap of `size` bits, all clear.
    ///
    /// Fails on `size == 0` and on allocation failure (the word buffer is
    /// reserved through `try_reserve_exact`).
    pub fn new(size: u64) -> Result<Self> {
        if size == 0 {
            bail!("cannot create a bitmap of size 0");
        }
        let num_words = (size as usize).div_ceil(64);
        let mut words = Vec::new();
        words
            .try_reserve_exact(num_words)
            .with_context(|| format!("allocation failed for {}-bit bitmap", size))?;
        words.resize(num_words, 0u64);
        Ok(Bitmap { words, size })
    }

    /// Number of bits.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Set every bit to 1.
    pub fn set_all(&mut self) {
        self.words.fill(u64::MAX);
        self.mask_tail();
    }

    /// Clear every bit to 0.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    // Bits past `size` in the last word stay clear so count_ones and the
    // serialised byte image are stable.
    fn mask_tail(&mut self) {
        let extra = self.words.len() as u64 * 64 - self.size;
        if extra > 0 {
            let last = self.words.len() - 1;
            self.words[last] &= u64::MAX >> extra;
        }
    }

    /// Get bit `idx`.
    #[inline]
    pub fn get(&self, idx: u64) -> bool {
        debug_assert!(idx < self.size, "bit index {} >= size {}", idx, self.size);
        self.words[(idx / 64) as usize] & (1u64 << (idx % 64)) != 0
    }

    /// Set bit `idx` to 1.
    #[inline]
    pub fn set(&mut self, idx: u64) {
        debug_assert!(idx < self.size, "bit index {} >= size {}", idx, self.size);
        self.words[(idx / 64) as usize] |= 1u64 << (idx % 64);
    }

    /// Clear bit `idx` to 0.
    #[inline]
    pub fn clear(&mut self, idx: u64) {
        debug_assert!(idx < self.size, "bit index {} >= size {}", idx, self.size);
        self.words[(idx / 64) as usize] &= !(1u64 << (idx % 64));
    }

    /// Flip bit `idx`.
    #[inline]
    pub fn flip(&mut self, idx: u64) {
        debug_assert!(idx < self.size, "bit index {} >= size {}", idx, self.size);
        self.words[(idx / 64) as usize] ^= 1u64 << (idx % 64);
    }

    /// Clear bits at `start, start + p, start + 2p, …` for every index
    /// `<= limit`. The canonical mark-composites primitive.
    #[inline]
    pub fn clear_mod_p(&mut self, p: u64, start: u64, limit: u64) {
        debug_assert!(p > 0, "clear_mod_p with zero step");
        debug_assert!(limit < self.size, "limit {} >= size {}", limit, self.size);
        let mut idx = start;
        while idx <= limit {
            self.words[(idx / 64) as usize] &= !(1u64 << (idx % 64));
            idx += p;
        }
    }

    /// Bit-exact copy of `len` bits from `src_idx` to `dest_idx` within the
    /// same bitmap. Forward overlap (`dest_idx > src_idx`) is allowed and
    /// replicates the source pattern, which is exactly what segment
    /// duplication relies on.
    pub fn copy_bits(&mut self, dest_idx: u64, src_idx: u64, len: u64) {
        debug_assert!(src_idx + len <= self.size);
        debug_assert!(dest_idx + len <= self.size);
        for i in 0..len {
            if self.get(src_idx + i) {
                self.set(dest_idx + i);
            } else {
                self.clear(dest_idx + i);
            }
        }
    }

    /// Tile the bit range `[start, start + seg_len)` so it repeats `copies`
    /// times in total, filling `[start, start + copies · seg_len)`.
    ///
    /// # Panics
    /// Out-of-bounds duplication is a programming error and asserts.
    pub fn duplicate_segment(&mut self, start: u64, seg_len: u64, copies: u64) {
        let total = seg_len
            .checked_mul(copies)
            .expect("duplicate_segment length overflow");
        assert!(
            start + total <= self.size,
            "duplicate_segment out of bounds: {} + {} exceeds size {}",
            start,
            total,
            self.size
        );
        let mut cursor = start + seg_len;
        for _ in 1..copies {
            self.copy_bits(cursor, start, seg_len);
            cursor += seg_len;
        }
    }

    /// Overwrite this bitmap's contents from `other` without reallocating.
    ///
    /// # Panics
    /// The two bitmaps must have the same size.
    pub fn copy_from(&mut self, other: &Bitmap) {
        assert_eq!(self.size, other.size, "copy_from size mismatch");
        self.words.copy_from_slice(&other.words);
    }

    /// Count the set bits using hardware popcount.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Render as a string of '0'/'1' characters, index 0 first.
    pub fn to_bit_string(&self) -> String {
        (0..self.size)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// Parse a string of '0'/'1' characters back into a bitmap.
    /// Inverse of [`Bitmap::to_bit_string`].
    pub fn from_bit_string(s: &str) -> Result<Self> {
        ensure!(!s.is_empty(), "empty bit string");
        let mut bitmap = Bitmap::new(s.len() as u64)?;
        for (i, c) in s.bytes().enumerate() {
            match c {
                b'1' => bitmap.set(i as u64),
                b'0' => {}
                other => bail!("invalid character {:?} at position {}", other as char, i),
            }
        }
        Ok(bitmap)
    }

    /// The packed byte image: `(size + 7) / 8` bytes, little-endian words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let byte_size = (self.size as usize).div_ceil(8);
        let mut bytes = Vec::with_capacity(byte_size);
        for w in &self.words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        bytes.truncate(byte_size);
        bytes
    }

    fn from_bytes(size: u64, bytes: &[u8]) -> Result<Self> {
        let byte_size = (size as usize).div_ceil(8);
        ensure!(
            bytes.len() == byte_size,
            "bitmap payload is {} bytes, expected {}",
            bytes.len(),
            byte_size
        );
        let mut bitmap = Bitmap::new(size)?;
        for (wi, chunk) in bytes.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            bitmap.words[wi] = u64::from_le_bytes(buf);
        }
        bitmap.mask_tail();
        Ok(bitmap)
    }

    /// SHA-256 digest of the packed byte image.
    pub fn sha256(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    /// Write `{u64 size, packed bytes, 32-byte SHA-256}` to `path`.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes();
        let mut out = Vec::with_capacity(8 + bytes.len() + 32);
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&bytes);
        out.extend_from_slice(&self.sha256());
        fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Read a bitmap written by [`Bitmap::write_file`], rejecting any payload
    /// whose recomputed digest differs from the stored one.
    pub fn read_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        ensure!(data.len() >= 8 + 32, "bitmap file too short");
        let size = u64::from_le_bytes(data[..8].try_into().unwrap());
        let byte_size = (size as usize).div_ceil(8);
        ensure!(
            data.len() == 8 + byte_size + 32,
            "bitmap file length mismatch for size {}",
            size
        );
        let bitmap = Bitmap::from_bytes(size, &data[8..8 + byte_size])?;
        let stored: [u8; 32] = data[8 + byte_size..].try_into().unwrap();
        if bitmap.sha256() != stored {
            bail!("corrupted data: SHA-256 mismatch in {}", path.display());
        }
        Ok(bitmap)
    }
}
