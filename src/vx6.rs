//! # VX6 — Fixed-Primorial Micro-Sieve with Gap Encoding
//!
//! A specialisation of the segmented iZm sieve at the fixed primorial
//! vx6 = 5·7·11·13·17·19 = 1,616,615, addressing one segment by an
//! arbitrary-precision row index y. The segment's primes are not stored as
//! values — a 10²⁴-row segment holds 25-digit primes — but as 16-bit gaps
//! from the base value iZ(vx6·y, +1): cumulative addition reproduces the
//! primes exactly.
//!
//! Sieving clones the cached pre-sieved wheel pair, strikes the cached
//! primes up to √iZ(vx6·(y+1), +1) via [`solve_for_x_big`], and — once the
//! cached table runs out below that bound, which happens for every large
//! y — confirms each survivor with a Miller–Rabin test. For small y the
//! marking alone is exhaustive and the results are deterministic.
//!
//! The `.vx6` file format is bit-exact:
//!
//! | field | type |
//! |---|---|
//! | y length (incl. NUL) | u64 |
//! | y decimal string + NUL | bytes |
//! | gap count | u64 |
//! | gaps | u16 × count |
//! | SHA-256 of the raw gap bytes | 32 bytes |
//!
//! Reads recompute the digest and reject on any mismatch.

use anyhow::{bail, ensure, Context, Result};
use rug::integer::IsPrime;
use rug::Integer;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::iz::{iz_big, solve_for_x_big};
use crate::mr_screened_test;
use crate::wheel::{cached_vx6_primes, cached_vx6_wheel};

/// The fixed micro-sieve primorial, 5·7·11·13·17·19.
pub const VX6: u64 = 1_616_615;

/// File extension for serialised segments.
pub const VX6_EXT: &str = "vx6";

/// One vx6 segment: row index, survivor bitmaps, and the gap stream.
#[derive(Clone, Debug)]
pub struct VxObj {
    /// Segment width, always [`VX6`].
    pub vx: u64,
    /// Row index as a decimal string; the segment covers
    /// iZ(vx·y, +1) .. iZ(vx·(y+1), +1).
    pub y: String,
    /// iZ− survivors after sieving, None until sieved or for objects read
    /// from disk.
    pub x5: Option<Bitmap>,
    /// iZ+ survivors, as above.
    pub x7: Option<Bitmap>,
    /// Gaps between consecutive primes, starting from the base value.
    pub p_gaps: Vec<u16>,
    /// SHA-256 of the raw gap bytes.
    pub sha256: [u8; 32],
}

impl VxObj {
    /// Create an unsieved segment for row `y` (a decimal string).
    pub fn new(y: &str) -> Result<Self> {
        ensure!(
            !y.is_empty() && y.bytes().all(|b| b.is_ascii_digit()),
            "row index must be a decimal string, got {:?}",
            y
        );
        Ok(VxObj {
            vx: VX6,
            y: y.to_owned(),
            x5: None,
            x7: None,
            p_gaps: Vec::new(),
            sha256: [0u8; 32],
        })
    }

    /// The segment's base value iZ(vx6·y, +1); gap sums start here.
    pub fn base_value(&self) -> Result<Integer> {
        let y = Integer::from_str_radix(&self.y, 10)?;
        let mut base = y;
        base *= VX6;
        base *= 6u32;
        base += 1;
        Ok(base)
    }

    /// Sieve the segment and fill the gap stream.
    ///
    /// `rounds` is the Miller–Rabin round count for the probabilistic stage
    /// (0 selects the default of 25). The stage only runs when the segment
    /// lies beyond the cached-prime horizon; below it the marking is
    /// exhaustive and no primality test is needed.
    pub fn sieve(&mut self, rounds: u32) -> Result<()> {
        let primes = cached_vx6_primes()?;
        let (wheel5, wheel7) = cached_vx6_wheel()?;
        let mut x5 = wheel5.clone();
        let mut x7 = wheel7.clone();

        let y = Integer::from_str_radix(&self.y, 10)
            .context("row index is not a decimal string")?;
        let yvx = Integer::from(&y * VX6);

        // Root primes are useful up to the square root of the segment top.
        let upper_limit = {
            let mut top = yvx.clone();
            top += VX6;
            let top = iz_big(&top, 1);
            Integer::from(top.sqrt_ref())
        };

        // Skip 2, 3 and the wheel factors; the clone above pre-excludes them.
        let ps = primes.as_slice();
        let start = ps
            .iter()
            .position(|&p| p > 3 && VX6 % p != 0)
            .unwrap_or(ps.len());

        let mut mark_ops: u64 = 0;
        let mut exhaustive = false;
        for &p in &ps[start..] {
            if upper_limit < p {
                // every composite in the segment has a factor below p;
                // the survivors are deterministically prime
                exhaustive = true;
                break;
            }
            let xp5 = solve_for_x_big(-1, p, VX6, &y);
            x5.clear_mod_p(p, xp5, VX6);
            let xp7 = solve_for_x_big(1, p, VX6, &y);
            x7.clear_mod_p(p, xp7, VX6);
            mark_ops += 2 * (VX6 / p);
        }

        let rounds = if rounds == 0 { 25 } else { rounds };
        let mut test_ops: u64 = 0;

        self.p_gaps.clear();
        // x = 1..3 never survive the wheel; their three slots contribute
        // 3·6 = 18 to the first gap
        let mut gap: u64 = 18;
        for x in 4..=VX6 {
            gap += 4;
            if x5.get(x) {
                let ok = if exhaustive {
                    true
                } else {
                    test_ops += 1;
                    let v = Integer::from(&yvx + x);
                    mr_screened_test(&iz_big(&v, -1), rounds) != IsPrime::No
                };
                if ok {
                    self.p_gaps
                        .push(u16::try_from(gap).context("prime gap exceeds 16 bits")?);
                    gap = 0;
                } else {
                    x5.clear(x);
                }
            }
            gap += 2;
            if x7.get(x) {
                let ok = if exhaustive {
                    true
                } else {
                    test_ops += 1;
                    let v = Integer::from(&yvx + x);
                    mr_screened_test(&iz_big(&v, 1), rounds) != IsPrime::No
                };
                if ok {
                    self.p_gaps
                        .push(u16::try_from(gap).context("prime gap exceeds 16 bits")?);
                    gap = 0;
                } else {
                    x7.clear(x);
                }
            }
        }

        self.p_gaps.shrink_to_fit();
        self.sha256 = gaps_sha256(&self.p_gaps);
        self.x5 = Some(x5);
        self.x7 = Some(x7);
        debug!(
            y = %self.y,
            mark_ops,
            test_ops,
            p_count = self.p_gaps.len(),
            "vx6 segment sieved"
        );
        Ok(())
    }

    /// Write the segment to `path` (the `.vx6` extension is appended when
    /// missing).
    pub fn write_file(&self, path: &Path) -> Result<PathBuf> {
        let path = with_vx6_ext(path);
        let mut out = Vec::with_capacity(8 + self.y.len() + 1 + 8 + self.p_gaps.len() * 2 + 32);
        let y_len = (self.y.len() + 1) as u64;
        out.extend_from_slice(&y_len.to_le_bytes());
        out.extend_from_slice(self.y.as_bytes());
        out.push(0);
        out.extend_from_slice(&(self.p_gaps.len() as u64).to_le_bytes());
        for &g in &self.p_gaps {
            out.extend_from_slice(&g.to_le_bytes());
        }
        out.extend_from_slice(&gaps_sha256(&self.p_gaps));
        fs::write(&path, out).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Read a segment written by [`VxObj::write_file`], validating the
    /// embedded digest. The survivor bitmaps are not persisted.
    pub fn read_file(path: &Path) -> Result<Self> {
        let path = with_vx6_ext(path);
        let data =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        ensure!(data.len() >= 8, "vx6 file too short");
        let y_len = u64::from_le_bytes(data[..8].try_into().unwrap()) as usize;
        ensure!(y_len >= 2 && data.len() >= 8 + y_len + 8, "vx6 file truncated");
        let y_bytes = &data[8..8 + y_len];
        ensure!(y_bytes[y_len - 1] == 0, "row index string is not terminated");
        let y = std::str::from_utf8(&y_bytes[..y_len - 1]).context("row index is not utf-8")?;

        let mut offset = 8 + y_len;
        let count =
            u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap()) as usize;
        offset += 8;
        ensure!(
            data.len() == offset + count * 2 + 32,
            "vx6 file length mismatch for gap count {}",
            count
        );

        let mut obj = VxObj::new(y)?;
        obj.p_gaps
            .try_reserve_exact(count)
            .context("allocation failed for gap array")?;
        for chunk in data[offset..offset + count * 2].chunks_exact(2) {
            obj.p_gaps.push(u16::from_le_bytes(chunk.try_into().unwrap()));
        }
        offset += count * 2;
        let stored: [u8; 32] = data[offset..].try_into().unwrap();
        let computed = gaps_sha256(&obj.p_gaps);
        if stored != computed {
            bail!("corrupted data: SHA-256 mismatch in {}", path.display());
        }
        obj.sha256 = stored;
        Ok(obj)
    }
}

fn gaps_sha256(gaps: &[u16]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for &g in gaps {
        hasher.update(g.to_le_bytes());
    }
    hasher.finalize().into()
}

fn with_vx6_ext(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == VX6_EXT => path.to_path_buf(),
        _ => {
            let mut s = path.as_os_str().to_owned();
            s.push(".");
            s.push(VX6_EXT);
            PathBuf::from(s)
        }
    }
}
