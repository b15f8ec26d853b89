//! Consumer side of the shared matrix.
//!
//! Independent processes map the region read-only and follow the seqlock
//! protocol implemented here; this module is both the in-repo reference
//! for that protocol and the reader the property tests run against.

use std::fs::File;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{compiler_fence, AtomicU32, AtomicU64, Ordering};

use memmap2::Mmap;

use super::layout::{cell_offset, version_offset, BboCell, MAX_EXCHANGES, NUM_SYMBOLS, REGION_SIZE};
use crate::error::{Error, Result};

/// Seqlock retries per cell before a read is reported as a transient miss.
/// A miss means the writer was mid-update on every attempt, never a torn
/// value.
pub const READ_RETRY_BUDGET: u32 = 64;

/// Read-only mapping of the matrix plus the reader's local version
/// watermarks.
pub struct MatrixReader {
    mmap: Mmap,
    base: *const u8,
    seen: Box<[u64; NUM_SYMBOLS]>,
}

// SAFETY: the reader performs no stores through `base`; the mapping is
// immutable for the struct's lifetime.
unsafe impl Send for MatrixReader {}

impl MatrixReader {
    /// Map an existing region read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Shm(format!("open {}: {e}", path.display())))?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::Shm(format!("mmap {}: {e}", path.display())))?;
        if mmap.len() < REGION_SIZE {
            return Err(Error::Shm(format!(
                "region {} is {} bytes, expected {REGION_SIZE}",
                path.display(),
                mmap.len()
            )));
        }
        let base = mmap.as_ptr();
        Ok(Self {
            mmap,
            base,
            seen: Box::new([0; NUM_SYMBOLS]),
        })
    }

    /// Shared version of a symbol row, acquire-loaded.
    pub fn shared_version(&self, symbol_id: u16) -> u64 {
        if symbol_id as usize >= NUM_SYMBOLS {
            return 0;
        }
        unsafe {
            let version = &*(self.base.add(version_offset(symbol_id)) as *const AtomicU64);
            version.load(Ordering::Acquire)
        }
    }

    /// The version this reader last consumed for a row.
    pub fn seen_version(&self, symbol_id: u16) -> u64 {
        self.seen
            .get(symbol_id as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Scan the version vector for the next row that changed since this
    /// reader last consumed it. Advances the watermark for the returned
    /// row, so repeated calls walk all pending rows. O(changed symbols)
    /// amortized: unchanged rows cost one L1 load each.
    pub fn poll_changed(&mut self) -> Option<u16> {
        for symbol in 0..NUM_SYMBOLS {
            let shared = self.shared_version(symbol as u16);
            if shared > self.seen[symbol] {
                self.seen[symbol] = shared;
                return Some(symbol as u16);
            }
        }
        None
    }

    /// One-shot consistent snapshot of a single cell.
    ///
    /// Returns `None` for out-of-range ids, for never-written cells
    /// (`seq == 0`), and when the retry budget is exhausted while the
    /// writer is active. A returned snapshot is never torn.
    pub fn read_cell(&self, symbol_id: u16, exchange_id: u8) -> Option<BboCell> {
        if symbol_id as usize >= NUM_SYMBOLS || exchange_id as usize >= MAX_EXCHANGES {
            return None;
        }

        unsafe {
            let cell = self.base.add(cell_offset(symbol_id, exchange_id)) as *const BboCell;
            let seq = &*(cell as *const AtomicU32);

            let mut attempts = 0;
            loop {
                let s1 = seq.load(Ordering::Acquire);
                if s1 == 0 {
                    return None;
                }
                if s1 & 1 == 1 {
                    attempts += 1;
                    if attempts > READ_RETRY_BUDGET {
                        return None;
                    }
                    std::hint::spin_loop();
                    continue;
                }

                compiler_fence(Ordering::Acquire);
                let snapshot = ptr::read_volatile(cell);
                compiler_fence(Ordering::Acquire);

                let s2 = seq.load(Ordering::Acquire);
                if s1 == s2 {
                    return Some(snapshot);
                }
                attempts += 1;
                if attempts > READ_RETRY_BUDGET {
                    return None;
                }
            }
        }
    }

    /// Snapshot every written cell in one symbol row and advance the
    /// row watermark.
    pub fn read_row(&mut self, symbol_id: u16) -> [Option<BboCell>; MAX_EXCHANGES] {
        let mut row = [None; MAX_EXCHANGES];
        if symbol_id as usize >= NUM_SYMBOLS {
            return row;
        }
        self.seen[symbol_id as usize] = self.shared_version(symbol_id);
        for (exchange, slot) in row.iter_mut().enumerate() {
            *slot = self.read_cell(symbol_id, exchange as u8);
        }
        row
    }

    /// Size of the mapped region.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}
