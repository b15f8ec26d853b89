//! Producer side of the shared matrix.
//!
//! `write_bbo` is the only mutation the region ever sees. It is wait-free:
//! no heap allocation, no blocking, no system calls, only two release
//! stores on the cell's seqlock, plain volatile payload stores between
//! them, and one release increment of the row version.

use std::fs::OpenOptions;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{compiler_fence, AtomicU32, AtomicU64, Ordering};

use memmap2::MmapMut;

use super::layout::{
    cell_offset, version_offset, BboCell, MAX_EXCHANGES, MSG_TYPE_BBO, NUM_SYMBOLS, REGION_SIZE,
};
use super::shm_path;
use crate::error::{Error, Result};

/// Writable mapping of the shared market matrix.
///
/// Ownership contract: each (symbol, exchange) cell has exactly one writer
/// task for the lifetime of the process. The struct is `Sync` because
/// concurrent `write_bbo` calls from different adapters always target
/// disjoint cells (the exchange id is fixed per adapter), and the version
/// vector is only touched with atomic RMW ops.
pub struct MarketMatrix {
    mmap: MmapMut,
    base: *mut u8,
}

// SAFETY: all mutation goes through raw-pointer stores guarded by the
// per-cell seqlock and atomic version counters; the mapping itself is
// never remapped or resized after construction.
unsafe impl Send for MarketMatrix {}
unsafe impl Sync for MarketMatrix {}

impl MarketMatrix {
    /// Create (or reset) the region under `/dev/shm` and map it.
    pub fn create(name: &str) -> Result<Self> {
        Self::create_at(shm_path(name))
    }

    /// Create (or reset) the region at an explicit path and map it.
    ///
    /// Opens with create+truncate and sizes the file to the full layout,
    /// which zero-fills every cell: `seq == 0` is the "never written"
    /// state consumers rely on.
    pub fn create_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::Shm(format!("open {}: {e}", path.display())))?;
        file.set_len(REGION_SIZE as u64)
            .map_err(|e| Error::Shm(format!("truncate {}: {e}", path.display())))?;

        let mut mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::Shm(format!("mmap {}: {e}", path.display())))?;
        let base = mmap.as_mut_ptr();

        Ok(Self { mmap, base })
    }

    /// Publish one BBO into `cells[symbol_id][exchange_id]` and bump the
    /// row version by exactly one.
    ///
    /// Out-of-range ids are a silent no-op. Safe to interleave with reads
    /// from any other process: a reader either observes the previous
    /// complete payload or retries while `seq` is odd or unstable.
    pub fn write_bbo(
        &self,
        exchange_id: u8,
        symbol_id: u16,
        timestamp_ns: u64,
        bid_price: f64,
        bid_size: f64,
        ask_price: f64,
        ask_size: f64,
    ) {
        if symbol_id as usize >= NUM_SYMBOLS || exchange_id as usize >= MAX_EXCHANGES {
            return;
        }

        unsafe {
            let cell = self.base.add(cell_offset(symbol_id, exchange_id)) as *mut BboCell;
            let seq = &*(cell as *const AtomicU32);

            // Only this producer mutates seq, so the load can be relaxed.
            let s = seq.load(Ordering::Relaxed);

            // Odd: write in progress.
            seq.store(s.wrapping_add(1), Ordering::Release);
            compiler_fence(Ordering::Release);

            ptr::write_volatile(ptr::addr_of_mut!((*cell).msg_type), MSG_TYPE_BBO);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).exchange_id), exchange_id);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).symbol_id), symbol_id);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).timestamp_ns), timestamp_ns);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).bid_price), bid_price);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).bid_size), bid_size);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).ask_price), ask_price);
            ptr::write_volatile(ptr::addr_of_mut!((*cell).ask_size), ask_size);

            // Even: payload consistent.
            compiler_fence(Ordering::Release);
            seq.store(s.wrapping_add(2), Ordering::Release);

            let version = &*(self.base.add(version_offset(symbol_id)) as *const AtomicU64);
            version.fetch_add(1, Ordering::Release);
        }
    }

    /// Current row version, for diagnostics and tests.
    pub fn version(&self, symbol_id: u16) -> u64 {
        if symbol_id as usize >= NUM_SYMBOLS {
            return 0;
        }
        unsafe {
            let version = &*(self.base.add(version_offset(symbol_id)) as *const AtomicU64);
            version.load(Ordering::Acquire)
        }
    }

    /// Raw view of the whole region. Only meaningful while no writer is
    /// active; used by the out-of-range property tests.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}
