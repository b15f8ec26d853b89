//! The shared market matrix: a memory-mapped, lock-free, latest-state-only
//! region read by independent consumer processes.
//!
//! Layout (one flat mapping, cache-line friendly):
//!
//! ```text
//! symbol_versions[NUM_SYMBOLS]              u64 per symbol, 16 KB, L1-resident
//! cells[NUM_SYMBOLS][MAX_EXCHANGES]         64-byte BboCell each, ~1 MB
//! ```
//!
//! Consumers spin on `symbol_versions` and only touch a row when its
//! version moved, so a poll costs O(changed symbols). Each cell is guarded
//! by a seqlock: odd `seq` means a write is in flight, even means the
//! payload is consistent with the last completed write.

mod layout;
mod producer;
mod reader;

use std::path::PathBuf;

pub use layout::{BboCell, CELL_SIZE, MAX_EXCHANGES, MSG_TYPE_BBO, NUM_SYMBOLS, REGION_SIZE};
pub use producer::MarketMatrix;
pub use reader::{MatrixReader, READ_RETRY_BUDGET};

/// Default leaf name of the backing file, overridable via `ALEPH_SHM`.
pub const DEFAULT_SHM_NAME: &str = "aleph-matrix";

/// Host shared-memory path for a region leaf name.
pub fn shm_path(name: &str) -> PathBuf {
    PathBuf::from("/dev/shm").join(name)
}
