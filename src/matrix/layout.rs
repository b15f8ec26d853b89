//! The shared-memory ABI. Every constant and field offset here is part of
//! the contract with consumer processes; changing any of them is a breaking
//! change that must be coordinated across all programs mapping the region.

/// Number of symbol rows. Fixed at build time on both sides of the region.
pub const NUM_SYMBOLS: usize = 2048;

/// Number of exchange columns per row. Ids 1..=5 are assigned, 0 is
/// reserved, the rest are spare capacity for future venues.
pub const MAX_EXCHANGES: usize = 8;

/// Size of one cell. One cache line, asserted below.
pub const CELL_SIZE: usize = 64;

const VERSION_SIZE: usize = std::mem::size_of::<u64>();
const VERSIONS_BYTES: usize = NUM_SYMBOLS * VERSION_SIZE;

/// Total region size: the version vector followed by the cell matrix.
pub const REGION_SIZE: usize = VERSIONS_BYTES + NUM_SYMBOLS * MAX_EXCHANGES * CELL_SIZE;

/// `msg_type` discriminant for a BBO payload. Other kinds are reserved.
pub const MSG_TYPE_BBO: u8 = 1;

/// One (symbol, exchange) cell.
///
/// `seq` is the seqlock counter: odd while its single producer is writing,
/// even when quiescent, zero only if the cell has never been written. The
/// counter wraps after 2^32 writes to one cell; readers rely only on parity
/// and equality, both of which hold modulo 2^32, so wrap is benign.
#[repr(C, align(64))]
#[derive(Clone, Copy, Debug, Default)]
pub struct BboCell {
    pub seq: u32,
    pub msg_type: u8,
    pub exchange_id: u8,
    pub symbol_id: u16,
    pub timestamp_ns: u64,
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_price: f64,
    pub ask_size: f64,
    pub _reserved: [u8; 16],
}

const _: () = assert!(std::mem::size_of::<BboCell>() == CELL_SIZE);
const _: () = assert!(std::mem::align_of::<BboCell>() == CELL_SIZE);

/// Byte offset of `symbol_versions[symbol_id]`.
#[inline]
pub(crate) const fn version_offset(symbol_id: u16) -> usize {
    symbol_id as usize * VERSION_SIZE
}

/// Byte offset of `cells[symbol_id][exchange_id]`.
#[inline]
pub(crate) const fn cell_offset(symbol_id: u16, exchange_id: u8) -> usize {
    VERSIONS_BYTES + (symbol_id as usize * MAX_EXCHANGES + exchange_id as usize) * CELL_SIZE
}
