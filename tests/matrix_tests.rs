//! Property and scenario tests for the shared market matrix.

mod support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aleph_feeder::matrix::{
    BboCell, MatrixReader, CELL_SIZE, MAX_EXCHANGES, NUM_SYMBOLS, REGION_SIZE,
};

// ---------------------------------------------------------------------------
// ABI
// ---------------------------------------------------------------------------

#[test]
fn abi_size_and_alignment() {
    assert_eq!(std::mem::size_of::<BboCell>(), 64);
    assert_eq!(std::mem::align_of::<BboCell>(), 64);
    assert_eq!(CELL_SIZE, 64);
    assert_eq!(
        REGION_SIZE,
        NUM_SYMBOLS * 8 + NUM_SYMBOLS * MAX_EXCHANGES * 64
    );
}

#[test]
fn region_file_is_sized_and_zeroed() {
    let region = support::region();
    let bytes = std::fs::metadata(&region.path).unwrap().len();
    assert_eq!(bytes as usize, REGION_SIZE);
    assert!(region.matrix.as_bytes().iter().all(|&b| b == 0));
}

// ---------------------------------------------------------------------------
// Round-trip of a single cell
// ---------------------------------------------------------------------------

#[test]
fn round_trip_single_cell() {
    let region = support::region();
    region
        .matrix
        .write_bbo(1, 1001, 1_700_000_000_000_000_000, 50000.5, 0.1, 50001.0, 0.2);

    let reader = region.reader();
    let cell = reader.read_cell(1001, 1).expect("consistent snapshot");

    assert_eq!(cell.msg_type, 1);
    assert_eq!(cell.exchange_id, 1);
    assert_eq!(cell.symbol_id, 1001);
    assert_eq!(cell.timestamp_ns, 1_700_000_000_000_000_000);
    assert_eq!(cell.bid_price, 50000.5);
    assert_eq!(cell.bid_size, 0.1);
    assert_eq!(cell.ask_price, 50001.0);
    assert_eq!(cell.ask_size, 0.2);
    assert_eq!(cell.seq % 2, 0);
    assert!(cell.seq >= 2);
    assert_eq!(reader.shared_version(1001), 1);
}

// ---------------------------------------------------------------------------
// Latest-only semantics
// ---------------------------------------------------------------------------

#[test]
fn latest_write_wins() {
    let region = support::region();
    for (i, ts) in [1_000u64, 2_000, 3_000].into_iter().enumerate() {
        let px = 1800.0 + i as f64;
        region.matrix.write_bbo(2, 1002, ts, px, 1.0, px + 0.1, 1.0);
    }

    let reader = region.reader();
    let cell = reader.read_cell(1002, 2).expect("consistent snapshot");
    assert_eq!(cell.timestamp_ns, 3_000);
    assert_eq!(cell.bid_price, 1802.0);
    assert_eq!(reader.shared_version(1002), 3);
}

// ---------------------------------------------------------------------------
// Cross-exchange isolation
// ---------------------------------------------------------------------------

#[test]
fn interleaved_exchanges_stay_isolated() {
    let region = support::region();
    region.matrix.write_bbo(1, 1001, 10, 100.0, 1.0, 101.0, 1.0);
    region.matrix.write_bbo(3, 1001, 11, 200.0, 2.0, 201.0, 2.0);
    region.matrix.write_bbo(1, 1001, 12, 102.0, 1.0, 103.0, 1.0);
    region.matrix.write_bbo(3, 1001, 13, 202.0, 2.0, 203.0, 2.0);

    let reader = region.reader();
    let hl = reader.read_cell(1001, 1).expect("hyperliquid cell");
    let edgex = reader.read_cell(1001, 3).expect("edgex cell");

    assert_eq!(hl.bid_price, 102.0);
    assert_eq!(hl.timestamp_ns, 12);
    assert_eq!(edgex.bid_price, 202.0);
    assert_eq!(edgex.timestamp_ns, 13);
    assert_eq!(reader.shared_version(1001), 4);
}

// ---------------------------------------------------------------------------
// Seqlock parity
// ---------------------------------------------------------------------------

#[test]
fn seq_stays_even_and_strictly_increases_per_write() {
    let region = support::region();
    let reader = region.reader();

    let mut last_seq = 0;
    for i in 0..10u64 {
        region.matrix.write_bbo(1, 1001, i + 1, 1.0, 1.0, 2.0, 1.0);
        let cell = reader.read_cell(1001, 1).expect("quiescent cell");
        assert_eq!(cell.seq % 2, 0);
        assert!(cell.seq > last_seq);
        last_seq = cell.seq;
    }
    // Two increments per completed write.
    assert_eq!(last_seq, 20);
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[test]
fn each_write_bumps_the_row_version_by_one() {
    let region = support::region();
    let mut last = 0;
    for i in 0..100u64 {
        region
            .matrix
            .write_bbo((i % 5 + 1) as u8, 1001, i, 1.0, 1.0, 2.0, 1.0);
        let version = region.matrix.version(1001);
        assert_eq!(version, last + 1);
        last = version;
    }
}

#[test]
fn unwritten_rows_keep_version_zero() {
    let region = support::region();
    region.matrix.write_bbo(1, 1001, 1, 1.0, 1.0, 2.0, 1.0);
    assert_eq!(region.matrix.version(1000), 0);
    assert_eq!(region.matrix.version(1002), 0);
}

// ---------------------------------------------------------------------------
// Out-of-range writes
// ---------------------------------------------------------------------------

#[test]
fn out_of_range_write_leaves_every_byte_unchanged() {
    let region = support::region();
    region.matrix.write_bbo(1, 1001, 1, 100.0, 1.0, 101.0, 1.0);
    let before = region.matrix.as_bytes().to_vec();

    region
        .matrix
        .write_bbo(MAX_EXCHANGES as u8, 1001, 2, 9.0, 9.0, 9.0, 9.0);
    region
        .matrix
        .write_bbo(1, NUM_SYMBOLS as u16, 2, 9.0, 9.0, 9.0, 9.0);

    assert_eq!(region.matrix.as_bytes(), &before[..]);
}

// ---------------------------------------------------------------------------
// Change scanning
// ---------------------------------------------------------------------------

#[test]
fn poll_changed_sees_each_updated_row_once() {
    let region = support::region();
    let mut reader = region.reader();
    assert!(reader.poll_changed().is_none());

    region.matrix.write_bbo(1, 1001, 1, 1.0, 1.0, 2.0, 1.0);
    region.matrix.write_bbo(2, 1002, 1, 1.0, 1.0, 2.0, 1.0);

    assert_eq!(reader.poll_changed(), Some(1001));
    assert_eq!(reader.poll_changed(), Some(1002));
    assert!(reader.poll_changed().is_none());

    region.matrix.write_bbo(1, 1001, 2, 1.5, 1.0, 2.5, 1.0);
    assert_eq!(reader.poll_changed(), Some(1001));
    assert!(reader.poll_changed().is_none());
}

// ---------------------------------------------------------------------------
// Seqlock tearing under concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_reader_never_observes_a_torn_snapshot() {
    const WRITES: u64 = 1_000_000;

    let region = support::region();
    let matrix = Arc::clone(&region.matrix);
    let reader = MatrixReader::open(&region.path).expect("open reader");
    let done = Arc::new(AtomicBool::new(false));

    let writer_done = Arc::clone(&done);
    let writer = std::thread::spawn(move || {
        for i in 0..WRITES {
            let bid = 50_000.0 + (i % 1000) as f64;
            matrix.write_bbo(1, 1001, i + 1, bid, 0.5, bid + 1.0, 0.5);
        }
        writer_done.store(true, Ordering::Release);
    });

    let mut consistent_reads = 0u64;
    let mut misses = 0u64;
    while !done.load(Ordering::Acquire) {
        match reader.read_cell(1001, 1) {
            Some(cell) => {
                // Every published payload satisfies bid + 1 == ask; a torn
                // read would mix two writes and break it.
                assert_eq!(
                    cell.bid_price + 1.0,
                    cell.ask_price,
                    "torn snapshot at ts {}",
                    cell.timestamp_ns
                );
                assert_eq!(cell.seq % 2, 0);
                consistent_reads += 1;
            }
            None => misses += 1,
        }
    }
    writer.join().expect("writer thread");

    // Misses are transient, consistent reads must dominate.
    assert!(consistent_reads > 0);
    assert!(consistent_reads > misses);
    assert_eq!(region.matrix.version(1001), WRITES);

    let last = reader.read_cell(1001, 1).expect("final snapshot");
    assert_eq!(last.timestamp_ns, WRITES);
}

#[test]
fn two_writers_on_disjoint_cells_do_not_interfere() {
    const WRITES: u64 = 100_000;

    let region = support::region();
    let matrix_a = Arc::clone(&region.matrix);
    let matrix_b = Arc::clone(&region.matrix);

    let a = std::thread::spawn(move || {
        for i in 0..WRITES {
            matrix_a.write_bbo(1, 1001, i + 1, 100.0, 1.0, 101.0, 1.0);
        }
    });
    let b = std::thread::spawn(move || {
        for i in 0..WRITES {
            matrix_b.write_bbo(2, 1001, i + 1, 200.0, 1.0, 201.0, 1.0);
        }
    });
    a.join().expect("writer a");
    b.join().expect("writer b");

    assert_eq!(region.matrix.version(1001), 2 * WRITES);

    let reader = region.reader();
    let hl = reader.read_cell(1001, 1).expect("exchange 1 cell");
    let lt = reader.read_cell(1001, 2).expect("exchange 2 cell");
    assert_eq!(hl.bid_price, 100.0);
    assert_eq!(lt.bid_price, 200.0);
}
