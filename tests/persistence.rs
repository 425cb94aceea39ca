//! Persistence integration test: insert into a file-backed database, close
//! the handle, reopen, and confirm a query returns byte-identical results.

use diskann_core::{DiskAnnIndex, IndexConfig, Metric, RusqliteHost};

const DIM: usize = 128;

/// Deterministic pseudo-random vector for a given row id, so the test needs
/// no external RNG dependency and reruns are reproducible.
fn make_vector(seed: i64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..DIM)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) as u32 % 10_000) as f32 / 10_000.0
        })
        .collect()
}

#[test]
fn search_results_survive_close_and_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("persist.db");

    let config = IndexConfig::with_params(DIM as u32, Metric::L2, 32, 64, 64, 0, 1300).expect("valid config");

    {
        let host = RusqliteHost::open(&path).expect("open db");
        DiskAnnIndex::create(&host, "main", "vectors", Some(config)).expect("create index");
        let mut index = DiskAnnIndex::open(&host, "main", "vectors").expect("open index");

        for id in 1..=100i64 {
            index.insert(&host, id, &make_vector(id)).expect("insert");
        }
    }

    let query = make_vector(42);
    let before = {
        let host = RusqliteHost::open(&path).expect("reopen db");
        let mut index = DiskAnnIndex::open(&host, "main", "vectors").expect("open index");
        index.search(&host, &query, 10).expect("search")
    };

    // Close and reopen a second time to make sure the round trip is stable,
    // not just a one-shot artifact of the first reopen.
    let after = {
        let host = RusqliteHost::open(&path).expect("reopen db again");
        let mut index = DiskAnnIndex::open(&host, "main", "vectors").expect("open index");
        index.search(&host, &query, 10).expect("search")
    };

    assert_eq!(before.len(), 10);
    assert_eq!(before, after);
}
