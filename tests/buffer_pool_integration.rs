//! Integration tests for the buffer pool over a heap store.
//!
//! These tests verify cross-component behavior that unit tests don't cover.

use lockpool::{
    BufferPool, BufferPoolConfig, Error, HeapStore, PageId, Permission, RetryPolicy, Transaction,
    TransactionId, Tuple,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const TABLE: u32 = 1;
const RECORD_SIZE: usize = 16;

fn create_pool(num_pages: usize) -> (BufferPool, Arc<HeapStore>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(HeapStore::open(dir.path()).unwrap());
    store.create_table(TABLE, RECORD_SIZE).unwrap();

    let config = BufferPoolConfig::new(num_pages)
        .with_retry(RetryPolicy::new(5, Duration::from_millis(2)));
    (BufferPool::with_config(config, store.clone()), store, dir)
}

fn record(byte: u8) -> Tuple {
    Tuple::new([byte; RECORD_SIZE])
}

/// All records of the table, read under a fresh transaction.
fn scan(pool: &BufferPool, store: &HeapStore) -> Vec<Vec<u8>> {
    let layout = store.layout(TABLE).unwrap();
    let txn = Transaction::begin();
    let mut out = vec![];
    for page_no in 0..store.page_count(TABLE).unwrap() {
        let page = pool
            .fetch_page(txn.id(), PageId::new(TABLE, page_no), Permission::Shared)
            .unwrap();
        let page = page.read();
        out.extend(layout.records(&page).map(|(_, r)| r.to_vec()));
    }
    txn.commit(pool).unwrap();
    out
}

/// Test that a commit reaches the store and survives a restart.
#[test]
fn test_commit_is_durable() {
    let dir = tempdir().unwrap();

    // First session: insert and commit
    {
        let store = Arc::new(HeapStore::open(dir.path()).unwrap());
        store.create_table(TABLE, RECORD_SIZE).unwrap();
        let pool = BufferPool::new(4, store);

        let txn = Transaction::begin();
        pool.insert_tuple(txn.id(), TABLE, &mut record(0xAB)).unwrap();
        txn.commit(&pool).unwrap();
    }

    // Second session: verify data
    {
        let store = Arc::new(HeapStore::open(dir.path()).unwrap());
        store.create_table(TABLE, RECORD_SIZE).unwrap();
        let pool = BufferPool::new(4, store.clone());

        assert_eq!(scan(&pool, &store), vec![vec![0xAB; RECORD_SIZE]]);
    }
}

/// Test that an abort leaves no trace, in cache or on disk.
#[test]
fn test_abort_rolls_back() {
    let (pool, store, _dir) = create_pool(4);

    let committed = Transaction::begin();
    pool.insert_tuple(committed.id(), TABLE, &mut record(1)).unwrap();
    committed.commit(&pool).unwrap();

    let aborted = Transaction::begin();
    let tid = aborted.id();
    pool.insert_tuple(tid, TABLE, &mut record(2)).unwrap();
    aborted.abort(&pool).unwrap();

    assert!(!pool.holds_lock(tid, PageId::new(TABLE, 0)));
    assert_eq!(scan(&pool, &store), vec![vec![1; RECORD_SIZE]]);
}

/// Test deleting a committed record in a later transaction.
#[test]
fn test_delete_committed_record() {
    let (pool, store, _dir) = create_pool(4);

    let mut tuple = record(5);
    let txn = Transaction::begin();
    pool.insert_tuple(txn.id(), TABLE, &mut tuple).unwrap();
    txn.commit(&pool).unwrap();

    let txn = Transaction::begin();
    pool.delete_tuple(txn.id(), &tuple).unwrap();
    txn.commit(&pool).unwrap();

    assert!(scan(&pool, &store).is_empty());
}

/// Test the capacity bound with a single-page pool.
#[test]
fn test_single_page_pool() {
    let (pool, store, _dir) = create_pool(1);
    store.allocate_page(TABLE).unwrap();
    store.allocate_page(TABLE).unwrap();

    // Clean pages are evicted freely
    let reader = TransactionId::new();
    pool.fetch_page(reader, PageId::new(TABLE, 0), Permission::Shared).unwrap();
    pool.fetch_page(reader, PageId::new(TABLE, 1), Permission::Shared).unwrap();
    assert_eq!(pool.resident_count(), 1);
    pool.transaction_complete(reader).unwrap();

    // A dirty page pins the pool until its transaction ends
    let writer = TransactionId::new();
    pool.insert_tuple(writer, TABLE, &mut record(9)).unwrap();
    let result = pool.fetch_page(writer, PageId::new(TABLE, 1), Permission::Shared);
    assert!(matches!(result, Err(Error::NoEvictablePage { capacity: 1 })));
    assert_eq!(pool.resident_count(), 1);

    pool.transaction_complete(writer).unwrap();
    pool.fetch_page(writer, PageId::new(TABLE, 1), Permission::Shared).unwrap();
    pool.transaction_complete(writer).unwrap();
}

/// Test data persistence across multiple eviction cycles.
#[test]
fn test_committed_data_survives_eviction() {
    let (pool, store, _dir) = create_pool(2);
    for _ in 0..5 {
        store.allocate_page(TABLE).unwrap();
    }

    let layout = store.layout(TABLE).unwrap();
    for page_no in 0..5u32 {
        let txn = Transaction::begin();
        let page = pool
            .fetch_page(txn.id(), PageId::new(TABLE, page_no), Permission::Exclusive)
            .unwrap();
        {
            let mut page = page.write();
            layout.insert(&mut page, &[page_no as u8; RECORD_SIZE]).unwrap();
            page.mark_dirty(txn.id());
        }
        drop(page);
        txn.commit(&pool).unwrap();
    }

    assert!(pool.stats().snapshot().evictions >= 3);
    let records = scan(&pool, &store);
    for page_no in 0..5u8 {
        assert!(records.contains(&vec![page_no; RECORD_SIZE]));
    }
}

/// Test concurrent inserters, each retrying after a lock timeout.
#[test]
fn test_concurrent_inserts() {
    let (pool, store, _dir) = create_pool(8);
    let pool = Arc::new(pool);

    let mut handles = vec![];
    for i in 0..4u8 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for j in 0..10u8 {
                let value = i * 10 + j;
                let mut retries = 0;
                loop {
                    let txn = Transaction::begin();
                    match pool.insert_tuple(txn.id(), TABLE, &mut record(value)) {
                        Ok(()) => {
                            txn.commit(&pool).unwrap();
                            break;
                        }
                        Err(e) if e.is_abort() => {
                            txn.abort(&pool).unwrap();
                            retries += 1;
                            assert!(retries < 1000, "insert kept timing out");
                            thread::sleep(Duration::from_millis(1 + i as u64));
                        }
                        Err(e) => panic!("insert failed: {e}"),
                    }
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let mut values: Vec<u8> = scan(&pool, &store).into_iter().map(|r| r[0]).collect();
    values.sort();
    assert_eq!(values, (0..40).collect::<Vec<u8>>());
}

/// Test stats accuracy under load.
#[test]
fn test_stats_accuracy() {
    let (pool, store, _dir) = create_pool(2);
    for _ in 0..3 {
        store.allocate_page(TABLE).unwrap();
    }

    let tid = TransactionId::new();
    let pid = PageId::new(TABLE, 0);
    for _ in 0..5 {
        pool.fetch_page(tid, pid, Permission::Shared).unwrap();
    }

    let stats = pool.stats().snapshot();
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 4);

    // Force eviction
    pool.fetch_page(tid, PageId::new(TABLE, 1), Permission::Shared).unwrap();
    pool.fetch_page(tid, PageId::new(TABLE, 2), Permission::Shared).unwrap();

    let stats = pool.stats().snapshot();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.pages_read, 3);
}
