/**********************************************
  > File Name		: block_cache/tests.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Wed 19 May 2021 10:03:27 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use super::*;
use crate::block_store::MemBlockStore;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup(block_size: usize, slots: usize) -> (Arc<MemBlockStore>, BlockCache<Arc<MemBlockStore>>) {
    init_logger();
    let store = Arc::new(MemBlockStore::new());
    let cache = BlockCache::with_geometry(block_size, slots, Arc::clone(&store)).unwrap();
    (store, cache)
}

fn occupied(entries: &[Entry]) -> Vec<Option<u32>> {
    entries.iter().map(|e| e.block).collect()
}

#[test]
fn construction_rejects_empty_geometry() {
    init_logger();
    let store = MemBlockStore::new();
    assert!(matches!(
        BlockCache::with_geometry(0, 4, store),
        Err(CacheError::ZeroBlockSize)
    ));
    let store = MemBlockStore::new();
    assert!(matches!(
        BlockCache::with_geometry(4, 0, store),
        Err(CacheError::NoCacheBlocks)
    ));
}

#[test]
fn new_cache_is_empty() {
    let (_, cache) = setup(8, 4);
    assert_eq!(cache.block_size(), 8);
    assert_eq!(cache.capacity(), 4);
    assert!(cache.entries().iter().all(|e| *e == Entry::default()));
    assert_eq!(cache.stats(), CacheStats::default());
}

#[test]
fn write_then_read_returns_same_data() {
    let (store, cache) = setup(4, 2);
    assert!(cache.write(7, &[1, 2, 3, 4]));
    let mut buf = [0u8; 4];
    assert!(cache.read(7, &mut buf));
    assert_eq!(buf, [1, 2, 3, 4]);
    //deferred: nothing went to the device.
    assert_eq!(store.writes(), 0);
    assert_eq!(store.reads(), 0);
}

#[test]
fn read_miss_loads_from_device_without_reference() {
    let (store, cache) = setup(4, 2);
    store.write(5, &[5, 5, 5, 5]);
    store.reset_counters();

    let mut buf = [0u8; 4];
    assert!(cache.read(5, &mut buf));
    assert_eq!(buf, [5, 5, 5, 5]);
    assert_eq!(store.read_log(), vec![5]);

    let entries = cache.entries();
    assert_eq!(entries[0], Entry { block: Some(5), reference: false, dirty: false });

    //second read is a hit and sets the reference bit.
    assert!(cache.read(5, &mut buf));
    assert_eq!(store.reads(), 1);
    assert!(cache.entries()[0].reference);
}

#[test]
fn full_cache_of_writes_reads_back_without_device_reads() {
    let (store, cache) = setup(4, 5);
    for id in 0..5 {
        assert!(cache.write(id, &[id as u8; 4]));
    }
    for id in 0..5 {
        let mut buf = [0u8; 4];
        assert!(cache.read(id, &mut buf));
        assert_eq!(buf, [id as u8; 4]);
    }
    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
    let stats = cache.stats();
    assert_eq!(stats.hits, 5);
    assert_eq!(stats.misses, 5);
    assert_eq!(stats.evictions, 0);
}

#[test]
fn one_write_past_capacity_evicts_once() {
    let (store, cache) = setup(4, 3);
    for id in 0..3 {
        assert!(cache.write(id, &[10 + id as u8; 4]));
    }
    assert!(cache.write(3, &[13; 4]));

    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(store.write_log(), vec![0]);
    assert_eq!(store.block(0), Some(vec![10; 4]));
    assert_eq!(occupied(&cache.entries()), vec![Some(3), Some(1), Some(2)]);
}

#[test]
fn clean_victim_is_not_written_back() {
    let (store, cache) = setup(4, 2);
    let mut buf = [0u8; 4];
    assert!(cache.read(0, &mut buf));
    assert!(cache.read(1, &mut buf));
    assert!(cache.read(2, &mut buf));
    assert_eq!(store.writes(), 0);
    assert_eq!(cache.stats().write_backs, 0);
    assert_eq!(occupied(&cache.entries()), vec![Some(2), Some(1)]);
}

#[test]
fn clock_clears_all_references_and_picks_index_zero() {
    let (_, cache) = setup(4, 3);
    let mut buf = [0u8; 4];
    for id in 0..3 {
        assert!(cache.write(id, &[id as u8; 4]));
    }
    for id in 0..3 {
        assert!(cache.read(id, &mut buf));
    }
    assert!(cache.entries().iter().all(|e| e.reference));

    assert!(cache.write(9, &[9; 4]));
    let entries = cache.entries();
    assert_eq!(occupied(&entries), vec![Some(9), Some(1), Some(2)]);
    assert!(entries.iter().all(|e| !e.reference));
}

#[test]
fn clock_skips_referenced_slot() {
    let (store, cache) = setup(4, 3);
    let mut buf = [0u8; 4];
    for id in 0..3 {
        assert!(cache.write(id, &[id as u8; 4]));
    }
    //only block 0 gets a second chance.
    assert!(cache.read(0, &mut buf));
    assert!(cache.write(3, &[3; 4]));

    assert_eq!(occupied(&cache.entries()), vec![Some(0), Some(3), Some(2)]);
    assert!(!cache.entries()[0].reference);
    assert_eq!(store.write_log(), vec![1]);
}

#[test]
fn scan_restarts_from_index_zero() {
    let (_, cache) = setup(4, 2);
    assert!(cache.write(0, &[0; 4]));
    assert!(cache.write(1, &[1; 4]));
    //both fault-ins leave reference cleared, index 0 goes first every time.
    assert!(cache.write(2, &[2; 4]));
    assert!(cache.write(3, &[3; 4]));
    assert_eq!(occupied(&cache.entries()), vec![Some(3), Some(1)]);
}

#[test]
fn write_hit_on_dirty_slot_writes_old_contents_back() {
    let (store, cache) = setup(4, 2);
    assert!(cache.write(4, &[1; 4]));
    assert!(cache.write(4, &[2; 4]));
    assert_eq!(store.write_log(), vec![4]);
    assert_eq!(store.block(4), Some(vec![1; 4]));

    let entry = cache.entries()[0];
    assert_eq!(entry, Entry { block: Some(4), reference: true, dirty: true });

    let mut buf = [0u8; 4];
    assert!(cache.read(4, &mut buf));
    assert_eq!(buf, [2; 4]);
}

#[test]
fn sync_writes_back_each_dirty_slot_once() {
    let (store, cache) = setup(4, 4);
    let mut buf = [0u8; 4];
    assert!(cache.write(0, &[0xa; 4]));
    assert!(cache.write(1, &[0xb; 4]));
    assert!(cache.read(2, &mut buf));
    assert!(cache.read(0, &mut buf));
    store.reset_counters();

    let before = cache.entries();
    cache.sync();
    let after = cache.entries();

    assert_eq!(store.write_log(), vec![0, 1]);
    assert_eq!(store.syncs(), 1);
    assert_eq!(store.block(0), Some(vec![0xa; 4]));
    assert_eq!(store.block(1), Some(vec![0xb; 4]));
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.block, a.block);
        assert_eq!(b.reference, a.reference);
        assert!(!a.dirty);
    }

    cache.sync();
    assert_eq!(store.writes(), 2);
    assert_eq!(store.syncs(), 2);

    //still resident.
    assert!(cache.read(1, &mut buf));
    assert_eq!(store.reads(), 0);
}

#[test]
fn flush_only_invalidates_dirty_slots() {
    let (store, cache) = setup(4, 3);
    let mut buf = [0u8; 4];
    assert!(cache.write(0, &[7; 4]));
    assert!(cache.read(1, &mut buf));
    assert!(cache.read(2, &mut buf));
    assert!(cache.read(1, &mut buf));
    store.reset_counters();

    cache.flush();
    assert_eq!(store.write_log(), vec![0]);
    assert_eq!(store.syncs(), 1);

    let entries = cache.entries();
    assert_eq!(entries[0], Entry::default());
    assert_eq!(entries[1], Entry { block: Some(1), reference: true, dirty: false });
    assert_eq!(entries[2].block, Some(2));
    assert!(!cache.contains(0));
    assert!(cache.contains(1));

    assert!(cache.read(1, &mut buf));
    assert!(cache.read(2, &mut buf));
    assert_eq!(store.reads(), 0);

    assert!(cache.read(0, &mut buf));
    assert_eq!(buf, [7; 4]);
    assert_eq!(store.read_log(), vec![0]);
}

#[test]
fn flush_on_clean_cache_only_syncs() {
    let (store, cache) = setup(4, 2);
    cache.flush();
    assert_eq!(store.writes(), 0);
    assert_eq!(store.syncs(), 1);
}

#[test]
fn negative_block_id_is_rejected() {
    let (store, cache) = setup(4, 2);
    assert!(cache.write(3, &[3; 4]));
    let before = cache.entries();
    let stats = cache.stats();

    let mut buf = [9u8; 4];
    assert!(!cache.read(-1, &mut buf));
    assert!(!cache.write(-1, &[1; 4]));
    assert!(!cache.read(i32::MIN, &mut buf));

    assert_eq!(buf, [9; 4]);
    assert_eq!(cache.entries(), before);
    assert_eq!(cache.stats(), stats);
    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
    assert!(!cache.contains(-1));
}

#[test]
fn wrong_buffer_length_is_rejected() {
    let (store, cache) = setup(4, 2);
    let mut short = [0u8; 3];
    assert!(!cache.read(1, &mut short));
    assert!(!cache.write(1, &[1; 5]));
    assert!(cache.entries().iter().all(|e| e.is_free()));
    assert_eq!(store.reads(), 0);
}

/*
 * Two slots, block size 4:
 * write 1, 2, 3 forces out block 1 from index 0, then a read of
 * block 1 has to go to the device again.
 */
#[test]
fn two_slot_walkthrough() {
    let (store, cache) = setup(4, 2);
    assert!(cache.write(1, &[1, 1, 1, 1]));
    assert!(cache.write(2, &[2, 2, 2, 2]));
    assert!(cache.write(3, &[3, 3, 3, 3]));

    assert_eq!(store.write_log(), vec![1]);
    assert_eq!(store.block(1), Some(vec![1, 1, 1, 1]));

    let mut buf = [0u8; 4];
    assert!(cache.read(3, &mut buf));
    assert_eq!(buf, [3, 3, 3, 3]);
    assert_eq!(store.reads(), 0);

    assert!(cache.read(1, &mut buf));
    assert_eq!(buf, [1, 1, 1, 1]);
    assert_eq!(store.read_log(), vec![1]);
    //block 3 was referenced, so block 2 made room and was written back.
    assert_eq!(store.write_log(), vec![1, 2]);
    assert_eq!(occupied(&cache.entries()), vec![Some(3), Some(1)]);
}

#[test]
fn concurrent_writers_keep_their_data() {
    init_logger();
    let store = Arc::new(MemBlockStore::new());
    let cache = Arc::new(BlockCache::with_geometry(16, 4, Arc::clone(&store)).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for round in 0..50 {
                    let block = t * 100 + (round % 10);
                    let data = [(t * 7 + round) as u8; 16];
                    assert!(cache.write(block, &data));
                    let mut buf = [0u8; 16];
                    assert!(cache.read(block, &mut buf));
                    //another thread may have evicted it in between, the data survives either way.
                    assert_eq!(buf, data);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    cache.sync();
    for t in 0..4 {
        for slot in 0..10 {
            let block = t * 100 + slot;
            let last_round = 40 + slot;
            let mut buf = [0u8; 16];
            assert!(cache.read(block, &mut buf));
            assert_eq!(buf, [(t * 7 + last_round) as u8; 16]);
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Read(i32),
    Write(i32, u8),
    Sync,
    Flush,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..8i32).prop_map(Op::Read),
        4 => (0..8i32, any::<u8>()).prop_map(|(b, v)| Op::Write(b, v)),
        1 => Just(Op::Sync),
        1 => Just(Op::Flush),
    ]
}

fn check_table(entries: &[Entry]) {
    let mut seen = Vec::new();
    for e in entries {
        match e.block {
            None => assert!(!e.dirty, "empty slot marked dirty"),
            Some(b) => {
                assert!(!seen.contains(&b), "block {} cached twice", b);
                seen.push(b);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cache_behaves_like_memory(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let (store, cache) = setup(4, 3);
        let mut model: HashMap<i32, u8> = HashMap::new();
        for op in ops {
            match op {
                Op::Read(b) => {
                    let mut buf = [0xeeu8; 4];
                    prop_assert!(cache.read(b, &mut buf));
                    let expected = model.get(&b).copied().unwrap_or(0);
                    prop_assert_eq!(buf, [expected; 4]);
                },
                Op::Write(b, v) => {
                    prop_assert!(cache.write(b, &[v; 4]));
                    model.insert(b, v);
                },
                Op::Sync => {
                    cache.sync();
                    prop_assert!(cache.entries().iter().all(|e| !e.dirty));
                },
                Op::Flush => {
                    cache.flush();
                    prop_assert!(cache.entries().iter().all(|e| !e.dirty));
                },
            }
            check_table(&cache.entries());
        }
        //after a sync the device agrees with everything ever written.
        cache.sync();
        for (b, v) in model {
            prop_assert_eq!(store.block(b as u32), Some(vec![v; 4]));
        }
    }
}
