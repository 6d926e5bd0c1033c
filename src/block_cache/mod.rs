/**********************************************
  > File Name		: block_cache/mod.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 18 May 2021 03:16:44 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Introduction:
 *
 * The block cache keeps a fixed number of device blocks in main
 * memory. Reads and writes are served from the cache whenever the
 * block is resident, writes are deferred until the block has to
 * leave the cache (write back, never write through).
 *
 * When a block is not resident we first look for an empty slot.
 * If there is none, a victim is chosen by the enhanced second
 * chance (clock) algorithm using the reference bit and the dirty
 * bit of every slot. A dirty victim is written back to the device
 * before its buffer gets reused.
 *
 * Locking:
 * One mutex covers the page table, the buffer pool and the stats.
 * Every public operation runs entirely under it, device calls
 * included, so no caller ever sees half updated metadata. A slow
 * device stalls every cache user, that's the price.
 *
 * Reference bits:
 * Only hits set the reference bit. A block that was just faulted
 * in, by a read miss or a write miss, keeps it cleared and is
 * therefore the first thing the next clock scan may take.
 */

pub mod buffer_pool;
pub mod page_table;

#[cfg(test)]
mod tests;

use std::convert::TryFrom;

use parking_lot::Mutex;
use log::{*};

use crate::block_store::BlockStore;
use crate::config::CacheConfig;
use crate::errors::CacheError;
use self::buffer_pool::BufferPool;
use self::page_table::PageTable;

pub use self::page_table::Entry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub write_backs: u64,
}

#[derive(Debug)]
struct Inner {
    table: PageTable,
    pool: BufferPool,
    stats: CacheStats,
}

pub struct BlockCache<S: BlockStore> {
    inner: Mutex<Inner>,
    store: S,
    config: CacheConfig,
}

impl<S: BlockStore> BlockCache<S> {
    pub fn new(config: CacheConfig, store: S) -> Result<Self, CacheError> {
        config.validate()?;
        debug!("cache initial geometry: {} slots of {} bytes", config.cache_blocks, config.block_size);
        Ok(BlockCache {
            inner: Mutex::new(Inner {
                table: PageTable::new(config.cache_blocks),
                pool: BufferPool::new(config.block_size, config.cache_blocks),
                stats: CacheStats::default(),
            }),
            store,
            config,
        })
    }

    pub fn with_geometry(block_size: usize, cache_blocks: usize, store: S) -> Result<Self, CacheError> {
        Self::new(CacheConfig::new(block_size, cache_blocks), store)
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn capacity(&self) -> usize {
        self.config.cache_blocks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    //copy of the whole page table, slot i at index i.
    pub fn entries(&self) -> Vec<Entry> {
        self.inner.lock().table.entries().to_vec()
    }

    //residency probe, reference bits are left alone.
    pub fn contains(&self, block_id: i32) -> bool {
        match u32::try_from(block_id) {
            Err(_) => false,
            Ok(block) => self.inner.lock().table.lookup(block).is_some(),
        }
    }

    /*
     * Both read and write refuse negative block ids and buffers
     * of the wrong length before taking the lock.
     */
    fn check_request(&self, block_id: i32, len: usize) -> Option<u32> {
        let block = match u32::try_from(block_id) {
            Err(_) => {
                warn!("Rejecting request for invalid block id {}", block_id);
                return None;
            },
            Ok(v) => v
        };
        if len != self.config.block_size {
            warn!("Rejecting request for block {}: buffer length {} != block size {}",
                block, len, self.config.block_size);
            return None;
        }
        Some(block)
    }

    /*
     * Write a slot back to the device at the block id it holds
     * right now, then mark it clean.
     * This is the only place the cache writes to the device.
     */
    fn write_back(&self, inner: &mut Inner, index: usize) {
        let entry = inner.table.entry_mut(index);
        match entry.block {
            None => {
                error!("Write back of empty slot index={}, nothing to persist", index);
            },
            Some(block) => {
                debug!("Writing back block {} from index={}", block, index);
                self.store.write(block, inner.pool.buffer(index));
                inner.stats.write_backs += 1;
            }
        }
        entry.dirty = false;
    }

    /*
     * Pick the slot that will take a block which is not resident.
     * An empty slot if there is one, otherwise the clock victim,
     * written back first if it's dirty.
     */
    fn claim_slot(&self, inner: &mut Inner) -> Option<usize> {
        if let Some(index) = inner.table.find_free() {
            debug!("Using free slot index={}", index);
            return Some(index);
        }
        debug!("No free slots");
        let victim = inner.table.next_victim()?;
        inner.stats.evictions += 1;
        if inner.table.entry(victim).dirty {
            self.write_back(inner, victim);
        }
        Some(victim)
    }

    pub fn read(&self, block_id: i32, buf: &mut [u8]) -> bool {
        let block = match self.check_request(block_id, buf.len()) {
            None => return false,
            Some(v) => v
        };
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(index) = inner.table.lookup(block) {
            debug!("Reading block {} from cache index={}", block, index);
            inner.pool.copy_out(index, buf);
            inner.table.entry_mut(index).reference = true;
            inner.stats.hits += 1;
            return true;
        }

        debug!("Reading block {} from device", block);
        inner.stats.misses += 1;
        let index = match self.claim_slot(inner) {
            None => return false,
            Some(v) => v
        };
        self.store.read(block, inner.pool.buffer_mut(index));
        inner.pool.copy_out(index, buf);
        let entry = inner.table.entry_mut(index);
        entry.block = Some(block);
        entry.dirty = false;
        true
    }

    pub fn write(&self, block_id: i32, buf: &[u8]) -> bool {
        let block = match self.check_request(block_id, buf.len()) {
            None => return false,
            Some(v) => v
        };
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(index) = inner.table.lookup(block) {
            debug!("Writing block {} into cache index={}", block, index);
            //the old contents go out first even though they're about to be overwritten.
            if inner.table.entry(index).dirty {
                self.write_back(inner, index);
            }
            inner.pool.copy_in(index, buf);
            let entry = inner.table.entry_mut(index);
            entry.reference = true;
            entry.dirty = true;
            inner.stats.hits += 1;
            return true;
        }

        debug!("Block {} not cached, taking a slot for the write", block);
        inner.stats.misses += 1;
        let index = match self.claim_slot(inner) {
            None => return false,
            Some(v) => v
        };
        inner.pool.copy_in(index, buf);
        let entry = inner.table.entry_mut(index);
        entry.block = Some(block);
        entry.dirty = true;
        true
    }

    /*
     * Write back every dirty slot and issue a device sync.
     * Nothing gets evicted, later reads of the same blocks hit.
     */
    pub fn sync(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut written = 0;
        for index in 0..inner.table.len() {
            if inner.table.entry(index).dirty {
                self.write_back(inner, index);
                written += 1;
            }
        }
        self.store.sync();
        info!("Sync wrote back {} blocks", written);
    }

    /*
     * Write back every dirty slot and drop it from the cache, then
     * issue a device sync.
     * Clean slots are left resident: only what had to be written
     * back is invalidated.
     */
    pub fn flush(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut flushed = 0;
        for index in 0..inner.table.len() {
            if inner.table.entry(index).dirty {
                self.write_back(inner, index);
                inner.table.entry_mut(index).invalidate();
                flushed += 1;
            }
        }
        self.store.sync();
        info!("Flush wrote back and invalidated {} blocks", flushed);
    }
}
