/**********************************************
  > File Name		: block_store/mod.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Mon 17 May 2021 10:05:31 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Introduction:
 *
 * The block store is the slow device that sits behind the cache.
 * It is addressed in fixed-size blocks, every call blocks until
 * the device is done, and the cache treats it as infallible.
 *
 * Two stores are provided:
 * MemBlockStore keeps blocks in memory and counts every call, so
 * tests can see exactly what the cache sent to the device.
 * FileBlockStore puts block n at offset n * block_size of a
 * regular file.
 */

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use log::{*};

use crate::errors::StoreError;


pub trait BlockStore: Send + Sync {
    /// Fill `buf` with the contents of device block `block`.
    fn read(&self, block: u32, buf: &mut [u8]);

    /// Persist `buf` as the contents of device block `block`.
    fn write(&self, block: u32, buf: &[u8]);

    /// Durability barrier for the whole device.
    fn sync(&self);
}

impl<T: BlockStore + ?Sized> BlockStore for Arc<T> {
    fn read(&self, block: u32, buf: &mut [u8]) {
        (**self).read(block, buf)
    }

    fn write(&self, block: u32, buf: &[u8]) {
        (**self).write(block, buf)
    }

    fn sync(&self) {
        (**self).sync()
    }
}

#[derive(Debug, Default)]
struct MemState {
    blocks: HashMap<u32, Vec<u8>>,
    read_log: Vec<u32>,
    write_log: Vec<u32>,
    syncs: usize,
}

/*
 * In-memory device.
 * Blocks never written read back as zeros.
 */
#[derive(Debug, Default)]
pub struct MemBlockStore {
    state: Mutex<MemState>,
}

impl MemBlockStore {
    pub fn new() -> Self {
        MemBlockStore::default()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().read_log.len()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().write_log.len()
    }

    pub fn syncs(&self) -> usize {
        self.state.lock().syncs
    }

    //block ids in the order they were read from the device.
    pub fn read_log(&self) -> Vec<u32> {
        self.state.lock().read_log.clone()
    }

    //block ids in the order they were written to the device.
    pub fn write_log(&self) -> Vec<u32> {
        self.state.lock().write_log.clone()
    }

    //persisted contents of a block, None if it was never written.
    pub fn block(&self, block: u32) -> Option<Vec<u8>> {
        self.state.lock().blocks.get(&block).cloned()
    }

    pub fn reset_counters(&self) {
        let mut state = self.state.lock();
        state.read_log.clear();
        state.write_log.clear();
        state.syncs = 0;
    }
}

impl BlockStore for MemBlockStore {
    fn read(&self, block: u32, buf: &mut [u8]) {
        let mut state = self.state.lock();
        state.read_log.push(block);
        match state.blocks.get(&block) {
            None => {
                for b in buf.iter_mut() {
                    *b = 0;
                }
            },
            Some(data) => {
                let n = buf.len().min(data.len());
                buf[..n].copy_from_slice(&data[..n]);
                for b in buf[n..].iter_mut() {
                    *b = 0;
                }
            }
        }
    }

    fn write(&self, block: u32, buf: &[u8]) {
        let mut state = self.state.lock();
        state.write_log.push(block);
        state.blocks.insert(block, buf.to_vec());
    }

    fn sync(&self) {
        self.state.lock().syncs += 1;
    }
}

/*
 * File backed device.
 * There's no header in the file, block n simply lives at
 * offset n * block_size. The file grows when a block past
 * its end gets written, and reading past the end gives zeros.
 */
#[derive(Debug)]
pub struct FileBlockStore {
    fp: File,
    block_size: usize,
}

impl FileBlockStore {
    pub fn open<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self, StoreError> {
        if block_size == 0 {
            return Err(StoreError::ZeroBlockSize);
        }
        let fp = ok_or_return!(
            OpenOptions::new().read(true).write(true).create(true).open(path.as_ref()),
            StoreError::OpenError
        );
        let len = ok_or_return!(fp.metadata(), StoreError::MetadataError).len();
        info!("Opened disk file {:?} with {} bytes, block size {}", path.as_ref(), len, block_size);
        Ok(FileBlockStore {
            fp,
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn get_block_offset(&self, block: u32) -> u64 {
        (block as u64) * (self.block_size as u64)
    }
}

impl BlockStore for FileBlockStore {
    fn read(&self, block: u32, buf: &mut [u8]) {
        let offset = self.get_block_offset(block);
        let mut read_bytes = 0;
        while read_bytes < buf.len() {
            match self.fp.read_at(&mut buf[read_bytes..], offset + read_bytes as u64) {
                Ok(0) => break,
                Ok(n) => read_bytes += n,
                Err(e) => {
                    error!("read_at error on block {}: {:?}", block, e);
                    break;
                }
            }
        }
        //whatever is past the end of the file reads as zeros.
        for b in buf[read_bytes..].iter_mut() {
            *b = 0;
        }
    }

    fn write(&self, block: u32, buf: &[u8]) {
        let offset = self.get_block_offset(block);
        if let Err(e) = self.fp.write_all_at(buf, offset) {
            error!("write_at error on block {}: {:?}", block, e);
        }
    }

    fn sync(&self) {
        if let Err(e) = self.fp.sync_all() {
            error!("sync_all error: {:?}", e);
        }
    }
}
