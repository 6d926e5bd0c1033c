/**********************************************
  > File Name		: buffer_pool.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 18 May 2021 10:22:51 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * All buffers are allocated once, when the cache is built, and
 * each is exactly block_size bytes. A buffer belongs to one slot
 * for the whole lifetime of the pool.
 *
 * Data only moves in and out by copying, callers never get a
 * reference that outlives the cache lock.
 */

#[derive(Debug, Clone)]
pub struct BufferPool {
    buffers: Vec<Vec<u8>>,
    block_size: usize,
}

impl BufferPool {
    pub fn new(block_size: usize, num_slots: usize) -> Self {
        BufferPool {
            buffers: vec![vec![0; block_size]; num_slots],
            block_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn buffer(&self, index: usize) -> &[u8] {
        &self.buffers[index]
    }

    pub fn buffer_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.buffers[index]
    }

    pub fn copy_in(&mut self, index: usize, src: &[u8]) {
        self.buffers[index].copy_from_slice(src);
    }

    pub fn copy_out(&self, index: usize, dest: &mut [u8]) {
        dest.copy_from_slice(&self.buffers[index]);
    }
}
