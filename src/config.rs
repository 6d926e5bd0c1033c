/**********************************************
  > File Name		: config.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Mon 17 May 2021 09:12:40 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

use crate::errors::CacheError;

pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_CACHE_BLOCKS: usize = 10;

/*
 * Geometry of a cache. Both values are fixed for the
 * whole lifetime of the cache built from it.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub block_size: usize,
    pub cache_blocks: usize,
}

impl CacheConfig {
    pub fn new(block_size: usize, cache_blocks: usize) -> Self {
        CacheConfig {
            block_size,
            cache_blocks,
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.block_size == 0 {
            return Err(CacheError::ZeroBlockSize);
        }
        if self.cache_blocks == 0 {
            return Err(CacheError::NoCacheBlocks);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::new(DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_BLOCKS)
    }
}
