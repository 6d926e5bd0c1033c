/**********************************************
  > File Name		: lib.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Mon 17 May 2021 09:02:11 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

#[macro_use]
mod macros;

pub mod errors;
pub mod config;
pub mod block_store;
pub mod block_cache;
pub mod workload;

pub use block_cache::{BlockCache, CacheStats, Entry};
pub use block_store::{BlockStore, FileBlockStore, MemBlockStore};
pub use config::CacheConfig;
