/**********************************************
  > File Name		: workload/mod.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Thu 20 May 2021 04:31:09 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Performance harness for the block cache.
 *
 * Four access patterns, each run either through the cache or
 * straight against the device behind it:
 * 1. Random: blocks spread randomly over the disk.
 * 2. Localized: a handful of blocks touched over and over.
 * 3. Mixed: 90% localized, 10% random.
 * 4. Adversary: every block touched once, nothing to reuse.
 *
 * A run reports its turnaround time and whether the last buffer
 * read back equals the last buffer written.
 */

use std::path::Path;
use std::time::{Duration, Instant};

use log::{*};

use crate::block_cache::{BlockCache, CacheStats};
use crate::block_store::{BlockStore, FileBlockStore};
use crate::config::CacheConfig;
use crate::errors::WorkloadError;


pub const ITERATIONS: usize = 100;
pub const RANDOM_RANGE: u64 = 512;
pub const USAGE: &str = "usage: blockcache [enabled | disabled] [1-4]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskMode {
    Enabled, //go through the cache.
    Disabled, //talk to the device directly.
}

impl DiskMode {
    pub fn label(&self) -> &'static str {
        match self {
            DiskMode::Enabled => "enabled",
            DiskMode::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    Random,
    Localized,
    Mixed,
    Adversary,
}

impl AccessPattern {
    pub fn from_case(case: u32) -> Option<Self> {
        match case {
            1 => Some(AccessPattern::Random),
            2 => Some(AccessPattern::Localized),
            3 => Some(AccessPattern::Mixed),
            4 => Some(AccessPattern::Adversary),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessPattern::Random => "Random Access",
            AccessPattern::Localized => "Localized Access",
            AccessPattern::Mixed => "Mixed Access",
            AccessPattern::Adversary => "Adversary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadArgs {
    pub mode: DiskMode,
    pub pattern: AccessPattern,
}

impl WorkloadArgs {
    /*
     * Exactly two arguments: [enabled | disabled] [1-4].
     * The mode is case insensitive.
     */
    pub fn parse<T: AsRef<str>>(args: &[T]) -> Result<Self, WorkloadError> {
        if args.len() != 2 {
            return Err(WorkloadError::InvalidArgCount);
        }
        let mode = match args[0].as_ref().to_lowercase().as_str() {
            "enabled" => DiskMode::Enabled,
            "disabled" => DiskMode::Disabled,
            _ => return Err(WorkloadError::InvalidDiskMode),
        };
        let case = ok_or_return!(args[1].as_ref().trim().parse::<u32>(), WorkloadError::InvalidCase);
        let pattern = match AccessPattern::from_case(case) {
            None => return Err(WorkloadError::InvalidCase),
            Some(v) => v
        };
        Ok(WorkloadArgs {
            mode,
            pattern,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadReport {
    pub pattern: AccessPattern,
    pub mode: DiskMode,
    pub elapsed: Duration,
    pub data_matches: bool,
    pub stats: CacheStats,
}

impl WorkloadReport {
    pub fn summary(&self) -> String {
        format!("{} Turnaround Time with cache {} : {}msec",
            self.pattern.label(), self.mode.label(), self.elapsed.as_millis())
    }
}

/*
 * xorshift64, deterministic for a given seed.
 */
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        XorShift64 {
            state: if seed == 0 { 0x853C49E6748FEA9B } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    //uniform enough in [0, bound) for a benchmark.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

struct Workload<'a, S: BlockStore> {
    cache: &'a BlockCache<S>,
    mode: DiskMode,
    write_buf: Vec<u8>,
    read_buf: Vec<u8>,
    rng: XorShift64,
}

impl<'a, S: BlockStore> Workload<'a, S> {
    fn read(&mut self, block: i32) {
        match self.mode {
            DiskMode::Enabled => {
                if !self.cache.read(block, &mut self.read_buf) {
                    warn!("cache read of block {} failed", block);
                }
            },
            DiskMode::Disabled => self.cache.store().read(block as u32, &mut self.read_buf),
        }
    }

    fn write(&mut self, block: i32) {
        match self.mode {
            DiskMode::Enabled => {
                if !self.cache.write(block, &self.write_buf) {
                    warn!("cache write of block {} failed", block);
                }
            },
            DiskMode::Disabled => self.cache.store().write(block as u32, &self.write_buf),
        }
    }

    fn fill_write_buf(&mut self, base: usize) {
        for (j, b) in self.write_buf.iter_mut().enumerate() {
            *b = (base + j) as u8;
        }
    }

    fn random_block(&mut self) -> i32 {
        self.rng.below(RANDOM_RANGE) as i32
    }

    fn write_then_read_all(&mut self, blocks: &[i32]) {
        for &block in blocks {
            self.fill_write_buf(0);
            self.write(block);
        }
        for &block in blocks {
            self.read(block);
        }
    }

    fn random_access(&mut self) {
        let blocks: Vec<i32> = (0..ITERATIONS).map(|_| self.random_block()).collect();
        self.write_then_read_all(&blocks);
    }

    fn localized_access(&mut self) {
        for round in 0..20 {
            self.fill_write_buf(round);
            for block in (0..1000).step_by(100) {
                self.write(block);
            }
            for block in (0..1000).step_by(100) {
                self.read(block);
            }
        }
    }

    fn mixed_access(&mut self) {
        let mut blocks = Vec::with_capacity(ITERATIONS);
        for _ in 0..ITERATIONS {
            if self.rng.below(10) > 8 {
                blocks.push(self.random_block());
            } else {
                blocks.push(self.rng.below(10) as i32);
            }
        }
        self.write_then_read_all(&blocks);
    }

    fn adversary_access(&mut self) {
        for group in 0..20 {
            self.fill_write_buf(0);
            for j in 0..10 {
                self.write(group * 10 + j);
            }
        }
        for group in 0..20 {
            for j in 0..10 {
                self.read(group * 10 + j);
            }
        }
    }
}

pub fn run<S: BlockStore>(args: &WorkloadArgs, cache: &BlockCache<S>, seed: u64) -> WorkloadReport {
    let block_size = cache.block_size();
    let mut workload = Workload {
        cache,
        mode: args.mode,
        write_buf: vec![0; block_size],
        read_buf: vec![0; block_size],
        rng: XorShift64::new(seed),
    };
    cache.flush();
    info!("Running {} with cache {}", args.pattern.label(), args.mode.label());

    let start = Instant::now();
    match args.pattern {
        AccessPattern::Random => workload.random_access(),
        AccessPattern::Localized => workload.localized_access(),
        AccessPattern::Mixed => workload.mixed_access(),
        AccessPattern::Adversary => workload.adversary_access(),
    }
    let elapsed = start.elapsed();

    let data_matches = workload.read_buf == workload.write_buf;
    if !data_matches {
        error!("Data does not match after {}", args.pattern.label());
    }
    WorkloadReport {
        pattern: args.pattern,
        mode: args.mode,
        elapsed,
        data_matches,
        stats: cache.stats(),
    }
}

/*
 * Open (or create) the disk file and put a cache in front of it.
 */
pub fn open_file_cache<P: AsRef<Path>>(path: P, config: CacheConfig) -> Result<BlockCache<FileBlockStore>, WorkloadError> {
    error_return!(config.validate(), WorkloadError::CacheSetup);
    let store = ok_or_return!(FileBlockStore::open(path, config.block_size), WorkloadError::StoreSetup);
    let cache = ok_or_return!(BlockCache::new(config, store), WorkloadError::CacheSetup);
    Ok(cache)
}
