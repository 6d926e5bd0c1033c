/**********************************************
  > File Name		: main.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Fri 21 May 2021 03:18:56 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

use std::env;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use blockcache::config::CacheConfig;
use blockcache::workload::{self, WorkloadArgs, USAGE};
use log::{*};

const DISK_ENV: &str = "BLOCKCACHE_DISK";
const DEFAULT_DISK: &str = "DISK";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match WorkloadArgs::parse(&args) {
        Err(e) => {
            error!("Invalid arguments: {:?}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        },
        Ok(v) => v
    };

    let disk = env::var(DISK_ENV).unwrap_or_else(|_| DEFAULT_DISK.to_string());
    let cache = match workload::open_file_cache(&disk, CacheConfig::default()) {
        Err(e) => {
            error!("Setting up cache on {} failed: {:?}", disk, e);
            process::exit(1);
        },
        Ok(v) => v
    };

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1);
    let report = workload::run(&args, &cache, seed);
    println!("{}", report.summary());
    if !report.data_matches {
        eprintln!(" Data does not match!");
    }
    debug!("{:?}", report.stats);
    cache.sync();
}
