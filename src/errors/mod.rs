/**********************************************
  > File Name		: errors.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 02 Mar 2021 11:05:17 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Define some erros enum for global usage.
 *
 * Notice that read and write on the cache never return these,
 * they report a rejected call with false. Errors here only happen
 * when something is being set up.
 */
#[derive(Debug, PartialEq, Eq)]
pub enum CacheError {
    ZeroBlockSize, //block size must be positive.
    NoCacheBlocks, //at least one slot is needed, or the clock scan has nothing to pick.
}

#[derive(Debug)]
pub enum StoreError {
    OpenError, //the disk file can't be opened or created.
    MetadataError, //can't read the length of the disk file.
    ZeroBlockSize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WorkloadError {
    InvalidArgCount, //exactly two arguments expected.
    InvalidDiskMode, //first argument is neither "enabled" nor "disabled".
    InvalidCase, //second argument is not an integer in 1..=4.
    CacheSetup,
    StoreSetup,
}
