/**********************************************
  > File Name		: page_table.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 18 May 2021 09:47:03 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * The page table keeps one entry of metadata per cache slot.
 * Entry i describes buffer i of the buffer pool, the two are
 * never reordered.
 *
 * An entry holds the block id it currently caches (None if the
 * slot is empty), a reference bit and a dirty bit.
 * Two occupied entries never hold the same block id, and an empty
 * entry is never dirty.
 */

use log::{*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Entry {
    pub block: Option<u32>,
    pub reference: bool, //accessed since the clock scan last passed over it.
    pub dirty: bool, //buffer differs from the copy on the device.
}

impl Entry {
    pub fn is_free(&self) -> bool {
        self.block.is_none()
    }

    /*
     * Give the slot back to the free list.
     * Callers must have written back a dirty buffer before.
     */
    pub fn invalidate(&mut self) {
        self.block = None;
        self.reference = false;
        self.dirty = false;
    }
}

#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<Entry>,
}

impl PageTable {
    pub fn new(num_slots: usize) -> Self {
        PageTable {
            entries: vec![Entry::default(); num_slots],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }

    /*
     * Find the slot caching a block.
     * Linear scan from index 0, there's at most one match.
     */
    pub fn lookup(&self, block: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.block == Some(block))
    }

    //first empty slot in index order.
    pub fn find_free(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_free())
    }

    /*
     * Second chance scan.
     *
     * The scan always starts over at index 0, the hand is not kept
     * between calls. An entry with its reference bit set loses it
     * and the hand moves on, the first entry found without one is
     * the victim. After one full lap every bit is cleared, so a
     * victim shows up within 2 * len steps.
     *
     * Returns None only for a table with no slots at all.
     */
    pub fn next_victim(&mut self) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        let mut index = 0;
        for _ in 0..(2 * len) {
            let entry = &mut self.entries[index];
            if !entry.reference {
                debug!("Clock selects victim index={} block={:?}", index, entry.block);
                return Some(index);
            }
            entry.reference = false;
            index = (index + 1) % len;
        }
        error!("Clock scan found no victim in {} slots, this is impossible.", len);
        None
    }
}
