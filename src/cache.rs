//! Summary: Block cache mapping page addresses to decoded blocks.
//! Copyright (c) YOAB. All rights reserved.
//!
//! An insertion/access-ordered map from [`Address`] to [`PageBlock`],
//! modeled on the ordered, deterministic cache shape used elsewhere in the
//! reference pack (`storage/cache.rs`'s `LinkedHashMap`-backed LRU): `get`
//! moves an entry to the most-recently-used end, `set` inserts or replaces.
//! Eviction is handled separately by [`BlockCache::shrink_to`], since the
//! spec gates eviction on dirtiness, not just recency.

use linked_hash_map::LinkedHashMap;

use crate::page::{Address, PageBlock};

/// Ordered cache of decoded page blocks.
pub struct BlockCache {
    map: LinkedHashMap<Address, PageBlock>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self {
            map: LinkedHashMap::new(),
        }
    }

    /// Number of blocks currently cached.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the block at `addr` and marks it most-recently-used, if
    /// present.
    pub fn get(&mut self, addr: Address) -> Option<&PageBlock> {
        self.map.get_refresh(&addr).map(|b| &*b)
    }

    /// Mutable variant of [`BlockCache::get`].
    pub fn get_mut(&mut self, addr: Address) -> Option<&mut PageBlock> {
        self.map.get_refresh(&addr)
    }

    /// Inserts or replaces the block at its own address, marking it
    /// most-recently-used.
    pub fn set(&mut self, block: PageBlock) {
        self.map.insert(block.addr(), block);
    }

    /// Removes and returns the block at `addr`, if present.
    pub fn remove(&mut self, addr: Address) -> Option<PageBlock> {
        self.map.remove(&addr)
    }

    /// Iterates blocks in least-recently-used → most-recently-used order.
    pub fn iter_lru_order(&self) -> impl Iterator<Item = &PageBlock> {
        self.map.values()
    }

    /// Iterates blocks in LRU order, yielding owned values (used by
    /// `save`, which must mutate the cache while walking it).
    pub fn addrs_lru_order(&self) -> Vec<Address> {
        self.map.keys().copied().collect()
    }

    /// Evicts clean blocks in least-recently-used order until `len() <=
    /// target` or no more clean candidates remain. Dirty blocks are never
    /// evicted, so this may leave the cache above `target` -- that is
    /// intentional, per `spec.md` §4.2.
    pub fn shrink_to(&mut self, target: usize) {
        if self.map.len() <= target {
            return;
        }
        let victims: Vec<Address> = self
            .map
            .iter()
            .filter(|(_, block)| !block.is_dirty())
            .map(|(addr, _)| *addr)
            .collect();
        let mut to_remove = self.map.len() - target;
        for addr in victims {
            if to_remove == 0 {
                break;
            }
            self.map.remove(&addr);
            to_remove -= 1;
        }
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = BlockCache::new();
        cache.set(PageBlock::new_empty(1, 64));
        cache.set(PageBlock::new_empty(2, 64));
        cache.set(PageBlock::new_empty(3, 64));
        // Touch 1 so it becomes most-recently-used.
        cache.get(1);
        assert_eq!(cache.addrs_lru_order(), vec![2, 3, 1]);
    }

    #[test]
    fn test_shrink_evicts_clean_oldest_first() {
        let mut cache = BlockCache::new();
        cache.set(PageBlock::new_empty(1, 64));
        cache.set(PageBlock::new_empty(2, 64));
        cache.set(PageBlock::new_empty(3, 64));
        cache.shrink_to(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_shrink_never_evicts_dirty_blocks() {
        let mut cache = BlockCache::new();
        // A block freshly constructed with `new_*` starts dirty.
        let dirty = PageBlock::new_root(1, 64, 0, 0);
        assert!(dirty.is_dirty());
        cache.set(dirty);
        // A block loaded from disk starts clean.
        let clean = PageBlock::load(2, vec![0u8; 64]);
        assert!(!clean.is_dirty());
        cache.set(clean);
        cache.shrink_to(0);
        // The dirty block at 1 survives even though target is 0; the clean
        // block at 2 is evicted.
        assert_eq!(cache.len(), 1);
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_remove_drops_block_regardless_of_dirtiness() {
        let mut cache = BlockCache::new();
        cache.set(PageBlock::new_empty(1, 64));
        assert!(cache.remove(1).is_some());
        assert!(cache.get(1).is_none());
    }
}
