//! Summary: On-disk free-list manager.
//! Copyright (c) YOAB. All rights reserved.
//!
//! The free-list tracks pages that have been freed and can be reused,
//! preventing unbounded file growth. Unlike the teacher's in-memory
//! `BTreeSet`-backed pool, this free-list is itself paged and persisted
//! incrementally: it is a doubly-chained sequence of free-list pages
//! reachable from `root.firstFreelistAddr`, each holding a slot array of
//! released addresses.
//!
//! These functions take the store's inner state directly rather than
//! owning the cache, so the root and any free-list node are fetched by
//! address on each step instead of held across calls.

use crate::page::{Address, PageBlock, NULL};
use crate::store::StoreInner;
use crate::Result;

/// Follows `firstFreelistAddr` to the node with `nextAddr == 0`. Returns
/// `None` iff the chain is empty.
fn tail(store: &mut StoreInner) -> Result<Option<Address>> {
    let head = store.root_block()?.first_freelist_addr()?;
    if head == NULL {
        return Ok(None);
    }
    let mut cur = head;
    loop {
        let next = store.freelist_block(cur)?.freelist_next()?;
        if next == NULL {
            return Ok(Some(cur));
        }
        cur = next;
    }
}

/// Allocator-side pop: returns a previously freed address, or `None` if the
/// free-list is empty (the caller must extend the file instead).
pub(crate) fn take_one(store: &mut StoreInner) -> Result<Option<Address>> {
    let tail_addr = match tail(store)? {
        None => return Ok(None),
        Some(addr) => addr,
    };
    let count = store.freelist_block(tail_addr)?.freelist_count()?;
    if count > 0 {
        let addr = store.freelist_block_mut(tail_addr)?.freelist_pop()?;
        return Ok(Some(addr));
    }

    // The tail node is itself empty: recycle the node's own address. This
    // is the only place a free-list node is ever recycled.
    let prev = store.freelist_block(tail_addr)?.freelist_prev()?;
    store.mark_empty(tail_addr);
    if prev == NULL {
        store.root_block_mut()?.set_first_freelist_addr(NULL)?;
    } else {
        store.freelist_block_mut(prev)?.set_freelist_next(NULL)?;
    }
    #[cfg(debug_assertions)]
    eprintln!("freelist: recycled tail node at {tail_addr} (prev={prev})");
    Ok(Some(tail_addr))
}

/// Release-side push: gives `addr` back to the free-list.
pub(crate) fn give_back(store: &mut StoreInner, addr: Address) -> Result<()> {
    let head = store.root_block()?.first_freelist_addr()?;
    if head == NULL {
        let node = PageBlock::new_freelist(addr, store.page_size(), NULL, NULL);
        store.set_block(node);
        store.root_block_mut()?.set_first_freelist_addr(addr)?;
        #[cfg(debug_assertions)]
        eprintln!("freelist: materialized first node at {addr}");
        return Ok(());
    }

    let tail_addr = tail(store)?.expect("head != NULL implies a tail exists");
    let full = {
        let t = store.freelist_block(tail_addr)?;
        t.freelist_count()? as usize >= t.freelist_capacity()
    };
    if full {
        let node = PageBlock::new_freelist(addr, store.page_size(), tail_addr, NULL);
        store.set_block(node);
        store.freelist_block_mut(tail_addr)?.set_freelist_next(addr)?;
        #[cfg(debug_assertions)]
        eprintln!("freelist: grew chain with new node at {addr} (prev tail {tail_addr})");
    } else {
        store.freelist_block_mut(tail_addr)?.freelist_push(addr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use crate::store::Store;

    fn fresh_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let store = Store::open_with(&path, StoreOptions::new(256)).unwrap();
        (store, dir)
    }

    #[test]
    fn test_take_one_on_empty_chain_is_none() {
        let (store, _dir) = fresh_store();
        let mut inner = store.inner_for_test();
        assert!(take_one(&mut inner).unwrap().is_none());
    }

    #[test]
    fn test_give_back_then_take_one_round_trips_single_address() {
        let (store, _dir) = fresh_store();
        let mut inner = store.inner_for_test();
        // Materialize the root so address 0 is not itself handed back.
        inner.root_block().unwrap();
        give_back(&mut inner, 7).unwrap();
        // Giving back a fresh address materializes a free-list node at
        // that very address, which is then recycled by the next take_one.
        assert_eq!(take_one(&mut inner).unwrap(), Some(7));
        assert!(take_one(&mut inner).unwrap().is_none());
    }

    #[test]
    fn test_multiple_give_backs_share_one_node_until_full() {
        let (store, _dir) = fresh_store();
        let mut inner = store.inner_for_test();
        inner.root_block().unwrap();
        give_back(&mut inner, 10).unwrap();
        give_back(&mut inner, 11).unwrap();
        give_back(&mut inner, 12).unwrap();
        // 10 materialized the node; 11 and 12 were appended as slots.
        assert_eq!(take_one(&mut inner).unwrap(), Some(12));
        assert_eq!(take_one(&mut inner).unwrap(), Some(11));
        assert_eq!(take_one(&mut inner).unwrap(), Some(10));
        assert!(take_one(&mut inner).unwrap().is_none());
    }
}
