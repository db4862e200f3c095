//! Summary: Overflow chain walkers for logical pages.
//! Copyright (c) YOAB. All rights reserved.
//!
//! A logical page (root or entry head) whose content outgrows a single raw
//! page is transparently spilled across a linked chain of Data pages. Read
//! and write share the same `(skip, remaining)` stepping rule; this module
//! generalizes the teacher's `OverflowManager`/`OverflowHeader` chain-walk
//! pattern (`allocate_overflow`/`read_overflow`/`free_overflow`) from a
//! value-only, checksum-carrying, always-singly-written chain into one that
//! is lazily grown, written in place at any offset, and carries no
//! checksums (an explicit non-goal of this store).

use crate::allocator;
use crate::freelist;
use crate::page::{Address, PageBlock, NULL};
use crate::store::StoreInner;
use crate::{Error, Result};

/// Total logical byte length reachable from `head`: the sum of content
/// capacities across the whole chain.
pub(crate) fn logical_len(store: &mut StoreInner, head: Address) -> Result<usize> {
    let mut total = 0usize;
    let mut cur = head;
    loop {
        let block = store.block(cur)?;
        total += block.content_capacity();
        let next = block.next_overflow_addr()?;
        if next == NULL {
            return Ok(total);
        }
        cur = next;
    }
}

/// Reads `length` bytes (or, if `None`, everything to the end of the chain)
/// starting at `start`.
pub(crate) fn read(
    store: &mut StoreInner,
    head: Address,
    start: usize,
    length: Option<usize>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(length.unwrap_or(0));
    let mut cur = head;
    let mut start = start;
    loop {
        let cap = store.block(cur)?.content_capacity();
        if start >= cap {
            start -= cap;
            let next = store.block(cur)?.next_overflow_addr()?;
            if next == NULL {
                return Err(Error::OutOfRange {
                    addr: head,
                    start,
                    length,
                });
            }
            cur = next;
            continue;
        }

        let want = length.map(|l| l - out.len());
        let take = match want {
            Some(w) => w.min(cap - start),
            None => cap - start,
        };
        out.extend_from_slice(&store.block(cur)?.content()[start..start + take]);
        start = 0;

        let satisfied = length.map(|l| out.len() >= l).unwrap_or(false);
        let next = store.block(cur)?.next_overflow_addr()?;
        if satisfied || next == NULL {
            if let Some(l) = length {
                if out.len() < l {
                    return Err(Error::OutOfRange {
                        addr: head,
                        start: 0,
                        length,
                    });
                }
            }
            return Ok(out);
        }
        cur = next;
    }
}

/// Appends a freshly allocated Data page after `after`, linking both ends.
fn grow(store: &mut StoreInner, after: Address) -> Result<Address> {
    let new_addr = allocator::allocate(store)?;
    let block = PageBlock::new_data(new_addr, store.page_size(), after, NULL);
    store.set_block(block);
    store.block_mut(after)?.set_next_overflow_addr(new_addr)?;
    #[cfg(debug_assertions)]
    eprintln!("overflow: grew chain from {after} to {new_addr}");
    Ok(new_addr)
}

/// Writes `content` starting at `start`, growing the chain lazily as
/// needed. When `cleanup_after` is set, everything reachable past the last
/// node touched by this write is freed once the write completes.
pub(crate) fn write(
    store: &mut StoreInner,
    head: Address,
    content: &[u8],
    start: usize,
    cleanup_after: bool,
) -> Result<()> {
    let mut cur = head;
    let mut start = start;
    let mut written = 0usize;
    loop {
        let cap = store.block(cur)?.content_capacity();
        if start >= cap {
            start -= cap;
            let next = store.block(cur)?.next_overflow_addr()?;
            cur = if next == NULL { grow(store, cur)? } else { next };
            continue;
        }

        let take = (content.len() - written).min(cap - start);
        store.block_mut(cur)?.content_mut()[start..start + take]
            .copy_from_slice(&content[written..written + take]);
        written += take;
        start = 0;

        if written == content.len() {
            if cleanup_after {
                let next = store.block(cur)?.next_overflow_addr()?;
                if next != NULL {
                    free_chain_from(store, next)?;
                    store.block_mut(cur)?.set_next_overflow_addr(NULL)?;
                }
            }
            return Ok(());
        }

        let next = store.block(cur)?.next_overflow_addr()?;
        cur = if next == NULL { grow(store, cur)? } else { next };
    }
}

/// Frees everything reachable past the node that covers `offset`, without
/// writing any content. A no-op if the chain already ends at or before
/// `offset`.
pub(crate) fn cleanup_after(store: &mut StoreInner, head: Address, offset: usize) -> Result<()> {
    let mut cur = head;
    let mut start = offset;
    loop {
        let cap = store.block(cur)?.content_capacity();
        if start >= cap {
            start -= cap;
            let next = store.block(cur)?.next_overflow_addr()?;
            if next == NULL {
                return Ok(());
            }
            cur = next;
            continue;
        }
        let next = store.block(cur)?.next_overflow_addr()?;
        if next != NULL {
            free_chain_from(store, next)?;
            store.block_mut(cur)?.set_next_overflow_addr(NULL)?;
        }
        return Ok(());
    }
}

/// Walks the chain starting at `addr`, marking every node Empty and giving
/// its address back to the free-list.
pub(crate) fn free_chain_from(store: &mut StoreInner, addr: Address) -> Result<()> {
    let mut cur = addr;
    while cur != NULL {
        let next = store.block(cur)?.next_overflow_addr()?;
        store.mark_empty(cur);
        freelist::give_back(store, cur)?;
        cur = next;
    }
    Ok(())
}

/// Destroys a head page: frees its overflow chain, then the head itself.
pub(crate) fn delete_head(store: &mut StoreInner, head: Address) -> Result<()> {
    let next = store.block(head)?.next_overflow_addr()?;
    if next != NULL {
        free_chain_from(store, next)?;
    }
    store.mark_empty(head);
    freelist::give_back(store, head)?;
    Ok(())
}
