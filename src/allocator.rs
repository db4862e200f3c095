//! Summary: Page address allocation.
//! Copyright (c) YOAB. All rights reserved.
//!
//! Returns the address of an unused page: one already released through the
//! free-list if available, otherwise a fresh address obtained by extending
//! the in-memory page count. `memoryPageCount` is always `>= filePageCount`;
//! addresses in between exist only in the cache until the next `save()`.

use crate::freelist;
use crate::page::Address;
use crate::store::StoreInner;
use crate::{Error, Result};

pub(crate) fn allocate(store: &mut StoreInner) -> Result<Address> {
    if let Some(addr) = freelist::take_one(store)? {
        return Ok(addr);
    }
    let count = store.memory_page_count();
    if count > Address::MAX as u32 {
        return Err(Error::InvalidAddress { addr: count });
    }
    let addr = count as Address;
    store.set_memory_page_count(count + 1);
    #[cfg(debug_assertions)]
    eprintln!("allocator: extended memory page count to {}", count + 1);
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use crate::store::Store;

    #[test]
    fn test_allocate_extends_when_freelist_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_with(dir.path().join("s.bin"), StoreOptions::new(256)).unwrap();
        let mut inner = store.inner_for_test();
        inner.root_block().unwrap();
        let a = allocate(&mut inner).unwrap();
        let b = allocate(&mut inner).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_allocate_prefers_freelist_address() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_with(dir.path().join("s.bin"), StoreOptions::new(256)).unwrap();
        let mut inner = store.inner_for_test();
        inner.root_block().unwrap();
        let a = allocate(&mut inner).unwrap();
        freelist::give_back(&mut inner, a).unwrap();
        let before = inner.memory_page_count();
        let reused = allocate(&mut inner).unwrap();
        assert_eq!(reused, a);
        assert_eq!(inner.memory_page_count(), before);
    }
}
