//! Copyright (c) YOAB. All rights reserved.
//!
//! Property-style tests over the public `Store`/`Page` surface, covering
//! the universal invariants worked through against concrete page sizes and
//! randomized content rather than a single fixed example each.

use rand::Rng;
use yoab_pagestore::{Store, StoreOptions};

fn open(dir: &tempfile::TempDir, page_size: u16) -> Store {
    Store::open_with(dir.path().join("store.bin"), StoreOptions::new(page_size)).unwrap()
}

fn random_bytes(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen()).collect()
}

// P1: for any bytes, write(bytes); read() == bytes.
#[test]
fn test_p1_round_trip_across_sizes_and_lengths() {
    let mut rng = rand::thread_rng();
    for &page_size in &[256u16, 512, 4096] {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, page_size);
        for len in [0usize, 1, 37, 300, 5_000] {
            let page = store.create_page(0).unwrap();
            let content = random_bytes(&mut rng, len);
            page.write(&content, 0).unwrap();
            assert_eq!(page.read(0, Some(len)).unwrap(), content);
        }
    }
}

// P2: write(x, o); read(o, x.length) == x.
#[test]
fn test_p2_offset_round_trip() {
    let mut rng = rand::thread_rng();
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 256);
    for offset in [0usize, 5, 260, 1000] {
        let page = store.create_page(0).unwrap();
        let content = random_bytes(&mut rng, 123);
        page.write(&content, offset).unwrap();
        assert_eq!(page.read(offset, Some(content.len())).unwrap(), content);
    }
}

// P3 / P4: persistence across reopen, and isolation of unsaved changes.
#[test]
fn test_p3_p4_persistence_and_unsaved_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");
    let addr;
    {
        let store = Store::open_with(&path, StoreOptions::new(256)).unwrap();
        let page = store.create_page(7).unwrap();
        addr = page.addr();
        page.write(&vec![1u8; 300], 0).unwrap();
        store.save().unwrap();
        // Unsaved change after the save: must not survive reopen.
        page.write(&[9, 9, 9], 0).unwrap();
        store.close();
    }
    let store = Store::open_with(&path, StoreOptions::new(256)).unwrap();
    let page = store.page(addr, Some(7)).unwrap();
    assert_eq!(page.read(0, Some(300)).unwrap(), vec![1u8; 300]);
}

// P5: createPage(); save(); reopen yields a handle at the same address
// with the same type and bytes.
#[test]
fn test_p5_address_stability_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");
    let addr;
    {
        let store = Store::open_with(&path, StoreOptions::new(256)).unwrap();
        let page = store.create_page(13).unwrap();
        addr = page.addr();
        page.write(&[1, 2, 3], 0).unwrap();
        store.save().unwrap();
    }
    let store = Store::open_with(&path, StoreOptions::new(256)).unwrap();
    let page = store.page(addr, Some(13)).unwrap();
    assert_eq!(page.addr(), addr);
    assert_eq!(page.page_type().unwrap(), Some(13));
    assert_eq!(page.read(0, Some(3)).unwrap(), vec![1, 2, 3]);
}

// P6: allocating N pages, deleting them all, then allocating N more,
// results in filePageCount no larger than the first peak.
#[test]
fn test_p6_space_reuse_bounds_file_growth() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 256);
    const N: usize = 10;
    let mut addrs = Vec::new();
    for i in 0..N {
        addrs.push(store.create_page(i as i32).unwrap().addr());
    }
    store.save().unwrap();
    let peak = store.size();

    for addr in &addrs {
        store.delete_page(*addr, None).unwrap();
    }
    store.save().unwrap();

    let mut reused = Vec::new();
    for i in 0..N {
        reused.push(store.create_page(i as i32).unwrap().addr());
    }
    store.save().unwrap();

    assert!(store.size() <= peak);
    // Every reused address came from the set freed above -- no new
    // addresses were minted beyond the first peak's footprint.
    for addr in &reused {
        assert!(addrs.contains(addr));
    }
}

// P8: no freed address is reachable from a live chain once reused
// elsewhere; the allocator never double-hands-out an address.
#[test]
fn test_p8_freed_addresses_are_not_reused_twice_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 256);
    let a = store.create_page(0).unwrap();
    let b = store.create_page(0).unwrap();
    let c = store.create_page(0).unwrap();
    let (addr_a, addr_b, addr_c) = (a.addr(), b.addr(), c.addr());
    store.delete_page(addr_a, None).unwrap();
    store.delete_page(addr_b, None).unwrap();

    let reused_first = store.create_page(1).unwrap().addr();
    let reused_second = store.create_page(1).unwrap().addr();
    assert_ne!(reused_first, reused_second);
    assert!(reused_first == addr_a || reused_first == addr_b);
    assert!(reused_second == addr_a || reused_second == addr_b);
    // The page that was never deleted is untouched by reuse.
    assert_ne!(reused_first, addr_c);
    assert_ne!(reused_second, addr_c);
}

// P9: a page created with subtype s is always returned with subtype s
// until deleted.
#[test]
fn test_p9_type_preservation_until_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 256);
    let page = store.create_page(99).unwrap();
    let addr = page.addr();
    page.write(&vec![0u8; 300], 0).unwrap();
    assert_eq!(page.page_type().unwrap(), Some(99));
    assert_eq!(store.page(addr, Some(99)).unwrap().page_type().unwrap(), Some(99));
    page.delete().unwrap();
    // Once deleted, the address is recycled as Empty; a stale read fails
    // rather than silently returning a wrong type.
    let recreated = store.create_page(5).unwrap();
    assert_eq!(recreated.page_type().unwrap(), Some(5));
}

// P7 (chain integrity, indirect): every byte of several concurrently live,
// independently spilled chains round-trips without cross-talk.
#[test]
fn test_p7_independent_chains_do_not_corrupt_each_other() {
    let mut rng = rand::thread_rng();
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, 256);
    let mut pages = Vec::new();
    for i in 0..6 {
        let page = store.create_page(i).unwrap();
        let content = random_bytes(&mut rng, 200 + i as usize * 137);
        page.write(&content, 0).unwrap();
        pages.push((page, content));
    }
    store.save().unwrap();
    for (page, content) in &pages {
        assert_eq!(&page.read(0, Some(content.len())).unwrap(), content);
    }
}
