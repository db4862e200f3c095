//! Summary: File binding — open/save/close and raw page I/O.
//! Copyright (c) YOAB. All rights reserved.
//!
//! Generalizes the teacher's `Database::open` / `load_meta` / seek-and-
//! `read_exact` / `fdatasync` pattern (`db.rs`) into this store's simpler
//! single-root-page validation and full-page retry-until-complete
//! read/write loop. There is no B+ tree to rewrite or append to, so
//! `save()` is a single LRU-ordered flush of dirty blocks rather than the
//! teacher's full-rewrite/incremental-append duality.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use crate::allocator;
use crate::cache::BlockCache;
use crate::config::StoreOptions;
use crate::handle::{Page, PageManager};
use crate::overflow;
use crate::page::{validate_subtype, Address, PageBlock, PageKind, NULL, ROOT_ADDR};
use crate::{Error, Result};

fn read_full(file: &mut File, buf: &mut [u8]) -> Result<()> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            return Err(Error::UnexpectedIo {
                context: "reading page",
            });
        }
        total += n;
    }
    Ok(())
}

fn write_full(file: &mut File, buf: &[u8]) -> Result<()> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.write(&buf[total..])?;
        if n == 0 {
            return Err(Error::UnexpectedIo {
                context: "writing page",
            });
        }
        total += n;
    }
    Ok(())
}

/// Internal state shared by a `Store` and every `Page`/`PageManager` handle
/// that refers to it. `Store` is a thin `Rc<RefCell<_>>` wrapper over this.
pub(crate) struct StoreInner {
    file: File,
    page_size: usize,
    cache_size: usize,
    cache: BlockCache,
    file_page_count: u32,
    memory_page_count: u32,
    ref_counts: HashMap<Address, u32>,
    closed: bool,
}

impl StoreInner {
    fn open(path: &Path, opts: &StoreOptions) -> Result<Self> {
        opts.validate()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(opts.create)
            .open(path)?;
        let file_len = file.metadata()?.len();
        let page_size = opts.page_size as u64;
        if file_len % page_size != 0 {
            return Err(Error::CorruptFile {
                reason: format!("file size {file_len} is not a multiple of page size {page_size}"),
            });
        }
        let file_page_count = (file_len / page_size) as u32;
        let memory_page_count = file_page_count.max(1);
        #[cfg(debug_assertions)]
        eprintln!(
            "store: opened {} with {file_page_count} page(s) on disk",
            path.display()
        );
        let mut inner = Self {
            file,
            page_size: opts.page_size as usize,
            cache_size: opts.cache_size,
            cache: BlockCache::new(),
            file_page_count,
            memory_page_count,
            ref_counts: HashMap::new(),
            closed: false,
        };
        if file_page_count > 0 {
            let stored_size = inner.block(ROOT_ADDR)?.root_page_size()?;
            if stored_size as usize != inner.page_size {
                return Err(Error::CorruptFile {
                    reason: format!(
                        "stored page size {stored_size} does not match configured page size {}",
                        inner.page_size
                    ),
                });
            }
        }
        Ok(inner)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    pub(crate) fn memory_page_count(&self) -> u32 {
        self.memory_page_count
    }

    pub(crate) fn set_memory_page_count(&mut self, count: u32) {
        self.memory_page_count = count;
    }

    fn read_raw(&mut self, addr: Address) -> Result<Vec<u8>> {
        let offset = addr as u64 * self.page_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.page_size];
        read_full(&mut self.file, &mut buf)?;
        Ok(buf)
    }

    fn write_raw(&mut self, addr: Address, buf: &[u8]) -> Result<()> {
        let offset = addr as u64 * self.page_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        write_full(&mut self.file, buf)
    }

    fn ensure_loaded(&mut self, addr: Address) -> Result<()> {
        if self.cache.get(addr).is_some() {
            return Ok(());
        }
        if addr as u32 >= self.memory_page_count {
            return Err(Error::InvalidAddress { addr: addr as u32 });
        }
        if (addr as u32) < self.file_page_count {
            let raw = self.read_raw(addr)?;
            self.cache.set(PageBlock::load(addr, raw));
            return Ok(());
        }
        // The only address that can be "in range but never allocated" is
        // the root of a brand new file: every other address within
        // memory_page_count was cached the moment it was allocated.
        if addr == ROOT_ADDR && self.file_page_count == 0 {
            self.cache
                .set(PageBlock::new_root(ROOT_ADDR, self.page_size, NULL, NULL));
            #[cfg(debug_assertions)]
            eprintln!("store: materialized fresh root page");
            return Ok(());
        }
        Err(Error::RangeExceeded { addr })
    }

    pub(crate) fn block(&mut self, addr: Address) -> Result<&PageBlock> {
        self.ensure_loaded(addr)?;
        Ok(self.cache.get(addr).expect("just loaded"))
    }

    pub(crate) fn block_mut(&mut self, addr: Address) -> Result<&mut PageBlock> {
        self.ensure_loaded(addr)?;
        Ok(self.cache.get_mut(addr).expect("just loaded"))
    }

    pub(crate) fn root_block(&mut self) -> Result<&PageBlock> {
        self.block(ROOT_ADDR)
    }

    pub(crate) fn root_block_mut(&mut self) -> Result<&mut PageBlock> {
        self.block_mut(ROOT_ADDR)
    }

    pub(crate) fn freelist_block(&mut self, addr: Address) -> Result<&PageBlock> {
        self.block(addr)
    }

    pub(crate) fn freelist_block_mut(&mut self, addr: Address) -> Result<&mut PageBlock> {
        self.block_mut(addr)
    }

    pub(crate) fn mark_empty(&mut self, addr: Address) {
        self.cache.set(PageBlock::new_empty(addr, self.page_size));
    }

    pub(crate) fn set_block(&mut self, block: PageBlock) {
        self.cache.set(block);
    }

    pub(crate) fn check_cache(&mut self) {
        self.cache.shrink_to(self.cache_size);
    }

    fn save(&mut self) -> Result<()> {
        self.ensure_open()?;
        for addr in self.cache.addrs_lru_order() {
            let addr_u32 = addr as u32;
            if addr_u32 >= self.file_page_count {
                self.file_page_count = addr_u32 + 1;
                #[cfg(debug_assertions)]
                eprintln!("store: growing file_page_count to {}", self.file_page_count);
            }
            let dirty = self
                .cache
                .get(addr)
                .map(|block| block.is_dirty())
                .unwrap_or(false);
            if dirty {
                let raw = self.cache.get(addr).expect("present").raw().to_vec();
                self.write_raw(addr, &raw)?;
                if let Some(block) = self.cache.get_mut(addr) {
                    block.mark_clean();
                }
            }
        }
        self.check_cache();
        Ok(())
    }

    fn mark_closed(&mut self) {
        self.closed = true;
    }

    fn size(&self) -> u64 {
        self.file_page_count as u64 * self.page_size as u64
    }

    fn unsaved_size(&self) -> u64 {
        self.memory_page_count as u64 * self.page_size as u64
    }

    pub(crate) fn bump_ref(&mut self, addr: Address) {
        *self.ref_counts.entry(addr).or_insert(0) += 1;
    }

    pub(crate) fn drop_ref(&mut self, addr: Address) -> u32 {
        let Some(count) = self.ref_counts.get_mut(&addr) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            self.ref_counts.remove(&addr);
            #[cfg(debug_assertions)]
            eprintln!("store: page {addr} has no remaining managers");
        }
        remaining
    }

    fn debug_dump(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let upper = self.memory_page_count.min(Address::MAX as u32) as Address;
        for addr in 0..upper {
            if (addr as u32) >= self.file_page_count && self.cache.get(addr).is_none() {
                continue;
            }
            let block = self.block(addr)?;
            let line = match block.kind() {
                PageKind::Root => format!(
                    "{addr:03}: Root [pageSize: {}, emptylistAddr: {}, nextPage: {}]",
                    block.root_page_size()?,
                    block.first_freelist_addr()?,
                    block.next_overflow_addr()?
                ),
                PageKind::Freelist => format!(
                    "{addr:03}: Freelist [prevPage: {}, nextPage: {}, count: {}]",
                    block.freelist_prev()?,
                    block.freelist_next()?,
                    block.freelist_count()?
                ),
                PageKind::Data => format!(
                    "{addr:03}: Data [prevPage: {}, nextPage: {}]",
                    block.prev_addr()?,
                    block.next_overflow_addr()?
                ),
                PageKind::Entry(subtype) => format!(
                    "{addr:03}: Entry({}) [nextPage: {}]",
                    crate::page::ENTRY_KIND_BASE + subtype,
                    block.next_overflow_addr()?
                ),
                PageKind::Empty => continue,
            };
            lines.push(line);
        }
        Ok(lines)
    }

    fn checked_entry_kind(&mut self, addr: Address, subtype: Option<i32>) -> Result<()> {
        match self.block(addr)?.kind() {
            PageKind::Entry(actual) => {
                if let Some(want) = subtype {
                    let want = validate_subtype(want)?;
                    if want != actual {
                        return Err(Error::TypeMismatch {
                            addr,
                            expected: "Entry(matching subtype)",
                            found: "Entry",
                        });
                    }
                }
                Ok(())
            }
            PageKind::Empty => Err(Error::EmptyPageOp { addr }),
            other => Err(Error::TypeMismatch {
                addr,
                expected: "Entry",
                found: other.name(),
            }),
        }
    }
}

/// The paged store bound to a single host file. Cheap to clone: it is a
/// handle over shared interior-mutable state, the way `Page`/`PageManager`
/// are handles over the same state.
#[derive(Clone)]
pub struct Store(pub(crate) Rc<RefCell<StoreInner>>);

impl Store {
    /// Opens (or creates) `path` with default options: page size 4096,
    /// `cache_size = ceil(8 MiB / page_size)`, `create = true`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Opens (or creates) `path` with explicit `opts`.
    pub fn open_with<P: AsRef<Path>>(path: P, opts: StoreOptions) -> Result<Self> {
        let inner = StoreInner::open(path.as_ref(), &opts)?;
        Ok(Self(Rc::new(RefCell::new(inner))))
    }

    /// The permanent root page (address 0).
    pub fn root_page(&self) -> Page {
        Page::new(self.0.clone(), ROOT_ADDR)
    }

    /// Loads an existing entry page. If `subtype` is given it must match
    /// the page's stored subtype.
    pub fn page(&self, addr: Address, subtype: Option<i32>) -> Result<Page> {
        let mut inner = self.0.borrow_mut();
        inner.ensure_open()?;
        inner.checked_entry_kind(addr, subtype)?;
        drop(inner);
        Ok(Page::new(self.0.clone(), addr))
    }

    /// Allocates a new entry head page of the given subtype.
    pub fn create_page(&self, subtype: i32) -> Result<Page> {
        let subtype = validate_subtype(subtype)?;
        let mut inner = self.0.borrow_mut();
        inner.ensure_open()?;
        let addr = allocator::allocate(&mut inner)?;
        let block = PageBlock::new_entry(addr, inner.page_size(), subtype, NULL, NULL);
        inner.set_block(block);
        inner.check_cache();
        drop(inner);
        Ok(Page::new(self.0.clone(), addr))
    }

    /// Destroys the entry page at `addr`, recursively freeing its overflow
    /// chain. A no-op when `addr == 0` (the root is never deleted).
    pub fn delete_page(&self, addr: Address, subtype: Option<i32>) -> Result<()> {
        if addr == ROOT_ADDR {
            return Ok(());
        }
        let mut inner = self.0.borrow_mut();
        inner.ensure_open()?;
        inner.checked_entry_kind(addr, subtype)?;
        overflow::delete_head(&mut inner, addr)?;
        inner.check_cache();
        Ok(())
    }

    /// Flushes dirty pages to disk in least-recently-used order, then
    /// eagerly trims the cache.
    pub fn save(&self) -> Result<()> {
        self.0.borrow_mut().save()
    }

    /// Idempotent; every operation after `close()` fails with
    /// [`Error::Closed`].
    pub fn close(&self) {
        self.0.borrow_mut().mark_closed();
    }

    /// Bytes persisted to disk (`filePageCount * pageSize`).
    pub fn size(&self) -> u64 {
        self.0.borrow().size()
    }

    /// Bytes staged in memory, including not-yet-saved pages
    /// (`memoryPageCount * pageSize`).
    pub fn unsaved_size(&self) -> u64 {
        self.0.borrow().unsaved_size()
    }

    /// A developer-facing dump of every live page, one line per address.
    /// Not a stable format; useful for tests and debugging only.
    pub fn debug_dump(&self) -> Result<Vec<String>> {
        self.0.borrow_mut().debug_dump()
    }

    /// A fresh named reference holder over this store.
    pub fn manager(&self) -> PageManager {
        PageManager::new(self.0.clone())
    }

    #[cfg(test)]
    pub(crate) fn inner_for_test(&self) -> std::cell::RefMut<'_, StoreInner> {
        self.0.borrow_mut()
    }
}
