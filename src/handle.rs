//! Summary: User-facing `Page` and `PageManager` handles.
//! Copyright (c) YOAB. All rights reserved.
//!
//! A [`Page`] is a thin handle: the head address plus a released flag,
//! dispatching every operation into the shared store state by address
//! rather than holding a block reference across calls (per the store's own
//! address-keyed, not reference-keyed, long-lived state). A
//! [`PageManager`] is a named reference holder: a page becomes eligible
//! for internal release once every manager that ever observed it has
//! released it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::overflow;
use crate::page::{Address, PageKind, ROOT_ADDR};
use crate::store::StoreInner;
use crate::{Error, Result};

/// A handle to a logical page (root or application entry). Cheap to
/// clone; clones are independent handles over the same address, each with
/// its own `released` flag.
#[derive(Clone)]
pub struct Page {
    inner: Rc<RefCell<StoreInner>>,
    addr: Address,
    released: Rc<Cell<bool>>,
}

impl Page {
    pub(crate) fn new(inner: Rc<RefCell<StoreInner>>, addr: Address) -> Self {
        Self {
            inner,
            addr,
            released: Rc::new(Cell::new(false)),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.released.get() {
            Err(Error::UseAfterRelease)
        } else {
            self.inner.borrow().ensure_open()
        }
    }

    /// The address of this page's head.
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Whether this handle refers to the permanent root page.
    pub fn is_root(&self) -> bool {
        self.addr == ROOT_ADDR
    }

    /// The stored subtype, or `None` for the root page.
    pub fn page_type(&self) -> Result<Option<i32>> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        match inner.block(self.addr)?.kind() {
            PageKind::Entry(subtype) => Ok(Some(subtype as i32)),
            _ => Ok(None),
        }
    }

    /// Total bytes reachable from this page's head: the head's content
    /// capacity plus the capacity of every page in its overflow chain.
    pub fn byte_length(&self) -> Result<usize> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        overflow::logical_len(&mut inner, self.addr)
    }

    /// Reads `length` bytes (or everything to the end of the chain, if
    /// `None`) starting at `start`.
    pub fn read(&self, start: usize, length: Option<usize>) -> Result<Vec<u8>> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        overflow::read(&mut inner, self.addr, start, length)
    }

    /// Writes `content` at `offset`, growing the overflow chain as needed.
    pub fn write(&self, content: &[u8], offset: usize) -> Result<()> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        overflow::write(&mut inner, self.addr, content, offset, false)?;
        inner.check_cache();
        Ok(())
    }

    /// Writes `content` at `offset`, then frees any chain beyond what was
    /// written.
    pub fn write_and_cleanup(&self, content: &[u8], offset: usize) -> Result<()> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        overflow::write(&mut inner, self.addr, content, offset, true)?;
        inner.check_cache();
        Ok(())
    }

    /// Frees everything in the overflow chain past `offset`, without
    /// writing any content.
    pub fn cleanup_after(&self, offset: usize) -> Result<()> {
        self.ensure_alive()?;
        let mut inner = self.inner.borrow_mut();
        overflow::cleanup_after(&mut inner, self.addr, offset)?;
        inner.check_cache();
        Ok(())
    }

    /// Destroys this page (illegal, and a no-op, for the root): frees its
    /// overflow chain and the head itself, then releases this handle.
    pub fn delete(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.is_root() {
            return Ok(());
        }
        let mut inner = self.inner.borrow_mut();
        overflow::delete_head(&mut inner, self.addr)?;
        inner.check_cache();
        drop(inner);
        self.released.set(true);
        Ok(())
    }

    /// Marks this handle released. Further operations on it fail with
    /// [`Error::UseAfterRelease`].
    pub fn release(&self) {
        self.released.set(true);
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.get()
    }
}

/// A named reference holder over pages obtained from the same store.
/// Multiple managers may track the same page; a page is only eligible for
/// internal release once every manager that ever tracked it has released
/// it (directly, or via [`PageManager::release_all`]).
pub struct PageManager {
    inner: Rc<RefCell<StoreInner>>,
    tracked: RefCell<Vec<Page>>,
}

impl PageManager {
    pub(crate) fn new(inner: Rc<RefCell<StoreInner>>) -> Self {
        Self {
            inner,
            tracked: RefCell::new(Vec::new()),
        }
    }

    /// Starts tracking `page`, bumping its reference count, and returns it
    /// back to the caller for convenient chaining.
    pub fn track(&self, page: Page) -> Page {
        self.inner.borrow_mut().bump_ref(page.addr());
        self.tracked.borrow_mut().push(page.clone());
        page
    }

    /// Releases every page this manager has tracked that has not already
    /// been released directly.
    pub fn release_all(&self) {
        for page in self.tracked.borrow_mut().drain(..) {
            if !page.is_released() {
                self.inner.borrow_mut().drop_ref(page.addr());
                page.release();
            }
        }
    }

    /// Number of pages currently tracked by this manager.
    pub fn len(&self) -> usize {
        self.tracked.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use crate::store::Store;

    fn open_store(page_size: u16) -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let store = Store::open_with(&path, StoreOptions::new(page_size)).unwrap();
        (store, dir)
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let (store, _dir) = open_store(256);
        let page = store.create_page(0).unwrap();
        page.write(&[1, 2, 3, 4], 0).unwrap();
        assert_eq!(page.read(0, Some(4)).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_offset_write_then_offset_read_round_trips() {
        let (store, _dir) = open_store(256);
        let page = store.create_page(0).unwrap();
        page.write(&[9, 9, 9], 5).unwrap();
        assert_eq!(page.read(5, Some(3)).unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn test_subtype_round_trips_until_deleted() {
        let (store, _dir) = open_store(256);
        let page = store.create_page(42).unwrap();
        assert_eq!(page.page_type().unwrap(), Some(42));
        page.write(&[0u8; 300], 0).unwrap();
        assert_eq!(page.page_type().unwrap(), Some(42));
    }

    #[test]
    fn test_released_page_fails_every_operation() {
        let (store, _dir) = open_store(256);
        let page = store.create_page(0).unwrap();
        page.release();
        assert!(matches!(page.read(0, None), Err(Error::UseAfterRelease)));
        assert!(matches!(
            page.write(&[1], 0),
            Err(Error::UseAfterRelease)
        ));
    }

    #[test]
    fn test_delete_is_a_no_op_for_the_root() {
        let (store, _dir) = open_store(256);
        let root = store.root_page();
        root.write(&[1, 2, 3], 0).unwrap();
        root.delete().unwrap();
        assert_eq!(root.read(0, Some(3)).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_manager_release_all_releases_every_tracked_page() {
        let (store, _dir) = open_store(256);
        let manager = store.manager();
        let a = manager.track(store.create_page(0).unwrap());
        let b = manager.track(store.create_page(1).unwrap());
        manager.release_all();
        assert!(a.is_released());
        assert!(b.is_released());
    }

    #[test]
    fn test_cleanup_after_frees_the_tail_of_a_spilled_chain() {
        let (store, _dir) = open_store(256);
        let page = store.create_page(0).unwrap();
        page.write(&[1u8; 300], 0).unwrap();
        assert!(page.byte_length().unwrap() > 256);
        page.cleanup_after(10).unwrap();
        // The chain is trimmed back to a single node's worth of capacity.
        assert!(page.byte_length().unwrap() <= 256);
    }
}
