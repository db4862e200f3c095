//! Summary: Page layout, encoding, and typed header accessors.
//! Copyright (c) YOAB. All rights reserved.
//!
//! Every page is a fixed-size buffer whose first byte is a kind tag. The
//! remaining header fields depend on the kind (see the layout table in
//! `spec.md` §3); everything after the header is the page's "content". A
//! [`PageBlock`] wraps exactly one such buffer and exposes typed
//! getters/setters for the header plus a content view, the way the teacher
//! crate's `OverflowHeader` wraps a single page's header fields.

use crate::error::{Error, Result};

/// Address of a page within the file. `0` is the root; otherwise `0` is the
/// null/no-neighbor sentinel.
pub type Address = u16;

/// The null address / "no next, no prev" sentinel.
pub const NULL: Address = 0;

/// The root page always lives at address 0.
pub const ROOT_ADDR: Address = 0;

/// Smallest internal kind byte used by application entry pages
/// (`kind = 4 + subtype`).
pub const ENTRY_KIND_BASE: u8 = 4;

/// Largest externally visible entry subtype.
pub const MAX_SUBTYPE: i32 = 251;

/// The decoded kind of a page, derived from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Physically present but carries no content; body is all zero.
    Empty,
    /// The single page at address 0.
    Root,
    /// A node of the free-list chain.
    Freelist,
    /// A link in an overflow chain.
    Data,
    /// An application-owned head page; `subtype` is 0..=251.
    Entry(u8),
}

impl PageKind {
    /// Decodes a kind from its on-disk byte value.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => PageKind::Empty,
            1 => PageKind::Root,
            2 => PageKind::Freelist,
            3 => PageKind::Data,
            n => PageKind::Entry(n - ENTRY_KIND_BASE),
        }
    }

    /// Encodes this kind back to its on-disk byte value.
    pub fn to_byte(self) -> u8 {
        match self {
            PageKind::Empty => 0,
            PageKind::Root => 1,
            PageKind::Freelist => 2,
            PageKind::Data => 3,
            PageKind::Entry(subtype) => ENTRY_KIND_BASE + subtype,
        }
    }

    /// A short name used in error messages and `debug_dump`.
    pub fn name(self) -> &'static str {
        match self {
            PageKind::Empty => "Empty",
            PageKind::Root => "Root",
            PageKind::Freelist => "Freelist",
            PageKind::Data => "Data",
            PageKind::Entry(_) => "Entry",
        }
    }

    /// Whether this kind may be the head of an overflow chain (root or
    /// entry).
    pub fn is_head(self) -> bool {
        matches!(self, PageKind::Root | PageKind::Entry(_))
    }
}

/// Validates and converts an application-visible subtype into the internal
/// `4 + subtype` kind byte component.
pub fn validate_subtype(subtype: i32) -> Result<u8> {
    if subtype < 0 {
        return Err(Error::InvalidSubtype { subtype });
    }
    if subtype > MAX_SUBTYPE {
        return Err(Error::SubtypeTooLarge { subtype });
    }
    Ok(subtype as u8)
}

// Header byte offsets (after the kind byte at offset 0).
const ROOT_PAGE_SIZE_OFF: usize = 1;
const ROOT_FREELIST_OFF: usize = 3;
const ROOT_NEXT_OVF_OFF: usize = 5;
const ROOT_HEADER_LEN: usize = 6;

const FL_PREV_OFF: usize = 1;
const FL_NEXT_OFF: usize = 3;
const FL_COUNT_OFF: usize = 5;
const FL_HEADER_LEN: usize = 6;
const FL_ENTRIES_OFF: usize = FL_HEADER_LEN + 1; // +1 for the kind byte

const BODY_PREV_OFF: usize = 1;
const BODY_NEXT_OVF_OFF: usize = 3;
const BODY_HEADER_LEN: usize = 4;

/// A single decoded page: the raw buffer plus bookkeeping the block cache
/// needs (address, dirtiness).
///
/// Constructed in one of two modes: `PageBlock::new_*` (dirty = true,
/// header values stamped fresh into a zeroed buffer) or [`PageBlock::load`]
/// (dirty = false, buffer taken as-is from disk). Every setter marks the
/// block dirty; every getter is pure.
#[derive(Debug, Clone)]
pub struct PageBlock {
    addr: Address,
    buf: Vec<u8>,
    dirty: bool,
}

impl PageBlock {
    /// Address of this page within the file.
    #[inline]
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// Whether this block's in-memory bytes differ from what is (or would
    /// be) on disk.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag; called by the file binding right after a
    /// successful write.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// The full page-sized buffer, exactly as it would be written to disk.
    pub fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// Decoded kind of this page.
    pub fn kind(&self) -> PageKind {
        PageKind::from_byte(self.buf[0])
    }

    fn require(&self, expected: &'static str, ok: bool) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                addr: self.addr,
                expected,
                found: self.kind().name(),
            })
        }
    }

    // ---- construction ---------------------------------------------------

    fn zeroed(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Builds a fresh Empty block: all-zero body, kind byte 0.
    pub fn new_empty(addr: Address, page_size: usize) -> Self {
        Self {
            addr,
            buf: Self::zeroed(page_size),
            dirty: true,
        }
    }

    /// Builds a fresh Root block with the given header values.
    pub fn new_root(
        addr: Address,
        page_size: usize,
        first_freelist_addr: Address,
        next_overflow_addr: Address,
    ) -> Self {
        let mut buf = Self::zeroed(page_size);
        buf[0] = PageKind::Root.to_byte();
        buf[ROOT_PAGE_SIZE_OFF..ROOT_PAGE_SIZE_OFF + 2]
            .copy_from_slice(&(page_size as u16).to_be_bytes());
        buf[ROOT_FREELIST_OFF..ROOT_FREELIST_OFF + 2]
            .copy_from_slice(&first_freelist_addr.to_be_bytes());
        buf[ROOT_NEXT_OVF_OFF..ROOT_NEXT_OVF_OFF + 2]
            .copy_from_slice(&next_overflow_addr.to_be_bytes());
        Self {
            addr,
            buf,
            dirty: true,
        }
    }

    /// Builds a fresh, empty Freelist node.
    pub fn new_freelist(addr: Address, page_size: usize, prev: Address, next: Address) -> Self {
        let mut buf = Self::zeroed(page_size);
        buf[0] = PageKind::Freelist.to_byte();
        buf[FL_PREV_OFF..FL_PREV_OFF + 2].copy_from_slice(&prev.to_be_bytes());
        buf[FL_NEXT_OFF..FL_NEXT_OFF + 2].copy_from_slice(&next.to_be_bytes());
        Self {
            addr,
            buf,
            dirty: true,
        }
    }

    /// Builds a fresh Data page linked into a chain.
    pub fn new_data(addr: Address, page_size: usize, prev: Address, next_overflow: Address) -> Self {
        let mut buf = Self::zeroed(page_size);
        buf[0] = PageKind::Data.to_byte();
        buf[BODY_PREV_OFF..BODY_PREV_OFF + 2].copy_from_slice(&prev.to_be_bytes());
        buf[BODY_NEXT_OVF_OFF..BODY_NEXT_OVF_OFF + 2]
            .copy_from_slice(&next_overflow.to_be_bytes());
        Self {
            addr,
            buf,
            dirty: true,
        }
    }

    /// Builds a fresh Entry head page of the given subtype.
    pub fn new_entry(
        addr: Address,
        page_size: usize,
        subtype: u8,
        prev: Address,
        next_overflow: Address,
    ) -> Self {
        let mut buf = Self::zeroed(page_size);
        buf[0] = PageKind::Entry(subtype).to_byte();
        buf[BODY_PREV_OFF..BODY_PREV_OFF + 2].copy_from_slice(&prev.to_be_bytes());
        buf[BODY_NEXT_OVF_OFF..BODY_NEXT_OVF_OFF + 2]
            .copy_from_slice(&next_overflow.to_be_bytes());
        Self {
            addr,
            buf,
            dirty: true,
        }
    }

    /// Wraps a buffer read from disk as-is; the kind byte is trusted.
    /// `dirty` starts false.
    pub fn load(addr: Address, buf: Vec<u8>) -> Self {
        Self {
            addr,
            buf,
            dirty: false,
        }
    }

    // ---- Root accessors ---------------------------------------------------

    fn assert_root(&self) -> Result<()> {
        self.require("Root", matches!(self.kind(), PageKind::Root))
    }

    pub fn root_page_size(&self) -> Result<u16> {
        self.assert_root()?;
        Ok(u16::from_be_bytes([
            self.buf[ROOT_PAGE_SIZE_OFF],
            self.buf[ROOT_PAGE_SIZE_OFF + 1],
        ]))
    }

    pub fn first_freelist_addr(&self) -> Result<Address> {
        self.assert_root()?;
        Ok(u16::from_be_bytes([
            self.buf[ROOT_FREELIST_OFF],
            self.buf[ROOT_FREELIST_OFF + 1],
        ]))
    }

    pub fn set_first_freelist_addr(&mut self, addr: Address) -> Result<()> {
        self.assert_root()?;
        self.buf[ROOT_FREELIST_OFF..ROOT_FREELIST_OFF + 2].copy_from_slice(&addr.to_be_bytes());
        self.dirty = true;
        Ok(())
    }

    // ---- Freelist accessors ------------------------------------------------

    fn assert_freelist(&self) -> Result<()> {
        self.require("Freelist", matches!(self.kind(), PageKind::Freelist))
    }

    pub fn freelist_prev(&self) -> Result<Address> {
        self.assert_freelist()?;
        Ok(u16::from_be_bytes([self.buf[FL_PREV_OFF], self.buf[FL_PREV_OFF + 1]]))
    }

    pub fn set_freelist_prev(&mut self, addr: Address) -> Result<()> {
        self.assert_freelist()?;
        self.buf[FL_PREV_OFF..FL_PREV_OFF + 2].copy_from_slice(&addr.to_be_bytes());
        self.dirty = true;
        Ok(())
    }

    pub fn freelist_next(&self) -> Result<Address> {
        self.assert_freelist()?;
        Ok(u16::from_be_bytes([self.buf[FL_NEXT_OFF], self.buf[FL_NEXT_OFF + 1]]))
    }

    pub fn set_freelist_next(&mut self, addr: Address) -> Result<()> {
        self.assert_freelist()?;
        self.buf[FL_NEXT_OFF..FL_NEXT_OFF + 2].copy_from_slice(&addr.to_be_bytes());
        self.dirty = true;
        Ok(())
    }

    pub fn freelist_count(&self) -> Result<u16> {
        self.assert_freelist()?;
        Ok(u16::from_be_bytes([self.buf[FL_COUNT_OFF], self.buf[FL_COUNT_OFF + 1]]))
    }

    fn set_freelist_count(&mut self, count: u16) {
        self.buf[FL_COUNT_OFF..FL_COUNT_OFF + 2].copy_from_slice(&count.to_be_bytes());
        self.dirty = true;
    }

    /// Capacity (in entries) of a free-list node for this page's size.
    pub fn freelist_capacity(&self) -> usize {
        (self.buf.len() - 1 - FL_HEADER_LEN) / 2
    }

    /// Appends `addr` to this free-list node's slot array, incrementing
    /// `count`. Caller must ensure `count < capacity`.
    pub fn freelist_push(&mut self, addr: Address) -> Result<()> {
        self.assert_freelist()?;
        let count = self.freelist_count()? as usize;
        debug_assert!(count < self.freelist_capacity());
        let off = FL_ENTRIES_OFF + count * 2;
        self.buf[off..off + 2].copy_from_slice(&addr.to_be_bytes());
        self.set_freelist_count((count + 1) as u16);
        Ok(())
    }

    /// Removes and returns the last slot, decrementing `count`. Caller
    /// must ensure `count > 0`.
    pub fn freelist_pop(&mut self) -> Result<Address> {
        self.assert_freelist()?;
        let count = self.freelist_count()? as usize;
        debug_assert!(count > 0);
        let off = FL_ENTRIES_OFF + (count - 1) * 2;
        let addr = u16::from_be_bytes([self.buf[off], self.buf[off + 1]]);
        self.buf[off..off + 2].copy_from_slice(&0u16.to_be_bytes());
        self.set_freelist_count((count - 1) as u16);
        Ok(addr)
    }

    // ---- Data / Entry (overflow body) accessors ----------------------------

    fn assert_body(&self) -> Result<()> {
        self.require(
            "Data or Entry",
            matches!(self.kind(), PageKind::Data | PageKind::Entry(_)),
        )
    }

    pub fn prev_addr(&self) -> Result<Address> {
        self.assert_body()?;
        Ok(u16::from_be_bytes([
            self.buf[BODY_PREV_OFF],
            self.buf[BODY_PREV_OFF + 1],
        ]))
    }

    pub fn set_prev_addr(&mut self, addr: Address) -> Result<()> {
        self.assert_body()?;
        self.buf[BODY_PREV_OFF..BODY_PREV_OFF + 2].copy_from_slice(&addr.to_be_bytes());
        self.dirty = true;
        Ok(())
    }

    /// Next-overflow link. Valid for Root, Data, and Entry pages.
    pub fn next_overflow_addr(&self) -> Result<Address> {
        match self.kind() {
            PageKind::Root => Ok(u16::from_be_bytes([
                self.buf[ROOT_NEXT_OVF_OFF],
                self.buf[ROOT_NEXT_OVF_OFF + 1],
            ])),
            PageKind::Data | PageKind::Entry(_) => Ok(u16::from_be_bytes([
                self.buf[BODY_NEXT_OVF_OFF],
                self.buf[BODY_NEXT_OVF_OFF + 1],
            ])),
            _ => Err(Error::TypeMismatch {
                addr: self.addr,
                expected: "Root, Data or Entry",
                found: self.kind().name(),
            }),
        }
    }

    pub fn set_next_overflow_addr(&mut self, addr: Address) -> Result<()> {
        match self.kind() {
            PageKind::Root => {
                self.buf[ROOT_NEXT_OVF_OFF..ROOT_NEXT_OVF_OFF + 2]
                    .copy_from_slice(&addr.to_be_bytes());
            }
            PageKind::Data | PageKind::Entry(_) => {
                self.buf[BODY_NEXT_OVF_OFF..BODY_NEXT_OVF_OFF + 2]
                    .copy_from_slice(&addr.to_be_bytes());
            }
            _ => {
                return Err(Error::TypeMismatch {
                    addr: self.addr,
                    expected: "Root, Data or Entry",
                    found: self.kind().name(),
                })
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Changes the subtype of an Entry page in place. The kind *category*
    /// (still Entry) is immutable; only the subtype varies.
    pub fn set_entry_subtype(&mut self, subtype: u8) -> Result<()> {
        self.require("Entry", matches!(self.kind(), PageKind::Entry(_)))?;
        self.buf[0] = PageKind::Entry(subtype).to_byte();
        self.dirty = true;
        Ok(())
    }

    /// Byte offset where this page's content begins.
    fn content_offset(&self) -> usize {
        match self.kind() {
            PageKind::Root => 1 + ROOT_HEADER_LEN,
            PageKind::Data | PageKind::Entry(_) => 1 + BODY_HEADER_LEN,
            PageKind::Freelist | PageKind::Empty => 0,
        }
    }

    /// Maximum content bytes this page can hold (Root, Data, Entry only).
    pub fn content_capacity(&self) -> usize {
        self.buf.len() - self.content_offset()
    }

    /// Read-only view of the content region (Root, Data, Entry only).
    pub fn content(&self) -> &[u8] {
        let off = self.content_offset();
        &self.buf[off..]
    }

    /// Mutable view of the content region (Root, Data, Entry only). Any
    /// write through this view dirties the block.
    pub fn content_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        let off = self.content_offset();
        &mut self.buf[off..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_byte_round_trip() {
        for kind in [
            PageKind::Empty,
            PageKind::Root,
            PageKind::Freelist,
            PageKind::Data,
            PageKind::Entry(0),
            PageKind::Entry(42),
            PageKind::Entry(251),
        ] {
            assert_eq!(PageKind::from_byte(kind.to_byte()), kind);
        }
    }

    #[test]
    fn test_validate_subtype_bounds() {
        assert!(validate_subtype(-1).is_err());
        assert_eq!(validate_subtype(0).unwrap(), 0);
        assert_eq!(validate_subtype(251).unwrap(), 251);
        assert!(validate_subtype(252).is_err());
    }

    #[test]
    fn test_root_header_round_trip() {
        let mut root = PageBlock::new_root(0, 256, 0, 0);
        assert_eq!(root.root_page_size().unwrap(), 256);
        assert_eq!(root.first_freelist_addr().unwrap(), 0);
        root.set_first_freelist_addr(9).unwrap();
        assert_eq!(root.first_freelist_addr().unwrap(), 9);
        root.set_next_overflow_addr(3).unwrap();
        assert_eq!(root.next_overflow_addr().unwrap(), 3);
        assert_eq!(root.content_capacity(), 256 - 7);
    }

    #[test]
    fn test_data_page_header_round_trip() {
        let mut data = PageBlock::new_data(5, 256, 4, 0);
        assert_eq!(data.prev_addr().unwrap(), 4);
        assert_eq!(data.next_overflow_addr().unwrap(), 0);
        data.set_next_overflow_addr(6).unwrap();
        assert_eq!(data.next_overflow_addr().unwrap(), 6);
        assert_eq!(data.content_capacity(), 256 - 5);
    }

    #[test]
    fn test_entry_page_subtype_is_mutable_kind_is_not() {
        let mut entry = PageBlock::new_entry(2, 256, 7, 0, 0);
        assert_eq!(entry.kind(), PageKind::Entry(7));
        entry.set_entry_subtype(9).unwrap();
        assert_eq!(entry.kind(), PageKind::Entry(9));
    }

    #[test]
    fn test_freelist_push_pop_round_trip() {
        let mut fl = PageBlock::new_freelist(1, 256, 0, 0);
        assert_eq!(fl.freelist_count().unwrap(), 0);
        fl.freelist_push(10).unwrap();
        fl.freelist_push(20).unwrap();
        assert_eq!(fl.freelist_count().unwrap(), 2);
        assert_eq!(fl.freelist_pop().unwrap(), 20);
        assert_eq!(fl.freelist_pop().unwrap(), 10);
        assert_eq!(fl.freelist_count().unwrap(), 0);
    }

    #[test]
    fn test_freelist_capacity_is_half_content_length() {
        let fl = PageBlock::new_freelist(1, 256, 0, 0);
        // content length = 256 - 1 - 6 = 249, floor(249/2) = 124
        assert_eq!(fl.freelist_capacity(), 124);
    }

    #[test]
    fn test_wrong_kind_accessor_is_type_mismatch() {
        let data = PageBlock::new_data(1, 256, 0, 0);
        assert!(matches!(
            data.first_freelist_addr(),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_content_mut_marks_dirty() {
        let root = PageBlock::new_root(0, 256, 0, 0);
        let mut loaded = PageBlock::load(0, root.raw().to_vec());
        assert!(!loaded.is_dirty());
        loaded.content_mut()[0] = 1;
        assert!(loaded.is_dirty());
    }
}
