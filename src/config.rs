//! Summary: Page-size validation and store configuration.
//! Copyright (c) YOAB. All rights reserved.

use crate::error::{Error, Result};

/// Page sizes a file may be configured with. Fixed per file and re-validated
/// against the stored root header on open.
pub const ALLOWED_PAGE_SIZES: [u16; 8] = [256, 512, 1024, 2048, 4096, 8192, 16384, 32768];

/// Default page size used by [`StoreOptions::new`]-less callers.
pub const DEFAULT_PAGE_SIZE: u16 = 4096;

/// Target cache budget in bytes, converted to a page count at open time.
pub const DEFAULT_CACHE_BUDGET_BYTES: usize = 8 * 1024 * 1024;

/// Returns `Ok(())` if `page_size` is one of the eight allowed sizes.
pub fn validate_page_size(page_size: u16) -> Result<()> {
    if ALLOWED_PAGE_SIZES.contains(&page_size) {
        Ok(())
    } else {
        Err(Error::InvalidPageSize {
            page_size: page_size as usize,
        })
    }
}

/// Options controlling how a [`crate::Store`] is opened.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Fixed page size for this file.
    pub page_size: u16,
    /// Maximum number of decoded page blocks kept in the block cache.
    pub cache_size: usize,
    /// Create the file if it does not already exist.
    pub create: bool,
}

impl StoreOptions {
    /// Defaults: `page_size = 4096`, `cache_size = ceil(8 MiB / page_size)`,
    /// `create = true`.
    pub fn new(page_size: u16) -> Self {
        let cache_size = DEFAULT_CACHE_BUDGET_BYTES.div_ceil(page_size as usize);
        Self {
            page_size,
            cache_size,
            create: true,
        }
    }

    /// Overrides the cache size, in pages.
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Overrides whether the file is created when missing.
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_page_size(self.page_size)
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
