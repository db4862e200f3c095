//! Summary: A paged random-access store over a single host file.
//! Copyright (c) YOAB. All rights reserved.
//!
//! The file is split into fixed-size pages, each tagged with a kind (root,
//! free-list, data, or application-defined entry). Logical pages that
//! outgrow a single raw page are spilled across a linked chain of data
//! pages; pages released by the caller are recycled through an on-disk
//! free-list so the file does not grow indefinitely.
//!
//! ```no_run
//! use yoab_pagestore::Store;
//!
//! let store = Store::open("example.db")?;
//! let page = store.create_page(0)?;
//! page.write(b"hello", 0)?;
//! store.save()?;
//! # Ok::<(), yoab_pagestore::Error>(())
//! ```

mod allocator;
mod cache;
mod config;
mod error;
mod freelist;
mod handle;
mod overflow;
mod page;
mod store;

pub use config::{StoreOptions, ALLOWED_PAGE_SIZES, DEFAULT_CACHE_BUDGET_BYTES, DEFAULT_PAGE_SIZE};
pub use error::{Error, Result};
pub use handle::{Page, PageManager};
pub use page::{Address, PageKind, MAX_SUBTYPE, NULL, ROOT_ADDR};
pub use store::Store;
