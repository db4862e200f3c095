//! Summary: Error types for the paged store.
//! Copyright (c) YOAB. All rights reserved.

use std::fmt;
use std::io;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for paged-store operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error from the underlying file.
    Io(io::Error),
    /// The host file returned zero bytes on a non-empty read/write request.
    UnexpectedIo { context: &'static str },
    /// File size is not a multiple of the page size, a stored header field
    /// is out of bounds, or the stored page size does not match the
    /// configured page size.
    CorruptFile { reason: String },
    /// A `get` with an expected page kind did not match the stored kind.
    TypeMismatch {
        addr: u16,
        expected: &'static str,
        found: &'static str,
    },
    /// Address is out of the valid range for the current file/memory size.
    InvalidAddress { addr: u32 },
    /// Access to a not-yet-created address when the caller required it to
    /// exist.
    RangeExceeded { addr: u16 },
    /// Read or write beyond the logical length of a page.
    OutOfRange {
        addr: u16,
        start: usize,
        length: Option<usize>,
    },
    /// A handle operation was attempted after `Page::release`/`delete`.
    UseAfterRelease,
    /// A store operation was attempted after `Store::close`.
    Closed,
    /// The configured page size is not one of the allowed sizes.
    InvalidPageSize { page_size: usize },
    /// A negative subtype was supplied.
    InvalidSubtype { subtype: i32 },
    /// A subtype above the maximum (251) was supplied.
    SubtypeTooLarge { subtype: i32 },
    /// Attempt to decode or use an Empty block as a live page.
    EmptyPageOp { addr: u16 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::UnexpectedIo { context } => {
                write!(f, "unexpected end of file ({context})")
            }
            Error::CorruptFile { reason } => write!(f, "corrupt file: {reason}"),
            Error::TypeMismatch {
                addr,
                expected,
                found,
            } => write!(f, "page {addr} has kind {found}, expected {expected}"),
            Error::InvalidAddress { addr } => write!(f, "invalid address {addr}"),
            Error::RangeExceeded { addr } => {
                write!(f, "page {addr} has not been created")
            }
            Error::OutOfRange {
                addr,
                start,
                length,
            } => match length {
                Some(len) => write!(
                    f,
                    "read/write of {len} bytes at offset {start} exceeds the length of page {addr}"
                ),
                None => write!(
                    f,
                    "read at offset {start} exceeds the length of page {addr}"
                ),
            },
            Error::UseAfterRelease => write!(f, "page handle used after release"),
            Error::Closed => write!(f, "store used after close"),
            Error::InvalidPageSize { page_size } => {
                write!(f, "invalid page size {page_size}")
            }
            Error::InvalidSubtype { subtype } => {
                write!(f, "invalid subtype {subtype} (must be >= 0)")
            }
            Error::SubtypeTooLarge { subtype } => {
                write!(f, "subtype {subtype} exceeds the maximum of 251")
            }
            Error::EmptyPageOp { addr } => {
                write!(f, "page {addr} is empty and cannot be used directly")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
