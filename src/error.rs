use std::io;

use thiserror::Error;

use crate::address::Address;

/// Errors reported by the memory manager.
#[derive(Debug, Error)]
pub enum MemsError {
  /// The OS declined a new page mapping. The directory is left untouched and
  /// the caller may retry with a smaller size.
  #[error("mapping of {requested} bytes refused by the OS: {source}")]
  MappingExhausted {
    requested: usize,
    #[source]
    source: io::Error,
  },

  /// Rounding the request up to whole pages does not fit in a `usize`.
  #[error("request of {requested} bytes overflows the address space")]
  SizeOverflow { requested: usize },

  /// `free` was given an address that is not the start of an allocated segment.
  #[error("attempted to free unallocated address {address}")]
  InvalidFree { address: Address },

  /// The configured page size is not a power-of-two multiple of the host
  /// page size.
  #[error("invalid page size {page_size}: must be a power-of-two multiple of the host page size")]
  InvalidPageSize { page_size: usize },

  #[error("allocation size must be positive")]
  ZeroSize,

  #[error("failed to unmap {len} bytes at {address}: {source}")]
  UnmapFailed {
    address: Address,
    len: usize,
    #[source]
    source: io::Error,
  },
}

impl MemsError {
  /// True for errors that mean "no memory for this request" and leave the
  /// manager fully usable.
  pub fn is_exhaustion(&self) -> bool {
    matches!(self, MemsError::MappingExhausted { .. } | MemsError::SizeOverflow { .. })
  }
}

pub type Result<T> = std::result::Result<T, MemsError>;
