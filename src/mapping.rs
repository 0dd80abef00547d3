use std::{io, mem, ptr};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use log::warn;

use crate::{
  address::Address,
  error::{MemsError, Result},
};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Page size of the host, as reported by `sysconf(_SC_PAGESIZE)`.
pub fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size <= 0 {
    FALLBACK_PAGE_SIZE
  } else {
    size as usize
  }
}

/// An anonymous, private, read/write mapping obtained with `mmap(2)`.
///
/// The mapping is returned to the OS exactly once: either through
/// [`Mapping::release`] or when the value is dropped.
#[derive(Debug)]
pub struct Mapping {
  base: *mut u8,
  len: usize,
}

impl Mapping {
  /// Maps `len` bytes. `len` should already be a whole number of pages.
  pub fn new(len: usize) -> Result<Self> {
    let address = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(MemsError::MappingExhausted {
        requested: len,
        source: io::Error::last_os_error(),
      });
    }

    Ok(Self {
      base: address as *mut u8,
      len,
    })
  }

  pub fn base(&self) -> Address {
    Address::from_ptr(self.base)
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn contains(
    &self,
    address: Address,
  ) -> bool {
    let start = self.base as usize;
    (start..start + self.len).contains(&address.as_usize())
  }

  /// Unmaps the region, reporting failure to the caller.
  pub fn release(self) -> Result<()> {
    let result = unsafe { self.unmap() };
    mem::forget(self);
    result
  }

  unsafe fn unmap(&self) -> Result<()> {
    if unsafe { munmap(self.base as *mut c_void, self.len) } != 0 {
      return Err(MemsError::UnmapFailed {
        address: self.base(),
        len: self.len,
        source: io::Error::last_os_error(),
      });
    }

    Ok(())
  }
}

impl Drop for Mapping {
  fn drop(&mut self) {
    if let Err(err) = unsafe { self.unmap() } {
      warn!("{err}");
    }
  }
}
