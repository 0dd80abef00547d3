use std::fmt;

/// A simulated address handed out by the manager.
///
/// Simulated addresses are backed by real mappings, so an `Address` can be
/// turned into a pointer once it has gone through
/// [`Mems::get_physical`](crate::Mems::get_physical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
  pub const fn new(addr: usize) -> Self {
    Self(addr)
  }

  pub fn from_ptr<T>(ptr: *const T) -> Self {
    Self(ptr as usize)
  }

  pub const fn as_usize(self) -> usize {
    self.0
  }

  pub fn as_mut_ptr(self) -> *mut u8 {
    self.0 as *mut u8
  }

  /// Address `offset` bytes past `self`.
  pub const fn add(
    self,
    offset: usize,
  ) -> Self {
    Self(self.0 + offset)
  }
}

impl fmt::Display for Address {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}
