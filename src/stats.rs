use std::fmt;

/// Process-lifetime counters of a [`Mems`](crate::Mems) instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
  /// Pages committed across all allocations. Never decremented.
  pub mapped_pages: u64,
  /// Bytes currently sitting in hole segments.
  pub unused_bytes: u64,
}

impl Stats {
  pub fn as_tuple(&self) -> (u64, u64) {
    (self.mapped_pages, self.unused_bytes)
  }
}

impl fmt::Display for Stats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "total mapped pages: {}, total unused memory: {} bytes",
      self.mapped_pages, self.unused_bytes
    )
  }
}
