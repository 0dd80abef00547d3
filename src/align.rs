/// Rounds `$value` up to the next multiple of `$align`.
///
/// `$align` must be a power of two. Region sizes are rounded to whole pages
/// with this before they are requested from the OS.
///
/// # Examples
///
/// ```rust
/// use mems::align_to;
///
/// assert_eq!(align_to!(100, 4096), 4096);
/// assert_eq!(align_to!(4096, 4096), 4096);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Overflow-checked version of [`align_to!`].
pub fn checked_align_to(
  value: usize,
  align: usize,
) -> Option<usize> {
  debug_assert!(align.is_power_of_two());
  value.checked_add(align - 1).map(|v| v & !(align - 1))
}

/// Number of pages of `page_size` bytes needed to hold `len` bytes.
pub fn pages_for(
  len: usize,
  page_size: usize,
) -> usize {
  len.div_ceil(page_size)
}
