//! Manager configuration.
//!
//! Configuration can be built programmatically or read from the environment:
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `MEMS_PAGE_SIZE` | Page size used for rounding and splitting, in bytes | host page size |
//! | `MEMS_RECLAIM` | What `free` does with a region that became empty (`eager`/`lazy`) | `eager` |
//!
//! `MEMS_PAGE_SIZE` must be a power of two and a multiple of the host page
//! size; other values are ignored with a warning.

use std::env;

use log::warn;

use crate::mapping;

/// What happens to a region once every segment in it is free again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReclaimPolicy {
  /// Unmap the region as soon as it coalesces into a single hole.
  #[default]
  Eager,
  /// Keep the region mapped so later requests can reuse it.
  Lazy,
}

impl ReclaimPolicy {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "eager" => Some(ReclaimPolicy::Eager),
      "lazy" => Some(ReclaimPolicy::Lazy),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct MemsConfig {
  page_size: usize,
  reclaim: ReclaimPolicy,
}

impl Default for MemsConfig {
  fn default() -> Self {
    Self {
      page_size: mapping::page_size(),
      reclaim: ReclaimPolicy::default(),
    }
  }
}

impl MemsConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Defaults overridden by `MEMS_*` environment variables.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Ok(val) = env::var("MEMS_PAGE_SIZE") {
      match val.trim().parse::<usize>() {
        Ok(size) if is_valid_page_size(size) => config.page_size = size,
        Ok(size) => warn!(
          "ignoring MEMS_PAGE_SIZE={size}: not a power-of-two multiple of the host page size {}",
          mapping::page_size()
        ),
        Err(err) => warn!("ignoring MEMS_PAGE_SIZE={val:?}: {err}"),
      }
    }

    if let Ok(val) = env::var("MEMS_RECLAIM") {
      match ReclaimPolicy::parse(&val) {
        Some(policy) => config.reclaim = policy,
        None => warn!("ignoring MEMS_RECLAIM={val:?}: expected `eager` or `lazy`"),
      }
    }

    config
  }

  /// Sets the page size. Invalid sizes fall back to the host page size.
  pub fn with_page_size(
    mut self,
    page_size: usize,
  ) -> Self {
    if is_valid_page_size(page_size) {
      self.page_size = page_size;
    } else {
      warn!("page size {page_size} rejected, keeping {}", self.page_size);
    }
    self
  }

  pub fn with_reclaim(
    mut self,
    reclaim: ReclaimPolicy,
  ) -> Self {
    self.reclaim = reclaim;
    self
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn reclaim(&self) -> ReclaimPolicy {
    self.reclaim
  }
}

/// A usable page size is a power of two and a whole number of host pages.
pub fn is_valid_page_size(size: usize) -> bool {
  let host = mapping::page_size();
  size.is_power_of_two() && size >= host && size % host == 0
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  /// Serializes the tests that touch `MEMS_*` variables.
  static ENV_LOCK: Mutex<()> = Mutex::new(());

  fn from_env_with(
    page_size: Option<&str>,
    reclaim: Option<&str>,
  ) -> MemsConfig {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    unsafe {
      match page_size {
        Some(val) => env::set_var("MEMS_PAGE_SIZE", val),
        None => env::remove_var("MEMS_PAGE_SIZE"),
      }
      match reclaim {
        Some(val) => env::set_var("MEMS_RECLAIM", val),
        None => env::remove_var("MEMS_RECLAIM"),
      }
    }

    let config = MemsConfig::from_env();

    unsafe {
      env::remove_var("MEMS_PAGE_SIZE");
      env::remove_var("MEMS_RECLAIM");
    }

    config
  }

  #[test]
  fn test_default_uses_host_page_size() {
    let config = MemsConfig::default();
    assert_eq!(config.page_size(), mapping::page_size());
    assert_eq!(config.reclaim(), ReclaimPolicy::Eager);
  }

  #[test]
  fn test_builder() {
    let host = mapping::page_size();
    let config = MemsConfig::new()
      .with_page_size(host * 4)
      .with_reclaim(ReclaimPolicy::Lazy);

    assert_eq!(config.page_size(), host * 4);
    assert_eq!(config.reclaim(), ReclaimPolicy::Lazy);
  }

  #[test]
  fn test_invalid_page_size_is_ignored() {
    let host = mapping::page_size();
    assert_eq!(MemsConfig::new().with_page_size(host + 1).page_size(), host);
    assert_eq!(MemsConfig::new().with_page_size(host / 2).page_size(), host);
    assert_eq!(MemsConfig::new().with_page_size(host * 3).page_size(), host);
    assert_eq!(MemsConfig::new().with_page_size(0).page_size(), host);
  }

  #[test]
  fn test_parse_reclaim() {
    assert_eq!(ReclaimPolicy::parse("Lazy"), Some(ReclaimPolicy::Lazy));
    assert_eq!(ReclaimPolicy::parse(" eager "), Some(ReclaimPolicy::Eager));
    assert_eq!(ReclaimPolicy::parse("sometimes"), None);
  }

  #[test]
  fn test_from_env_with_no_vars() {
    let config = from_env_with(None, None);
    assert_eq!(config.page_size(), mapping::page_size());
    assert_eq!(config.reclaim(), ReclaimPolicy::Eager);
  }

  #[test]
  fn test_from_env_overrides() {
    let host = mapping::page_size();
    let config = from_env_with(Some(&(host * 2).to_string()), Some("lazy"));

    assert_eq!(config.page_size(), host * 2);
    assert_eq!(config.reclaim(), ReclaimPolicy::Lazy);
  }

  #[test]
  fn test_from_env_rejects_non_multiple_page_size() {
    let host = mapping::page_size();
    let config = from_env_with(Some(&(host * 3).to_string()), None);
    assert_eq!(config.page_size(), host);

    let config = from_env_with(Some(&(host + 1).to_string()), None);
    assert_eq!(config.page_size(), host);
  }

  #[test]
  fn test_from_env_rejects_unparsable_page_size() {
    let config = from_env_with(Some("abc"), None);
    assert_eq!(config.page_size(), mapping::page_size());

    let config = from_env_with(Some("-4096"), None);
    assert_eq!(config.page_size(), mapping::page_size());
  }

  #[test]
  fn test_from_env_rejects_unknown_reclaim() {
    let config = from_env_with(None, Some("sometimes"));
    assert_eq!(config.reclaim(), ReclaimPolicy::Eager);
  }
}
