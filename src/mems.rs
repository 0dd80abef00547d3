use log::{debug, error, info, warn};

use crate::{
  address::Address,
  align::pages_for,
  config::{MemsConfig, ReclaimPolicy},
  error::{MemsError, Result},
  region::{RegionDirectory, RegionSnapshot, SegmentRef},
  segment::SegmentState,
  stats::Stats,
};

/// The memory manager: a region directory plus the allocation engine that
/// works over it.
///
/// A `Mems` value is the whole simulated address space. [`Mems::init`]
/// creates it and [`Mems::shutdown`] consumes it, so using a manager after
/// shutdown does not compile. Dropping a manager without calling `shutdown`
/// still returns every mapping to the OS.
#[derive(Debug)]
pub struct Mems {
  directory: RegionDirectory,
  config: MemsConfig,
  stats: Stats,
}

impl Mems {
  pub fn init(config: MemsConfig) -> Result<Self> {
    let directory = RegionDirectory::create(config.page_size())?;

    info!(
      "mems initialized: page size {} bytes, address space base {}",
      config.page_size(),
      directory.base().map_or_else(|| "-".to_string(), |b| b.to_string()),
    );

    Ok(Self {
      directory,
      config,
      stats: Stats::default(),
    })
  }

  /// [`Mems::init`] with configuration read from `MEMS_*` variables.
  pub fn init_from_env() -> Result<Self> {
    Self::init(MemsConfig::from_env())
  }

  pub fn config(&self) -> &MemsConfig {
    &self.config
  }

  pub fn page_size(&self) -> usize {
    self.directory.page_size()
  }

  /// Hands out the first hole that can hold `size` bytes, mapping a new
  /// region when none can.
  ///
  /// A hole is split only when more than one page would be left over;
  /// otherwise the caller gets the whole hole.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Address> {
    if size == 0 {
      return Err(MemsError::ZeroSize);
    }

    let found = match self.directory.find_hole(size) {
      Some(found) => found,
      None => {
        let region = self.directory.new_region(size)?;
        self.stats.unused_bytes += self.directory.region(region).mapped_len() as u64;
        SegmentRef {
          region,
          segment: self.directory.region(region).head(),
        }
      }
    };

    Ok(self.carve(found, size))
  }

  fn carve(
    &mut self,
    found: SegmentRef,
    size: usize,
  ) -> Address {
    let page_size = self.directory.page_size();
    let segments = self.directory.segments_mut();

    let hole_len = segments.get(found.segment).len;
    let consumed = if hole_len - size > page_size {
      segments.split_after(found.segment, size);
      size
    } else {
      hole_len
    };

    let segment = segments.get_mut(found.segment);
    segment.state = SegmentState::Allocated;
    let start = segment.start;

    self.stats.unused_bytes -= consumed as u64;
    self.stats.mapped_pages += pages_for(consumed, page_size) as u64;
    debug_assert_eq!(self.stats.unused_bytes, self.directory.hole_bytes());

    debug!(
      "allocated {} bytes at {} ({} bytes consumed{})",
      size,
      start,
      consumed,
      if consumed == size && hole_len != size { ", split from a larger hole" } else { "" },
    );

    start
  }

  /// Returns the allocated segment starting at `address` to the hole pool
  /// and merges it with free neighbours.
  ///
  /// Under [`ReclaimPolicy::Eager`] a region left empty is unmapped. The
  /// region is dropped from the directory even if `munmap` fails; that
  /// failure is logged and the free still succeeds.
  pub fn free(
    &mut self,
    address: Address,
  ) -> Result<()> {
    let Some(found) = self.directory.find_allocated(address) else {
      warn!("attempted to free unallocated address {address}");
      return Err(MemsError::InvalidFree { address });
    };

    let head = self.directory.region(found.region).head();
    let segments = self.directory.segments_mut();

    let segment = segments.get_mut(found.segment);
    segment.state = SegmentState::Hole;
    let freed = segment.len;
    self.stats.unused_bytes += freed as u64;

    /* the ring wraps from the last segment to the head, but those two are
    not adjacent in memory, so never merge across the head */
    let mut id = found.segment;
    loop {
      let next = segments.next(id);
      if next == head || !segments.get(next).is_hole() {
        break;
      }
      segments.absorb_next(id);
    }
    while id != head {
      let prev = segments.prev(id);
      if !segments.get(prev).is_hole() {
        break;
      }
      segments.absorb_next(prev);
      id = prev;
    }

    debug!(
      "freed {} bytes at {}, hole is now {} bytes at {}",
      freed,
      address,
      segments.get(id).len,
      segments.get(id).start
    );

    if self.config.reclaim() == ReclaimPolicy::Eager && self.directory.is_region_empty(found.region) {
      self.stats.unused_bytes -= self.directory.region(found.region).mapped_len() as u64;
      /* the free itself has already taken effect, an unmap failure only
      leaks the pages */
      if let Err(err) = self.directory.release_region(found.region) {
        error!("{err}");
      }
    }

    debug_assert_eq!(self.stats.unused_bytes, self.directory.hole_bytes());
    Ok(())
  }

  /// Physical address behind `address`. Simulated addresses are backed
  /// one-to-one by real mappings, so this is the identity.
  pub fn get_physical(
    &self,
    address: Address,
  ) -> Address {
    address
  }

  pub fn stats(&self) -> Stats {
    self.stats
  }

  pub fn snapshot(&self) -> Vec<RegionSnapshot> {
    self.directory.snapshot()
  }

  /// Reports the counters and every region's segment layout through `log`.
  pub fn print_stats(&self) {
    info!("{}", self.stats);

    for (i, region) in self.directory.snapshot().iter().enumerate() {
      let layout: Vec<String> = region
        .segments
        .iter()
        .map(|s| match s.state {
          SegmentState::Hole => format!("H[{}:{}]", s.start, s.len),
          SegmentState::Allocated => format!("P[{}:{}]", s.start, s.len),
        })
        .collect();
      info!("region {} at {} ({} bytes): {}", i, region.base, region.mapped_len, layout.join(" <-> "));
    }
  }

  /// Returns every mapping to the OS, including regions that still hold
  /// allocated segments.
  pub fn shutdown(mut self) -> Result<()> {
    info!(
      "mems finished: releasing {} regions ({} segments), {}",
      self.directory.regions().len(),
      self.directory.segments().len(),
      self.stats
    );
    self.directory.teardown()
  }
}

impl Drop for Mems {
  fn drop(&mut self) {
    if self.directory.base().is_some() {
      if let Err(err) = self.directory.teardown() {
        warn!("teardown on drop: {err}");
      }
    }
  }
}
