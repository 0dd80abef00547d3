//! The region directory: every mapping obtained from the OS and the segment
//! ring that subdivides it.

use log::debug;

use crate::{
  address::Address,
  align::checked_align_to,
  config::is_valid_page_size,
  error::{MemsError, Result},
  mapping::Mapping,
  segment::{Segment, SegmentArena, SegmentId, SegmentState},
};

/// One or more pages mapped together, subdivided into segments.
#[derive(Debug)]
pub struct Region {
  mapping: Mapping,
  head: SegmentId,
}

impl Region {
  pub fn base(&self) -> Address {
    self.mapping.base()
  }

  pub fn mapped_len(&self) -> usize {
    self.mapping.len()
  }

  pub fn head(&self) -> SegmentId {
    self.head
  }

  pub fn contains(
    &self,
    address: Address,
  ) -> bool {
    self.mapping.contains(address)
  }
}

/// Position of a segment inside the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRef {
  pub region: usize,
  pub segment: SegmentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSnapshot {
  pub start: Address,
  pub len: usize,
  pub state: SegmentState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSnapshot {
  pub base: Address,
  pub mapped_len: usize,
  pub segments: Vec<SegmentSnapshot>,
}

impl RegionSnapshot {
  /// True when the segments tile the region with no gap and no overlap.
  pub fn is_contiguous(&self) -> bool {
    let mut expected = self.base;
    for segment in &self.segments {
      if segment.start != expected || segment.len == 0 {
        return false;
      }
      expected = expected.add(segment.len);
    }
    expected == self.base.add(self.mapped_len)
  }
}

#[derive(Debug)]
pub struct RegionDirectory {
  /// Reserved only to fix where the simulated address space starts; never
  /// handed out as segments.
  base: Option<Mapping>,
  regions: Vec<Region>,
  segments: SegmentArena,
  page_size: usize,
}

impl RegionDirectory {
  /// Creates an empty directory and reserves the address-space base.
  /// `page_size` must be a power-of-two multiple of the host page size.
  pub fn create(page_size: usize) -> Result<Self> {
    if !is_valid_page_size(page_size) {
      return Err(MemsError::InvalidPageSize { page_size });
    }

    let base = Mapping::new(page_size)?;
    debug!("reserved address-space base at {}", base.base());

    Ok(Self {
      base: Some(base),
      regions: Vec::new(),
      segments: SegmentArena::new(),
      page_size,
    })
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn base(&self) -> Option<Address> {
    self.base.as_ref().map(Mapping::base)
  }

  pub fn regions(&self) -> &[Region] {
    &self.regions
  }

  pub fn segments(&self) -> &SegmentArena {
    &self.segments
  }

  pub fn segments_mut(&mut self) -> &mut SegmentArena {
    &mut self.segments
  }

  pub fn region(
    &self,
    index: usize,
  ) -> &Region {
    &self.regions[index]
  }

  /// Maps at least `min_size` bytes, rounded up to whole pages, and appends a
  /// region holding one hole that spans it. Returns the region's index.
  pub fn new_region(
    &mut self,
    min_size: usize,
  ) -> Result<usize> {
    let len = checked_align_to(min_size, self.page_size)
      .ok_or(MemsError::SizeOverflow { requested: min_size })?;

    let mapping = Mapping::new(len)?;
    let head = self.segments.insert_ring(mapping.base(), len);

    debug!("new region at {} spanning {} bytes", mapping.base(), len);
    self.regions.push(Region { mapping, head });

    Ok(self.regions.len() - 1)
  }

  /// First hole, in region insertion order then ring order, that can hold
  /// `size` bytes.
  pub fn find_hole(
    &self,
    size: usize,
  ) -> Option<SegmentRef> {
    self.find(|segment| segment.state == SegmentState::Hole && segment.len >= size)
  }

  /// The allocated segment that starts exactly at `address`.
  pub fn find_allocated(
    &self,
    address: Address,
  ) -> Option<SegmentRef> {
    self.regions.iter().enumerate().find_map(|(region, r)| {
      if !r.contains(address) {
        return None;
      }
      self
        .segments
        .ring(r.head)
        .find(|&id| {
          let segment = self.segments.get(id);
          segment.state == SegmentState::Allocated && segment.start == address
        })
        .map(|segment| SegmentRef { region, segment })
    })
  }

  fn find(
    &self,
    predicate: impl Fn(&Segment) -> bool,
  ) -> Option<SegmentRef> {
    self.regions.iter().enumerate().find_map(|(region, r)| {
      self
        .segments
        .ring(r.head)
        .find(|&id| predicate(self.segments.get(id)))
        .map(|segment| SegmentRef { region, segment })
    })
  }

  /// True when the region is a single hole covering its whole mapping.
  pub fn is_region_empty(
    &self,
    index: usize,
  ) -> bool {
    let region = &self.regions[index];
    let head = self.segments.get(region.head);
    head.is_hole() && head.len == region.mapped_len()
  }

  /// Unmaps the region at `index` and drops its segments. Later regions
  /// keep their relative order.
  pub fn release_region(
    &mut self,
    index: usize,
  ) -> Result<()> {
    let region = self.regions.remove(index);
    self.segments.remove_ring(region.head);

    debug!("releasing region at {} ({} bytes)", region.base(), region.mapped_len());
    region.mapping.release()
  }

  /// Sum of the lengths of every hole in the directory.
  pub fn hole_bytes(&self) -> u64 {
    self
      .regions
      .iter()
      .flat_map(|r| self.segments.ring(r.head))
      .map(|id| self.segments.get(id))
      .filter(|segment| segment.is_hole())
      .map(|segment| segment.len as u64)
      .sum()
  }

  pub fn snapshot(&self) -> Vec<RegionSnapshot> {
    self
      .regions
      .iter()
      .map(|r| RegionSnapshot {
        base: r.base(),
        mapped_len: r.mapped_len(),
        segments: self
          .segments
          .ring(r.head)
          .map(|id| {
            let segment = self.segments.get(id);
            SegmentSnapshot {
              start: segment.start,
              len: segment.len,
              state: segment.state,
            }
          })
          .collect(),
      })
      .collect()
  }

  /// Releases every region, allocated segments included, then the
  /// address-space base. Every mapping is attempted even if an earlier one
  /// fails; the first failure is returned.
  pub fn teardown(&mut self) -> Result<()> {
    let mut first_err = None;

    for region in self.regions.drain(..) {
      if let Err(err) = region.mapping.release() {
        first_err.get_or_insert(err);
      }
    }
    self.segments.clear();

    if let Some(base) = self.base.take() {
      if let Err(err) = base.release() {
        first_err.get_or_insert(err);
      }
    }

    first_err.map_or(Ok(()), Err)
  }
}
