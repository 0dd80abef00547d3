//! Segment nodes and the arena that links them into per-region rings.
//!
//! Every region owns one circular, doubly linked sequence of segments. The
//! links are arena indices rather than pointers, so splitting and merging are
//! O(1) splices and the rings never form ownership cycles.

use crate::address::Address;

/// Handle to a segment slot in a [`SegmentArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
  Hole,
  Allocated,
}

#[derive(Debug, Clone)]
pub struct Segment {
  pub start: Address,
  pub len: usize,
  pub state: SegmentState,
  prev: SegmentId,
  next: SegmentId,
}

impl Segment {
  pub fn end(&self) -> Address {
    self.start.add(self.len)
  }

  pub fn is_hole(&self) -> bool {
    self.state == SegmentState::Hole
  }
}

#[derive(Debug, Default)]
pub struct SegmentArena {
  slots: Vec<Option<Segment>>,
  free_slots: Vec<usize>,
}

impl SegmentArena {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of live segments across all rings.
  pub fn len(&self) -> usize {
    self.slots.len() - self.free_slots.len()
  }

  pub fn get(
    &self,
    id: SegmentId,
  ) -> &Segment {
    self.slots[id.0].as_ref().expect("dangling segment id")
  }

  pub fn get_mut(
    &mut self,
    id: SegmentId,
  ) -> &mut Segment {
    self.slots[id.0].as_mut().expect("dangling segment id")
  }

  pub fn next(
    &self,
    id: SegmentId,
  ) -> SegmentId {
    self.get(id).next
  }

  pub fn prev(
    &self,
    id: SegmentId,
  ) -> SegmentId {
    self.get(id).prev
  }

  fn alloc_slot(
    &mut self,
    segment: Segment,
  ) -> SegmentId {
    /* reuse a freed slot before growing the arena */
    if let Some(idx) = self.free_slots.pop() {
      self.slots[idx] = Some(segment);
      SegmentId(idx)
    } else {
      self.slots.push(Some(segment));
      SegmentId(self.slots.len() - 1)
    }
  }

  fn free_slot(
    &mut self,
    id: SegmentId,
  ) {
    self.slots[id.0] = None;
    self.free_slots.push(id.0);
  }

  /// Creates a one-node ring holding a single hole.
  pub fn insert_ring(
    &mut self,
    start: Address,
    len: usize,
  ) -> SegmentId {
    let id = self.alloc_slot(Segment {
      start,
      len,
      state: SegmentState::Hole,
      prev: SegmentId(0),
      next: SegmentId(0),
    });

    let segment = self.get_mut(id);
    segment.prev = id;
    segment.next = id;
    id
  }

  /// Shrinks `id` to `len` bytes and links a hole covering the rest right
  /// after it. Returns the new hole.
  pub fn split_after(
    &mut self,
    id: SegmentId,
    len: usize,
  ) -> SegmentId {
    let (start, old_len, next) = {
      let segment = self.get(id);
      (segment.start, segment.len, segment.next)
    };
    debug_assert!(len > 0 && len < old_len, "split must leave both halves non-empty");

    let remainder = self.alloc_slot(Segment {
      start: start.add(len),
      len: old_len - len,
      state: SegmentState::Hole,
      prev: id,
      next,
    });

    self.get_mut(next).prev = remainder;
    let segment = self.get_mut(id);
    segment.len = len;
    segment.next = remainder;

    remainder
  }

  /// Merges the successor of `id` into `id` and frees the successor's slot.
  /// Returns the number of bytes absorbed.
  pub fn absorb_next(
    &mut self,
    id: SegmentId,
  ) -> usize {
    let next = self.next(id);
    debug_assert_ne!(next, id, "cannot absorb a segment into itself");

    let (absorbed_len, after) = {
      let absorbed = self.get(next);
      debug_assert_eq!(absorbed.start, self.get(id).end());
      (absorbed.len, absorbed.next)
    };

    let segment = self.get_mut(id);
    segment.len += absorbed_len;
    segment.next = after;
    self.get_mut(after).prev = id;
    self.free_slot(next);

    absorbed_len
  }

  /// Visits every node of the ring starting at `head` exactly once,
  /// including rings of a single node.
  pub fn ring(
    &self,
    head: SegmentId,
  ) -> Ring<'_> {
    Ring {
      arena: self,
      head,
      cursor: Some(head),
    }
  }

  /// Frees every node of the ring starting at `head`. Returns how many
  /// segments were removed.
  pub fn remove_ring(
    &mut self,
    head: SegmentId,
  ) -> usize {
    let ids: Vec<SegmentId> = self.ring(head).collect();
    for &id in &ids {
      self.free_slot(id);
    }
    ids.len()
  }

  pub fn clear(&mut self) {
    self.slots.clear();
    self.free_slots.clear();
  }
}

pub struct Ring<'a> {
  arena: &'a SegmentArena,
  head: SegmentId,
  cursor: Option<SegmentId>,
}

impl Iterator for Ring<'_> {
  type Item = SegmentId;

  fn next(&mut self) -> Option<SegmentId> {
    let current = self.cursor?;
    let next = self.arena.next(current);
    self.cursor = (next != self.head).then_some(next);
    Some(current)
  }
}
