//! Property-based tests for the memory manager.
//!
//! Uses proptest to drive random allocate/free sequences and checks the
//! structural invariants after every step.

use mems::{Address, Mems, MemsConfig, MemsError, ReclaimPolicy, SegmentState, page_size};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
  /// Allocate this many bytes.
  Allocate(usize),
  /// Free the live allocation at this index (modulo the number of live ones).
  Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
  let max = 6 * page_size();
  prop_oneof![
    3 => (1..=max).prop_map(Op::Allocate),
    2 => any::<usize>().prop_map(Op::Free),
  ]
}

fn reclaim_policy() -> impl Strategy<Value = ReclaimPolicy> {
  prop_oneof![Just(ReclaimPolicy::Eager), Just(ReclaimPolicy::Lazy)]
}

fn check_invariants(mems: &Mems) -> Result<(), TestCaseError> {
  let mut holes = 0u64;

  for region in mems.snapshot() {
    prop_assert!(region.is_contiguous(), "gap or overlap in {:?}", region);
    prop_assert_eq!(region.mapped_len % page_size(), 0);

    let total: usize = region.segments.iter().map(|s| s.len).sum();
    prop_assert_eq!(total, region.mapped_len);

    for pair in region.segments.windows(2) {
      prop_assert!(
        !(pair[0].state == SegmentState::Hole && pair[1].state == SegmentState::Hole),
        "adjacent holes left uncoalesced in {:?}",
        region
      );
    }

    holes += region
      .segments
      .iter()
      .filter(|s| s.state == SegmentState::Hole)
      .map(|s| s.len as u64)
      .sum::<u64>();
  }

  prop_assert_eq!(mems.stats().unused_bytes, holes);
  Ok(())
}

fn run(
  reclaim: ReclaimPolicy,
  ops: &[Op],
) -> Result<(), TestCaseError> {
  let mut mems = Mems::init(MemsConfig::new().with_reclaim(reclaim)).unwrap();
  let mut live: Vec<Address> = Vec::new();

  for op in ops {
    match *op {
      Op::Allocate(size) => {
        let pages_before = mems.stats().mapped_pages;
        let addr = mems.allocate(size).unwrap();

        prop_assert!(!live.contains(&addr), "address {} handed out twice", addr);
        prop_assert!(mems.stats().mapped_pages >= pages_before + size.div_ceil(page_size()) as u64);

        live.push(addr);
      }
      Op::Free(i) if !live.is_empty() => {
        let addr = live.swap_remove(i % live.len());
        mems.free(addr).unwrap();
      }
      Op::Free(_) => {}
    }
    check_invariants(&mems)?;
  }

  mems.shutdown().unwrap();
  Ok(())
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  /// Segments tile their region and the counters match the structure.
  #[test]
  fn invariants_hold(reclaim in reclaim_policy(), ops in prop::collection::vec(op(), 1..60)) {
    run(reclaim, &ops)?;
  }

  /// Freeing something twice is reported and leaves counters alone.
  #[test]
  fn double_free_is_rejected(size in 1..=4 * page_size()) {
    let mut mems = Mems::init(MemsConfig::new().with_reclaim(ReclaimPolicy::Lazy)).unwrap();

    let addr = mems.allocate(size).unwrap();
    mems.free(addr).unwrap();

    let stats = mems.stats();
    let is_invalid_free = matches!(mems.free(addr), Err(MemsError::InvalidFree { .. }));
    prop_assert!(is_invalid_free);
    prop_assert_eq!(mems.stats(), stats);

    mems.shutdown().unwrap();
  }

  /// With lazy reclamation, allocating the same sizes into a freed region
  /// hands back the same offsets.
  #[test]
  fn first_fit_is_deterministic(sizes in prop::collection::vec(1..=page_size() / 2, 1..8)) {
    let page = page_size();
    let mut mems = Mems::init(MemsConfig::new().with_reclaim(ReclaimPolicy::Lazy)).unwrap();

    let base = mems.allocate(16 * page).unwrap();
    mems.free(base).unwrap();

    let first: Vec<usize> = sizes
      .iter()
      .map(|&s| mems.allocate(s).unwrap().as_usize() - base.as_usize())
      .collect();
    for &offset in &first {
      mems.free(Address::new(base.as_usize() + offset)).unwrap();
    }

    let second: Vec<usize> = sizes
      .iter()
      .map(|&s| mems.allocate(s).unwrap().as_usize() - base.as_usize())
      .collect();

    prop_assert_eq!(first, second);
    prop_assert_eq!(mems.snapshot().len(), 1);

    mems.shutdown().unwrap();
  }
}
