//! # mems - A Simulated Virtual-Memory Manager
//!
//! This crate provides a user-space **memory manager** that hands out
//! simulated addresses from a space backed by real `mmap(2)` page mappings.
//! It exercises first-fit allocation, segment splitting and hole coalescing
//! without touching the host's native allocator.
//!
//! ## Overview
//!
//! Memory is tracked on two levels. The directory holds *regions*, each one
//! a batch of pages mapped together. Every region is cut into *segments*
//! which are either free (`H`, a hole) or in use (`P`, allocated):
//!
//! ```text
//!   Region Directory:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │  Region 0 (3 pages)                                                  │
//!   │   ┌──────────┬──────────┬──────────────────────────────────────┐     │
//!   │   │ P 100 B  │ P 4000 B │              H 8188 B                │     │
//!   │   └──────────┴──────────┴──────────────────────────────────────┘     │
//!   │        ▲                                                    │        │
//!   │        └──────────────────── ring ──────────────────────────┘        │
//!   ├──────────────────────────────────────────────────────────────────────┤
//!   │  Region 1 (1 page)                                                   │
//!   │   ┌─────────────────────────┐                                        │
//!   │   │        P 4096 B         │                                        │
//!   │   └─────────────────────────┘                                        │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Segments of a region form a circular sequence with no gaps: each segment
//! starts where the previous one ends, and the lengths add up to the size
//! of the mapping.
//!
//! ## Crate Structure
//!
//! ```text
//!   mems
//!   ├── address    - Simulated address newtype
//!   ├── align      - Page rounding (align_to!, pages_for)
//!   ├── config     - MemsConfig, ReclaimPolicy, MEMS_* variables
//!   ├── error      - MemsError
//!   ├── mapping    - RAII wrapper around mmap/munmap
//!   ├── segment    - Segment arena and per-region rings
//!   ├── region     - RegionDirectory
//!   ├── stats      - Counters
//!   └── mems       - Mems, the allocation engine
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mems::{Mems, MemsConfig};
//!
//! fn main() -> mems::Result<()> {
//!     let mut mems = Mems::init(MemsConfig::default())?;
//!
//!     let addr = mems.allocate(100)?;
//!     unsafe { mems.get_physical(addr).as_mut_ptr().write(42) };
//!
//!     println!("{}", mems.stats());
//!
//!     mems.free(addr)?;
//!     mems.shutdown()
//! }
//! ```
//!
//! ## How It Works
//!
//! `allocate(n)` walks regions in creation order and each region's ring in
//! address order, and takes the first hole of at least `n` bytes:
//!
//! ```text
//!   Split (remainder > one page):
//!
//!   ┌───────────────────────────────────┐      ┌─────────┬─────────────────┐
//!   │              H  N                 │  ->  │  P  n   │     H  N - n    │
//!   └───────────────────────────────────┘      └─────────┴─────────────────┘
//!
//!   No split (remainder <= one page), the caller gets the whole hole:
//!
//!   ┌───────────────┐                          ┌───────────────┐
//!   │     H  N      │                      ->  │     P  N      │
//!   └───────────────┘                          └───────────────┘
//! ```
//!
//! When no hole fits, `n` is rounded up to whole pages and a new region is
//! mapped for it. `free(addr)` turns the segment back into a hole and merges
//! it with free neighbours:
//!
//! ```text
//!   ┌───────┬───────┬───────┐              ┌───────────────────────┐
//!   │   H   │ P ->H │   H   │      ->      │           H           │
//!   └───────┴───────┴───────┘              └───────────────────────┘
//! ```
//!
//! With [`ReclaimPolicy::Eager`] (the default) a region that merges back
//! into one hole is unmapped right away; with [`ReclaimPolicy::Lazy`] it
//! stays mapped for later requests.
//!
//! ## Counters
//!
//! - **mapped pages**: `ceil(consumed / page_size)` added on every
//!   allocation; never decremented.
//! - **unused bytes**: total length of all holes in the directory.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no internal locking; callers serialize access
//! - **Identity translation**: `get_physical` returns its argument
//! - **Unix-only**: requires `libc` and `mmap` (POSIX systems)
//!
//! ## Safety
//!
//! The manager itself is safe to drive. Writing through the addresses it
//! hands out requires `unsafe`, and such addresses are dangling once they are
//! freed or the manager is shut down.

pub mod align;

mod address;
mod config;
mod error;
mod mapping;
mod mems;
mod region;
mod segment;
mod stats;

pub use address::Address;
pub use config::{MemsConfig, ReclaimPolicy};
pub use error::{MemsError, Result};
pub use mapping::page_size;
pub use mems::Mems;
pub use region::{RegionSnapshot, SegmentSnapshot};
pub use segment::SegmentState;
pub use stats::Stats;
