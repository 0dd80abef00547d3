use std::ptr;

use mems::{Mems, MemsConfig, ReclaimPolicy};

/// Prints where every region sits and how it is cut into segments.
fn print_layout(
  label: &str,
  mems: &Mems,
) {
  println!("[{}] {}", label, mems.stats());
  for (i, region) in mems.snapshot().iter().enumerate() {
    print!("  region {} at {} ({} bytes):", i, region.base, region.mapped_len);
    for segment in &region.segments {
      print!(" {:?}({} @ {})", segment.state, segment.len, segment.start);
    }
    println!();
  }
}

fn main() -> mems::Result<()> {
  env_logger::init();

  // Lazy reclamation keeps A1's region around after it is freed, so the
  // last allocation can land on the same address.
  let config = MemsConfig::from_env().with_reclaim(ReclaimPolicy::Lazy);
  let page_size = config.page_size();
  let mut mems = Mems::init(config)?;

  println!("page size = {} bytes", page_size);

  // --------------------------------------------------------------------
  // 1) Allocate 100 bytes. No holes exist yet, so a region is mapped.
  // --------------------------------------------------------------------
  let a1 = mems.allocate(100)?;
  println!("\n[1] allocate(100) = {}", a1);

  unsafe {
    let ptr = mems.get_physical(a1).as_mut_ptr() as *mut u32;
    ptr.write(0xDEADBEEF);
    println!("[1] value written = 0x{:X}", ptr.read());
  }
  print_layout("1", &mems);

  // --------------------------------------------------------------------
  // 2) Allocate 50 bytes. A1 took its whole page, so this maps again.
  // --------------------------------------------------------------------
  let a2 = mems.allocate(50)?;
  println!("\n[2] allocate(50) = {}", a2);
  print_layout("2", &mems);

  // --------------------------------------------------------------------
  // 3) Free A1. Its page becomes a hole.
  // --------------------------------------------------------------------
  mems.free(a1)?;
  println!("\n[3] free({})", a1);
  print_layout("3", &mems);

  // --------------------------------------------------------------------
  // 4) Allocate 90 bytes. First fit finds A1's old page.
  // --------------------------------------------------------------------
  let a3 = mems.allocate(90)?;
  println!("\n[4] allocate(90) = {} (same as A1? {})", a3, a3 == a1);
  print_layout("4", &mems);

  // --------------------------------------------------------------------
  // 5) A large request, then carve a small piece out of its hole once it
  //    has been freed.
  // --------------------------------------------------------------------
  let big = mems.allocate(8 * page_size)?;
  mems.free(big)?;
  let small = mems.allocate(page_size + 10)?;
  println!("\n[5] allocate({}) = {} (split from a larger hole)", page_size + 10, small);

  unsafe {
    ptr::write_bytes(mems.get_physical(small).as_mut_ptr(), 0xAB, page_size + 10);
  }
  print_layout("5", &mems);

  // --------------------------------------------------------------------
  // 6) A freed address cannot be freed again.
  // --------------------------------------------------------------------
  mems.free(small)?;
  if let Err(err) = mems.free(small) {
    println!("\n[6] second free rejected: {}", err);
  }

  mems.print_stats();

  println!("\n[7] shutting down; outstanding allocations are released with their regions.");
  mems.shutdown()
}
