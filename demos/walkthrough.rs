use std::io::Read;

use segalloc::{ExplicitHeap, HeapPtr, MappedSegment};

/// Waits until the user presses ENTER when run with `--step`.
/// Useful to inspect the mapping with `pmap` or `gdb` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn print_alloc(
  label: &str,
  heap: &ExplicitHeap<MappedSegment>,
  ptr: HeapPtr,
) {
  println!(
    "[{}] payload offset = {}, payload bytes = {}, used = {} of {}",
    label,
    ptr.offset(),
    heap.payload(ptr).map_or(0, <[u8]>::len),
    heap.used(),
    heap.capacity(),
  );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let step = std::env::args().any(|arg| arg == "--step");

  // One page, mapped privately. The heap never grows past it.
  let segment = MappedSegment::new(4096)?;
  println!("segment mapped at {:?}", segment.start());

  let mut heap = ExplicitHeap::init(segment)?;
  pause(step);

  // --------------------------------------------------------------------
  // 1) Three allocations extend the arena one after another.
  // --------------------------------------------------------------------
  let first = heap.allocate(4).ok_or("out of memory")?;
  print_alloc("1a", &heap, first);
  let second = heap.allocate(12).ok_or("out of memory")?;
  print_alloc("1b", &heap, second);
  let third = heap.allocate(32).ok_or("out of memory")?;
  print_alloc("1c", &heap, third);

  if let Some(bytes) = heap.payload_mut(second) {
    bytes.fill(0xAB);
  }
  print!("{}", heap.dump_headers());
  pause(step);

  // --------------------------------------------------------------------
  // 2) Freeing the middle block leaves a hole the next request reuses.
  // --------------------------------------------------------------------
  heap.free(second);
  let reused = heap.allocate(8).ok_or("out of memory")?;
  print_alloc("2", &heap, reused);
  println!(
    "[2] reused == second? {}",
    if reused == second { "yes" } else { "no" }
  );
  pause(step);

  // --------------------------------------------------------------------
  // 3) Growing the last block relocates it; growing into a freed
  //    neighbour happens in place.
  // --------------------------------------------------------------------
  let grown = heap.reallocate(third, 100).ok_or("out of memory")?;
  print_alloc("3a", &heap, grown);

  heap.free(reused);
  let in_place = heap.reallocate(first, 24).ok_or("out of memory")?;
  print_alloc("3b", &heap, in_place);
  println!("[3] grown in place? {}", in_place == first);
  print!("{}", heap.dump_headers());
  pause(step);

  // --------------------------------------------------------------------
  // 4) Summary and raw bytes.
  // --------------------------------------------------------------------
  println!("\n{:#?}", heap.report());
  println!("valid = {}", heap.validate());
  print!("{}", heap.dump_bytes());

  Ok(())
}
