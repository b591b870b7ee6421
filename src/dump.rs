//! Read-only views of a heap for debugging.
//!
//! ```text
//!   ==== HEADER DUMP
//!   - payload=24 used=true size=16
//!   - payload=64 used=false size=40
//! ```

use std::fmt;

use crate::{heap::Heap, scheme::Scheme, segment::Segment};

const BYTES_PER_LINE: usize = 32;

/// Lists every block header along the chain.
pub struct HeaderDump<'a, S, M> {
  heap: &'a Heap<S, M>,
}

/// Hex dump of the claimed part of the segment.
pub struct ByteDump<'a, S, M> {
  heap: &'a Heap<S, M>,
}

/// Counters gathered in one pass over the chain and the free index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapReport {
  pub capacity: usize,
  pub used: usize,
  pub blocks: usize,
  pub used_blocks: usize,
  pub free_blocks: usize,
  pub free_payload_bytes: usize,
  pub largest_free_payload: usize,
  /// Entries on the free-block index.
  pub tracked: usize,
  /// Entries on the free-block index whose header says the block is used.
  pub stale_entries: usize,
}

impl<S: Scheme, M: Segment> Heap<S, M> {
  pub fn dump_headers(&self) -> HeaderDump<'_, S, M> {
    HeaderDump { heap: self }
  }

  pub fn dump_bytes(&self) -> ByteDump<'_, S, M> {
    ByteDump { heap: self }
  }

  pub fn report(&self) -> HeapReport {
    let mut report = HeapReport {
      capacity: self.capacity(),
      used: self.used(),
      ..HeapReport::default()
    };

    for block in self.blocks() {
      report.blocks += 1;

      if block.used {
        report.used_blocks += 1;
      } else {
        report.free_blocks += 1;
        report.free_payload_bytes += block.payload_size;
        report.largest_free_payload = report.largest_free_payload.max(block.payload_size);
      }
    }

    let tracked = self.scheme.tracked(&self.arena);
    report.tracked = tracked.len();
    report.stale_entries = tracked
      .into_iter()
      .filter(|&at| self.arena.try_header(at).is_some_and(|header| header.is_used()))
      .count();

    report
  }
}

impl<S: Scheme, M: Segment> fmt::Display for HeaderDump<'_, S, M> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "==== HEADER DUMP ({})", S::NAME)?;

    for block in self.heap.blocks() {
      writeln!(
        f,
        "- payload={} used={} size={}",
        block.payload.offset(),
        block.used,
        block.payload_size
      )?;
    }

    Ok(())
  }
}

impl<S: Scheme, M: Segment> fmt::Display for ByteDump<'_, S, M> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let heap = self.heap;
    let bytes = &heap.raw_bytes()[..heap.used()];

    writeln!(f, "==== HEAP SUMMARY")?;
    writeln!(f, "start={:p}", heap.raw_bytes().as_ptr())?;
    writeln!(f, "capacity={}", heap.capacity())?;
    writeln!(f, "==== BYTE DUMP")?;
    writeln!(f, "bytes={}", bytes.len())?;

    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
      write!(f, "{:#08x}:", line * BYTES_PER_LINE)?;
      for byte in chunk {
        write!(f, " {byte:02x}")?;
      }
      writeln!(f)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::{ExplicitHeap, ImplicitHeap};

  #[test]
  fn test_header_dump_lists_blocks() {
    let mut heap = ImplicitHeap::init(vec![0u8; 128]).unwrap();
    let a = heap.allocate(8).unwrap();
    heap.allocate(16).unwrap();
    heap.free(a);

    let dump = heap.dump_headers().to_string();

    assert_eq!(
      dump,
      "==== HEADER DUMP (implicit)\n- payload=8 used=false size=8\n- payload=24 used=true size=16\n"
    );
  }

  #[test]
  fn test_byte_dump_covers_used_prefix() {
    let mut heap = ImplicitHeap::init(vec![0u8; 128]).unwrap();
    heap.allocate(40).unwrap();

    let dump = heap.dump_bytes().to_string();

    assert!(dump.contains("bytes=48\n"));
    assert!(dump.contains("0x000000: 29 00"));
    assert!(dump.contains("0x000020:"));
    assert!(!dump.contains("0x000040:"));
  }

  #[test]
  fn test_report_counts() {
    let mut heap = ExplicitHeap::init(vec![0u8; 512]).unwrap();
    let a = heap.allocate(8).unwrap();
    let _b = heap.allocate(8).unwrap();
    let c = heap.allocate(64).unwrap();
    let _d = heap.allocate(8).unwrap();
    heap.free(a);
    heap.free(c);

    let report = heap.report();

    assert_eq!(report.blocks, 4);
    assert_eq!(report.used_blocks, 2);
    assert_eq!(report.free_blocks, 2);
    assert_eq!(report.free_payload_bytes, 72);
    assert_eq!(report.largest_free_payload, 64);
    assert_eq!(report.tracked, 2);
    assert_eq!(report.stale_entries, 0);
  }

  #[test]
  fn test_report_counts_reused_entries() {
    let mut heap = ExplicitHeap::init(vec![0u8; 512]).unwrap();
    let a = heap.allocate(8).unwrap();
    let _b = heap.allocate(8).unwrap();
    heap.free(a);

    // Reusing a without a split leaves its entry on the list.
    assert_eq!(heap.allocate(8), Some(a));

    let report = heap.report();
    assert_eq!(report.free_blocks, 0);
    assert_eq!(report.tracked, 1);
    assert_eq!(report.stale_entries, 1);
    assert!(heap.validate());
  }
}
