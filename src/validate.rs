//! Consistency checks over the block chain and the free-block index.
//!
//! A failed check means block metadata was overwritten, typically by a
//! double free or a write past the end of a payload. Nothing can be
//! repaired at that point; the checker reports and traps.

use thiserror::Error;

use crate::{heap::Heap, scheme::Scheme, segment::Segment};

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Corruption {
  #[error("{used} bytes claimed from a {capacity} byte segment")]
  UsedExceedsCapacity { used: usize, capacity: usize },

  #[error("block chain ends at offset {ends_at}, expected {expected}")]
  BrokenChain { ends_at: usize, expected: usize },

  #[error("free list holds {forward} entries head to tail but {backward} tail to head")]
  AsymmetricFreeList { forward: usize, backward: usize },
}

/// Called on every failed validation, after the failure is logged.
///
/// Kept out of line so a debugger breakpoint on `segalloc::validate::trap`
/// stops right where corruption was noticed.
#[cold]
#[inline(never)]
pub fn trap(corruption: &Corruption) {
  let _ = std::hint::black_box(corruption);
}

impl<S: Scheme, M: Segment> Heap<S, M> {
  /// Checks the heap, logging and trapping on the first inconsistency.
  pub fn validate(&self) -> bool {
    match self.check() {
      Ok(()) => true,
      Err(corruption) => {
        tracing::error!(scheme = S::NAME, %corruption, "heap validation failed");
        tracing::debug!("\n{}", self.dump_headers());
        trap(&corruption);
        false
      }
    }
  }

  /// Checks the heap without logging.
  ///
  /// The explicit free list is only checked for symmetric traversal; it is
  /// not compared against the set of free headers.
  pub fn check(&self) -> Result<(), Corruption> {
    let used = self.arena.used();
    let capacity = self.arena.capacity();

    if used > capacity {
      return Err(Corruption::UsedExceedsCapacity { used, capacity });
    }

    self.check_chain()?;
    self.scheme.check(&self.arena)
  }

  fn check_chain(&self) -> Result<(), Corruption> {
    let layout = self.arena.layout();
    let expected = self.arena.used();
    let mut at = 0;

    while at < expected {
      let Some(header) = self.arena.try_header(at) else {
        break;
      };

      at = layout.payload_of(at).saturating_add(header.payload_size());
    }

    if at != expected {
      return Err(Corruption::BrokenChain { ends_at: at, expected });
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::{ExplicitHeap, ImplicitHeap, header::Header};

  #[test]
  fn test_empty_heap_is_valid() {
    let heap = ExplicitHeap::init(vec![0u8; 64]).unwrap();

    assert!(heap.validate());
  }

  #[test]
  fn test_corrupted_size_breaks_chain() {
    let mut heap = ImplicitHeap::init(vec![0u8; 256]).unwrap();
    heap.allocate(8).unwrap();
    heap.allocate(8).unwrap();

    heap.raw_bytes_mut()[..8].copy_from_slice(&Header::used(40).to_bytes());

    assert_eq!(
      heap.check(),
      Err(super::Corruption::BrokenChain {
        ends_at: 48,
        expected: 32
      })
    );
    assert!(!heap.validate());
  }

  #[test]
  fn test_huge_size_does_not_overflow() {
    let mut heap = ExplicitHeap::init(vec![0u8; 256]).unwrap();
    heap.allocate(8).unwrap();

    heap.raw_bytes_mut()[..8].copy_from_slice(&u64::MAX.to_ne_bytes());

    assert!(!heap.validate());
  }

  #[test]
  fn test_broken_free_list() {
    let mut heap = ExplicitHeap::init(vec![0u8; 256]).unwrap();
    let a = heap.allocate(8).unwrap();
    let _b = heap.allocate(8).unwrap();
    let c = heap.allocate(8).unwrap();
    let _d = heap.allocate(8).unwrap();
    heap.free(a);
    heap.free(c);
    assert!(heap.validate());

    // Clear c's back link: the list now reads 2 entries forward, 1 backward.
    heap.raw_bytes_mut()[72..80].copy_from_slice(&u64::MAX.to_ne_bytes());

    assert_eq!(
      heap.check(),
      Err(super::Corruption::AsymmetricFreeList {
        forward: 2,
        backward: 1
      })
    );
  }
}
