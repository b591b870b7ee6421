//! Free-space strategies plugged into the allocation engine.
//!
//! A [`Scheme`] decides how free blocks are found and whether they are
//! tracked anywhere besides their own headers. The engine in
//! [`heap`](crate::heap) is otherwise identical for every scheme.

use crate::{
  arena::Arena,
  block::BlockLayout,
  header::Header,
  segment::Segment,
  validate::Corruption,
};

pub trait Scheme: Default {
  /// Human-readable name, used in logs and dumps.
  const NAME: &'static str;

  /// Where headers, links and payloads sit inside a block.
  const LAYOUT: BlockLayout;

  /// Whether releasing or growing a block absorbs free right neighbours.
  const COALESCES: bool;

  /// Forgets every tracked free block.
  fn reset(&mut self);

  /// Best-fit search for a free block with at least `payload_bytes` of
  /// payload. Returns its header offset.
  fn locate<M: Segment>(
    &self,
    arena: &Arena<M>,
    payload_bytes: usize,
  ) -> Option<usize>;

  /// Starts tracking the freshly freed block at `at`.
  fn insert<M: Segment>(
    &mut self,
    arena: &mut Arena<M>,
    at: usize,
  );

  /// Stops tracking the block at `at`.
  fn remove<M: Segment>(
    &mut self,
    arena: &mut Arena<M>,
    at: usize,
  );

  /// Header offsets of the tracked free blocks, in tracking order.
  fn tracked<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> Vec<usize>;

  /// Scheme-specific consistency checks, run after the chain check.
  fn check<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> Result<(), Corruption>;
}

/// Best fit over `candidates`: the smallest free block that still holds
/// `payload_bytes`. On equal sizes the earliest candidate wins.
pub fn best_fit(
  candidates: impl IntoIterator<Item = (usize, Header)>,
  payload_bytes: usize,
) -> Option<usize> {
  let mut found: Option<(usize, usize)> = None;

  for (at, header) in candidates {
    let size = header.payload_size();

    if header.is_used() || size < payload_bytes {
      continue;
    }

    match found {
      Some((_, best)) if size >= best => {}
      _ => found = Some((at, size)),
    }
  }

  found.map(|(at, _)| at)
}
