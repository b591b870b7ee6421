use crate::{
  arena::Arena,
  block::BlockLayout,
  scheme::{Scheme, best_fit},
  segment::Segment,
  validate::Corruption,
};

/// Free space is found by walking every block, used or free.
///
/// Nothing besides the headers records which blocks are free, so freeing is
/// a single header write and blocks are never merged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Implicit;

impl Scheme for Implicit {
  const NAME: &'static str = "implicit";
  const LAYOUT: BlockLayout = BlockLayout::IMPLICIT;
  const COALESCES: bool = false;

  fn reset(&mut self) {}

  fn locate<M: Segment>(
    &self,
    arena: &Arena<M>,
    payload_bytes: usize,
  ) -> Option<usize> {
    best_fit(arena.blocks(), payload_bytes)
  }

  fn insert<M: Segment>(
    &mut self,
    _arena: &mut Arena<M>,
    _at: usize,
  ) {
  }

  fn remove<M: Segment>(
    &mut self,
    _arena: &mut Arena<M>,
    _at: usize,
  ) {
  }

  fn tracked<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> Vec<usize> {
    arena
      .blocks()
      .filter(|(_, header)| !header.is_used())
      .map(|(at, _)| at)
      .collect()
  }

  fn check<M: Segment>(
    &self,
    _arena: &Arena<M>,
  ) -> Result<(), Corruption> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::header::Header;

  fn arena_with(blocks: &[Header]) -> Arena<Vec<u8>> {
    let mut arena = Arena::new(vec![0u8; 512], Implicit::LAYOUT);

    for &header in blocks {
      let at = arena.extend(Implicit::LAYOUT.overhead_bytes() + header.payload_size());
      arena.set_header(at, header);
    }

    arena
  }

  #[test]
  fn test_locate_scans_whole_chain() {
    let arena = arena_with(&[
      Header::used(8),
      Header::free(40),
      Header::used(8),
      Header::free(16),
      Header::free(64),
    ]);

    // 16 + 48 + 16 = 80
    assert_eq!(Implicit.locate(&arena, 16), Some(80));
    assert_eq!(Implicit.locate(&arena, 48), Some(104));
    assert_eq!(Implicit.locate(&arena, 72), None);
  }

  #[test]
  fn test_tracked_lists_free_headers() {
    let arena = arena_with(&[Header::free(8), Header::used(8), Header::free(8)]);

    assert_eq!(Implicit.tracked(&arena), vec![0, 32]);
  }
}
