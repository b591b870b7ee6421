//! Address-ordered doubly linked list of free blocks.
//!
//! ```text
//!   head                                                        tail
//!    │                                                           │
//!    ▼                                                           ▼
//!   ┌────┬─────┬──────┐      ┌────┬─────┬──────┐      ┌────┬─────┬──────┐
//!   │ hdr│ link│ free │ ...  │ hdr│ link│ free │ ...  │ hdr│ link│ free │
//!   └────┴─────┴──────┘      └────┴─────┴──────┘      └────┴─────┴──────┘
//!          │  ▲                 │  ▲                    ▲
//!          └──┼─── next ────────┘  └──── next ──────────┘ ...
//!             └─── prev ───────────┘
//! ```
//!
//! Links live inside the blocks themselves; the list only owns the two end
//! offsets. Entries are kept in ascending address order, which is what lets
//! a released block find its physical right neighbour among the free ones.

use crate::{
  arena::Arena,
  block::{BlockLayout, Link},
  scheme::{Scheme, best_fit},
  segment::Segment,
  validate::Corruption,
};

/// Free blocks additionally threaded on an address-ordered list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Explicit {
  head: Option<usize>,
  tail: Option<usize>,
}

#[derive(Clone, Copy)]
enum Direction {
  Forward,
  Backward,
}

/// Follows list links from one end. Gives up after `budget` steps so a
/// corrupted cycle cannot hang a diagnostic walk.
struct Walk<'a, M> {
  arena: &'a Arena<M>,
  at: Option<usize>,
  direction: Direction,
  budget: usize,
}

impl<M: Segment> Iterator for Walk<'_, M> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let at = self.at?;

    if self.budget == 0 {
      return None;
    }
    self.budget -= 1;

    let link = self.arena.try_link(at).unwrap_or_default();
    self.at = match self.direction {
      Direction::Forward => link.next,
      Direction::Backward => link.prev,
    };

    Some(at)
  }
}

impl Explicit {
  pub fn head(&self) -> Option<usize> {
    self.head
  }

  pub fn tail(&self) -> Option<usize> {
    self.tail
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  fn walk<'a, M: Segment>(
    &self,
    arena: &'a Arena<M>,
    direction: Direction,
  ) -> Walk<'a, M> {
    let at = match direction {
      Direction::Forward => self.head,
      Direction::Backward => self.tail,
    };

    // A well-formed list never has more entries than the arena has blocks.
    let budget = arena.used() / Self::LAYOUT.min_block_bytes() + 1;

    Walk {
      arena,
      at,
      direction,
      budget,
    }
  }

  /// Nearest entry below `at`, scanning up from the head.
  fn preceding<M: Segment>(
    &self,
    arena: &Arena<M>,
    at: usize,
  ) -> Option<usize> {
    self.walk(arena, Direction::Forward).take_while(|&entry| entry < at).last()
  }

  /// Nearest entry above `at`, scanning down from the tail.
  fn following<M: Segment>(
    &self,
    arena: &Arena<M>,
    at: usize,
  ) -> Option<usize> {
    self.walk(arena, Direction::Backward).take_while(|&entry| at < entry).last()
  }

  pub fn forward_len<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> usize {
    self.walk(arena, Direction::Forward).count()
  }

  pub fn backward_len<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> usize {
    self.walk(arena, Direction::Backward).count()
  }
}

impl Scheme for Explicit {
  const NAME: &'static str = "explicit";
  const LAYOUT: BlockLayout = BlockLayout::EXPLICIT;
  const COALESCES: bool = true;

  fn reset(&mut self) {
    self.head = None;
    self.tail = None;
  }

  fn locate<M: Segment>(
    &self,
    arena: &Arena<M>,
    payload_bytes: usize,
  ) -> Option<usize> {
    let candidates = self
      .walk(arena, Direction::Forward)
      .map(|at| (at, arena.header(at)));

    best_fit(candidates, payload_bytes)
  }

  fn insert<M: Segment>(
    &mut self,
    arena: &mut Arena<M>,
    at: usize,
  ) {
    if self.is_empty() {
      arena.set_link(at, Link::new(None, None));
      self.head = Some(at);
      self.tail = Some(at);
      return;
    }

    let prev = self.preceding(arena, at);
    let next = self.following(arena, at);

    arena.set_link(at, Link::new(prev, next));

    match prev {
      Some(prev) => arena.set_next_free(prev, Some(at)),
      None => self.head = Some(at),
    }

    match next {
      Some(next) => arena.set_prev_free(next, Some(at)),
      None => self.tail = Some(at),
    }

    tracing::trace!(at, ?prev, ?next, "linked free block");
  }

  fn remove<M: Segment>(
    &mut self,
    arena: &mut Arena<M>,
    at: usize,
  ) {
    let Link { prev, next } = arena.link(at);

    match prev {
      Some(prev) => arena.set_next_free(prev, next),
      None => self.head = next,
    }

    match next {
      Some(next) => arena.set_prev_free(next, prev),
      None => self.tail = prev,
    }

    tracing::trace!(at, ?prev, ?next, "unlinked free block");
  }

  fn tracked<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> Vec<usize> {
    self.walk(arena, Direction::Forward).collect()
  }

  fn check<M: Segment>(
    &self,
    arena: &Arena<M>,
  ) -> Result<(), Corruption> {
    let forward = self.forward_len(arena);
    let backward = self.backward_len(arena);

    if forward != backward {
      return Err(Corruption::AsymmetricFreeList { forward, backward });
    }

    Ok(())
  }
}
