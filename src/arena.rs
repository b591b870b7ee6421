use crate::{
  block::{BlockLayout, HeapPtr, Link},
  header::Header,
  segment::Segment,
};

/// The claimed prefix of a segment and the block metadata written into it.
///
/// Offsets are relative to the segment start. Every block lies in
/// `[0, used)`; `used` only grows, and only by extending at the top.
pub struct Arena<M> {
  segment: M,
  layout: BlockLayout,
  used: usize,
}

impl<M: Segment> Arena<M> {
  pub fn new(
    segment: M,
    layout: BlockLayout,
  ) -> Self {
    Self {
      segment,
      layout,
      used: 0,
    }
  }

  pub fn layout(&self) -> BlockLayout {
    self.layout
  }

  pub fn capacity(&self) -> usize {
    self.segment.len()
  }

  pub fn used(&self) -> usize {
    self.used
  }

  pub fn reset(&mut self) {
    self.used = 0;
  }

  /// Claims `bytes` more at the top, returning where they start.
  pub fn extend(
    &mut self,
    bytes: usize,
  ) -> usize {
    let top = self.used;
    self.used += bytes;
    debug_assert!(self.used <= self.capacity(), "arena overrun");
    top
  }

  pub fn bytes(&self) -> &[u8] {
    self.segment.bytes()
  }

  pub fn bytes_mut(&mut self) -> &mut [u8] {
    self.segment.bytes_mut()
  }

  pub fn into_segment(self) -> M {
    self.segment
  }

  pub fn header(
    &self,
    at: usize,
  ) -> Header {
    let mut word = [0u8; Header::BYTES];
    word.copy_from_slice(&self.bytes()[at..at + Header::BYTES]);
    Header::from_bytes(word)
  }

  /// Like [`header`](Self::header), but `None` instead of a bounds panic.
  pub fn try_header(
    &self,
    at: usize,
  ) -> Option<Header> {
    let end = at.checked_add(Header::BYTES)?;
    let word = self.bytes().get(at..end)?;
    word.try_into().ok().map(Header::from_bytes)
  }

  pub fn set_header(
    &mut self,
    at: usize,
    header: Header,
  ) {
    self.bytes_mut()[at..at + Header::BYTES].copy_from_slice(&header.to_bytes());
  }

  pub fn link(
    &self,
    at: usize,
  ) -> Link {
    let start = self.layout.link_of(at);
    let mut raw = [0u8; Link::BYTES];
    raw.copy_from_slice(&self.bytes()[start..start + Link::BYTES]);
    Link::from_bytes(raw)
  }

  pub fn try_link(
    &self,
    at: usize,
  ) -> Option<Link> {
    let start = at.checked_add(Header::BYTES)?;
    let end = start.checked_add(Link::BYTES)?;
    let raw = self.bytes().get(start..end)?;
    raw.try_into().ok().map(Link::from_bytes)
  }

  pub fn set_link(
    &mut self,
    at: usize,
    link: Link,
  ) {
    let start = self.layout.link_of(at);
    self.bytes_mut()[start..start + Link::BYTES].copy_from_slice(&link.to_bytes());
  }

  pub fn set_next_free(
    &mut self,
    at: usize,
    next: Option<usize>,
  ) {
    let link = self.link(at);
    self.set_link(at, Link { next, ..link });
  }

  pub fn set_prev_free(
    &mut self,
    at: usize,
    prev: Option<usize>,
  ) {
    let link = self.link(at);
    self.set_link(at, Link { prev, ..link });
  }

  /// Header offset of the block physically after the one at `at`.
  pub fn next_block(
    &self,
    at: usize,
  ) -> usize {
    self.layout.next_of(at, self.header(at).payload_size())
  }

  /// Whole size (overhead plus payload) of the block at `at` if it lies
  /// inside the claimed prefix and is free.
  pub fn free_block_bytes(
    &self,
    at: usize,
  ) -> Option<usize> {
    if at >= self.used {
      return None;
    }

    let header = self.header(at);

    (!header.is_used()).then(|| self.layout.overhead_bytes() + header.payload_size())
  }

  pub fn payload_ptr(
    &self,
    header_at: usize,
  ) -> HeapPtr {
    HeapPtr::of_block(self.layout, header_at)
  }

  /// Maps a client pointer back to its block header, refusing offsets that
  /// cannot name a block inside the claimed prefix.
  ///
  /// The header found there must also describe a block that ends inside
  /// the prefix, which turns away most pointers into the middle of a
  /// payload.
  pub fn resolve(
    &self,
    ptr: HeapPtr,
  ) -> Option<usize> {
    let payload_at = ptr.offset();
    let overhead = self.layout.overhead_bytes();

    if payload_at < overhead
      || payload_at >= self.used
      || payload_at % crate::align::ALIGNMENT != 0
    {
      return None;
    }

    let header_at = self.layout.header_of(payload_at);
    let end = payload_at.checked_add(self.try_header(header_at)?.payload_size())?;

    (end <= self.used).then_some(header_at)
  }

  pub fn payload(
    &self,
    header_at: usize,
  ) -> &[u8] {
    let start = self.layout.payload_of(header_at);
    let size = self.header(header_at).payload_size();
    &self.bytes()[start..start + size]
  }

  pub fn payload_mut(
    &mut self,
    header_at: usize,
  ) -> &mut [u8] {
    let start = self.layout.payload_of(header_at);
    let size = self.header(header_at).payload_size();
    &mut self.bytes_mut()[start..start + size]
  }

  /// Walks the implicit chain from the start of the arena.
  pub fn blocks(&self) -> Blocks<'_, M> {
    Blocks { arena: self, at: 0 }
  }
}

/// Iterator over `(header offset, header)` pairs along the implicit chain.
///
/// Stops at the top of the arena, or early if a header would be read out
/// of bounds.
pub struct Blocks<'a, M> {
  arena: &'a Arena<M>,
  at: usize,
}

impl<M: Segment> Iterator for Blocks<'_, M> {
  type Item = (usize, Header);

  fn next(&mut self) -> Option<Self::Item> {
    if self.at >= self.arena.used {
      return None;
    }

    let at = self.at;
    let header = self.arena.try_header(at)?;

    self.at = self
      .arena
      .layout
      .payload_of(at)
      .saturating_add(header.payload_size());

    Some((at, header))
  }
}
