use std::num::NonZeroUsize;

use crate::header::Header;

/// Bytes a client is always given at least, whatever the request.
pub const MIN_PAYLOAD_BYTES: usize = 8;

/// Offsets of the pieces of a block relative to its header.
///
/// ```text
///   implicit:  ┌────────┬──────────────────────┐
///              │ header │       payload        │
///              └────────┴──────────────────────┘
///   explicit:  ┌────────┬───────────┬──────────────────────┐
///              │ header │ prev next │       payload        │
///              └────────┴───────────┴──────────────────────┘
///              0        8           24
/// ```
///
/// The link slot is reserved in every explicit block, used or free, so the
/// chain can be walked without knowing which blocks are on the free list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
  link_bytes: usize,
}

impl BlockLayout {
  pub const IMPLICIT: Self = Self { link_bytes: 0 };
  pub const EXPLICIT: Self = Self {
    link_bytes: Link::BYTES,
  };

  pub const fn has_link(&self) -> bool {
    self.link_bytes != 0
  }

  pub const fn overhead_bytes(&self) -> usize {
    Header::BYTES + self.link_bytes
  }

  pub const fn min_block_bytes(&self) -> usize {
    self.overhead_bytes() + MIN_PAYLOAD_BYTES
  }

  pub const fn payload_of(
    &self,
    header_at: usize,
  ) -> usize {
    header_at + self.overhead_bytes()
  }

  pub const fn header_of(
    &self,
    payload_at: usize,
  ) -> usize {
    payload_at - self.overhead_bytes()
  }

  pub const fn link_of(
    &self,
    header_at: usize,
  ) -> usize {
    header_at + Header::BYTES
  }

  /// Header offset of the block that physically follows one of
  /// `payload_size` bytes at `header_at`.
  pub const fn next_of(
    &self,
    header_at: usize,
    payload_size: usize,
  ) -> usize {
    self.payload_of(header_at) + payload_size
  }
}

/// The free-list pointers stored after the header of an explicit block.
///
/// Neighbours are arena offsets; an all-ones word encodes "none".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Link {
  pub prev: Option<usize>,
  pub next: Option<usize>,
}

impl Link {
  pub const BYTES: usize = 16;

  const NIL: u64 = u64::MAX;

  pub fn new(
    prev: Option<usize>,
    next: Option<usize>,
  ) -> Self {
    Self { prev, next }
  }

  pub fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
    let (prev, next) = bytes.split_at(Self::BYTES / 2);

    Self {
      prev: Self::decode_word(prev),
      next: Self::decode_word(next),
    }
  }

  pub fn to_bytes(self) -> [u8; Self::BYTES] {
    let mut bytes = [0u8; Self::BYTES];
    let (prev, next) = bytes.split_at_mut(Self::BYTES / 2);

    prev.copy_from_slice(&Self::encode_word(self.prev));
    next.copy_from_slice(&Self::encode_word(self.next));

    bytes
  }

  fn encode_word(offset: Option<usize>) -> [u8; 8] {
    offset.map_or(Self::NIL, |at| at as u64).to_ne_bytes()
  }

  fn decode_word(word: &[u8]) -> Option<usize> {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(word);

    match u64::from_ne_bytes(raw) {
      Self::NIL => None,
      at => Some(at as usize),
    }
  }
}

/// A client handle: the offset of a payload inside the heap's region.
///
/// Payloads always sit after at least one header, so the offset is never
/// zero and `Option<HeapPtr>` stands in for a nullable pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapPtr(NonZeroUsize);

impl HeapPtr {
  pub fn new(offset: usize) -> Option<Self> {
    NonZeroUsize::new(offset).map(Self)
  }

  /// Payload of the block whose header sits at `header_at`.
  pub(crate) fn of_block(
    layout: BlockLayout,
    header_at: usize,
  ) -> Self {
    Self(NonZeroUsize::MIN.saturating_add(layout.payload_of(header_at) - 1))
  }

  pub fn offset(self) -> usize {
    self.0.get()
  }
}
