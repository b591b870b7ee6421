use std::fmt;

use crate::align::ALIGNMENT;

/// The fixed-width word at the start of every block.
///
/// ```text
///   63                                        3   2   1   0
///   ┌──────────────────────────────────────────┬───┬───┬───┐
///   │            payload size                  │ - │ - │ U │
///   └──────────────────────────────────────────┴───┴───┴───┘
///                                                          └── used flag
/// ```
///
/// The payload size is always a multiple of [`ALIGNMENT`], so the low bits
/// never carry size information.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header(u64);

impl Header {
  /// Width of the encoded word in the arena.
  pub const BYTES: usize = 8;

  const USED_MASK: u64 = 0b001;
  const FLAGS_MASK: u64 = 0b111;

  /// Encodes a header. `payload_size` must already be aligned.
  pub fn new(
    payload_size: usize,
    used: bool,
  ) -> Self {
    debug_assert_eq!(payload_size % ALIGNMENT, 0, "unaligned payload size");

    let encoding = payload_size as u64 & !Self::FLAGS_MASK;

    if used {
      Self(encoding | Self::USED_MASK)
    } else {
      Self(encoding)
    }
  }

  pub fn used(payload_size: usize) -> Self {
    Self::new(payload_size, true)
  }

  pub fn free(payload_size: usize) -> Self {
    Self::new(payload_size, false)
  }

  pub fn payload_size(self) -> usize {
    (self.0 & !Self::FLAGS_MASK) as usize
  }

  pub fn is_used(self) -> bool {
    self.0 & Self::USED_MASK != 0
  }

  /// The raw word, flags included.
  pub fn encoding(self) -> u64 {
    self.0
  }

  pub fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
    Self(u64::from_ne_bytes(bytes))
  }

  pub fn to_bytes(self) -> [u8; Self::BYTES] {
    self.0.to_ne_bytes()
  }
}

impl fmt::Debug for Header {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Header")
      .field("payload_size", &self.payload_size())
      .field("used", &self.is_used())
      .finish()
  }
}
