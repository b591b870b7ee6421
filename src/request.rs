use thiserror::Error;

use crate::{align::checked_align, block::BlockLayout};

/// Why a request was turned down before any block was touched.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Rejection {
  #[error("zero-byte request")]
  Zero,

  #[error("request of {requested} bytes exceeds the {max} byte ceiling")]
  TooLarge { requested: usize, max: usize },

  #[error("block of {block_bytes} bytes does not fit: {used} of {capacity} bytes used")]
  Exhausted {
    block_bytes: usize,
    used: usize,
    capacity: usize,
  },
}

/// A validated request: the whole padded block and the payload inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
  pub block_bytes: usize,
  pub payload_bytes: usize,
}

impl Request {
  /// Pads `requested` into an aligned block for `layout`.
  ///
  /// The headroom check always prices a fresh block at the top of the
  /// arena, even when a free block could later be reused instead.
  pub fn validate(
    layout: BlockLayout,
    requested: usize,
    max_request_size: usize,
    used: usize,
    capacity: usize,
  ) -> Result<Self, Rejection> {
    if requested == 0 {
      return Err(Rejection::Zero);
    }

    if requested > max_request_size {
      return Err(Rejection::TooLarge {
        requested,
        max: max_request_size,
      });
    }

    let exhausted = |block_bytes| Rejection::Exhausted {
      block_bytes,
      used,
      capacity,
    };

    let block_bytes = layout
      .overhead_bytes()
      .checked_add(requested)
      .and_then(checked_align)
      .ok_or(exhausted(usize::MAX))?;

    match block_bytes.checked_add(used) {
      Some(top) if top <= capacity => Ok(Self {
        block_bytes,
        payload_bytes: block_bytes - layout.overhead_bytes(),
      }),
      _ => Err(exhausted(block_bytes)),
    }
  }
}
