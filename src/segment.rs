//! Backing regions a heap can be laid over.
//!
//! The heap never acquires or releases memory itself; whoever builds the
//! [`Segment`] owns that concern. Two ready-made sources are provided besides
//! plain byte buffers: a caller-supplied raw region and an anonymous mapping
//! obtained from the operating system.

use std::{io, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::error::InitError;

/// A contiguous, fixed-size byte region.
pub trait Segment {
  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  fn len(&self) -> usize {
    self.bytes().len()
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Segment for Vec<u8> {
  fn bytes(&self) -> &[u8] {
    self
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    self
  }
}

impl Segment for Box<[u8]> {
  fn bytes(&self) -> &[u8] {
    self
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    self
  }
}

impl Segment for &mut [u8] {
  fn bytes(&self) -> &[u8] {
    self
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    self
  }
}

/// A region handed over as a start address and a length.
pub struct RawSegment {
  start: NonNull<u8>,
  len: usize,
}

impl RawSegment {
  /// Wraps `len` bytes starting at `start`.
  ///
  /// # Safety
  ///
  /// `start` must be valid for reads and writes of `len` bytes for as long
  /// as the segment lives, and nothing else may access that memory
  /// meanwhile.
  pub unsafe fn new(
    start: *mut u8,
    len: usize,
  ) -> Result<Self, InitError> {
    let start = NonNull::new(start).ok_or(InitError::NullRegion)?;

    Ok(Self { start, len })
  }

  pub fn start(&self) -> *mut u8 {
    self.start.as_ptr()
  }
}

impl Segment for RawSegment {
  fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.start.as_ptr(), self.len) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
  }
}

/// A private anonymous mapping, unmapped on drop.
pub struct MappedSegment {
  start: NonNull<u8>,
  len: usize,
}

impl MappedSegment {
  pub fn new(len: usize) -> Result<Self, InitError> {
    if len == 0 {
      return Err(InitError::EmptyRegion);
    }

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(InitError::Map {
        size: len,
        source: io::Error::last_os_error(),
      });
    }

    let start = NonNull::new(address as *mut u8).ok_or(InitError::NullRegion)?;

    tracing::debug!(?address, len, "mapped segment");

    Ok(Self { start, len })
  }

  pub fn start(&self) -> *mut u8 {
    self.start.as_ptr()
  }
}

impl Segment for MappedSegment {
  fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.start.as_ptr(), self.len) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.start.as_ptr(), self.len) }
  }
}

impl Drop for MappedSegment {
  fn drop(&mut self) {
    let result = unsafe { munmap(self.start.as_ptr() as *mut c_void, self.len) };

    if result != 0 {
      tracing::warn!(
        error = %io::Error::last_os_error(),
        len = self.len,
        "failed to unmap segment"
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_vec_segment() {
    let mut segment = vec![0u8; 64];

    segment.bytes_mut()[3] = 7;

    assert_eq!(Segment::len(&segment), 64);
    assert_eq!(segment.bytes()[3], 7);
  }

  #[test]
  fn test_raw_segment_rejects_null() {
    let result = unsafe { RawSegment::new(std::ptr::null_mut(), 64) };

    assert!(matches!(result, Err(InitError::NullRegion)));
  }

  #[test]
  fn test_raw_segment_views_buffer() {
    let mut buffer = [0u8; 32];
    let mut segment = unsafe { RawSegment::new(buffer.as_mut_ptr(), buffer.len()).unwrap() };

    segment.bytes_mut()[31] = 0xAB;

    assert_eq!(segment.bytes()[31], 0xAB);
    assert_eq!(segment.start(), buffer.as_mut_ptr());
  }

  #[test]
  fn test_mapped_segment() {
    let mut segment = MappedSegment::new(4096).unwrap();

    assert_eq!(segment.len(), 4096);
    assert!(segment.bytes().iter().all(|&b| b == 0));

    segment.bytes_mut()[4095] = 1;
    assert_eq!(segment.bytes()[4095], 1);
    assert_eq!(segment.start() as usize % 4096, 0);
  }

  #[test]
  fn test_mapped_segment_rejects_empty() {
    assert!(matches!(MappedSegment::new(0), Err(InitError::EmptyRegion)));
  }
}
