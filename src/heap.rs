use crate::{
  arena::Arena,
  block::{HeapPtr, Link},
  config::Config,
  error::InitError,
  free_list::Explicit,
  header::Header,
  implicit::Implicit,
  request::{Rejection, Request},
  scheme::Scheme,
  segment::Segment,
};

/// A heap over one caller-supplied segment.
///
/// `S` picks how free space is tracked and found, `M` is the backing
/// region. All state lives in this value; independent heaps never share
/// anything.
pub struct Heap<S, M> {
  pub(crate) arena: Arena<M>,
  pub(crate) scheme: S,
  config: Config,
}

/// Heap that finds free blocks by walking every block.
pub type ImplicitHeap<M = Vec<u8>> = Heap<Implicit, M>;

/// Heap that threads free blocks on an address-ordered list.
pub type ExplicitHeap<M = Vec<u8>> = Heap<Explicit, M>;

/// One block along the chain, as seen by diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub header_at: usize,
  pub payload: HeapPtr,
  pub payload_size: usize,
  pub used: bool,
}

impl<S: Scheme, M: Segment> Heap<S, M> {
  /// Lays an empty heap over `segment`.
  pub fn init(segment: M) -> Result<Self, InitError> {
    Self::with_config(segment, Config::default())
  }

  pub fn with_config(
    segment: M,
    config: Config,
  ) -> Result<Self, InitError> {
    if segment.is_empty() {
      return Err(InitError::EmptyRegion);
    }

    tracing::debug!(
      scheme = S::NAME,
      capacity = segment.len(),
      max_request_size = config.max_request_size,
      "heap initialised"
    );

    Ok(Self {
      arena: Arena::new(segment, S::LAYOUT),
      scheme: S::default(),
      config,
    })
  }

  /// Forgets every block; the whole segment is available again.
  pub fn reset(&mut self) {
    self.arena.reset();
    self.scheme.reset();
    tracing::debug!(scheme = S::NAME, "heap reset");
  }

  pub fn config(&self) -> Config {
    self.config
  }

  pub fn capacity(&self) -> usize {
    self.arena.capacity()
  }

  /// High-water mark of claimed bytes. Never decreases until a reset.
  pub fn used(&self) -> usize {
    self.arena.used()
  }

  pub fn into_segment(self) -> M {
    self.arena.into_segment()
  }

  /// Returns a block with at least `size` payload bytes, or `None` when
  /// `size` is zero, above the configured ceiling, or a fresh block of that
  /// size would not fit above the current high-water mark.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<HeapPtr> {
    let request = self.request(size)?;

    let at = match self.scheme.locate(&self.arena, request.payload_bytes) {
      Some(at) => {
        let available = self.arena.header(at).payload_size();
        tracing::trace!(at, available, ?request, "reusing free block");
        self.place(at, available, request);
        at
      }
      None => self.extend(request),
    };

    Some(self.arena.payload_ptr(at))
  }

  /// Releases the block owning `ptr`. `None` is a no-op.
  pub fn free(
    &mut self,
    ptr: impl Into<Option<HeapPtr>>,
  ) {
    let Some(ptr) = ptr.into() else {
      return;
    };

    let Some(at) = self.arena.resolve(ptr) else {
      tracing::warn!(?ptr, used = self.arena.used(), "free of a pointer that names no block");
      return;
    };

    let header = self.arena.header(at);
    if !header.is_used() {
      tracing::warn!(?ptr, "free of a block that is already free");
    }

    self.release(at, header.payload_size());
  }

  /// Resizes the block owning `ptr` to hold at least `size` bytes.
  ///
  /// Shrinking always keeps the block as is. Growing first tries to absorb
  /// free blocks directly to the right (for coalescing schemes) and only
  /// then moves the contents to a new block. On failure `None` is returned
  /// and the old block is left untouched. A `None` pointer allocates.
  pub fn reallocate(
    &mut self,
    ptr: impl Into<Option<HeapPtr>>,
    size: usize,
  ) -> Option<HeapPtr> {
    let Some(ptr) = ptr.into() else {
      return self.allocate(size);
    };

    let Some(at) = self.arena.resolve(ptr) else {
      tracing::warn!(
        ?ptr,
        used = self.arena.used(),
        "reallocate of a pointer that names no block"
      );
      return None;
    };

    let old_size = self.arena.header(at).payload_size();
    if size <= old_size {
      return Some(ptr);
    }

    let request = self.request(size)?;

    if S::COALESCES {
      if let Some(super_block_bytes) = self.growth_extent(at, old_size, request.block_bytes) {
        self.grow_in_place(at, old_size, super_block_bytes, request);
        return Some(ptr);
      }
    }

    let moved = self.allocate(size)?;
    tracing::debug!(from = ?ptr, to = ?moved, old_size, size, "relocating block");

    let from = self.arena.layout().payload_of(at);
    let to = moved.offset();
    let count = old_size.min(size);
    self.arena.bytes_mut().copy_within(from..from + count, to);

    self.free(ptr);

    Some(moved)
  }

  /// Client bytes of a live block.
  pub fn payload(
    &self,
    ptr: HeapPtr,
  ) -> Option<&[u8]> {
    let at = self.arena.resolve(ptr)?;
    Some(self.arena.payload(at))
  }

  pub fn payload_mut(
    &mut self,
    ptr: HeapPtr,
  ) -> Option<&mut [u8]> {
    let at = self.arena.resolve(ptr)?;
    Some(self.arena.payload_mut(at))
  }

  /// Every block from the start of the segment up to the high-water mark.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    let layout = self.arena.layout();

    self.arena.blocks().map(move |(at, header)| BlockInfo {
      header_at: at,
      payload: HeapPtr::of_block(layout, at),
      payload_size: header.payload_size(),
      used: header.is_used(),
    })
  }

  /// Number of entries on the scheme's free-block index.
  pub fn free_list_len(&self) -> usize {
    self.scheme.tracked(&self.arena).len()
  }

  /// The whole segment, including bytes above the high-water mark.
  pub fn raw_bytes(&self) -> &[u8] {
    self.arena.bytes()
  }

  /// Unchecked write access to the segment, block metadata included.
  /// Writing through it can corrupt the heap; meant for diagnostics.
  pub fn raw_bytes_mut(&mut self) -> &mut [u8] {
    self.arena.bytes_mut()
  }

  fn request(
    &self,
    size: usize,
  ) -> Option<Request> {
    let result = Request::validate(
      S::LAYOUT,
      size,
      self.config.max_request_size,
      self.arena.used(),
      self.arena.capacity(),
    );

    match result {
      Ok(request) => Some(request),
      Err(Rejection::Zero) => None,
      Err(rejection) => {
        tracing::debug!(size, %rejection, "request rejected");
        None
      }
    }
  }

  /// Writes a fresh used block at the top of the arena.
  fn extend(
    &mut self,
    request: Request,
  ) -> usize {
    let at = self.arena.extend(request.block_bytes);

    self.arena.set_header(at, Header::used(request.payload_bytes));
    if S::LAYOUT.has_link() {
      self.arena.set_link(at, Link::new(None, None));
    }

    tracing::trace!(at, used = self.arena.used(), "extended arena");
    at
  }

  /// Turns the block at `at`, currently spanning `available` payload bytes,
  /// into a used block for `request`.
  ///
  /// When the slack can hold a minimum block of its own it is split off and
  /// released; otherwise the client gets all of `available`.
  fn place(
    &mut self,
    at: usize,
    available: usize,
    request: Request,
  ) {
    // A reused block keeps its free-list entry; see `HeapReport::stale_entries`.
    if available >= request.block_bytes + S::LAYOUT.min_block_bytes() {
      self.arena.set_header(at, Header::used(request.payload_bytes));

      let split_at = at + request.block_bytes;
      let split_payload = available - request.block_bytes;
      tracing::trace!(at, split_at, split_payload, "splitting block");

      self.release(split_at, split_payload);
    } else {
      self.arena.set_header(at, Header::used(available));
    }
  }

  /// Marks the block at `at` free and hands it to the scheme, absorbing a
  /// free right neighbour first when the scheme coalesces.
  fn release(
    &mut self,
    at: usize,
    payload_size: usize,
  ) {
    let next = S::LAYOUT.next_of(at, payload_size);
    let eatable = if S::COALESCES {
      self.arena.free_block_bytes(next)
    } else {
      None
    };

    match eatable {
      Some(eaten) => {
        tracing::trace!(at, next, eaten, "coalescing right neighbour");
        self.arena.set_header(at, Header::free(payload_size + eaten));
        self.scheme.insert(&mut self.arena, at);
        self.scheme.remove(&mut self.arena, next);
      }
      None => {
        self.arena.set_header(at, Header::free(payload_size));
        self.scheme.insert(&mut self.arena, at);
      }
    }
  }

  /// Total bytes of the block at `at` plus the run of free blocks directly
  /// after it, stopping as soon as `target` bytes are covered. `None` when
  /// the run ends short of `target`.
  fn growth_extent(
    &self,
    at: usize,
    payload_size: usize,
    target: usize,
  ) -> Option<usize> {
    let mut super_block_bytes = S::LAYOUT.overhead_bytes() + payload_size;

    while super_block_bytes < target {
      let neighbour = at + super_block_bytes;

      match self.arena.free_block_bytes(neighbour) {
        Some(bytes) => super_block_bytes += bytes,
        None => return None,
      }
    }

    Some(super_block_bytes)
  }

  /// Absorbs the free run measured by [`growth_extent`](Self::growth_extent)
  /// into the block at `at`.
  fn grow_in_place(
    &mut self,
    at: usize,
    payload_size: usize,
    super_block_bytes: usize,
    request: Request,
  ) {
    let end = at + super_block_bytes;
    let mut absorbed = S::LAYOUT.next_of(at, payload_size);

    while absorbed < end {
      let next = self.arena.next_block(absorbed);
      self.scheme.remove(&mut self.arena, absorbed);
      absorbed = next;
    }

    tracing::trace!(at, super_block_bytes, "growing in place");

    let available = super_block_bytes - S::LAYOUT.overhead_bytes();
    self.place(at, available, request);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn explicit(capacity: usize) -> ExplicitHeap {
    ExplicitHeap::init(vec![0u8; capacity]).unwrap()
  }

  fn implicit(capacity: usize) -> ImplicitHeap {
    ImplicitHeap::init(vec![0u8; capacity]).unwrap()
  }

  fn shape<S: Scheme, M: Segment>(heap: &Heap<S, M>) -> Vec<(usize, bool)> {
    heap.blocks().map(|b| (b.payload_size, b.used)).collect()
  }

  #[test]
  fn test_init_rejects_empty_region() {
    assert!(matches!(
      ExplicitHeap::init(Vec::new()),
      Err(InitError::EmptyRegion)
    ));
  }

  #[test]
  fn test_zero_request() {
    let mut heap = explicit(256);

    assert_eq!(heap.allocate(0), None);
    assert_eq!(heap.used(), 0);
  }

  #[test]
  fn test_extension_layout() {
    let mut heap = implicit(256);

    let first = heap.allocate(1).unwrap();
    let second = heap.allocate(13).unwrap();

    assert_eq!(first.offset(), 8);
    assert_eq!(second.offset(), 24);
    assert_eq!(heap.used(), 40);
    assert_eq!(shape(&heap), vec![(8, true), (16, true)]);
  }

  #[test]
  fn test_payload_is_writable() {
    let mut heap = explicit(256);
    let ptr = heap.allocate(16).unwrap();

    heap.payload_mut(ptr).unwrap().copy_from_slice(&[7u8; 16]);

    assert_eq!(heap.payload(ptr).unwrap(), &[7u8; 16]);
  }

  #[test]
  fn test_split_on_reuse() {
    let mut heap = explicit(512);

    let big = heap.allocate(200).unwrap();
    let _guard = heap.allocate(8).unwrap();
    heap.free(big);

    let small = heap.allocate(16).unwrap();

    assert_eq!(small, big);
    // 200 payload = 40 used block + 160 payload remainder after its own header.
    assert_eq!(shape(&heap), vec![(16, true), (160, false), (8, true)]);
    // The reused block stays listed ahead of its split-off remainder.
    assert_eq!(heap.scheme.tracked(&heap.arena), vec![0, 40]);

    let report = heap.report();
    assert_eq!(report.tracked, 2);
    assert_eq!(report.stale_entries, 1);
    assert!(heap.validate());
  }

  #[test]
  fn test_consume_whole_block_without_slack() {
    let mut heap = explicit(512);

    let block = heap.allocate(40).unwrap();
    let _guard = heap.allocate(8).unwrap();
    heap.free(block);

    let reused = heap.allocate(16).unwrap();

    assert_eq!(reused, block);
    assert_eq!(heap.payload(reused).unwrap().len(), 40);
  }

  #[test]
  fn test_implicit_free_does_not_merge() {
    let mut heap = implicit(256);

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    heap.free(b);
    heap.free(a);

    assert_eq!(shape(&heap), vec![(8, false), (8, false)]);
  }

  #[test]
  fn test_explicit_free_merges_right() {
    let mut heap = explicit(256);

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    heap.free(b);
    heap.free(a);

    assert_eq!(shape(&heap), vec![(40, false)]);
    assert_eq!(heap.free_list_len(), 1);
  }

  #[test]
  fn test_free_ignores_foreign_pointer() {
    let mut heap = explicit(256);
    heap.allocate(8).unwrap();

    heap.free(HeapPtr::new(200));
    heap.free(None);

    assert_eq!(shape(&heap), vec![(8, true)]);
  }

  #[test]
  fn test_reallocate_moves_contents() {
    let mut heap = implicit(512);

    let a = heap.allocate(8).unwrap();
    heap.payload_mut(a).unwrap().copy_from_slice(b"abcdefgh");
    let _guard = heap.allocate(8).unwrap();

    let b = heap.reallocate(a, 64).unwrap();

    assert_ne!(a, b);
    assert_eq!(&heap.payload(b).unwrap()[..8], b"abcdefgh");
    assert_eq!(shape(&heap), vec![(8, false), (8, true), (64, true)]);
  }

  #[test]
  fn test_reallocate_null_allocates() {
    let mut heap = explicit(256);

    let ptr = heap.reallocate(None, 8).unwrap();

    assert_eq!(ptr.offset(), 24);
  }

  #[test]
  fn test_grow_in_place_splits_surplus() {
    let mut heap = explicit(1024);

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(200).unwrap();
    let _guard = heap.allocate(8).unwrap();
    heap.free(b);

    let grown = heap.reallocate(a, 40).unwrap();

    assert_eq!(grown, a);
    // super block: 32 + 224 = 256; used part 64, remainder 192 = 24 + 168
    assert_eq!(shape(&heap), vec![(40, true), (168, false), (8, true)]);
    assert!(heap.validate());
  }

  #[test]
  fn test_grow_in_place_spans_several_blocks() {
    let mut heap = explicit(1024);

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    let c = heap.allocate(8).unwrap();
    let _guard = heap.allocate(8).unwrap();
    heap.free(c);
    heap.free(b);
    let used = heap.used();

    // b absorbed c when it was released; growing a swallows that run whole.
    let grown = heap.reallocate(a, 64).unwrap();

    assert_eq!(grown, a);
    assert_eq!(heap.used(), used);
    assert_eq!(shape(&heap), vec![(72, true), (8, true)]);
    assert_eq!(heap.free_list_len(), 0);
  }

  #[test]
  fn test_grow_in_place_walks_separate_blocks() {
    let mut heap = explicit(1024);

    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    let c = heap.allocate(8).unwrap();
    let d = heap.allocate(8).unwrap();
    let _guard = heap.allocate(8).unwrap();
    heap.free(b);
    heap.free(c);
    heap.free(d);
    let used = heap.used();
    assert_eq!(
      shape(&heap),
      vec![(8, true), (8, false), (8, false), (8, false), (8, true)]
    );

    // 88 bytes are needed; a, b and c cover 96, so d is left alone.
    let grown = heap.reallocate(a, 60).unwrap();

    assert_eq!(grown, a);
    assert_eq!(heap.used(), used);
    assert_eq!(shape(&heap), vec![(72, true), (8, false), (8, true)]);
    assert_eq!(heap.free_list_len(), 1);
    assert!(heap.validate());
  }

  #[test]
  fn test_free_ignores_pointer_into_payload() {
    let mut heap = implicit(256);

    let a = heap.allocate(64).unwrap();
    let _guard = heap.allocate(8).unwrap();
    let fake = Header::used(1000).to_bytes();
    heap.payload_mut(a).unwrap()[..8].copy_from_slice(&fake);

    heap.free(HeapPtr::new(a.offset() + 8));

    assert_eq!(&heap.payload(a).unwrap()[..8], &fake);
    assert_eq!(shape(&heap), vec![(64, true), (8, true)]);
  }

  #[test]
  fn test_grow_falls_back_when_neighbour_used() {
    let mut heap = explicit(1024);

    let a = heap.allocate(8).unwrap();
    let _b = heap.allocate(8).unwrap();

    let moved = heap.reallocate(a, 64).unwrap();

    assert_ne!(moved, a);
    assert_eq!(shape(&heap), vec![(8, false), (8, true), (64, true)]);
  }

  #[test]
  fn test_reallocate_rejected_keeps_block() {
    let mut heap = explicit(64);

    let a = heap.allocate(8).unwrap();

    assert_eq!(heap.reallocate(a, 64), None);
    assert_eq!(shape(&heap), vec![(8, true)]);
  }

  #[test]
  fn test_reset_forgets_blocks() {
    let mut heap = explicit(256);

    let a = heap.allocate(8).unwrap();
    heap.allocate(8).unwrap();
    heap.free(a);
    heap.reset();

    assert_eq!(heap.used(), 0);
    assert_eq!(heap.free_list_len(), 0);
    assert_eq!(heap.allocate(8), Some(a));
  }

  #[test]
  fn test_config_ceiling() {
    let config = Config::new().with_max_request_size(64);
    let mut heap = ExplicitHeap::with_config(vec![0u8; 1024], config).unwrap();

    assert!(heap.allocate(64).is_some());
    assert_eq!(heap.allocate(65), None);
  }
}
