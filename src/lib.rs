//! # segalloc - A Heap Allocator over a Caller-Supplied Segment
//!
//! This crate implements the engine of a classic `malloc`/`free`/`realloc`
//! heap: block layout, header encoding, best-fit search, splitting,
//! coalescing and free-list bookkeeping, all inside one contiguous region
//! that somebody else acquired.
//!
//! ## Overview
//!
//! Every allocation is a *block*: a header followed by the client payload.
//! Blocks tile the claimed prefix of the segment without gaps, so the whole
//! heap can be walked from its first byte by following sizes:
//!
//! ```text
//!   Segment:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌─────┬──────┬─────┬──────────┬─────┬────┐                           │
//!   │ │ hdr │  A1  │ hdr │  (free)  │ hdr │ A3 │      unclaimed            │
//!   │ └─────┴──────┴─────┴──────────┴─────┴────┘                           │
//!   │ ▲                                        ▲                         ▲ │
//!   │ │                                        │                         │ │
//!   │ start                                   used                 capacity│
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   `used` only moves right, when no free block can hold a request.
//! ```
//!
//! Two schemes share that layout:
//!
//! - [`Implicit`]: free blocks are found by scanning every block.
//! - [`Explicit`]: free blocks are also threaded on an address-ordered
//!   doubly linked list, searched on its own. Freed blocks absorb a free
//!   right neighbour and `reallocate` can grow a block in place.
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── header     - Header word codec
//!   ├── block      - Block layout, free-list links, client handles
//!   ├── request    - Request padding and admission
//!   ├── segment    - Backing regions (buffers, raw regions, mmap)
//!   ├── arena      - Claimed prefix of a segment
//!   ├── scheme     - Free-space strategy trait and best-fit policy
//!   ├── implicit   - Chain-scanning scheme
//!   ├── free_list  - Address-ordered free-list scheme
//!   ├── heap       - Allocation engine
//!   ├── validate   - Consistency checker
//!   └── dump       - Diagnostic views
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::ExplicitHeap;
//!
//! let mut heap = ExplicitHeap::init(vec![0u8; 4096]).unwrap();
//!
//! let ptr = heap.allocate(12).unwrap();
//! heap.payload_mut(ptr).unwrap()[..5].copy_from_slice(b"hello");
//!
//! let ptr = heap.reallocate(ptr, 200).unwrap();
//! assert_eq!(&heap.payload(ptr).unwrap()[..5], b"hello");
//!
//! heap.free(ptr);
//! assert!(heap.validate());
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap a heap in a lock to share it.
//! - **Monotonic high-water mark**: claimed bytes are never handed back.
//! - **Fixed alignment**: every payload is 8-byte aligned relative to the
//!   segment start.
//!
//! ## Safety
//!
//! Client handles are offsets, not pointers. A bad handle or a corrupted
//! header ends in a bounds-check panic or a failed [`Heap::validate`],
//! never in undefined behaviour. Only [`RawSegment`] needs `unsafe`.

pub mod align;
pub mod arena;
pub mod block;
pub mod config;
pub mod dump;
pub mod error;
pub mod free_list;
pub mod header;
pub mod heap;
pub mod implicit;
pub mod request;
pub mod scheme;
pub mod segment;
pub mod validate;

pub use block::HeapPtr;
pub use config::{Config, MAX_REQUEST_SIZE};
pub use dump::HeapReport;
pub use error::InitError;
pub use free_list::Explicit;
pub use heap::{BlockInfo, ExplicitHeap, Heap, ImplicitHeap};
pub use implicit::Implicit;
pub use scheme::Scheme;
pub use segment::{MappedSegment, RawSegment, Segment};
pub use validate::Corruption;
