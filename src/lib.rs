//! # vallocator - Virtual Memory Allocators
//!
//! This crate exposes the operating system's virtual memory paging calls as a
//! small set of page-granular primitives, and builds two allocators on top of
//! them.
//!
//! ## Overview
//!
//! Virtual memory separates *claiming address space* from *backing it with
//! storage*:
//!
//! ```text
//!   Page States:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        ADDRESS SPACE                                 │
//!   │                                                                      │
//!   │   ┌──────────────┬────────────────────────────┬──────────────────┐   │
//!   │   │  Unreserved  │         Reserved           │    Committed     │   │
//!   │   │              │  claimed, not accessible   │  readable and    │   │
//!   │   │              │  costs no storage          │  writable        │   │
//!   │   └──────────────┴────────────────────────────┴──────────────────┘   │
//!   │                                                                      │
//!   │   reserve:  Unreserved -> Reserved                                   │
//!   │   commit:   Reserved   -> Committed                                  │
//!   │   decommit: Committed  -> Reserved                                   │
//!   │   release:  Reserved   -> Unreserved                                 │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   vallocator
//!   ├── page           - page_size, reserve, release, commit, decommit
//!   ├── align          - page rounding helpers
//!   ├── block          - MemoryBlock, a committed {memory, size} range
//!   ├── allocator      - RawAllocator and BlockAllocator traits
//!   ├── node           - VirtualMemoryAllocator (stateless, one reservation per node)
//!   ├── virtual_block  - VirtualBlockAllocator (one reservation, stack of blocks)
//!   ├── error          - Error, AllocatorInfo, out-of-memory handler
//!   ├── debug          - guard pages and fill patterns
//!   └── leak           - outstanding reservation accounting
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use vallocator::{VirtualBlockAllocator, VirtualMemoryAllocator, page_size};
//!
//! // One node, straight from the OS.
//! let mut nodes = VirtualMemoryAllocator::new();
//! let node = nodes.allocate_node(10_000, 8).unwrap();
//! unsafe {
//!   node.as_ptr().write(42);
//!   nodes.deallocate_node(node, 10_000, 8);
//! }
//!
//! // Four page-sized blocks out of one reservation.
//! let mut blocks = VirtualBlockAllocator::new(page_size(), 4).unwrap();
//! let block = blocks.allocate_block().unwrap();
//! assert_eq!(blocks.capacity_left(), 3);
//! unsafe { blocks.deallocate_block(block) };
//! ```
//!
//! ## Features
//!
//! - `debug-fence`: a never-committed guard page on each side of every node
//! - `debug-fill`: newly handed out memory is filled with `0xCD`
//! - `leak-check`: leak accounting in release builds too
//!
//! In debug builds every page primitive also checks that its range is in the
//! expected state, and leak accounting is always on.
//!
//! ## Limitations
//!
//! - **No synchronization**: an allocator must not be used from two threads at
//!   once; distinct allocators are independent
//! - **Stack order only**: blocks must be returned last-in, first-out
//! - **Page granularity**: every node occupies at least one page
//!
//! ## Safety
//!
//! Releasing or decommitting takes the caller's word that the range matches
//! an earlier reservation or commit, so those operations are `unsafe`.

pub mod align;
mod allocator;
mod block;
pub mod debug;
mod error;
pub mod leak;
mod node;
pub mod page;
mod virtual_block;

pub use allocator::{BlockAllocator, RawAllocator};
pub use block::MemoryBlock;
pub use error::{AllocatorInfo, Error, OutOfMemoryHandler, out_of_memory_handler, set_out_of_memory_handler};
pub use node::VirtualMemoryAllocator;
pub use page::{PageState, page_size};
pub use virtual_block::VirtualBlockAllocator;
