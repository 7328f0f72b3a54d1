use std::ptr::NonNull;

use crate::{block::MemoryBlock, error::Error};

/// An allocator handing out individual nodes of a given size and alignment.
pub trait RawAllocator {
  /// Whether two instances may own different memory.
  const IS_STATEFUL: bool;

  /// Allocates a node of at least `size` bytes aligned to `alignment`.
  fn allocate_node(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<NonNull<u8>, Error>;

  /// # Safety
  ///
  /// `node`, `size` and `alignment` must match an earlier successful
  /// [`allocate_node`](RawAllocator::allocate_node) on this allocator.
  unsafe fn deallocate_node(
    &mut self,
    node: NonNull<u8>,
    size: usize,
    alignment: usize,
  );

  fn max_node_size(&self) -> usize;

  fn max_alignment(&self) -> usize;
}

/// An allocator feeding whole blocks to an arena, which returns them in
/// reverse order of allocation.
pub trait BlockAllocator {
  fn allocate_block(&mut self) -> Result<MemoryBlock, Error>;

  /// # Safety
  ///
  /// `block` must be the most recently allocated block not yet deallocated.
  unsafe fn deallocate_block(
    &mut self,
    block: MemoryBlock,
  );

  /// Size of the block the next [`allocate_block`](BlockAllocator::allocate_block) returns.
  fn next_block_size(&self) -> usize;
}
