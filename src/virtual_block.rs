use std::{mem, ptr, ptr::NonNull};

use crate::{
  allocator::BlockAllocator,
  block::MemoryBlock,
  debug,
  error::{self, AllocatorInfo, Error},
  leak,
  page::{self, page_size},
};

/// Reserves one region up front and commits it block by block.
///
/// ```text
///   base                    cur                                    end
///   ▼                       ▼                                      ▼
///   ┌───────────┬───────────┬───────────┬───────────┬──────────────┐
///   │ committed │ committed │ reserved  │ reserved  │   reserved   │
///   │  block 0  │  block 1  │           │           │              │
///   └───────────┴───────────┴───────────┴───────────┴──────────────┘
///                           ──▶ allocate_block commits here
///               ◀── deallocate_block decommits the top block
/// ```
///
/// Blocks are handed back in stack order, the way a memory arena releases
/// them. Moving the allocator never moves the region, so blocks stay valid
/// across [`take`](Self::take) and [`swap`](Self::swap).
#[derive(Debug)]
pub struct VirtualBlockAllocator {
  base: *mut u8,
  cur: *mut u8,
  end: *mut u8,
  block_size: usize,
}

// The allocator is the only owner of its region.
unsafe impl Send for VirtualBlockAllocator {}

impl VirtualBlockAllocator {
  /// Reserves room for `block_count` blocks of `block_size` bytes.
  ///
  /// `block_size` must be a non-zero multiple of the page size and
  /// `block_count` bigger than one.
  pub fn new(
    block_size: usize,
    block_count: usize,
  ) -> Result<Self, Error> {
    assert!(
      block_size != 0 && block_size % page_size() == 0,
      "block size {block_size} is not a non-zero multiple of the page size {}",
      page_size()
    );
    assert!(block_count > 1, "block count must be bigger than one, got {block_count}");

    let total_size = block_size.checked_mul(block_count);
    let base = total_size
      .and_then(|size| page::reserve(size / page_size()))
      .ok_or_else(|| error::out_of_memory(Self::info_at(ptr::null()), total_size.unwrap_or(usize::MAX)))?
      .as_ptr();

    let allocator = Self {
      base,
      cur: base,
      end: unsafe { base.add(block_size * block_count) },
      block_size,
    };

    leak::on_reserve(allocator.info(), base as usize);
    log::debug!("{}: reserved {block_count} blocks of {block_size} bytes", allocator.info());

    Ok(allocator)
  }

  /// An allocator owning nothing; what [`take`](Self::take) leaves behind.
  pub const fn empty() -> Self {
    Self {
      base: ptr::null_mut(),
      cur: ptr::null_mut(),
      end: ptr::null_mut(),
      block_size: 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.base.is_null()
  }

  /// Moves the reservation out, leaving `self` empty.
  pub fn take(&mut self) -> Self {
    mem::take(self)
  }

  /// Exchanges reservations; no block is invalidated.
  pub fn swap(
    &mut self,
    other: &mut Self,
  ) {
    mem::swap(&mut self.base, &mut other.base);
    mem::swap(&mut self.cur, &mut other.cur);
    mem::swap(&mut self.end, &mut other.end);
    mem::swap(&mut self.block_size, &mut other.block_size);
  }

  fn info_at(base: *const u8) -> AllocatorInfo {
    AllocatorInfo::new("vallocator::VirtualBlockAllocator", base as usize)
  }

  /// Identifies this allocator by the start of its reservation.
  pub fn info(&self) -> AllocatorInfo {
    Self::info_at(self.base)
  }

  fn pages_per_block(&self) -> usize {
    self.block_size / page_size()
  }

  /// Commits the next block.
  pub fn allocate_block(&mut self) -> Result<MemoryBlock, Error> {
    if self.capacity_left() == 0 {
      return Err(error::out_of_fixed_memory(self.info(), self.block_size));
    }

    let memory = unsafe { NonNull::new_unchecked(self.cur) };
    let committed = unsafe { page::commit(memory, self.pages_per_block()) };
    if committed.is_none() {
      return Err(error::out_of_memory(self.info(), self.block_size));
    }

    self.cur = unsafe { self.cur.add(self.block_size) };
    unsafe { debug::fill_new(memory.as_ptr(), self.block_size) };

    Ok(MemoryBlock::new(memory, self.block_size))
  }

  /// Decommits the top block; the next [`allocate_block`](Self::allocate_block)
  /// returns the same range again.
  ///
  /// # Safety
  ///
  /// `block` must be the most recently allocated block still outstanding.
  pub unsafe fn deallocate_block(
    &mut self,
    block: MemoryBlock,
  ) {
    debug_assert!(
      self.cur != self.base && block.size == self.block_size && block.end() == self.cur,
      "{}: {block:?} is not the top block",
      self.info()
    );

    unsafe {
      page::decommit(block.memory, self.pages_per_block());
      self.cur = self.cur.sub(self.block_size);
    }
  }

  pub fn next_block_size(&self) -> usize {
    self.block_size
  }

  /// How many more blocks can be committed.
  pub fn capacity_left(&self) -> usize {
    if self.is_empty() {
      return 0;
    }
    (self.end as usize - self.cur as usize) / self.block_size
  }

  /// How many blocks are currently committed.
  pub fn allocated_blocks(&self) -> usize {
    if self.is_empty() {
      return 0;
    }
    (self.cur as usize - self.base as usize) / self.block_size
  }
}

impl Default for VirtualBlockAllocator {
  fn default() -> Self {
    Self::empty()
  }
}

impl Drop for VirtualBlockAllocator {
  fn drop(&mut self) {
    let Some(base) = NonNull::new(self.base) else {
      return;
    };

    if self.cur != self.base {
      log::debug!("{}: dropped with {} blocks still committed", self.info(), self.allocated_blocks());
    }
    while self.cur != self.base {
      unsafe {
        self.cur = self.cur.sub(self.block_size);
        page::decommit(NonNull::new_unchecked(self.cur), self.pages_per_block());
      }
    }

    let pages = (self.end as usize - self.base as usize) / page_size();
    unsafe { page::release(base, pages) };
    leak::on_release(base.as_ptr() as usize);
  }
}

impl BlockAllocator for VirtualBlockAllocator {
  fn allocate_block(&mut self) -> Result<MemoryBlock, Error> {
    VirtualBlockAllocator::allocate_block(self)
  }

  unsafe fn deallocate_block(
    &mut self,
    block: MemoryBlock,
  ) {
    unsafe { VirtualBlockAllocator::deallocate_block(self, block) }
  }

  fn next_block_size(&self) -> usize {
    VirtualBlockAllocator::next_block_size(self)
  }
}
