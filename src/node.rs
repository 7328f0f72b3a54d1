use std::ptr::NonNull;

use crate::{
  align::{is_aligned, page_count},
  allocator::RawAllocator,
  debug::{self, FENCE_PAGES},
  error::{self, AllocatorInfo, Error},
  leak,
  page::{self, page_size},
};

/// Allocates every node directly from the operating system.
///
/// Each allocation reserves and commits its own pages, so nothing is shared
/// between nodes and the allocator itself holds no state.
///
/// ```text
///   FENCE_PAGES == 1:
///
///   ┌──────────┬─────────────────────────────────┬──────────┐
///   │  guard   │        committed node           │  guard   │
///   │ reserved │   page_count(size) pages        │ reserved │
///   └──────────┴─────────────────────────────────┴──────────┘
///   ▲          ▲
///   │          └── pointer returned to the caller
///   └── reservation base
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualMemoryAllocator;

impl VirtualMemoryAllocator {
  pub const fn new() -> Self {
    Self
  }

  pub fn info(&self) -> AllocatorInfo {
    // Every instance is interchangeable, so they share one identity.
    AllocatorInfo::new("vallocator::VirtualMemoryAllocator", 0)
  }

  /// Pages committed for a node of `size` bytes; empty nodes still get one.
  pub fn node_pages(size: usize) -> usize {
    page_count(size, page_size()).max(1)
  }

  /// Pages reserved for a node of `size` bytes, guard pages included.
  ///
  /// `None` if the count does not fit in a `usize`.
  pub fn reserved_pages(size: usize) -> Option<usize> {
    Self::node_pages(size).checked_add(2 * FENCE_PAGES)
  }

  pub fn allocate_node(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<NonNull<u8>, Error> {
    debug_assert!(
      alignment <= self.max_alignment(),
      "alignment {alignment} exceeds the page size {}",
      self.max_alignment()
    );

    let node_pages = Self::node_pages(size);
    let pages = Self::reserved_pages(size)
      .and_then(page::reserve)
      .ok_or_else(|| error::out_of_memory(self.info(), size))?;

    unsafe {
      let node = NonNull::new_unchecked(pages.as_ptr().add(FENCE_PAGES * page_size()));
      debug_assert!(is_aligned(node.as_ptr() as usize, alignment));

      if page::commit(node, node_pages).is_none() {
        page::release(pages, node_pages + 2 * FENCE_PAGES);
        return Err(error::out_of_memory(self.info(), size));
      }

      leak::on_reserve(self.info(), pages.as_ptr() as usize);
      debug::fill_new(node.as_ptr(), size);

      Ok(node)
    }
  }

  /// # Safety
  ///
  /// `node`, `size` and `alignment` must come from an earlier successful
  /// [`allocate_node`](Self::allocate_node).
  pub unsafe fn deallocate_node(
    &mut self,
    node: NonNull<u8>,
    size: usize,
    _alignment: usize,
  ) {
    let node_pages = Self::node_pages(size);

    unsafe {
      let pages = NonNull::new_unchecked(node.as_ptr().sub(FENCE_PAGES * page_size()));

      page::decommit(node, node_pages);
      page::release(pages, node_pages + 2 * FENCE_PAGES);

      leak::on_release(pages.as_ptr() as usize);
    }
  }

  pub fn max_node_size(&self) -> usize {
    usize::MAX
  }

  /// Nodes always start on a page boundary, so no stricter alignment exists.
  pub fn max_alignment(&self) -> usize {
    page_size()
  }
}

impl RawAllocator for VirtualMemoryAllocator {
  const IS_STATEFUL: bool = false;

  fn allocate_node(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<NonNull<u8>, Error> {
    VirtualMemoryAllocator::allocate_node(self, size, alignment)
  }

  unsafe fn deallocate_node(
    &mut self,
    node: NonNull<u8>,
    size: usize,
    alignment: usize,
  ) {
    unsafe { VirtualMemoryAllocator::deallocate_node(self, node, size, alignment) }
  }

  fn max_node_size(&self) -> usize {
    VirtualMemoryAllocator::max_node_size(self)
  }

  fn max_alignment(&self) -> usize {
    VirtualMemoryAllocator::max_alignment(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn test_alloc() {
    let mut allocator = VirtualMemoryAllocator::new();

    unsafe {
      let first = allocator.allocate_node(8, 8).unwrap().cast::<u64>();
      first.as_ptr().write(3);

      let size = 3 * page_size() + 1;
      let second = allocator.allocate_node(size, 16).unwrap();
      for i in 0..size {
        second.as_ptr().add(i).write((i % 251) as u8);
      }

      assert_eq!(first.as_ptr().read(), 3);
      for i in (0..size).step_by(97) {
        assert_eq!(second.as_ptr().add(i).read(), (i % 251) as u8);
      }

      allocator.deallocate_node(first.cast(), 8, 8);
      allocator.deallocate_node(second, size, 16);
    }
  }

  #[test]
  fn test_limits() {
    let allocator = VirtualMemoryAllocator::new();

    assert_eq!(allocator.max_node_size(), usize::MAX);
    assert_eq!(allocator.max_alignment(), page_size());
    assert!(!<VirtualMemoryAllocator as RawAllocator>::IS_STATEFUL);
    assert_eq!(std::mem::size_of::<VirtualMemoryAllocator>(), 0);
  }

  #[test]
  fn test_zero_size_node() {
    let mut allocator = VirtualMemoryAllocator::new();

    assert_eq!(VirtualMemoryAllocator::node_pages(0), 1);

    let node = allocator.allocate_node(0, 1).unwrap();
    unsafe { allocator.deallocate_node(node, 0, 1) };
  }

  #[test]
  fn test_oversized_request_is_out_of_memory() {
    let mut allocator = VirtualMemoryAllocator::new();

    for size in [usize::MAX, usize::MAX / 2] {
      match allocator.allocate_node(size, 1) {
        Err(Error::OutOfMemory { info, requested }) => {
          assert_eq!(requested, size);
          assert_eq!(info, allocator.info());
        }
        other => panic!("expected out of memory, got {other:?}"),
      }
    }
  }

  #[test]
  fn test_failed_commit_releases_reservation() {
    let mut allocator = VirtualMemoryAllocator::new();
    let size = 3 * page_size();

    let live = page::fault::live_reservations();

    page::fault::fail_commits(1);
    match allocator.allocate_node(size, 8) {
      Err(Error::OutOfMemory { info, requested }) => {
        assert_eq!(requested, size);
        assert_eq!(info, allocator.info());
      }
      other => panic!("expected out of memory, got {other:?}"),
    }

    // The commit was attempted, and the reservation under it given back.
    assert!(!page::fault::last_failed_commit().is_null());
    assert_eq!(page::fault::live_reservations(), live);

    // The next attempt goes through.
    let node = allocator.allocate_node(size, 8).unwrap();
    unsafe { allocator.deallocate_node(node, size, 8) };
  }

  #[test]
  #[cfg(debug_assertions)]
  fn test_node_pages_are_committed_and_fenced() {
    use crate::page::{PageState, state_of};

    let mut allocator = VirtualMemoryAllocator::new();
    let size = 2 * page_size();
    let node = allocator.allocate_node(size, 8).unwrap();
    let addr = node.as_ptr();

    unsafe {
      assert_eq!(state_of(addr), PageState::Committed);
      assert_eq!(state_of(addr.add(size - 1)), PageState::Committed);

      if FENCE_PAGES > 0 {
        assert_eq!(state_of(addr.sub(1)), PageState::Reserved);
        assert_eq!(state_of(addr.add(size)), PageState::Reserved);
      }

      allocator.deallocate_node(node, size, 8);
    }

    assert_eq!(state_of(addr), PageState::Unreserved);
  }

  #[test]
  #[cfg(feature = "debug-fill")]
  fn test_new_memory_is_filled() {
    let mut allocator = VirtualMemoryAllocator::new();
    let node = allocator.allocate_node(100, 8).unwrap();

    unsafe {
      for i in 0..100 {
        assert_eq!(node.as_ptr().add(i).read(), debug::NEW_MEMORY);
      }
      allocator.deallocate_node(node, 100, 8);
    }
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn nodes_cover_size_and_are_page_aligned(
      size in 0usize..(64 * 4096),
      align_shift in 0u32..12,
    ) {
      let mut allocator = VirtualMemoryAllocator::new();
      let alignment = 1usize << align_shift;

      let node = allocator.allocate_node(size, alignment).unwrap();
      prop_assert!(is_aligned(node.as_ptr() as usize, page_size()));
      prop_assert_eq!(VirtualMemoryAllocator::node_pages(size), page_count(size, page_size()).max(1));
      prop_assert_eq!(
        VirtualMemoryAllocator::reserved_pages(size),
        Some(VirtualMemoryAllocator::node_pages(size) + 2 * FENCE_PAGES)
      );

      unsafe {
        // Last byte of the node is writable.
        if size > 0 {
          node.as_ptr().add(size - 1).write(1);
        }
        allocator.deallocate_node(node, size, alignment);
      }

      // Same page count can be reserved straight away.
      let pages = VirtualMemoryAllocator::reserved_pages(size).unwrap();
      let again = page::reserve(pages);
      prop_assert!(again.is_some());
      unsafe { page::release(again.unwrap(), pages) };
    }
  }
}
