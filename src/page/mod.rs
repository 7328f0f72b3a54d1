//! The operating system boundary.
//!
//! Every range of pages moves through the same states:
//!
//! ```text
//!   Unreserved ──reserve──▶ Reserved ──commit───▶ Committed
//!       ▲                    │    ▲                  │
//!       └──────release───────┘    └────decommit──────┘
//! ```
//!
//! The OS calls do not check that a `decommit` matches an earlier `commit`, or
//! that a `release` covers exactly what `reserve` returned. In debug builds a
//! process-wide tracker records every live reservation and commit and asserts
//! those preconditions before the OS is touched.

use std::ptr::NonNull;
use std::sync::OnceLock;

#[cfg(debug_assertions)]
mod tracker;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// State of a single page as seen by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
  Unreserved,
  Reserved,
  Committed,
}

/// Raw paging calls of one operating system.
///
/// Lengths are in bytes and always a multiple of [`Backend::page_size`].
pub(crate) trait Backend {
  fn page_size() -> usize;

  /// Returns null on failure.
  fn reserve(len: usize) -> *mut u8;

  unsafe fn release(
    address: *mut u8,
    len: usize,
  ) -> bool;

  unsafe fn commit(
    address: *mut u8,
    len: usize,
  ) -> bool;

  unsafe fn decommit(
    address: *mut u8,
    len: usize,
  ) -> bool;
}

pub(crate) struct Os;

/// The size of a virtual memory page; usually 4 KiB.
///
/// Queried once per process.
pub fn page_size() -> usize {
  static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
  *PAGE_SIZE.get_or_init(Os::page_size)
}

fn byte_len(page_count: usize) -> usize {
  page_count * page_size()
}

/// Reserves `page_count` contiguous pages without making them accessible.
///
/// Returns `None` if the address space cannot hold them, or for zero pages.
pub fn reserve(page_count: usize) -> Option<NonNull<u8>> {
  if page_count == 0 {
    return None;
  }
  let len = page_count.checked_mul(page_size())?;

  let pages = NonNull::new(Os::reserve(len));
  log::trace!("reserve {page_count} pages -> {pages:?}");

  #[cfg(debug_assertions)]
  if let Some(pages) = pages {
    tracker::on_reserve(pages.as_ptr() as usize, len);
  }
  #[cfg(test)]
  if pages.is_some() {
    fault::count_reservation(1);
  }

  pages
}

/// Returns reserved pages to the system.
///
/// # Safety
///
/// `pages` and `page_count` must be exactly what an earlier [`reserve`] used,
/// and no page of the range may still be committed.
pub unsafe fn release(
  pages: NonNull<u8>,
  page_count: usize,
) {
  let len = byte_len(page_count);
  log::trace!("release {page_count} pages at {pages:?}");

  #[cfg(debug_assertions)]
  tracker::on_release(pages.as_ptr() as usize, len);

  #[cfg(test)]
  fault::count_reservation(-1);

  let released = unsafe { Os::release(pages.as_ptr(), len) };
  if !released {
    log::error!("failed to release {page_count} pages at {pages:?}");
  }
  debug_assert!(released, "failed to release {page_count} pages at {pages:?}");
}

/// Makes `page_count` reserved pages starting at `memory` readable and writable.
///
/// Returns `memory` on success, `None` if the system cannot back the pages.
///
/// # Safety
///
/// The whole range must lie inside one reservation and must not be committed.
pub unsafe fn commit(
  memory: NonNull<u8>,
  page_count: usize,
) -> Option<NonNull<u8>> {
  let len = byte_len(page_count);

  #[cfg(debug_assertions)]
  tracker::check_commit(memory.as_ptr() as usize, len);

  #[cfg(test)]
  let committed = !fault::commit_fails(memory.as_ptr()) && unsafe { Os::commit(memory.as_ptr(), len) };
  #[cfg(not(test))]
  let committed = unsafe { Os::commit(memory.as_ptr(), len) };
  log::trace!("commit {page_count} pages at {memory:?} -> {committed}");
  if !committed {
    return None;
  }

  #[cfg(debug_assertions)]
  tracker::on_commit(memory.as_ptr() as usize, len);

  Some(memory)
}

/// Puts committed pages back into the reserved state, discarding their contents.
///
/// # Safety
///
/// `memory` and `page_count` must be exactly what an earlier [`commit`] used.
pub unsafe fn decommit(
  memory: NonNull<u8>,
  page_count: usize,
) {
  let len = byte_len(page_count);
  log::trace!("decommit {page_count} pages at {memory:?}");

  #[cfg(debug_assertions)]
  tracker::on_decommit(memory.as_ptr() as usize, len);

  let decommitted = unsafe { Os::decommit(memory.as_ptr(), len) };
  if !decommitted {
    log::error!("failed to decommit {page_count} pages at {memory:?}");
  }
  debug_assert!(decommitted, "failed to decommit {page_count} pages at {memory:?}");
}

/// The tracked state of the page holding `address`.
#[cfg(debug_assertions)]
pub fn state_of(address: *const u8) -> PageState {
  tracker::state_of(address as usize)
}
