//! Process-wide accounting of outstanding reservations.
//!
//! Both allocators report every reservation they make and every one they give
//! back. A [`LeakChecker`] obtained from [`init`] checks, when the last one is
//! dropped, that nothing is still outstanding:
//!
//! ```rust
//! fn main() {
//!   let _leaks = vallocator::leak::init();
//!
//!   // ... use the allocators ...
//! } // every reservation must have been released here
//! ```
//!
//! Accounting is on in debug builds and with the `leak-check` feature. In other
//! builds every hook compiles to nothing and the checker never complains.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::AllocatorInfo;

pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "leak-check"));

/// Called at teardown with each allocator that still owns a reservation and
/// how many reservations it owns.
pub type LeakHandler = fn(&AllocatorInfo, usize);

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);
static RECORDS: Mutex<BTreeMap<usize, AllocatorInfo>> = parking_lot::const_mutex(BTreeMap::new());
static CHECKERS: AtomicUsize = AtomicUsize::new(0);
static LEAK_HANDLER: RwLock<Option<LeakHandler>> = parking_lot::const_rwlock(None);

fn default_leak_handler(
  info: &AllocatorInfo,
  count: usize,
) {
  log::error!("{info} leaked {count} virtual memory reservation(s)");
}

/// Installs `handler`, returning the one it replaces. `None` restores logging.
pub fn set_leak_handler(handler: Option<LeakHandler>) -> Option<LeakHandler> {
  std::mem::replace(&mut *LEAK_HANDLER.write(), handler)
}

pub(crate) fn on_reserve(
  info: AllocatorInfo,
  address: usize,
) {
  if !ENABLED {
    return;
  }

  OUTSTANDING.fetch_add(1, Ordering::Relaxed);
  RECORDS.lock().insert(address, info);
}

pub(crate) fn on_release(address: usize) {
  if !ENABLED {
    return;
  }

  let record = RECORDS.lock().remove(&address);
  debug_assert!(record.is_some(), "release of untracked reservation at {address:#x}");
  OUTSTANDING.fetch_sub(1, Ordering::Relaxed);
}

/// Number of reservations currently held by allocators.
pub fn outstanding() -> usize {
  OUTSTANDING.load(Ordering::Relaxed)
}

/// The owner of every outstanding reservation, in address order.
pub fn outstanding_records() -> Vec<AllocatorInfo> {
  RECORDS.lock().values().copied().collect()
}

/// Starts leak checking; may be called any number of times.
pub fn init() -> LeakChecker {
  if CHECKERS.fetch_add(1, Ordering::AcqRel) == 0 && ENABLED {
    log::debug!("virtual memory leak checking enabled");
  }

  LeakChecker { _private: () }
}

/// Guard returned by [`init`]; the last one dropped performs the check.
#[must_use = "leaks are checked when the checker is dropped"]
pub struct LeakChecker {
  _private: (),
}

impl LeakChecker {
  /// Reports every outstanding reservation to the leak handler, grouped by
  /// allocator, and returns how many there were.
  pub fn report(&self) -> usize {
    let mut leaks: Vec<(AllocatorInfo, usize)> = Vec::new();

    for info in outstanding_records() {
      match leaks.iter_mut().find(|(seen, _)| *seen == info) {
        Some((_, count)) => *count += 1,
        None => leaks.push((info, 1)),
      }
    }

    let handler = (*LEAK_HANDLER.read()).unwrap_or(default_leak_handler);
    for (info, count) in &leaks {
      handler(info, *count);
    }

    leaks.iter().map(|(_, count)| count).sum()
  }
}

impl Drop for LeakChecker {
  fn drop(&mut self) {
    if CHECKERS.fetch_sub(1, Ordering::AcqRel) != 1 || !ENABLED {
      return;
    }

    let leaked = self.report();
    if !std::thread::panicking() {
      assert_eq!(leaked, 0, "{leaked} virtual memory reservation(s) leaked");
    }
  }
}
