//! Debug-build bookkeeping of live reservations and commits.
//!
//! Both tables map a start address to a length in bytes. Commits are always
//! nested inside exactly one reservation and never overlap each other.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::PageState;

struct Tracker {
  reserved: BTreeMap<usize, usize>,
  committed: BTreeMap<usize, usize>,
}

static TRACKER: Mutex<Tracker> = parking_lot::const_mutex(Tracker {
  reserved: BTreeMap::new(),
  committed: BTreeMap::new(),
});

/// The range in `map` starting at or before `address` that contains it.
fn containing(
  map: &BTreeMap<usize, usize>,
  address: usize,
) -> Option<(usize, usize)> {
  map
    .range(..=address)
    .next_back()
    .filter(|&(&start, &len)| address - start < len)
    .map(|(&start, &len)| (start, len))
}

pub(super) fn on_reserve(
  address: usize,
  len: usize,
) {
  let mut tracker = TRACKER.lock();

  assert!(
    containing(&tracker.reserved, address).is_none(),
    "reservation at {address:#x} overlaps a live reservation"
  );
  tracker.reserved.insert(address, len);
}

pub(super) fn on_release(
  address: usize,
  len: usize,
) {
  let mut tracker = TRACKER.lock();

  assert_eq!(
    tracker.reserved.get(&address),
    Some(&len),
    "release of {len} bytes at {address:#x} does not match a reservation"
  );
  assert!(
    tracker.committed.range(address..address + len).next().is_none(),
    "release of {address:#x} while pages are still committed"
  );
  tracker.reserved.remove(&address);
}

pub(super) fn check_commit(
  address: usize,
  len: usize,
) {
  let tracker = TRACKER.lock();

  let inside = containing(&tracker.reserved, address)
    .is_some_and(|(start, reserved)| address + len <= start + reserved);
  assert!(inside, "commit of {len} bytes at {address:#x} is not inside a reservation");

  let overlaps = tracker
    .committed
    .range(..address + len)
    .next_back()
    .is_some_and(|(&start, &committed)| start + committed > address);
  assert!(!overlaps, "commit of {len} bytes at {address:#x} overlaps committed pages");
}

pub(super) fn on_commit(
  address: usize,
  len: usize,
) {
  TRACKER.lock().committed.insert(address, len);
}

pub(super) fn on_decommit(
  address: usize,
  len: usize,
) {
  let mut tracker = TRACKER.lock();

  assert_eq!(
    tracker.committed.get(&address),
    Some(&len),
    "decommit of {len} bytes at {address:#x} does not match a commit"
  );
  tracker.committed.remove(&address);
}

pub(super) fn state_of(address: usize) -> PageState {
  let tracker = TRACKER.lock();

  if containing(&tracker.committed, address).is_some() {
    PageState::Committed
  } else if containing(&tracker.reserved, address).is_some() {
    PageState::Reserved
  } else {
    PageState::Unreserved
  }
}
