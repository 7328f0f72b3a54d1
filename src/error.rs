use std::fmt;

use parking_lot::RwLock;

/// Identifies an allocator instance in error and leak reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocatorInfo {
  pub name: &'static str,
  pub identity: usize,
}

impl AllocatorInfo {
  pub const fn new(
    name: &'static str,
    identity: usize,
  ) -> Self {
    Self { name, identity }
  }
}

impl fmt::Display for AllocatorInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{}@{:#x}", self.name, self.identity)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  /// The system refused to reserve or commit the pages.
  #[error("{info}: out of memory while allocating {requested} bytes")]
  OutOfMemory {
    info: AllocatorInfo,
    requested: usize,
  },

  /// A fixed-capacity allocator has handed out everything it reserved.
  #[error("{info}: fixed capacity exhausted while allocating {requested} bytes")]
  OutOfFixedMemory {
    info: AllocatorInfo,
    requested: usize,
  },
}

impl Error {
  pub fn requested_size(&self) -> usize {
    match *self {
      Error::OutOfMemory { requested, .. } | Error::OutOfFixedMemory { requested, .. } => requested,
    }
  }

  pub fn info(&self) -> &AllocatorInfo {
    match self {
      Error::OutOfMemory { info, .. } | Error::OutOfFixedMemory { info, .. } => info,
    }
  }
}

/// Observes every out-of-memory condition before it is returned.
///
/// Receives the failing allocator and the requested size in bytes. It may free
/// memory elsewhere, log, or abort the process; when it returns the error
/// still propagates to the caller.
pub type OutOfMemoryHandler = fn(&AllocatorInfo, usize);

static OUT_OF_MEMORY_HANDLER: RwLock<Option<OutOfMemoryHandler>> = parking_lot::const_rwlock(None);

/// Installs `handler`, returning the one it replaces.
pub fn set_out_of_memory_handler(handler: Option<OutOfMemoryHandler>) -> Option<OutOfMemoryHandler> {
  std::mem::replace(&mut *OUT_OF_MEMORY_HANDLER.write(), handler)
}

pub fn out_of_memory_handler() -> Option<OutOfMemoryHandler> {
  *OUT_OF_MEMORY_HANDLER.read()
}

fn notify(
  info: &AllocatorInfo,
  requested: usize,
) {
  // Copy the handler out so it may replace itself.
  if let Some(handler) = out_of_memory_handler() {
    handler(info, requested);
  }
}

pub(crate) fn out_of_memory(
  info: AllocatorInfo,
  requested: usize,
) -> Error {
  log::debug!("{info}: out of memory, requested {requested} bytes");
  notify(&info, requested);
  Error::OutOfMemory { info, requested }
}

pub(crate) fn out_of_fixed_memory(
  info: AllocatorInfo,
  requested: usize,
) -> Error {
  log::debug!("{info}: fixed capacity exhausted, requested {requested} bytes");
  notify(&info, requested);
  Error::OutOfFixedMemory { info, requested }
}
