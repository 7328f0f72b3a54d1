use std::{io, ptr};

use libc::{
  MADV_DONTNEED, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE, _SC_PAGESIZE, c_void,
  madvise, mmap, mprotect, munmap, sysconf,
};

use super::{Backend, Os};

impl Backend for Os {
  fn page_size() -> usize {
    let size = unsafe { sysconf(_SC_PAGESIZE) };
    assert!(size > 0, "sysconf(_SC_PAGESIZE) failed: {}", io::Error::last_os_error());

    size as usize
  }

  fn reserve(len: usize) -> *mut u8 {
    // No MAP_NORESERVE: `commit` must be the call that takes the commit charge.
    let address = unsafe { mmap(ptr::null_mut(), len, PROT_NONE, MAP_PRIVATE | MAP_ANONYMOUS, -1, 0) };

    if address == MAP_FAILED {
      log::debug!("mmap of {len} bytes failed: {}", io::Error::last_os_error());
      return ptr::null_mut();
    }

    address as *mut u8
  }

  unsafe fn release(
    address: *mut u8,
    len: usize,
  ) -> bool {
    unsafe { munmap(address as *mut c_void, len) == 0 }
  }

  unsafe fn commit(
    address: *mut u8,
    len: usize,
  ) -> bool {
    let result = unsafe { mprotect(address as *mut c_void, len, PROT_READ | PROT_WRITE) };

    if result != 0 {
      log::debug!("mprotect of {len} bytes at {address:?} failed: {}", io::Error::last_os_error());
    }

    result == 0
  }

  unsafe fn decommit(
    address: *mut u8,
    len: usize,
  ) -> bool {
    unsafe {
      // Drop the physical pages first; the mapping itself stays reserved.
      madvise(address as *mut c_void, len, MADV_DONTNEED) == 0
        && mprotect(address as *mut c_void, len, PROT_NONE) == 0
    }
  }
}
