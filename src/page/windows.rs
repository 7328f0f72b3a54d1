use std::{io, mem, ptr};

use windows_sys::Win32::System::Memory::{
  MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE, VirtualAlloc, VirtualFree,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use super::{Backend, Os};

impl Backend for Os {
  fn page_size() -> usize {
    let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
    unsafe { GetSystemInfo(&mut info) };

    info.dwPageSize as usize
  }

  fn reserve(len: usize) -> *mut u8 {
    let address = unsafe { VirtualAlloc(ptr::null(), len, MEM_RESERVE, PAGE_NOACCESS) };

    if address.is_null() {
      log::debug!("VirtualAlloc reserve of {len} bytes failed: {}", io::Error::last_os_error());
    }

    address as *mut u8
  }

  unsafe fn release(
    address: *mut u8,
    _len: usize,
  ) -> bool {
    // MEM_RELEASE frees the whole reservation and requires a size of zero.
    unsafe { VirtualFree(address.cast(), 0, MEM_RELEASE) != 0 }
  }

  unsafe fn commit(
    address: *mut u8,
    len: usize,
  ) -> bool {
    let result = unsafe { VirtualAlloc(address as *const _, len, MEM_COMMIT, PAGE_READWRITE) };

    if result.is_null() {
      log::debug!(
        "VirtualAlloc commit of {len} bytes at {address:?} failed: {}",
        io::Error::last_os_error()
      );
    }

    result.cast::<u8>() == address
  }

  unsafe fn decommit(
    address: *mut u8,
    len: usize,
  ) -> bool {
    unsafe { VirtualFree(address.cast(), len, MEM_DECOMMIT) != 0 }
  }
}
