//! Diagnostic aids that can be switched on through cargo features.

/// Guard pages placed on each side of a node allocation.
///
/// They stay reserved but are never committed, so touching them faults. Zero
/// unless the `debug-fence` feature is enabled.
pub const FENCE_PAGES: usize = if cfg!(feature = "debug-fence") { 1 } else { 0 };

/// Byte written over memory that was just handed out, with `debug-fill`.
pub const NEW_MEMORY: u8 = 0xCD;

/// Fills `len` bytes at `memory` with [`NEW_MEMORY`] when `debug-fill` is on.
///
/// # Safety
///
/// The range must be committed and owned by the caller.
#[inline]
pub(crate) unsafe fn fill_new(
  memory: *mut u8,
  len: usize,
) {
  if cfg!(feature = "debug-fill") {
    unsafe { memory.write_bytes(NEW_MEMORY, len) };
  }
}
