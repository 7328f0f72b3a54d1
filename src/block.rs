use std::ptr::NonNull;

/// A committed range handed out by a [`BlockAllocator`](crate::BlockAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
  pub memory: NonNull<u8>,
  pub size: usize,
}

impl MemoryBlock {
  pub fn new(
    memory: NonNull<u8>,
    size: usize,
  ) -> Self {
    Self { memory, size }
  }

  /// One past the last byte.
  pub fn end(&self) -> *mut u8 {
    self.memory.as_ptr().wrapping_add(self.size)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_end() {
    let mut buffer = [0u8; 64];
    let memory = NonNull::new(buffer.as_mut_ptr()).unwrap();
    let block = MemoryBlock::new(memory, 32);

    assert_eq!(block.end(), buffer[32..].as_mut_ptr());
  }
}
