use std::thread;

use vallocator::{
  BlockAllocator, MemoryBlock, RawAllocator, VirtualBlockAllocator, VirtualMemoryAllocator, page_size,
};

/// Minimal arena: grows by whole blocks, frees them in reverse.
struct Arena<A: BlockAllocator> {
  allocator: A,
  blocks: Vec<MemoryBlock>,
}

impl<A: BlockAllocator> Arena<A> {
  fn new(allocator: A) -> Self {
    Self {
      allocator,
      blocks: Vec::new(),
    }
  }

  fn grow(&mut self) -> bool {
    match self.allocator.allocate_block() {
      Ok(block) => {
        self.blocks.push(block);
        true
      }
      Err(_) => false,
    }
  }

  fn shrink(&mut self) {
    if let Some(block) = self.blocks.pop() {
      unsafe { self.allocator.deallocate_block(block) };
    }
  }
}

impl<A: BlockAllocator> Drop for Arena<A> {
  fn drop(&mut self) {
    while !self.blocks.is_empty() {
      self.shrink();
    }
  }
}

#[test]
fn test_arena_over_block_allocator() {
  let mut arena = Arena::new(VirtualBlockAllocator::new(2 * page_size(), 8).unwrap());

  let mut grown = 0;
  while arena.grow() {
    let block = arena.blocks.last().unwrap();
    assert_eq!(block.size, arena.allocator.next_block_size());
    unsafe { block.memory.as_ptr().write_bytes(grown as u8, block.size) };
    grown += 1;
  }
  assert_eq!(grown, 8);

  for (i, block) in arena.blocks.iter().enumerate() {
    unsafe { assert_eq!(block.end().sub(1).read(), i as u8) };
  }

  arena.shrink();
  arena.shrink();
  assert_eq!(arena.allocator.capacity_left(), 2);
  assert!(arena.grow());
}

fn allocate_with<A: RawAllocator>(
  allocator: &mut A,
  sizes: &[usize],
) {
  let nodes: Vec<_> = sizes.iter().map(|&size| (allocator.allocate_node(size, 8).unwrap(), size)).collect();

  for &(node, size) in &nodes {
    unsafe { node.as_ptr().write_bytes(0x5A, size) };
  }
  for (node, size) in nodes {
    unsafe { allocator.deallocate_node(node, size, 8) };
  }
}

#[test]
fn test_node_allocator_through_trait() {
  let mut allocator = VirtualMemoryAllocator::new();
  let copy = allocator;

  allocate_with(&mut allocator, &[1, 64, page_size() - 1, page_size(), 5 * page_size() + 3]);
  assert_eq!(copy.max_alignment(), RawAllocator::max_alignment(&allocator));
}

#[test]
fn test_distinct_instances_on_threads() {
  let handles: Vec<_> = (0..4)
    .map(|i| {
      let mut blocks = VirtualBlockAllocator::new(page_size(), 4).unwrap();

      thread::spawn(move || {
        let mut nodes = VirtualMemoryAllocator::new();
        allocate_with(&mut nodes, &[100 * (i + 1), page_size() * (i + 1)]);

        let block = blocks.allocate_block().unwrap();
        unsafe {
          block.memory.as_ptr().write(i as u8);
          assert_eq!(block.memory.as_ptr().read(), i as u8);
          blocks.deallocate_block(block);
        }
        blocks.capacity_left()
      })
    })
    .collect();

  for handle in handles {
    assert_eq!(handle.join().unwrap(), 4);
  }
}
