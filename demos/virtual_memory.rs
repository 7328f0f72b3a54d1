use std::io::Read;

use vallocator::{VirtualBlockAllocator, VirtualMemoryAllocator, leak, page_size};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the mappings with `pmap -x <pid>` or
/// `/proc/<pid>/smaps` and watch reserved ranges turn into resident memory.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() -> Result<(), vallocator::Error> {
  let _leaks = leak::init();

  println!("PID = {}, page size = {} bytes", std::process::id(), page_size());
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Reserve 64 blocks of 16 pages each. Nothing is resident yet:
  //    pmap shows one large `---p` mapping.
  // --------------------------------------------------------------------
  let block_size = 16 * page_size();
  let mut blocks = VirtualBlockAllocator::new(block_size, 64)?;
  println!("\n[1] Reserved {} bytes, {} blocks left", block_size * 64, blocks.capacity_left());
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Commit three blocks and touch them. The start of the mapping
  //    turns `rw-p` and becomes resident.
  // --------------------------------------------------------------------
  let mut committed = Vec::new();
  for i in 0..3 {
    let block = blocks.allocate_block()?;
    unsafe { block.memory.as_ptr().write_bytes(0xAB, block.size) };
    println!("[2] Block {i} at {:?}, {} bytes", block.memory, block.size);
    committed.push(block);
  }
  println!("[2] {} blocks left", blocks.capacity_left());
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Move the allocator. The region stays where it is, so the blocks
  //    remain valid.
  // --------------------------------------------------------------------
  let mut moved = blocks.take();
  println!("\n[3] Moved: source empty = {}, destination = {}", blocks.is_empty(), moved.info());
  println!("[3] First byte of block 0 is still {:#X}", unsafe { committed[0].memory.as_ptr().read() });
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Hand the blocks back, top first. Resident memory drops again.
  // --------------------------------------------------------------------
  while let Some(block) = committed.pop() {
    unsafe { moved.deallocate_block(block) };
  }
  println!("\n[4] Decommitted everything, {} blocks left", moved.capacity_left());
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) A single node straight from the OS: its own mapping, rounded up
  //    to whole pages.
  // --------------------------------------------------------------------
  let mut nodes = VirtualMemoryAllocator::new();
  let size = 3 * page_size() + 100;
  let node = nodes.allocate_node(size, 8)?;
  println!(
    "\n[5] Node of {size} bytes at {node:?} spans {} pages",
    VirtualMemoryAllocator::node_pages(size)
  );
  block_until_enter_pressed();

  unsafe { nodes.deallocate_node(node, size, 8) };

  // --------------------------------------------------------------------
  // 6) End of demo. Dropping the allocator releases the reservation;
  //    the leak checker verifies nothing is left.
  // --------------------------------------------------------------------
  drop(moved);
  println!("\n[6] Outstanding reservations: {}", leak::outstanding());

  Ok(())
}
