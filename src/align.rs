/// Number of whole pages needed to hold `size` bytes.
///
/// # Examples
///
/// ```rust
/// use vallocator::align::page_count;
///
/// assert_eq!(page_count(1, 4096), 1);
/// assert_eq!(page_count(4096, 4096), 1);
/// assert_eq!(page_count(4097, 4096), 2);
/// assert_eq!(page_count(usize::MAX, 4096), usize::MAX / 4096 + 1);
/// ```
pub const fn page_count(
  size: usize,
  page_size: usize,
) -> usize {
  size / page_size + (size % page_size != 0) as usize
}

pub const fn is_aligned(
  address: usize,
  align: usize,
) -> bool {
  address & (align - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn test_page_count() {
    let page = 4096;

    assert_eq!(page_count(0, page), 0);

    for i in 0..10 {
      let sizes = (page * i + 1)..=(page * (i + 1));

      for size in sizes.step_by(511) {
        assert_eq!(page_count(size, page), i + 1);
      }
    }
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned(0, 4096));
    assert!(is_aligned(3 * 4096, 4096));
    assert!(!is_aligned(4095, 4096));
    assert!(is_aligned(24, 8));
  }

  proptest! {
    #[test]
    fn page_count_covers_size_tightly(
      size in 1usize..(u32::MAX as usize),
      shift in 12u32..22,
    ) {
      let page = 1usize << shift;
      let pages = page_count(size, page);

      prop_assert!(pages * page >= size);
      prop_assert!((pages - 1) * page < size);
      prop_assert!(is_aligned(pages * page, page));
    }
  }
}
