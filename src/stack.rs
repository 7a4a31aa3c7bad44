/*!
  The stack manager: a dedicated virtual address range, disjoint from heap
  addresses, holding return addresses and pushed values. The range starts at a
  large fixed offset and grows downward. Sixteen segments are configured, but
  only the topmost is materialized; the boundary constant computed from the
  offset, the segment size, and the segment count partitions the full address
  space into stack (at or above the boundary) and heap (below it).
*/

pub const STACK_SEGMENT_SIZE: i32 = 16384;
pub const STACK_SEGMENTS: i32 = 16;
pub const STACK_VIRTUAL_OFFSET: i32 = 0x6e00_0000;

/// Effective addresses at or above this are stack addresses; below it they
/// belong to the heap.
pub const STACK_VIRTUAL_BOUNDARY: i32 =
  STACK_VIRTUAL_OFFSET - STACK_SEGMENT_SIZE * (STACK_SEGMENTS - 1);

/// Where a stack slot access landed, for fault reporting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackAccess {
  /// Inside the materialized top segment.
  Resident(usize),
  /// In the stack's virtual range, but in one of the segments that is never
  /// materialized. Growing into them is an unimplemented extension point.
  Unmaterialized,
  /// Above the top of the virtual range.
  OutOfRange,
}

pub struct Stack {
  slots: Vec<i32>,
}

impl Stack {

  pub fn new() -> Stack {
    Stack {
      slots: vec![0; STACK_SEGMENT_SIZE as usize]
    }
  }

  /// The address of the topmost slot, where SP and BP begin.
  pub fn start_address() -> i32 {
    STACK_VIRTUAL_OFFSET + STACK_SEGMENT_SIZE - 1
  }

  /// True iff `address` falls in the stack's virtual range.
  pub fn contains(address: i32) -> bool {
    address >= STACK_VIRTUAL_BOUNDARY
  }

  fn classify(address: i32) -> StackAccess {
    let index = address - STACK_VIRTUAL_OFFSET;
    if index < 0 {
      StackAccess::Unmaterialized
    } else if index >= STACK_SEGMENT_SIZE {
      StackAccess::OutOfRange
    } else {
      StackAccess::Resident(index as usize)
    }
  }

  pub fn read(&self, address: i32) -> Result<i32, StackAccess> {
    match Stack::classify(address) {
      StackAccess::Resident(index) => Ok(self.slots[index]),
      miss                         => Err(miss)
    }
  }

  pub fn write(&mut self, address: i32, value: i32) -> Result<(), StackAccess> {
    match Stack::classify(address) {
      StackAccess::Resident(index) => {
        self.slots[index] = value;
        Ok(())
      }
      miss => Err(miss)
    }
  }

  /// The topmost slots, oldest first, for state display.
  pub fn top_slots(&self, count: usize) -> &[i32] {
    let len = self.slots.len();
    &self.slots[len - count.min(len)..]
  }

}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn boundary_partitions_the_address_space() {
    assert_eq!(STACK_VIRTUAL_BOUNDARY, 0x6e00_0000 - 16384 * 15);
    assert!(Stack::contains(STACK_VIRTUAL_BOUNDARY));
    assert!(Stack::contains(Stack::start_address()));
    assert!(!Stack::contains(STACK_VIRTUAL_BOUNDARY - 1));
    assert!(!Stack::contains(0));
  }

  #[test]
  fn resident_slots_round_trip() {
    let mut stack = Stack::new();
    let top = Stack::start_address();
    stack.write(top, 17).unwrap();
    stack.write(STACK_VIRTUAL_OFFSET, -4).unwrap();
    assert_eq!(stack.read(top), Ok(17));
    assert_eq!(stack.read(STACK_VIRTUAL_OFFSET), Ok(-4));
  }

  #[test]
  fn misses_are_classified() {
    let mut stack = Stack::new();
    assert_eq!(
      stack.read(STACK_VIRTUAL_OFFSET - 1),
      Err(StackAccess::Unmaterialized)
    );
    assert_eq!(
      stack.write(Stack::start_address() + 1, 0),
      Err(StackAccess::OutOfRange)
    );
  }
}
