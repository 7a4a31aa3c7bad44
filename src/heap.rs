/*!
  The heap growth model and the segmented heap stores it governs.

  A heap address is a flat index into a conceptual space that grows by adding
  segments. The growth policy is the function mapping the configured segment
  count to total addressable capacity, and its inverse maps a logical address
  to the segment holding it. Capacity is validated once, at construction, with
  a dedicated overflow check performed before each multiplication so that an
  infeasible configuration is rejected rather than wrapped into a smaller,
  incorrect capacity.
*/

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::error::ConfigurationError;
use crate::registers::ObjectRef;

pub const DEFAULT_SEGMENTS: i32 = 14;
pub const DEFAULT_SLOTS: i32 = 2048;
pub const DEFAULT_GROWTH: GrowthPolicy = GrowthPolicy::Exponential;

/// How declared capacity scales with the configured segment count.
#[derive(StrumDisplay, IntoStaticStr, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum GrowthPolicy {
  /// Capacity `segments * slots`; segment index is `n`.
  #[strum(serialize = "linear")]
  Linear,
  /// Capacity `segments^2 * slots`; segment index is `floor(sqrt(n))`. The
  /// index and capacity formulas are not mutually consistent; this is
  /// inherited behavior, preserved as written.
  #[strum(serialize = "quadratic")]
  Quadratic,
  /// Capacity `2^segments * slots`; segment index is the lowest set bit of
  /// `n`, which is only well-defined when `n` is a power of two.
  #[strum(serialize = "exponential")]
  Exponential,
}

// region Pure model functions

/// True iff `a * b` would exceed `i32::MAX`. Both operands must be positive.
fn multiply_overflows(a: i32, b: i32) -> bool {
  a != 0 && b > i32::MAX / a
}

/**
  Returns log base 2 of the argument, which must be a power of 2. When given
  0, returns 0. Scanning proceeds from bit 0 upward and falls back to 31 when
  no set bit is found in range; behavior for non-powers of two follows the
  scan literally and is out of the function's stated domain.
*/
pub fn log2_of_power_of_2(power_of_2: i32) -> i32 {
  if power_of_2 == 0 {
    return 0;
  }
  let mut remaining = power_of_2;
  for i in 0..32 {
    if (remaining & 1) == 1 {
      return i;
    }
    remaining >>= 1;
  }
  31
}

/// Given a logical address, returns the segment index of that address under
/// the chosen growth policy.
pub fn segment_for_address(address: i32, initial_slots: i32, growth: GrowthPolicy) -> i32 {
  let n = address / initial_slots;
  match growth {
    GrowthPolicy::Linear      => n,
    GrowthPolicy::Quadratic   => (n as f64).sqrt() as i32,
    GrowthPolicy::Exponential => log2_of_power_of_2(n),
  }
}

/**
  Validates an address-space configuration and returns its maximum capacity.

  Fails with a `ConfigurationError` when a count is non-positive or when the
  capacity product for the policy would exceed `i32::MAX`. Every intermediate
  product is guarded: `segments^2` and `2^segments` are checked before the
  final multiplication, so boundary values at and beyond the representable
  maximum are rejected outright.
*/
pub fn max_heap_size(
  segments: i32,
  slots: i32,
  growth: GrowthPolicy
) -> Result<i32, ConfigurationError> {
  if segments <= 0 {
    return Err(ConfigurationError::NonPositiveSegments(segments));
  }
  if slots <= 0 {
    return Err(ConfigurationError::NonPositiveSlots(slots));
  }

  let overflow = ConfigurationError::CapacityOverflow {
    policy: growth,
    segments,
    slots
  };

  match growth {

    GrowthPolicy::Linear => {
      match multiply_overflows(segments, slots) {
        true  => Err(overflow),
        false => Ok(segments * slots)
      }
    }

    GrowthPolicy::Quadratic => {
      if multiply_overflows(segments, segments) {
        return Err(overflow);
      }
      let squared = segments * segments;
      match multiply_overflows(squared, slots) {
        true  => Err(overflow),
        false => Ok(squared * slots)
      }
    }

    GrowthPolicy::Exponential => {
      // 2^31 already exceeds `i32::MAX`, regardless of the slot count.
      if segments > 30 {
        return Err(overflow);
      }
      let doubled = 1i32 << segments;
      match multiply_overflows(doubled, slots) {
        true  => Err(overflow),
        false => Ok(doubled * slots)
      }
    }

  }
}

/// Result of the capacity planning query: the largest feasible segment count
/// for a policy and slot size, and the capacity it yields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CapacityReport {
  pub max_segments :  i32,
  pub max_size     :  i32,
}

impl Display for CapacityReport {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "Max segments: {}, Max size: {} slots", self.max_segments, self.max_size)
  }
}

/**
  Reports the largest feasible segment count and resulting capacity for a
  policy and slot size, independent of any running machine, by probing
  increasing segment counts until the overflow check first fails.
*/
pub fn report_max_heap_size(
  growth: GrowthPolicy,
  slots: i32
) -> Result<CapacityReport, ConfigurationError> {
  if slots <= 0 {
    return Err(ConfigurationError::NonPositiveSlots(slots));
  }
  let mut previous_size = -1;
  let mut segments = 1;
  loop {
    match max_heap_size(segments, slots, growth) {
      Ok(size) => previous_size = size,
      Err(_)   => {
        return Ok(CapacityReport {
          max_segments: segments - 1,
          max_size: previous_size
        });
      }
    }
    if segments == i32::MAX {
      return Ok(CapacityReport { max_segments: i32::MAX, max_size: i32::MAX });
    }
    segments += 1;
  }
}

// endregion

// region Segment stores

/**
  The segmented heap: per operand type, an ordered sequence of segments of
  which segment 0 is materialized at construction with `initial_slots`
  entries. Later segments are materialized on demand as addresses exceed
  existing capacity. Only the integer store is reachable from the current
  instruction set; the other banks are reserved alongside it.
*/
pub struct Heap {
  segments      :  i32,
  initial_slots :  i32,
  growth        :  GrowthPolicy,
  max_size      :  i32,

  int_segments    :  Vec<Option<Vec<i32>>>,
  #[allow(dead_code)] // Reserved for the float instruction type.
  float_segments  :  Vec<Option<Vec<f64>>>,
  #[allow(dead_code)] // Reserved for the text instruction type.
  text_segments   :  Vec<Option<Vec<String>>>,
  #[allow(dead_code)] // Reserved for the object instruction type.
  object_segments :  Vec<Option<Vec<Option<ObjectRef>>>>,
}

impl Heap {

  pub fn new(
    segments: i32,
    initial_slots: i32,
    growth: GrowthPolicy
  ) -> Result<Heap, ConfigurationError> {
    let max_size = max_heap_size(segments, initial_slots, growth)?;
    let count = segments as usize;
    let slots = initial_slots as usize;

    let mut heap = Heap {
      segments,
      initial_slots,
      growth,
      max_size,
      int_segments    :  vec![None; count],
      float_segments  :  vec![None; count],
      text_segments   :  vec![None; count],
      object_segments :  vec![None; count],
    };
    heap.int_segments   [0] = Some(vec![0; slots]);
    heap.float_segments [0] = Some(vec![0.0; slots]);
    heap.text_segments  [0] = Some(vec![String::new(); slots]);
    heap.object_segments[0] = Some(vec![None; slots]);
    Ok(heap)
  }

  pub fn max_size(&self) -> i32 {
    self.max_size
  }

  /// The range of `address / initial_slots` values segment `segment` covers,
  /// the inverse of `segment_for_address`. Computed in `i64`: the upper bound
  /// can touch the capacity limit itself.
  fn pair_range(&self, segment: i32) -> (i64, i64) {
    let s = segment as i64;
    match self.growth {
      GrowthPolicy::Linear      => (s, s + 1),
      GrowthPolicy::Quadratic   => (s * s, (s + 1) * (s + 1)),
      GrowthPolicy::Exponential => {
        match s == 0 {
          true  => (0, 2), // n = 0 and n = 1 both index segment 0.
          false => (1 << s, 1 << (s + 1))
        }
      }
    }
  }

  /**
    Resolves a logical address to `(segment, offset, span)` where `span` is
    the segment's full slot count. Returns `None` for addresses outside the
    configured capacity and for addresses whose computed offset falls outside
    their segment, which can only happen for inputs outside the exponential
    index's power-of-two domain.
  */
  fn locate(&self, address: i32) -> Option<(usize, usize, usize)> {
    if address < 0 || address >= self.max_size {
      return None;
    }
    let segment = segment_for_address(address, self.initial_slots, self.growth);
    if segment < 0 || segment >= self.segments {
      return None;
    }
    let (low, high) = self.pair_range(segment);
    let base = low * self.initial_slots as i64;
    let span = (high - low) * self.initial_slots as i64;
    let offset = address as i64 - base;
    if offset < 0 || offset >= span {
      return None;
    }
    Some((segment as usize, offset as usize, span as usize))
  }

  fn int_slots(&mut self, segment: usize, offset: usize, span: usize) -> &mut Vec<i32> {
    let slots = self.int_segments[segment].get_or_insert_with(Vec::new);
    if slots.len() <= offset {
      slots.resize(span, 0);
    }
    slots
  }

  pub fn load_int(&mut self, address: i32) -> Option<i32> {
    let (segment, offset, span) = self.locate(address)?;
    Some(self.int_slots(segment, offset, span)[offset])
  }

  pub fn save_int(&mut self, address: i32, value: i32) -> Option<()> {
    let (segment, offset, span) = self.locate(address)?;
    self.int_slots(segment, offset, span)[offset] = value;
    Some(())
  }

  #[cfg(test)]
  fn int_segment_is_materialized(&self, segment: usize) -> bool {
    self.int_segments[segment].is_some()
  }

}

// endregion
