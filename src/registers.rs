//! The register file: four parallel banks of 64 fixed-width registers, one
//! bank per operand type, indexed independently. Two integer registers are
//! reserved by convention for the stack and base pointers; nothing stops
//! ordinary arithmetic from clobbering them.

pub const NUM_REGISTERS: usize = 64;

/// Stack pointer register, by convention.
pub const R_SP: usize = 62;
/// Base pointer register, by convention.
pub const R_BP: usize = 63;

/// A handle into the object heap. The object instruction type is a reserved
/// extension point, so nothing dereferences these yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ObjectRef(pub i32);

pub struct RegisterFile {
  ints    :  [i32; NUM_REGISTERS],
  floats  :  [f64; NUM_REGISTERS],
  texts   :  Vec<String>,
  objects :  Vec<Option<ObjectRef>>,
}

impl RegisterFile {

  pub fn new() -> RegisterFile {
    RegisterFile {
      ints    :  [0; NUM_REGISTERS],
      floats  :  [0.0; NUM_REGISTERS],
      texts   :  vec![String::new(); NUM_REGISTERS],
      objects :  vec![None; NUM_REGISTERS],
    }
  }

  // Register indices come from 6-bit instruction fields, so they are always
  // in range and the accessors index directly.

  pub fn int(&self, register: usize) -> i32 {
    self.ints[register]
  }

  pub fn set_int(&mut self, register: usize, value: i32) {
    self.ints[register] = value;
  }

  #[allow(dead_code)] // Reserved for the float instruction type.
  pub fn float(&self, register: usize) -> f64 {
    self.floats[register]
  }

  #[allow(dead_code)] // Reserved for the float instruction type.
  pub fn set_float(&mut self, register: usize, value: f64) {
    self.floats[register] = value;
  }

  /// Text registers receive lines read by the INPUT syscall.
  pub fn text(&self, register: usize) -> &str {
    &self.texts[register]
  }

  pub fn set_text(&mut self, register: usize, value: String) {
    self.texts[register] = value;
  }

  #[allow(dead_code)] // Reserved for the object instruction type.
  pub fn object(&self, register: usize) -> Option<ObjectRef> {
    self.objects[register]
  }

  #[allow(dead_code)] // Reserved for the object instruction type.
  pub fn set_object(&mut self, register: usize, value: Option<ObjectRef>) {
    self.objects[register] = value;
  }

  /// The integer registers, for state display.
  pub fn int_bank(&self) -> &[i32; NUM_REGISTERS] {
    &self.ints
  }

}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn banks_start_zeroed_and_empty() {
    let registers = RegisterFile::new();
    for r in 0..NUM_REGISTERS {
      assert_eq!(registers.int(r), 0);
      assert_eq!(registers.float(r), 0.0);
      assert_eq!(registers.text(r), "");
      assert_eq!(registers.object(r), None);
    }
  }

  #[test]
  fn banks_are_independent() {
    let mut registers = RegisterFile::new();
    registers.set_int(5, -3);
    registers.set_float(5, 2.5);
    registers.set_text(5, "five".to_string());
    assert_eq!(registers.int(5), -3);
    assert_eq!(registers.float(5), 2.5);
    assert_eq!(registers.text(5), "five");
    assert_eq!(registers.int(6), 0);
  }

  #[test]
  fn pointer_registers_are_ordinary_slots() {
    let mut registers = RegisterFile::new();
    registers.set_int(R_SP, 100);
    registers.set_int(R_BP, 200);
    assert_eq!(registers.int(62), 100);
    assert_eq!(registers.int(63), 200);
  }
}
