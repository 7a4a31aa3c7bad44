use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/**
  Opcodes of the virtual machine, the value of the 11-bit opcode field.

  Rust stores these variants as consecutive natural numbers, so a variant can
  be recovered from a decoded field with a trivial conversion. The numbering
  groups fused-immediate arithmetic, control flow, memory, and the syscall
  gateway; the concrete numbers are a contract with the external assembler
  that produces the bytecode, not with any code here.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u16)]
pub enum Opcode {
  // Fused-immediate arithmetic: the immediate combines with the second
  // operand before the primary operator is applied.
  Mov,               // regA <- regB + constant
  Add,               // regA += regB + constant
  Sub,               // regA -= regB + constant
  Mul,               // regA *= regB + constant
  Div,               // regA /= regB + constant
  Mod,               // regA %= regB + constant
  And,               // regA &= regB | constant
  Or,                // regA |= regB | constant
  Xor,               // regA ^= regB ^ constant
  Shlv,              // regA <<= regB + constant

  // Control flow. Targets are instruction-pair indices, shifted left by one
  // to form word offsets.
  J,                 // ip <- constant << 1
  Jmp,               // ip <- regA << 1
  Jeq,               // if regA == regB, jump to constant
  Jne,               // if regA != regB, jump to constant
  Jge,               // if regA >= regB, jump to constant
  Jg,                // if regA >  regB, jump to constant
  Jle,               // if regA <= regB, jump to constant
  Jl,                // if regA <  regB, jump to constant
  Call,              // push ip + 2, jump to constant
  Ret,               // pop ip

  // Memory. Effective address is regB + regC + constant.
  Load,              // regA <- memory[address]
  Save,              // memory[address] <- regA
  Push,              // push constant
  Pop,               // regA <- popped value

  Syscall,           // syscall number in regA
}

/// The 2-bit operand class field. Only `Int` instructions execute; the other
/// three decode and then fault as unimplemented.
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum OperandType {
  Int    = 0,
  Float  = 1,
  Text   = 2,
  Object = 3,
}

/// Syscall numbers, carried in the `rA` field of a `Syscall` instruction.
#[derive(
StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,  Hash
)]
#[repr(u8)]
pub enum Syscall {
  Exit          = 0,
  Halt          = 1,
  Print         = 2,
  Println       = 3,
  Input         = 4,
  ReadProperty  = 5,
  WriteProperty = 6,
  CallMethod    = 7,
  Other         = 8,
}

/// Holds the unencoded components of a command word. The paired immediate
/// word is not part of the record; it sits adjacent in the program.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub operand_type :  OperandType,
  pub opcode       :  Opcode,
  pub ra           :  u8,
  pub rb           :  u8,
  pub rc           :  u8,
}

impl Instruction {
  pub fn new(operand_type: OperandType, opcode: Opcode, ra: u8, rb: u8, rc: u8) -> Instruction {
    Instruction { operand_type, opcode, ra, rb, rc }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}:{}(rA:{}, rB:{}, rC:{})",
      self.operand_type, self.opcode, self.ra, self.rb, self.rc
    )
  }
}
