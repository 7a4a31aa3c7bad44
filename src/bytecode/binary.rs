/*!
  This module is responsible for the encoding and decoding of binary
  command words.
*/
use std::convert::TryFrom;

use super::{Instruction, Opcode, OperandType};

// If you change this you must also change `encode_instruction` and
// `try_decode_instruction`.
pub type Word = u32;

// Command word layout:
//
//   [type:2][opcode:11][unused:1][rC:6][rA:6][rB:6]
//    31..30   29..19      18     17..12 11..6  5..0
//
pub const TYPE_SHIFT   : u32  = 30;
pub const OPCODE_MASK  : Word = 0x3ff8_0000;
pub const OPCODE_SHIFT : u32  = 19;
pub const RC_MASK      : Word = 0x0003_f000;
pub const RC_SHIFT     : u32  = 12;
pub const RA_MASK      : Word = 0x0000_0fc0;
pub const RA_SHIFT     : u32  = 6;
pub const RB_MASK      : Word = 0x0000_003f;

/**
  Extracts the typed fields of a command word. Returns `None` when the opcode
  field holds no recognized operation; the 2-bit type field always decodes.
*/
pub fn try_decode_instruction(command: Word) -> Option<Instruction> {
  let operand_type = OperandType::try_from((command >> TYPE_SHIFT) as u8).ok()?;
  let opcode = Opcode::try_from(((command & OPCODE_MASK) >> OPCODE_SHIFT) as u16).ok()?;

  Some(Instruction {
    operand_type,
    opcode,
    ra: ((command & RA_MASK) >> RA_SHIFT) as u8,
    rb: ( command & RB_MASK)              as u8,
    rc: ((command & RC_MASK) >> RC_SHIFT) as u8,
  })
}

/**
  Packs an instruction into its command word. It is the caller's
  responsibility to pair the word with an immediate; the two always travel
  together in a program.
*/
pub fn encode_instruction(instruction: &Instruction) -> Word {
  ((instruction.operand_type as Word) << TYPE_SHIFT)
    | ((instruction.opcode as Word) << OPCODE_SHIFT)
    | ((instruction.rc as Word) << RC_SHIFT)
    | ((instruction.ra as Word) << RA_SHIFT)
    |  (instruction.rb as Word)
}
