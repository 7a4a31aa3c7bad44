/*!

  The VM uses a 32 bit word size. Every instruction is exactly two words: a
  command word followed by an immediate word. The command word is bit-packed
  as follows, high bits first:

    Type:    2 bits   (operand class: int, float, text, object)
    Opcode: 11 bits
    unused:  1 bit
    rC:      6 bits   (register index, 0-63)
    rA:      6 bits
    rB:      6 bits

  The immediate word carries a full-width constant or a jump target. Jump and
  call targets are instruction-pair indices and are shifted left by one to
  obtain the word offset into the program, which is why a program must hold
  an even number of words.

  One design decision that needed to be made is whether to store the decoded
  instruction as one enum variant per opcode, carrying its fields as payload.
  The fields here are the same five for every opcode, so a plain record with
  a separate one-byte opcode enum is both smaller and simpler; variant-per-
  opcode layouts only pay off when argument shapes differ.

*/

mod binary;
mod instruction;

pub use binary::{encode_instruction, try_decode_instruction, Word};
pub use instruction::{Instruction, Opcode, OperandType, Syscall};
