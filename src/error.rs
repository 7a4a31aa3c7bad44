//! Tagged error variants, split into the two tiers the machine distinguishes:
//! configuration errors that reject a machine before it ever runs, and runtime
//! faults that abort the dispatch loop with a failure exit.

use thiserror::Error;

use crate::bytecode::Word;
use crate::heap::GrowthPolicy;

/// Rejected at construction. A machine holding one of these never begins
/// executing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ConfigurationError {
  /// Instructions are command/immediate word pairs, so a valid program has an
  /// even number of words.
  #[error("program length is {0}, number of words should be even")]
  OddProgramLength(usize),

  #[error("number of segments is negative or 0: {0}")]
  NonPositiveSegments(i32),

  #[error("initial slots is negative or 0: {0}")]
  NonPositiveSlots(i32),

  /// The capacity product for the selected growth policy exceeds `i32::MAX`.
  /// Detected before multiplying; the capacity is never allowed to wrap.
  #[error("{policy} growth with {segments} segments of {slots} slots overflows the heap size")]
  CapacityOverflow {
    policy   :  GrowthPolicy,
    segments :  i32,
    slots    :  i32
  },
}

/// Aborts the dispatch loop immediately. Every variant carries the word index
/// (`ip`) of the faulting instruction; once raised, the machine is done.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Fault {
  /// The command word has an unrecognized type or opcode field.
  #[error("cannot decode command word {command:#010x} at word {ip}")]
  DecodeFault { ip: usize, command: Word },

  /// A syscall number outside the defined protocol.
  #[error("unrecognized syscall {number} at word {ip}")]
  UnknownSyscall { ip: usize, number: usize },

  /// The console capability reported end-of-input or an I/O error.
  #[error("console i/o failed at word {ip}: {reason}")]
  IoFault { ip: usize, reason: String },

  /// A decodable operation whose semantics are reserved extension points:
  /// float/text/object instruction types, the object syscalls, HALT, and
  /// growth into unmaterialized stack segments.
  #[error("{operation} is not implemented, at word {ip}")]
  UnimplementedOperation { ip: usize, operation: &'static str },

  /// An effective address outside the mapped heap capacity or above the
  /// materialized stack top, or a negative branch target.
  #[error("address {address:#x} is outside mapped memory, at word {ip}")]
  MemoryFault { ip: usize, address: i32 },

  /// The fused divisor `regB + constant` evaluated to zero.
  #[error("division by zero at word {ip}")]
  DivisionByZero { ip: usize },
}
