//! Structures and functions for the Successor Virtual Machine, the bytecode
//! interpreter at the core of the Capacita toolchain.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::bytecode::{try_decode_instruction, Instruction, Opcode, OperandType, Syscall, Word};
use crate::console::Console;
use crate::error::{ConfigurationError, Fault};
use crate::heap::{GrowthPolicy, Heap, DEFAULT_GROWTH, DEFAULT_SEGMENTS, DEFAULT_SLOTS};
use crate::registers::{RegisterFile, R_BP, R_SP};
use crate::stack::{Stack, StackAccess};

/// Terminal outcome of one `execute` run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExitStatus {
  /// An explicit EXIT syscall.
  Success,
  /// Execution ran off the end of the program without reaching EXIT. Not an
  /// error: it lets callers tell "forgot to exit" apart from a fault.
  EndOfProgram,
  /// The dispatch loop aborted on a fault.
  Failure(Fault),
}

impl ExitStatus {
  /// The process exit code for this outcome.
  pub fn code(&self) -> i32 {
    match self {
      ExitStatus::Success      =>  0,
      ExitStatus::EndOfProgram => -1,
      ExitStatus::Failure(_)   =>  1,
    }
  }
}

impl Display for ExitStatus {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ExitStatus::Success        => write!(f, "SUCCESS"),
      ExitStatus::EndOfProgram   => write!(f, "END_OF_PROGRAM"),
      ExitStatus::Failure(fault) => write!(f, "FAILURE: {}", fault),
    }
  }
}

/// How many stack slots the state display shows, counted down from the top.
const DISPLAYED_STACK_SLOTS: usize = 10;

pub struct SVM<C: Console> {

  // Memory stores
  program :  Vec<Word>, // Code memory, read-only for the duration of a run
  heap    :  Heap,      // Segmented typed heap
  stack   :  Stack,     // Descending virtual stack, one resident segment

  // Registers
  registers :  RegisterFile,
  ip        :  usize,   // Instruction pointer, a word offset into `program`

  // Host I/O capability, injected at construction
  console :  C,

}

impl<C: Console> SVM<C> {

  // region Construction

  /// Creates a machine with the default heap configuration: 14 segments of
  /// 2048 slots under exponential growth.
  pub fn new(program: Vec<Word>, console: C) -> Result<SVM<C>, ConfigurationError> {
    SVM::with_config(program, DEFAULT_SEGMENTS, DEFAULT_SLOTS, DEFAULT_GROWTH, console)
  }

  /**
    Creates a machine with an explicit heap configuration. Configuration
    errors are detected here, before execution can begin: an odd program
    length, non-positive segment or slot counts, or a capacity that would
    overflow under the chosen growth policy.
  */
  pub fn with_config(
    program: Vec<Word>,
    segments: i32,
    initial_slots: i32,
    growth: GrowthPolicy,
    console: C
  ) -> Result<SVM<C>, ConfigurationError> {
    if program.len() % 2 != 0 {
      return Err(ConfigurationError::OddProgramLength(program.len()));
    }
    let heap = Heap::new(segments, initial_slots, growth)?;

    let mut registers = RegisterFile::new();
    registers.set_int(R_SP, Stack::start_address());
    registers.set_int(R_BP, Stack::start_address());

    Ok(SVM {
      program,
      heap,
      stack: Stack::new(),
      registers,
      ip: 0,
      console,
    })
  }

  pub fn registers(&self) -> &RegisterFile {
    &self.registers
  }

  pub fn console(&self) -> &C {
    &self.console
  }

  // endregion

  // region Dispatch loop

  /**
    Runs the fetch/decode/execute cycle to one of its three terminal
    outcomes: an explicit EXIT syscall, a fault, or the end of the program.
    There is no suspension other than the INPUT syscall blocking on the
    console, and no resumption after a fault.
  */
  pub fn execute(&mut self) -> ExitStatus {
    self.ip = 0;

    while self.ip + 1 < self.program.len() {
      let command = self.program[self.ip];
      let constant = self.program[self.ip + 1] as i32;

      let instruction = match try_decode_instruction(command) {
        Some(instruction) => instruction,
        None => {
          return ExitStatus::Failure(Fault::DecodeFault { ip: self.ip, command });
        }
      };

      #[cfg(feature = "trace_computation")]
      println!("ip={}: {} #{}", self.ip, instruction, constant);

      match self.dispatch(instruction, constant) {
        Ok(None)         => { }
        Ok(Some(status)) => return status,
        Err(fault)       => return ExitStatus::Failure(fault),
      }

      #[cfg(feature = "trace_computation")]
      println!("{}", self);
    }

    ExitStatus::EndOfProgram
  }

  /// First dispatch level: by operand type. Only integer instructions
  /// execute; the other classes are reserved and fault immediately rather
  /// than no-op through the loop.
  fn dispatch(
    &mut self,
    instruction: Instruction,
    constant: i32
  ) -> Result<Option<ExitStatus>, Fault> {
    match instruction.operand_type {
      OperandType::Int => self.dispatch_int(instruction, constant),

      OperandType::Float => Err(Fault::UnimplementedOperation {
        ip: self.ip,
        operation: "float instructions"
      }),

      OperandType::Text => Err(Fault::UnimplementedOperation {
        ip: self.ip,
        operation: "text instructions"
      }),

      OperandType::Object => Err(Fault::UnimplementedOperation {
        ip: self.ip,
        operation: "object instructions"
      }),
    }
  }

  /// Second dispatch level: by opcode, for the integer operand class.
  /// Arithmetic wraps on overflow, matching the original machine's 32-bit
  /// integer semantics.
  fn dispatch_int(
    &mut self,
    instruction: Instruction,
    constant: i32
  ) -> Result<Option<ExitStatus>, Fault> {
    let ra = instruction.ra as usize;
    let rb = instruction.rb as usize;
    let rc = instruction.rc as usize;

    match instruction.opcode {

      // The immediate is fused with the second operand before the primary
      // operator is applied. This is not a plain three-operand form.
      Opcode::Mov => {
        let value = self.registers.int(rb).wrapping_add(constant);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Add => {
        let fused = self.registers.int(rb).wrapping_add(constant);
        let value = self.registers.int(ra).wrapping_add(fused);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Sub => {
        let fused = self.registers.int(rb).wrapping_add(constant);
        let value = self.registers.int(ra).wrapping_sub(fused);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Mul => {
        let fused = self.registers.int(rb).wrapping_add(constant);
        let value = self.registers.int(ra).wrapping_mul(fused);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Div => {
        let fused = self.registers.int(rb).wrapping_add(constant);
        if fused == 0 {
          return Err(Fault::DivisionByZero { ip: self.ip });
        }
        let value = self.registers.int(ra).wrapping_div(fused);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Mod => {
        let fused = self.registers.int(rb).wrapping_add(constant);
        if fused == 0 {
          return Err(Fault::DivisionByZero { ip: self.ip });
        }
        let value = self.registers.int(ra).wrapping_rem(fused);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::And => {
        let fused = self.registers.int(rb) | constant;
        let value = self.registers.int(ra) & fused;
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Or => {
        let fused = self.registers.int(rb) | constant;
        let value = self.registers.int(ra) | fused;
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Xor => {
        let fused = self.registers.int(rb) ^ constant;
        let value = self.registers.int(ra) ^ fused;
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Shlv => {
        // Shift counts are masked to the low five bits, as in the original.
        let fused = self.registers.int(rb).wrapping_add(constant);
        let value = self.registers.int(ra).wrapping_shl(fused as u32);
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::J => {
        self.jump(constant)?;
      }

      Opcode::Jmp => {
        let target = self.registers.int(ra);
        self.jump(target)?;
      }

      Opcode::Jeq => {
        let taken = self.registers.int(ra) == self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Jne => {
        let taken = self.registers.int(ra) != self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Jge => {
        let taken = self.registers.int(ra) >= self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Jg => {
        let taken = self.registers.int(ra) > self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Jle => {
        let taken = self.registers.int(ra) <= self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Jl => {
        let taken = self.registers.int(ra) < self.registers.int(rb);
        self.branch(taken, constant)?;
      }

      Opcode::Call => {
        let sp = self.registers.int(R_SP).wrapping_sub(1);
        self.registers.set_int(R_SP, sp);
        let return_address = (self.ip + 2) as i32;
        self.stack_write(sp, return_address)?;
        self.jump(constant)?;
      }

      Opcode::Ret => {
        let sp = self.registers.int(R_SP);
        let return_address = self.stack_read(sp)?;
        if return_address < 0 {
          return Err(Fault::MemoryFault { ip: self.ip, address: return_address });
        }
        self.ip = return_address as usize;
        self.registers.set_int(R_SP, sp.wrapping_add(1));
      }

      Opcode::Load => {
        let address = self.effective_address(rb, rc, constant);
        let value = match Stack::contains(address) {
          true  => self.stack_read(address)?,
          false => {
            self.heap
                .load_int(address)
                .ok_or(Fault::MemoryFault { ip: self.ip, address })?
          }
        };
        self.registers.set_int(ra, value);
        self.advance();
      }

      Opcode::Save => {
        let address = self.effective_address(rb, rc, constant);
        let value = self.registers.int(ra);
        match Stack::contains(address) {
          true  => self.stack_write(address, value)?,
          false => {
            self.heap
                .save_int(address, value)
                .ok_or(Fault::MemoryFault { ip: self.ip, address })?
          }
        }
        self.advance();
      }

      Opcode::Push => {
        let sp = self.registers.int(R_SP).wrapping_sub(1);
        self.registers.set_int(R_SP, sp);
        self.stack_write(sp, constant)?;
        self.advance();
      }

      Opcode::Pop => {
        let sp = self.registers.int(R_SP);
        let value = self.stack_read(sp)?;
        self.registers.set_int(ra, value);
        self.registers.set_int(R_SP, sp.wrapping_add(1));
        self.advance();
      }

      Opcode::Syscall => {
        return self.syscall(ra, rb);
      }

    }

    Ok(None)
  }

  // endregion

  // region Syscall boundary

  /// Delegates to the host console capability. The syscall number arrives in
  /// the `rA` field; PRINT, PRINTLN, and INPUT use `rB` for their operand.
  fn syscall(&mut self, number: usize, rb: usize) -> Result<Option<ExitStatus>, Fault> {
    let call = Syscall::try_from(number as u8)
      .map_err(|_| Fault::UnknownSyscall { ip: self.ip, number })?;

    match call {

      Syscall::Exit => {
        return Ok(Some(ExitStatus::Success));
      }

      Syscall::Print => {
        self.console.print(self.registers.int(rb));
      }

      Syscall::Println => {
        self.console.println(self.registers.int(rb));
      }

      Syscall::Input => {
        match self.console.read_line() {
          Ok(Some(line)) => self.registers.set_text(rb, line),
          Ok(None) => {
            return Err(Fault::IoFault {
              ip: self.ip,
              reason: "end of input".to_string()
            });
          }
          Err(error) => {
            return Err(Fault::IoFault { ip: self.ip, reason: error.to_string() });
          }
        }
      }

      // No distinct halt semantics exist; the original fell through to its
      // failure path. The reserved object syscalls fault likewise instead of
      // silently skipping their instruction pair.
      Syscall::Halt => {
        return Err(self.unimplemented_syscall("syscall HALT"));
      }
      Syscall::ReadProperty => {
        return Err(self.unimplemented_syscall("syscall READ_PROPERTY"));
      }
      Syscall::WriteProperty => {
        return Err(self.unimplemented_syscall("syscall WRITE_PROPERTY"));
      }
      Syscall::CallMethod => {
        return Err(self.unimplemented_syscall("syscall CALL_METHOD"));
      }
      Syscall::Other => {
        return Err(self.unimplemented_syscall("syscall OTHER"));
      }

    }

    self.advance();
    Ok(None)
  }

  fn unimplemented_syscall(&self, operation: &'static str) -> Fault {
    Fault::UnimplementedOperation { ip: self.ip, operation }
  }

  // endregion

  // region Low-level utility methods

  /// Advance past the current command/immediate pair.
  fn advance(&mut self) {
    self.ip += 2;
  }

  /// Set `ip` from an instruction-pair index, shifting left by one for the
  /// word offset. A target past the end of the program ends the run as
  /// end-of-program; a negative target is a memory fault.
  fn jump(&mut self, pair_index: i32) -> Result<(), Fault> {
    if pair_index < 0 {
      return Err(Fault::MemoryFault { ip: self.ip, address: pair_index });
    }
    self.ip = (pair_index as usize) << 1;
    Ok(())
  }

  /// On a taken branch, jump to the target pair; otherwise fall through
  /// exactly one instruction pair.
  fn branch(&mut self, taken: bool, target: i32) -> Result<(), Fault> {
    match taken {
      true  => self.jump(target),
      false => {
        self.advance();
        Ok(())
      }
    }
  }

  fn effective_address(&self, rb: usize, rc: usize, constant: i32) -> i32 {
    self.registers
        .int(rb)
        .wrapping_add(self.registers.int(rc))
        .wrapping_add(constant)
  }

  fn stack_read(&self, address: i32) -> Result<i32, Fault> {
    match self.stack.read(address) {
      Ok(value) => Ok(value),
      Err(miss) => Err(self.stack_fault(address, miss)),
    }
  }

  fn stack_write(&mut self, address: i32, value: i32) -> Result<(), Fault> {
    match self.stack.write(address, value) {
      Ok(())    => Ok(()),
      Err(miss) => Err(self.stack_fault(address, miss)),
    }
  }

  fn stack_fault(&self, address: i32, miss: StackAccess) -> Fault {
    match miss {
      StackAccess::Unmaterialized => Fault::UnimplementedOperation {
        ip: self.ip,
        operation: "growth into unmaterialized stack segments"
      },
      _ => Fault::MemoryFault { ip: self.ip, address },
    }
  }

  // endregion

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    // Registers that are 0 are suppressed; the pointer pair always shows.
    for (i, value) in self.registers.int_bank().iter().enumerate() {
      if *value == 0 && i != R_SP && i != R_BP {
        continue;
      }
      let label = match i {
        R_SP => "rSP".to_string(),
        R_BP => "rBP".to_string(),
        _    => format!("r{}", i),
      };
      table.add_row(row![r->format!("{} =", label), format!("{}", value)]);
    }
    table
  }

  fn make_stack_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    let top = Stack::start_address();
    for (distance, value) in
      self.stack.top_slots(DISPLAYED_STACK_SLOTS).iter().rev().enumerate()
    {
      table.add_row(row![
        r->format!("{:#x} =", top - distance as i32),
        format!("{}", value)
      ]);
    }
    table
  }

  // endregion

}

impl<C: Console> Display for SVM<C> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut combined_table = table!([self.make_register_table(), self.make_stack_table()]);

    combined_table.set_titles(row![ub->"Registers", ub->"Stack Top"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "ip = {}\n{}", self.ip, combined_table)
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::encode_instruction;
  use crate::console::MemoryConsole;
  use crate::stack::{STACK_VIRTUAL_BOUNDARY, STACK_VIRTUAL_OFFSET};

  fn pair(opcode: Opcode, ra: u8, rb: u8, rc: u8, constant: i32) -> [Word; 2] {
    let command = encode_instruction(&Instruction::new(OperandType::Int, opcode, ra, rb, rc));
    [command, constant as Word]
  }

  fn syscall_pair(call: Syscall, rb: u8) -> [Word; 2] {
    pair(Opcode::Syscall, call as u8, rb, 0, 0)
  }

  fn program(pairs: &[[Word; 2]]) -> Vec<Word> {
    pairs.iter().flatten().copied().collect()
  }

  fn run(words: Vec<Word>) -> (ExitStatus, SVM<MemoryConsole>) {
    run_on(words, MemoryConsole::new())
  }

  fn run_on(words: Vec<Word>, console: MemoryConsole) -> (ExitStatus, SVM<MemoryConsole>) {
    let mut machine = SVM::new(words, console).expect("configuration rejected");
    let status = machine.execute();
    (status, machine)
  }

  // region Fused-immediate arithmetic

  #[test]
  fn add_fuses_immediate_with_second_operand() {
    // regB = 5, constant = 3: ADD must add 8, not 3.
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 5),
      pair(Opcode::Add, 2, 1, 0, 3),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(2), 8);
  }

  #[test]
  fn mov_fuses_immediate_with_source() {
    let (_, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 5),
      pair(Opcode::Mov, 2, 1, 0, 37),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(machine.registers().int(2), 42);
  }

  #[test]
  fn sub_mul_div_mod_fuse_their_immediates() {
    let (_, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 5),   // r1 = 5
      pair(Opcode::Mov, 2, 0, 0, 10),
      pair(Opcode::Sub, 2, 1, 0, 3),   // r2 = 10 - (5 + 3) = 2
      pair(Opcode::Mov, 3, 0, 0, 3),
      pair(Opcode::Mul, 3, 1, 0, -3),  // r3 = 3 * (5 - 3) = 6
      pair(Opcode::Mov, 4, 0, 0, 20),
      pair(Opcode::Div, 4, 1, 0, -1),  // r4 = 20 / (5 - 1) = 5
      pair(Opcode::Mov, 5, 0, 0, 23),
      pair(Opcode::Mod, 5, 1, 0, 0),   // r5 = 23 % 5 = 3
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(machine.registers().int(2), 2);
    assert_eq!(machine.registers().int(3), 6);
    assert_eq!(machine.registers().int(4), 5);
    assert_eq!(machine.registers().int(5), 3);
  }

  #[test]
  fn bitwise_ops_fuse_with_or_and_xor() {
    let (_, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 0b1010),
      pair(Opcode::Mov, 2, 0, 0, 0b1100),
      pair(Opcode::And, 2, 1, 0, 0b0110), // r2 &= (0b1010 | 0b0110) = 0b1110
      pair(Opcode::Mov, 3, 0, 0, 0b0001),
      pair(Opcode::Or,  3, 1, 0, 0b0100), // r3 |= (0b1010 | 0b0100)
      pair(Opcode::Mov, 4, 0, 0, 0b1111),
      pair(Opcode::Xor, 4, 1, 0, 0b0110), // r4 ^= (0b1010 ^ 0b0110) = 0b1100
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(machine.registers().int(2), 0b1100);
    assert_eq!(machine.registers().int(3), 0b1111);
    assert_eq!(machine.registers().int(4), 0b0011);
  }

  #[test]
  fn shlv_shifts_by_fused_count() {
    let (_, machine) = run(program(&[
      pair(Opcode::Mov,  1, 0, 0, 1),
      pair(Opcode::Mov,  2, 0, 0, 1),
      pair(Opcode::Shlv, 2, 1, 0, 2), // r2 <<= (1 + 2)
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(machine.registers().int(2), 8);
  }

  #[test]
  fn arithmetic_wraps_like_32_bit_integers() {
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, i32::MAX),
      pair(Opcode::Add, 1, 0, 0, 1),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(1), i32::MIN);
  }

  #[test]
  fn division_by_fused_zero_faults() {
    let (status, _) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 10),
      pair(Opcode::Div, 1, 0, 0, 0),
    ]));
    assert_eq!(status, ExitStatus::Failure(Fault::DivisionByZero { ip: 2 }));
    assert_eq!(status.code(), 1);

    let (status, _) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 3),   // r1 = 3
      pair(Opcode::Mod, 2, 1, 0, -3),  // fused divisor 3 + (-3) = 0
    ]));
    assert!(matches!(status, ExitStatus::Failure(Fault::DivisionByZero { .. })));
  }

  // endregion

  // region Control flow

  #[test]
  fn unconditional_jump_skips_a_pair() {
    let (status, machine) = run(program(&[
      pair(Opcode::J, 0, 0, 0, 2),
      pair(Opcode::Mov, 5, 0, 0, 99), // skipped
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(5), 0);
  }

  #[test]
  fn indirect_jump_uses_register_pair_index() {
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 3),
      pair(Opcode::Jmp, 1, 0, 0, 0),
      pair(Opcode::Mov, 5, 0, 0, 99), // skipped
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(5), 0);
  }

  #[test]
  fn jeq_taken_jumps_and_not_taken_falls_through_one_pair() {
    // r0 == r1 (both zero): taken.
    let (status, machine) = run(program(&[
      pair(Opcode::Jeq, 0, 1, 0, 2),
      pair(Opcode::Mov, 5, 0, 0, 99),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(5), 0);

    // r1 = 1 != r0: falls through exactly one pair.
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 1),
      pair(Opcode::Jeq, 0, 1, 0, 3),
      pair(Opcode::Mov, 5, 0, 0, 99),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(5), 99);
  }

  /// Runs `a <opcode> b` branching over a marker write; returns true iff the
  /// branch was taken.
  fn branch_taken(opcode: Opcode, a: i32, b: i32) -> bool {
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, a),
      pair(Opcode::Mov, 2, 0, 0, b),
      pair(opcode, 1, 2, 0, 4),
      pair(Opcode::Mov, 5, 0, 0, 1),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    machine.registers().int(5) == 0
  }

  #[test]
  fn comparison_branches_compare_ra_against_rb() {
    assert!( branch_taken(Opcode::Jne,  1, 2));
    assert!(!branch_taken(Opcode::Jne,  2, 2));
    assert!( branch_taken(Opcode::Jge,  2, 2));
    assert!( branch_taken(Opcode::Jge,  3, 2));
    assert!(!branch_taken(Opcode::Jge, -3, 2));
    assert!( branch_taken(Opcode::Jg,   3, 2));
    assert!(!branch_taken(Opcode::Jg,   2, 2));
    assert!( branch_taken(Opcode::Jle,  2, 2));
    assert!( branch_taken(Opcode::Jle, -3, 2));
    assert!(!branch_taken(Opcode::Jle,  3, 2));
    assert!( branch_taken(Opcode::Jl,   1, 2));
    assert!(!branch_taken(Opcode::Jl,   2, 2));
  }

  #[test]
  fn negative_branch_target_faults() {
    let (status, _) = run(program(&[pair(Opcode::J, 0, 0, 0, -1)]));
    assert_eq!(
      status,
      ExitStatus::Failure(Fault::MemoryFault { ip: 0, address: -1 })
    );
  }

  // endregion

  // region Call/return and push/pop

  #[test]
  fn call_ret_round_trip_restores_ip_and_sp() {
    let (status, machine) = run(program(&[
      pair(Opcode::Call, 0, 0, 0, 3),  // pair 0: call subroutine at pair 3
      pair(Opcode::Mov, 1, 0, 0, 11),  // pair 1: return lands here
      syscall_pair(Syscall::Exit, 0),  // pair 2
      pair(Opcode::Mov, 2, 0, 0, 7),   // pair 3: subroutine body
      pair(Opcode::Ret, 0, 0, 0, 0),   // pair 4
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(2), 7);
    assert_eq!(machine.registers().int(1), 11);
    assert_eq!(machine.registers().int(R_SP), Stack::start_address());
    assert_eq!(machine.registers().int(R_BP), Stack::start_address());
  }

  #[test]
  fn nested_calls_unwind_in_lifo_order() {
    let (status, machine) = run(program(&[
      pair(Opcode::Call, 0, 0, 0, 3),  // pair 0: call f
      pair(Opcode::Mov, 1, 0, 0, 1),   // pair 1
      syscall_pair(Syscall::Exit, 0),  // pair 2
      pair(Opcode::Call, 0, 0, 0, 6),  // pair 3: f calls g
      pair(Opcode::Mov, 2, 0, 0, 2),   // pair 4
      pair(Opcode::Ret, 0, 0, 0, 0),   // pair 5
      pair(Opcode::Mov, 3, 0, 0, 3),   // pair 6: g
      pair(Opcode::Ret, 0, 0, 0, 0),   // pair 7
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(1), 1);
    assert_eq!(machine.registers().int(2), 2);
    assert_eq!(machine.registers().int(3), 3);
    assert_eq!(machine.registers().int(R_SP), Stack::start_address());
  }

  #[test]
  fn push_pop_round_trip_is_lifo_and_restores_sp() {
    let (status, machine) = run(program(&[
      pair(Opcode::Push, 0, 0, 0, 1),
      pair(Opcode::Push, 0, 0, 0, 2),
      pair(Opcode::Push, 0, 0, 0, 3),
      pair(Opcode::Pop, 1, 0, 0, 0),
      pair(Opcode::Pop, 2, 0, 0, 0),
      pair(Opcode::Pop, 3, 0, 0, 0),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(1), 3);
    assert_eq!(machine.registers().int(2), 2);
    assert_eq!(machine.registers().int(3), 1);
    assert_eq!(machine.registers().int(R_SP), Stack::start_address());
  }

  // endregion

  // region Memory

  #[test]
  fn load_save_route_to_the_stack_at_or_above_the_boundary() {
    let (status, machine) = run(program(&[
      pair(Opcode::Push, 0, 0, 0, 5),
      pair(Opcode::Load, 1, R_SP as u8, 0, 0), // r1 <- [rSP]
      pair(Opcode::Mov, 2, 0, 0, 9),
      pair(Opcode::Save, 2, R_SP as u8, 0, 0), // [rSP] <- 9
      pair(Opcode::Pop, 3, 0, 0, 0),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().int(1), 5);
    assert_eq!(machine.registers().int(3), 9);
  }

  #[test]
  fn load_save_route_to_the_heap_below_the_boundary() {
    let words = program(&[
      pair(Opcode::Mov, 1, 0, 0, 7),
      pair(Opcode::Save, 1, 0, 0, 40), // heap address 40, segment 2
      pair(Opcode::Load, 2, 0, 0, 40),
      syscall_pair(Syscall::Exit, 0),
    ]);
    let mut machine =
      SVM::with_config(words, 4, 16, GrowthPolicy::Linear, MemoryConsole::new()).unwrap();
    assert_eq!(machine.execute(), ExitStatus::Success);
    assert_eq!(machine.registers().int(2), 7);
  }

  #[test]
  fn heap_access_beyond_capacity_faults() {
    let words = program(&[
      pair(Opcode::Load, 1, 0, 0, 64), // capacity is 4 * 16
    ]);
    let mut machine =
      SVM::with_config(words, 4, 16, GrowthPolicy::Linear, MemoryConsole::new()).unwrap();
    assert_eq!(
      machine.execute(),
      ExitStatus::Failure(Fault::MemoryFault { ip: 0, address: 64 })
    );
  }

  #[test]
  fn negative_effective_address_faults() {
    let (status, _) = run(program(&[
      pair(Opcode::Save, 1, 0, 0, -5),
    ]));
    assert_eq!(
      status,
      ExitStatus::Failure(Fault::MemoryFault { ip: 0, address: -5 })
    );
  }

  #[test]
  fn unmaterialized_stack_segments_fault_as_unimplemented() {
    // The boundary is stack territory, but fifteen segments below the
    // resident one.
    let (status, _) = run(program(&[
      pair(Opcode::Load, 1, 0, 0, STACK_VIRTUAL_BOUNDARY),
    ]));
    assert!(matches!(
      status,
      ExitStatus::Failure(Fault::UnimplementedOperation { ip: 0, .. })
    ));

    // One below the resident segment's base, same story.
    let (status, _) = run(program(&[
      pair(Opcode::Load, 1, 0, 0, STACK_VIRTUAL_OFFSET - 1),
    ]));
    assert!(matches!(
      status,
      ExitStatus::Failure(Fault::UnimplementedOperation { .. })
    ));
  }

  #[test]
  fn pop_past_the_stack_top_faults() {
    let (status, _) = run(program(&[
      pair(Opcode::Pop, 1, 0, 0, 0),
      pair(Opcode::Pop, 2, 0, 0, 0), // SP now above the top slot
    ]));
    assert!(matches!(
      status,
      ExitStatus::Failure(Fault::MemoryFault { ip: 2, .. })
    ));
  }

  // endregion

  // region Syscalls and termination

  #[test]
  fn lone_exit_returns_success() {
    let (status, _) = run(program(&[syscall_pair(Syscall::Exit, 0)]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(status.code(), 0);
  }

  #[test]
  fn unrecognized_opcode_returns_failure() {
    // Type Int, opcode field all ones: no such operation.
    let (status, _) = run(vec![0x3ff8_0000, 0]);
    assert_eq!(
      status,
      ExitStatus::Failure(Fault::DecodeFault { ip: 0, command: 0x3ff8_0000 })
    );
    assert_eq!(status.code(), 1);
  }

  #[test]
  fn running_off_the_end_returns_end_of_program() {
    let (status, machine) = run(program(&[pair(Opcode::Mov, 1, 0, 0, 42)]));
    assert_eq!(status, ExitStatus::EndOfProgram);
    assert_eq!(status.code(), -1);
    assert_eq!(machine.registers().int(1), 42);
  }

  #[test]
  fn empty_program_returns_end_of_program() {
    let (status, _) = run(vec![]);
    assert_eq!(status, ExitStatus::EndOfProgram);
  }

  #[test]
  fn println_writes_value_and_terminator() {
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 42),
      syscall_pair(Syscall::Println, 1),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.console().output(), "42\n");
  }

  #[test]
  fn print_writes_no_terminator() {
    let (status, machine) = run(program(&[
      pair(Opcode::Mov, 1, 0, 0, 7),
      syscall_pair(Syscall::Print, 1),
      pair(Opcode::Mov, 1, 0, 0, 8),
      syscall_pair(Syscall::Println, 1),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.console().output(), "78\n");
  }

  #[test]
  fn input_reads_one_line_into_the_text_register() {
    let words = program(&[
      syscall_pair(Syscall::Input, 4),
      syscall_pair(Syscall::Exit, 0),
    ]);
    let (status, machine) = run_on(words, MemoryConsole::with_input(&["hello vm"]));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(machine.registers().text(4), "hello vm");
  }

  #[test]
  fn input_at_end_of_input_faults() {
    let (status, _) = run(program(&[
      syscall_pair(Syscall::Input, 4),
      syscall_pair(Syscall::Exit, 0),
    ]));
    assert!(matches!(status, ExitStatus::Failure(Fault::IoFault { ip: 0, .. })));
    assert_eq!(status.code(), 1);
  }

  #[test]
  fn halt_and_reserved_syscalls_fault() {
    for &call in &[
      Syscall::Halt,
      Syscall::ReadProperty,
      Syscall::WriteProperty,
      Syscall::CallMethod,
      Syscall::Other,
    ] {
      let (status, _) = run(program(&[syscall_pair(call, 0)]));
      assert!(
        matches!(status, ExitStatus::Failure(Fault::UnimplementedOperation { .. })),
        "syscall {} should fault",
        call
      );
    }
  }

  #[test]
  fn unknown_syscall_number_faults() {
    let (status, _) = run(program(&[pair(Opcode::Syscall, 9, 0, 0, 0)]));
    assert_eq!(
      status,
      ExitStatus::Failure(Fault::UnknownSyscall { ip: 0, number: 9 })
    );
  }

  #[test]
  fn non_integer_instruction_types_fault_as_unimplemented() {
    for &operand_type in &[OperandType::Float, OperandType::Text, OperandType::Object] {
      let command =
        encode_instruction(&Instruction::new(operand_type, Opcode::Mov, 1, 0, 0));
      let (status, _) = run(vec![command, 0]);
      assert!(matches!(
        status,
        ExitStatus::Failure(Fault::UnimplementedOperation { ip: 0, .. })
      ));
    }
  }

  // endregion

  // region Configuration

  #[test]
  fn odd_program_length_is_rejected_before_execution() {
    let command = encode_instruction(
      &Instruction::new(OperandType::Int, Opcode::Mov, 1, 0, 0)
    );
    let result = SVM::new(vec![command], MemoryConsole::new());
    assert!(matches!(result, Err(ConfigurationError::OddProgramLength(1))));
  }

  #[test]
  fn infeasible_heap_configuration_is_rejected_before_execution() {
    let result = SVM::with_config(
      vec![],
      0,
      2048,
      GrowthPolicy::Linear,
      MemoryConsole::new()
    );
    assert!(matches!(result, Err(ConfigurationError::NonPositiveSegments(0))));

    let result = SVM::with_config(
      vec![],
      32,
      2048,
      GrowthPolicy::Exponential,
      MemoryConsole::new()
    );
    assert!(matches!(result, Err(ConfigurationError::CapacityOverflow { .. })));
  }

  // endregion
}
