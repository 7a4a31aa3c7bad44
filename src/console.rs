/*!
  The console capability consumed by the syscall boundary. The machine is
  parameterized over this trait at construction and never reaches for a
  process-global console, so an in-memory recorder can stand in during tests.
*/

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::io;
use std::io::{BufRead, Write};

pub trait Console {
  /// Write `value` with no trailing terminator.
  fn print(&mut self, value: i32);

  /// Write `value` followed by a line terminator.
  fn println(&mut self, value: i32);

  /// Read one line of text, without its terminator. `Ok(None)` signals end
  /// of input, distinguishable from an I/O error.
  fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Console backed by the process's stdin and stdout.
pub struct StandardConsole;

impl Console for StandardConsole {

  fn print(&mut self, value: i32) {
    print!("{}", value);
    // Syscall output must be visible before a subsequent INPUT blocks.
    let _ = io::stdout().flush();
  }

  fn println(&mut self, value: i32) {
    println!("{}", value);
  }

  fn read_line(&mut self) -> io::Result<Option<String>> {
    let mut line = String::new();
    let bytes = io::stdin().lock().read_line(&mut line)?;
    if bytes == 0 {
      return Ok(None);
    }
    if line.ends_with('\n') {
      line.pop();
      if line.ends_with('\r') {
        line.pop();
      }
    }
    Ok(Some(line))
  }

}

/// In-memory console: records everything printed and serves queued input
/// lines. Once the queue is exhausted it reports end of input.
pub struct MemoryConsole {
  output :  String,
  input  :  VecDeque<String>,
}

impl MemoryConsole {

  pub fn new() -> MemoryConsole {
    MemoryConsole {
      output :  String::new(),
      input  :  VecDeque::new(),
    }
  }

  pub fn with_input(lines: &[&str]) -> MemoryConsole {
    MemoryConsole {
      output :  String::new(),
      input  :  lines.iter().map(|line| line.to_string()).collect(),
    }
  }

  /// Everything printed so far, line terminators included.
  pub fn output(&self) -> &str {
    &self.output
  }

}

impl Console for MemoryConsole {

  fn print(&mut self, value: i32) {
    let _ = write!(self.output, "{}", value);
  }

  fn println(&mut self, value: i32) {
    let _ = writeln!(self.output, "{}", value);
  }

  fn read_line(&mut self) -> io::Result<Option<String>> {
    Ok(self.input.pop_front())
  }

}
